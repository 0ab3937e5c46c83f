use glam::{Quat, Vec3};

use super::{CrdtReader, CrdtReaderError, FromCrdtReader, SceneEntityId, ToCrdtWriter};

/// The fixed-layout transform payload: 44 bytes on the wire, ten floats then
/// the parent entity. Unlike the generated components this one is packed by
/// hand, field by field in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformAndParent {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub parent: SceneEntityId,
}

impl Default for TransformAndParent {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: SceneEntityId::ROOT,
        }
    }
}

impl TransformAndParent {
    pub const WIRE_SIZE: usize = 44;

    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn parented_to(parent: SceneEntityId) -> Self {
        Self {
            parent,
            ..Default::default()
        }
    }

    /// scenes occasionally send non-finite or denormal rotations; readers
    /// should renormalize before use
    pub fn sanitized_rotation(&self) -> Quat {
        let rotation = self.rotation.normalize();
        if rotation.is_finite() {
            rotation
        } else {
            Quat::IDENTITY
        }
    }
}

impl FromCrdtReader for TransformAndParent {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(TransformAndParent {
            translation: buf.read()?,
            rotation: buf.read()?,
            scale: buf.read()?,
            parent: buf.read()?,
        })
    }
}

impl ToCrdtWriter for TransformAndParent {
    fn to_writer(&self, buf: &mut super::CrdtWriter) {
        buf.write(&self.translation);
        buf.write(&self.rotation);
        buf.write(&self.scale);
        buf.write(&self.parent);
    }
}
