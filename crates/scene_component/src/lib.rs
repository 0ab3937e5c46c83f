// structs representing scene components and wire de/serialization
use std::ops::Range;

pub mod component_number;
pub mod components;
pub mod maths;
pub mod reader;
pub mod schema;
pub mod transform_and_parent;
pub mod writer;

pub use reader::{CrdtReader, CrdtReaderError, FromCrdtReader};
pub use writer::{CrdtWriter, ToCrdtWriter};

/// A scene entity reference: a 16 bit slot number plus a 16 bit version,
/// packed little-endian into a u32 on the wire (number low, version high).
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy, Default)]
pub struct SceneEntityId {
    pub number: u16,
    pub version: u16,
}

impl std::fmt::Display for SceneEntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("e{}v{}", self.number, self.version))
    }
}

impl SceneEntityId {
    const fn reserved(number: u16) -> Self {
        Self { number, version: 0 }
    }

    pub const ROOT: SceneEntityId = Self::reserved(0);
    pub const PLAYER: SceneEntityId = Self::reserved(1);
    pub const CAMERA: SceneEntityId = Self::reserved(2);

    /// numbers below this are allocated by the host, never by the scene
    pub const RESERVED_NUMBERS: Range<u16> = 0..512;

    pub fn new(number: u16, version: u16) -> Self {
        Self { number, version }
    }

    pub fn is_reserved(&self) -> bool {
        Self::RESERVED_NUMBERS.contains(&self.number)
    }

    pub fn to_u32(self) -> u32 {
        self.number as u32 | (self.version as u32) << 16
    }

    pub fn from_u32(raw: u32) -> Self {
        Self {
            number: raw as u16,
            version: (raw >> 16) as u16,
        }
    }
}

#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct SceneComponentId(pub u32);

impl SceneComponentId {
    pub const TRANSFORM: SceneComponentId = SceneComponentId(1);

    pub const MATERIAL: SceneComponentId = SceneComponentId(1017);
    pub const MESH_RENDERER: SceneComponentId = SceneComponentId(1018);
    pub const MESH_COLLIDER: SceneComponentId = SceneComponentId(1019);

    pub const GLTF_CONTAINER: SceneComponentId = SceneComponentId(1041);
    pub const ANIMATOR: SceneComponentId = SceneComponentId(1042);

    pub const ENGINE_INFO: SceneComponentId = SceneComponentId(1048);

    pub const POINTER_EVENTS: SceneComponentId = SceneComponentId(1062);
    pub const POINTER_RESULT: SceneComponentId = SceneComponentId(1063);

    pub const RAYCAST: SceneComponentId = SceneComponentId(1067);
    pub const RAYCAST_RESULT: SceneComponentId = SceneComponentId(1068);

    pub const AVATAR_ATTACHMENT: SceneComponentId = SceneComponentId(1073);
    pub const AVATAR_SHAPE: SceneComponentId = SceneComponentId(1080);

    pub const BILLBOARD: SceneComponentId = SceneComponentId(1090);
    pub const PLAYER_IDENTITY_DATA: SceneComponentId = SceneComponentId(1091);
}

/// Per (component, entity) Lamport counter driving last-write-wins ordering.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy, Default)]
pub struct SceneCrdtTimestamp(pub u32);

impl FromCrdtReader for SceneEntityId {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self {
            number: buf.read_u16()?,
            version: buf.read_u16()?,
        })
    }
}

impl ToCrdtWriter for SceneEntityId {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_u16(self.number);
        buf.write_u16(self.version);
    }
}

impl FromCrdtReader for SceneComponentId {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self(buf.read_u32()?))
    }
}

impl ToCrdtWriter for SceneComponentId {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_u32(self.0)
    }
}

impl FromCrdtReader for SceneCrdtTimestamp {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self(buf.read_u32()?))
    }
}

impl ToCrdtWriter for SceneCrdtTimestamp {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_u32(self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entity_id_u32_packing() {
        let entity = SceneEntityId::new(512, 3);
        assert_eq!(entity.to_u32(), 512 | 3 << 16);
        assert_eq!(SceneEntityId::from_u32(entity.to_u32()), entity);
    }

    #[test]
    fn entity_id_wire_format_is_little_endian_u32() {
        let entity = SceneEntityId::new(0x0201, 0x0403);
        let bytes = entity.to_vec();
        assert_eq!(bytes, entity.to_u32().to_le_bytes());
    }

    #[test]
    fn well_known_entities_are_reserved() {
        assert!(SceneEntityId::ROOT.is_reserved());
        assert!(SceneEntityId::PLAYER.is_reserved());
        assert!(SceneEntityId::CAMERA.is_reserved());
        assert!(!SceneEntityId::new(512, 0).is_reserved());
    }
}
