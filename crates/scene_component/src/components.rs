// built-in component payload types. the original system ships these as
// generated schemas with `{$case, payload}` unions; here each union is a
// tagged enum with an explicit u32 discriminator on the wire.

use glam::Vec3;
use num_derive::{FromPrimitive, ToPrimitive};

use super::{
    maths::Color4,
    schema::{read_enum, write_enum},
    CrdtReader, CrdtReaderError, CrdtWriter, FromCrdtReader, SceneEntityId, ToCrdtWriter,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MeshRenderer {
    Box { uvs: Vec<f32> },
    Sphere,
    Cylinder { radius_top: f32, radius_bottom: f32 },
    Plane { uvs: Vec<f32> },
}

impl Default for MeshRenderer {
    fn default() -> Self {
        Self::Box {
            uvs: Vec::default(),
        }
    }
}

impl FromCrdtReader for MeshRenderer {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        match buf.read_u32()? {
            0 => Ok(Self::Box { uvs: buf.read()? }),
            1 => Ok(Self::Sphere),
            2 => Ok(Self::Cylinder {
                radius_top: buf.read_float()?,
                radius_bottom: buf.read_float()?,
            }),
            3 => Ok(Self::Plane { uvs: buf.read()? }),
            _ => Err(CrdtReaderError::InvalidEnumMember),
        }
    }
}

impl ToCrdtWriter for MeshRenderer {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        match self {
            Self::Box { uvs } => {
                buf.write_u32(0);
                buf.write(uvs);
            }
            Self::Sphere => buf.write_u32(1),
            Self::Cylinder {
                radius_top,
                radius_bottom,
            } => {
                buf.write_u32(2);
                buf.write_float(*radius_top);
                buf.write_float(*radius_bottom);
            }
            Self::Plane { uvs } => {
                buf.write_u32(3);
                buf.write(uvs);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum TextureWrapMode {
    Repeat = 0,
    Clamp = 1,
    Mirror = 2,
}

/// string-valued closed enum: written as its canonical name, validated
/// against the member set on read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilterMode {
    Point,
    #[default]
    Bilinear,
    Trilinear,
}

impl TextureFilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Bilinear => "bilinear",
            Self::Trilinear => "trilinear",
        }
    }
}

impl TryFrom<&str> for TextureFilterMode {
    type Error = CrdtReaderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "point" => Ok(Self::Point),
            "bilinear" => Ok(Self::Bilinear),
            "trilinear" => Ok(Self::Trilinear),
            _ => Err(CrdtReaderError::InvalidEnumMember),
        }
    }
}

impl FromCrdtReader for TextureFilterMode {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Self::try_from(buf.read_string()?.as_str())
    }
}

impl ToCrdtWriter for TextureFilterMode {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_string(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Texture {
    Standard {
        src: String,
        wrap_mode: TextureWrapMode,
        filter_mode: TextureFilterMode,
    },
    Avatar {
        user_id: String,
    },
    Video {
        video_player_entity: SceneEntityId,
    },
}

impl FromCrdtReader for Texture {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        match buf.read_u32()? {
            0 => Ok(Self::Standard {
                src: buf.read()?,
                wrap_mode: read_enum(buf)?,
                filter_mode: buf.read()?,
            }),
            1 => Ok(Self::Avatar {
                user_id: buf.read()?,
            }),
            2 => Ok(Self::Video {
                video_player_entity: buf.read()?,
            }),
            _ => Err(CrdtReaderError::InvalidEnumMember),
        }
    }
}

impl ToCrdtWriter for Texture {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        match self {
            Self::Standard {
                src,
                wrap_mode,
                filter_mode,
            } => {
                buf.write_u32(0);
                buf.write(src);
                write_enum(wrap_mode, buf);
                buf.write(filter_mode);
            }
            Self::Avatar { user_id } => {
                buf.write_u32(1);
                buf.write(user_id);
            }
            Self::Video {
                video_player_entity,
            } => {
                buf.write_u32(2);
                buf.write(video_player_entity);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Unlit {
        diffuse_color: Option<Color4>,
        texture: Option<Texture>,
    },
    Pbr {
        albedo_color: Option<Color4>,
        emissive_color: Option<Color4>,
        metallic: f32,
        roughness: f32,
        texture: Option<Texture>,
    },
}

impl Default for Material {
    fn default() -> Self {
        Self::Pbr {
            albedo_color: None,
            emissive_color: None,
            metallic: 0.5,
            roughness: 0.5,
            texture: None,
        }
    }
}

impl FromCrdtReader for Material {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        match buf.read_u32()? {
            0 => Ok(Self::Unlit {
                diffuse_color: buf.read()?,
                texture: buf.read()?,
            }),
            1 => Ok(Self::Pbr {
                albedo_color: buf.read()?,
                emissive_color: buf.read()?,
                metallic: buf.read_float()?,
                roughness: buf.read_float()?,
                texture: buf.read()?,
            }),
            _ => Err(CrdtReaderError::InvalidEnumMember),
        }
    }
}

impl ToCrdtWriter for Material {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        match self {
            Self::Unlit {
                diffuse_color,
                texture,
            } => {
                buf.write_u32(0);
                buf.write(diffuse_color);
                buf.write(texture);
            }
            Self::Pbr {
                albedo_color,
                emissive_color,
                metallic,
                roughness,
                texture,
            } => {
                buf.write_u32(1);
                buf.write(albedo_color);
                buf.write(emissive_color);
                buf.write_float(*metallic);
                buf.write_float(*roughness);
                buf.write(texture);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum BillboardMode {
    None = 0,
    X = 1,
    Y = 2,
    #[default]
    All = 7,
}

impl FromCrdtReader for BillboardMode {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        read_enum(buf)
    }
}

impl ToCrdtWriter for BillboardMode {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        write_enum(self, buf)
    }
}

/// host-authored frame counters, attached to the root entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineInfo {
    pub frame_number: u32,
    pub total_runtime_ms: u32,
    pub tick_number: u32,
}

impl FromCrdtReader for EngineInfo {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self {
            frame_number: buf.read_u32()?,
            total_runtime_ms: buf.read_u32()?,
            tick_number: buf.read_u32()?,
        })
    }
}

impl ToCrdtWriter for EngineInfo {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_u32(self.frame_number);
        buf.write_u32(self.total_runtime_ms);
        buf.write_u32(self.tick_number);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum InputAction {
    #[default]
    Pointer = 0,
    Primary = 1,
    Secondary = 2,
    Any = 3,
    Forward = 4,
    Backward = 5,
    Right = 6,
    Left = 7,
    Jump = 8,
    Walk = 9,
    Action3 = 10,
    Action4 = 11,
    Action5 = 12,
    Action6 = 13,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum PointerEventType {
    #[default]
    Up = 0,
    Down = 1,
    HoverEnter = 2,
    HoverLeave = 3,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RaycastHit {
    pub position: Vec3,
    pub direction: Vec3,
    pub entity: SceneEntityId,
    pub distance: f32,
}

impl FromCrdtReader for RaycastHit {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self {
            position: buf.read()?,
            direction: buf.read()?,
            entity: buf.read()?,
            distance: buf.read_float()?,
        })
    }
}

impl ToCrdtWriter for RaycastHit {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write(&self.position);
        buf.write(&self.direction);
        buf.write(&self.entity);
        buf.write_float(self.distance);
    }
}

/// one pointer transition reported by the host, appended to the
/// pointer-result value set. `timestamp` is the host's event counter and
/// drives the set ordering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputResult {
    pub button: InputAction,
    pub state: PointerEventType,
    pub timestamp: u32,
    pub hit: Option<RaycastHit>,
}

impl InputResult {
    pub fn timestamp_of(value: &InputResult) -> u32 {
        value.timestamp
    }
}

impl FromCrdtReader for InputResult {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self {
            button: read_enum(buf)?,
            state: read_enum(buf)?,
            timestamp: buf.read_u32()?,
            hit: buf.read()?,
        })
    }
}

impl ToCrdtWriter for InputResult {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        write_enum(&self.button, buf);
        write_enum(&self.state, buf);
        buf.write_u32(self.timestamp);
        buf.write(&self.hit);
    }
}
