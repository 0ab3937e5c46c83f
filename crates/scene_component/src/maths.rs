// wire schemas for the math value types carried inside component payloads.
// vectors and quaternions come from glam; colors are local value structs.

use glam::{Mat4, Quat, Vec2, Vec3};

use super::{CrdtReader, CrdtReaderError, CrdtWriter, FromCrdtReader, ToCrdtWriter};

impl FromCrdtReader for Vec2 {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self::from_array(buf.read_float2()?))
    }
}

impl ToCrdtWriter for Vec2 {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_float2(&self.to_array())
    }
}

impl FromCrdtReader for Vec3 {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self::from_array(buf.read_float3()?))
    }
}

impl ToCrdtWriter for Vec3 {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_float3(&self.to_array())
    }
}

impl FromCrdtReader for Quat {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(Self::from_array(buf.read_float4()?))
    }
}

impl ToCrdtWriter for Quat {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_float4(&self.to_array())
    }
}

// column-major, 16 floats
impl FromCrdtReader for Mat4 {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        let mut cols = [0.0; 16];
        for col in &mut cols {
            *col = buf.read_float()?;
        }
        Ok(Self::from_cols_array(&cols))
    }
}

impl ToCrdtWriter for Mat4 {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        for col in self.to_cols_array() {
            buf.write_float(col);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color4 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color3 {
    pub const BLACK: Color3 = Color3 {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color3 = Color3 {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Color4 {
    pub const BLACK: Color4 = Color4 {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color4 = Color4 {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }
}

impl From<Color3> for Color4 {
    fn from(value: Color3) -> Self {
        Self {
            r: value.r,
            g: value.g,
            b: value.b,
            a: 1.0,
        }
    }
}

impl FromCrdtReader for Color3 {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        let [r, g, b] = buf.read_float3()?;
        Ok(Self { r, g, b })
    }
}

impl ToCrdtWriter for Color3 {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_float3(&[self.r, self.g, self.b])
    }
}

impl FromCrdtReader for Color4 {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        let [r, g, b, a] = buf.read_float4()?;
        Ok(Self { r, g, b, a })
    }
}

impl ToCrdtWriter for Color4 {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_float4(&[self.r, self.g, self.b, self.a])
    }
}
