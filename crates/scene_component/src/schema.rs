// built-in wire schemas for primitive and composite values
//
// fixed-layout maps are plain structs writing their fields in declaration
// order (see transform_and_parent.rs for the canonical example); integer
// enums go through read_enum/write_enum against a closed member set.

use num_traits::{FromPrimitive, ToPrimitive};

use super::{CrdtReader, CrdtReaderError, CrdtWriter, FromCrdtReader, ToCrdtWriter};

macro_rules! impl_scalar_schema {
    ($ty:ty, $read:ident, $write:ident) => {
        impl FromCrdtReader for $ty {
            fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
                buf.$read()
            }
        }

        impl ToCrdtWriter for $ty {
            fn to_writer(&self, buf: &mut CrdtWriter) {
                buf.$write(*self)
            }
        }
    };
}

impl_scalar_schema!(u8, read_u8, write_u8);
impl_scalar_schema!(u16, read_u16, write_u16);
impl_scalar_schema!(u32, read_u32, write_u32);
impl_scalar_schema!(u64, read_u64, write_u64);
impl_scalar_schema!(i8, read_i8, write_i8);
impl_scalar_schema!(i16, read_i16, write_i16);
impl_scalar_schema!(i32, read_i32, write_i32);
impl_scalar_schema!(i64, read_i64, write_i64);
impl_scalar_schema!(f32, read_float, write_float);
impl_scalar_schema!(f64, read_double, write_double);

impl FromCrdtReader for bool {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        Ok(buf.read_u8()? != 0)
    }
}

impl ToCrdtWriter for bool {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_u8(*self as u8)
    }
}

impl FromCrdtReader for String {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        buf.read_string()
    }
}

impl ToCrdtWriter for String {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_string(self)
    }
}

// homogeneous array: u32 element count then each element in order
impl<T: FromCrdtReader> FromCrdtReader for Vec<T> {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        let count = buf.read_u32()? as usize;
        // cap the preallocation: the count is attacker-controlled
        let mut items = Vec::with_capacity(count.min(buf.len()));
        for _ in 0..count {
            items.push(buf.read()?);
        }
        Ok(items)
    }
}

impl<T: ToCrdtWriter> ToCrdtWriter for Vec<T> {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        buf.write_u32(self.len() as u32);
        for item in self {
            buf.write(item);
        }
    }
}

// optional: presence byte then the inner value if present
impl<T: FromCrdtReader> FromCrdtReader for Option<T> {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError> {
        match buf.read_u8()? {
            0 => Ok(None),
            _ => Ok(Some(buf.read()?)),
        }
    }
}

impl<T: ToCrdtWriter> ToCrdtWriter for Option<T> {
    fn to_writer(&self, buf: &mut CrdtWriter) {
        match self {
            Some(value) => {
                buf.write_u8(1);
                buf.write(value);
            }
            None => buf.write_u8(0),
        }
    }
}

/// read an integer-valued enum, validating membership
pub fn read_enum<E: FromPrimitive>(buf: &mut CrdtReader) -> Result<E, CrdtReaderError> {
    E::from_i32(buf.read_i32()?).ok_or(CrdtReaderError::InvalidEnumMember)
}

pub fn write_enum<E: ToPrimitive>(value: &E, buf: &mut CrdtWriter) {
    // members are declared with explicit i32 discriminants
    buf.write_i32(value.to_i32().unwrap())
}
