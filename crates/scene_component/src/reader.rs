use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CrdtReaderError {
    #[error("read past the end of the buffer")]
    OutOfBounds,
    #[error("string is not valid utf-8")]
    InvalidString,
    #[error("value is not a member of the target enum")]
    InvalidEnumMember,
}

/// Cursor over a received byte slice. All multi-byte reads are little-endian
/// and advance the cursor; reading past the written extent fails with
/// `OutOfBounds` and leaves the cursor where it was.
pub struct CrdtReader<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> CrdtReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    /// bytes consumed so far
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// bytes remaining
    pub fn len(&self) -> usize {
        self.buffer.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// the unconsumed remainder
    pub fn as_slice(&self) -> &'a [u8] {
        &self.buffer[self.pos..]
    }

    pub fn take_slice(&mut self, len: usize) -> Result<&'a [u8], CrdtReaderError> {
        if len > self.len() {
            return Err(CrdtReaderError::OutOfBounds);
        }
        let slice = &self.buffer[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// split off a sub-reader over the next `len` bytes (clamped to the
    /// remainder), advancing this reader past them
    pub fn take_reader(&mut self, len: usize) -> CrdtReader<'a> {
        let len = len.min(self.len());
        let slice = &self.buffer[self.pos..self.pos + len];
        self.pos += len;
        CrdtReader::new(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CrdtReaderError> {
        Ok(self.take_slice(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CrdtReaderError> {
        Ok(u16::from_le_bytes(self.take_slice(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, CrdtReaderError> {
        Ok(u32::from_le_bytes(self.take_slice(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, CrdtReaderError> {
        Ok(u64::from_le_bytes(self.take_slice(8)?.try_into().unwrap()))
    }

    pub fn read_i8(&mut self) -> Result<i8, CrdtReaderError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, CrdtReaderError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, CrdtReaderError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, CrdtReaderError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_float(&mut self) -> Result<f32, CrdtReaderError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_double(&mut self) -> Result<f64, CrdtReaderError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_float2(&mut self) -> Result<[f32; 2], CrdtReaderError> {
        Ok([self.read_float()?, self.read_float()?])
    }

    pub fn read_float3(&mut self) -> Result<[f32; 3], CrdtReaderError> {
        Ok([self.read_float()?, self.read_float()?, self.read_float()?])
    }

    pub fn read_float4(&mut self) -> Result<[f32; 4], CrdtReaderError> {
        Ok([
            self.read_float()?,
            self.read_float()?,
            self.read_float()?,
            self.read_float()?,
        ])
    }

    /// u32 byte-count prefixed slice
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CrdtReaderError> {
        let len = self.read_u32()? as usize;
        self.take_slice(len)
    }

    /// u32 byte-count prefixed utf-8
    pub fn read_string(&mut self) -> Result<String, CrdtReaderError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CrdtReaderError::InvalidString)
    }

    pub fn read<T: FromCrdtReader>(&mut self) -> Result<T, CrdtReaderError> {
        T::from_reader(self)
    }
}

pub trait FromCrdtReader: Sized {
    fn from_reader(buf: &mut CrdtReader) -> Result<Self, CrdtReaderError>;

    fn from_slice(slice: &[u8]) -> Result<Self, CrdtReaderError> {
        Self::from_reader(&mut CrdtReader::new(slice))
    }
}
