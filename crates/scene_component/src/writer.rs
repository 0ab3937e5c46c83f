use std::ops::Deref;

use super::CrdtReader;

/// Appending cursor over a growable byte buffer. All multi-byte writes are
/// little-endian. Growth is in whole KiB blocks so repeated small writes
/// reallocate at most once per block boundary.
pub struct CrdtWriter<'a> {
    buffer: &'a mut Vec<u8>,
}

const GROW_BLOCK: usize = 1024;

impl<'a> CrdtWriter<'a> {
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        Self { buffer }
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.buffer.len() + additional;
        if needed > self.buffer.capacity() {
            let target = (self.buffer.capacity().max(needed) + GROW_BLOCK).div_ceil(GROW_BLOCK)
                * GROW_BLOCK;
            self.buffer.reserve_exact(target - self.buffer.len());
        }
    }

    pub fn write_raw(&mut self, data: &[u8]) {
        self.grow_for(data.len());
        self.buffer.extend_from_slice(data)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_raw(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_u8(value as u8);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    pub fn write_float(&mut self, value: f32) {
        self.write_u32(value.to_bits())
    }

    pub fn write_double(&mut self, value: f64) {
        self.write_u64(value.to_bits())
    }

    pub fn write_float2(&mut self, value: &[f32; 2]) {
        self.write_float(value[0]);
        self.write_float(value[1]);
    }

    pub fn write_float3(&mut self, value: &[f32; 3]) {
        self.write_float(value[0]);
        self.write_float(value[1]);
        self.write_float(value[2]);
    }

    pub fn write_float4(&mut self, value: &[f32; 4]) {
        self.write_float(value[0]);
        self.write_float(value[1]);
        self.write_float(value[2]);
        self.write_float(value[3]);
    }

    /// u32 byte-count prefixed slice
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.write_raw(data);
    }

    /// u32 byte-count prefixed utf-8
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write<T: ToCrdtWriter>(&mut self, value: &T) {
        value.to_writer(self)
    }

    /// bytes written so far
    pub fn pos(&self) -> usize {
        self.buffer.len()
    }

    pub fn reader(&self) -> CrdtReader<'_> {
        CrdtReader::new(self.buffer)
    }
}

impl Deref for CrdtWriter<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.buffer
    }
}

pub trait ToCrdtWriter {
    fn to_writer(&self, buf: &mut CrdtWriter);

    fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::default();
        let mut writer = CrdtWriter::new(&mut buf);
        self.to_writer(&mut writer);
        buf
    }
}
