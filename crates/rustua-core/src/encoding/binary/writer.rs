use crate::EncodeError;

/// Little-endian cursor over a caller-owned output buffer.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn as_written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        if self.remaining() < 1 {
            return Err(EncodeError::BufferTooSmall);
        }
        self.buf[self.pos] = value;
        self.pos += 1;
        Ok(())
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        if self.remaining() < data.len() {
            return Err(EncodeError::BufferTooSmall);
        }
        let end = self.pos + data.len();
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn write_le_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    pub fn write_le_u32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    pub fn write_le_u64(&mut self, value: u64) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    pub fn write_le_i16(&mut self, value: i16) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    pub fn write_le_i32(&mut self, value: i32) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    pub fn write_le_i64(&mut self, value: i64) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    pub fn write_le_f32(&mut self, value: f32) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    pub fn write_le_f64(&mut self, value: f64) -> Result<(), EncodeError> {
        self.write_all(&value.to_le_bytes())
    }

    /// Overwrites four already-written bytes at `at`.
    pub fn patch_le_i32(&mut self, at: usize, value: i32) -> Result<(), EncodeError> {
        let end = at + 4;
        if end > self.pos {
            return Err(EncodeError::InvalidState("patch outside written bytes"));
        }
        self.buf[at..end].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;
    use crate::EncodeError;

    #[test]
    fn writer_writes_little_endian() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        w.write_u8(1).unwrap();
        w.write_le_u16(0x1234).unwrap();
        w.write_le_i32(-2).unwrap();
        assert_eq!(w.as_written(), &[1, 0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn writer_bounds() {
        let mut buf = [0u8; 3];
        let mut w = Writer::new(&mut buf);
        assert_eq!(w.write_le_u32(1).unwrap_err(), EncodeError::BufferTooSmall);
        w.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(w.write_u8(2).unwrap_err(), EncodeError::BufferTooSmall);
    }

    #[test]
    fn patch_rewrites_length_slot() {
        let mut buf = [0u8; 6];
        let mut w = Writer::new(&mut buf);
        w.write_le_i32(0).unwrap();
        w.write_all(&[7, 7]).unwrap();
        w.patch_le_i32(0, 2).unwrap();
        assert_eq!(w.as_written(), &[2, 0, 0, 0, 7, 7]);
        assert!(w.patch_le_i32(4, 0).is_err());
    }
}
