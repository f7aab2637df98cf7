//! TLS presentation-language codec: a cursor reader over borrowed bytes and
//! length-prefixed vector writers.

/// Error from decoding a TLS structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Input ended before the structure did
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the decoder needed
        needed: usize,
        /// Bytes left in the input
        remaining: usize,
    },
    /// A length prefix pointed past the end of the enclosing structure
    #[error("length prefix {len} overruns enclosing structure")]
    BadLength {
        /// The offending length
        len: usize,
    },
    /// Value does not fit the length prefix it must be written under
    #[error("value of length {len} does not fit a {bits}-bit length prefix")]
    ValueTooLong {
        /// Value length
        len: usize,
        /// Width of the length prefix
        bits: u8,
    },
    /// Unknown ECH version in an encoded config
    #[error("unknown ech version {0:#06x}")]
    UnknownEchVersion(u16),
    /// Structure decoded but bytes were left over
    #[error("trailing bytes after structure")]
    TrailingBytes,
}

/// Reader over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether all input has been consumed
    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof { needed: n, remaining: self.remaining() });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian u16
    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian u24
    pub fn read_u24(&mut self) -> Result<u32, WireError> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    /// Read a big-endian u32
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read exactly `n` raw bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.take(n)
    }

    /// Read an `opaque<0..2^8-1>` vector
    pub fn read_vec8(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_u8()? as usize;
        self.take(len)
    }

    /// Read an `opaque<0..2^16-1>` vector
    pub fn read_vec16(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_u16()? as usize;
        self.take(len)
    }

    /// Read an `opaque<0..2^24-1>` vector
    pub fn read_vec24(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_u24()? as usize;
        self.take(len)
    }

    /// Consume bytes while `pred` holds
    pub fn skip_while(&mut self, mut pred: impl FnMut(u8) -> bool) {
        while self.pos < self.data.len() && pred(self.data[self.pos]) {
            self.pos += 1;
        }
    }
}

/// Append a big-endian u16
pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Append a big-endian u24
pub fn put_u24(out: &mut Vec<u8>, v: u32) {
    debug_assert!(v < 1 << 24);
    out.extend_from_slice(&v.to_be_bytes()[1..]);
}

/// Append a big-endian u32
pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Append an `opaque<0..2^8-1>` vector
pub fn put_vec8(out: &mut Vec<u8>, v: &[u8]) -> Result<(), WireError> {
    let len = u8::try_from(v.len()).map_err(|_| WireError::ValueTooLong { len: v.len(), bits: 8 })?;
    out.push(len);
    out.extend_from_slice(v);
    Ok(())
}

/// Append an `opaque<0..2^16-1>` vector
pub fn put_vec16(out: &mut Vec<u8>, v: &[u8]) -> Result<(), WireError> {
    let len =
        u16::try_from(v.len()).map_err(|_| WireError::ValueTooLong { len: v.len(), bits: 16 })?;
    put_u16(out, len);
    out.extend_from_slice(v);
    Ok(())
}

/// Append an `opaque<0..2^24-1>` vector
pub fn put_vec24(out: &mut Vec<u8>, v: &[u8]) -> Result<(), WireError> {
    if v.len() >= 1 << 24 {
        return Err(WireError::ValueTooLong { len: v.len(), bits: 24 });
    }
    put_u24(out, v.len() as u32);
    out.extend_from_slice(v);
    Ok(())
}
