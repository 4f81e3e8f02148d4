//! Sequential binary cursors
//!
//! `Loader` and `Saver` read and write primitive scalars and strings in a
//! fixed order, little-endian. Both carry a sticky error: after the first
//! fault every further call is a no-op (reads return zero values), so a long
//! chain of loads needs a single check at the end.

use super::PersistError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Read cursor over signature data
#[derive(Debug)]
pub struct Loader {
    buf: Bytes,
    pos: usize,
    err: Option<PersistError>,
}

impl Loader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            pos: 0,
            err: None,
        }
    }

    /// Records `err` unless an earlier error is already recorded
    pub fn fail(&mut self, err: PersistError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Returns the recorded error, if any
    pub fn error(&self) -> Option<&PersistError> {
        self.err.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Current read offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Terminal check: surfaces the sticky error
    pub fn finish(self) -> Result<(), PersistError> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Like `finish`, but also rejects unread trailing bytes
    pub fn finish_exact(self) -> Result<(), PersistError> {
        let remaining = self.remaining();
        self.finish()?;
        if remaining > 0 {
            return Err(PersistError::TrailingData(remaining));
        }
        Ok(())
    }

    fn ready(&mut self, needed: usize) -> bool {
        if self.err.is_some() {
            return false;
        }
        let remaining = self.buf.remaining();
        if remaining < needed {
            self.fail(PersistError::Truncated {
                offset: self.pos,
                needed,
                remaining,
            });
            return false;
        }
        self.pos += needed;
        true
    }

    pub fn load_byte(&mut self) -> u8 {
        if !self.ready(1) {
            return 0;
        }
        self.buf.get_u8()
    }

    pub fn load_bool(&mut self) -> bool {
        self.load_byte() != 0
    }

    pub fn load_u16(&mut self) -> u16 {
        if !self.ready(2) {
            return 0;
        }
        self.buf.get_u16_le()
    }

    pub fn load_u32(&mut self) -> u32 {
        if !self.ready(4) {
            return 0;
        }
        self.buf.get_u32_le()
    }

    pub fn load_u64(&mut self) -> u64 {
        if !self.ready(8) {
            return 0;
        }
        self.buf.get_u64_le()
    }

    pub fn load_usize(&mut self) -> usize {
        let value = self.load_u64();
        match usize::try_from(value) {
            Ok(v) => v,
            Err(_) => {
                self.fail(PersistError::Invalid(format!("{value} does not fit usize")));
                0
            }
        }
    }

    /// Loads a collection length
    ///
    /// A count that could not possibly be backed by the remaining bytes is
    /// rejected, so garbage input cannot trigger huge allocations.
    pub fn load_count(&mut self) -> usize {
        let count = self.load_u32() as usize;
        if self.err.is_none() && count > self.remaining() {
            self.fail(PersistError::Invalid(format!(
                "count {count} exceeds {} remaining bytes",
                self.remaining()
            )));
            return 0;
        }
        count
    }

    pub fn load_bytes(&mut self) -> Vec<u8> {
        let len = self.load_u32() as usize;
        if !self.ready(len) {
            return Vec::new();
        }
        self.buf.split_to(len).to_vec()
    }

    pub fn load_string(&mut self) -> String {
        let start = self.pos;
        let raw = self.load_bytes();
        if self.err.is_some() {
            return String::new();
        }
        String::from_utf8(raw).unwrap_or_else(|_| {
            self.fail(PersistError::InvalidString(start));
            String::new()
        })
    }

    pub fn load_strings(&mut self) -> Vec<String> {
        let count = self.load_count();
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            if self.err.is_some() {
                break;
            }
            out.push(self.load_string());
        }
        out
    }

    pub fn load_usizes(&mut self) -> Vec<usize> {
        let count = self.load_count();
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            if self.err.is_some() {
                break;
            }
            out.push(self.load_usize());
        }
        out
    }
}

/// Write cursor for signature data
#[derive(Debug, Default)]
pub struct Saver {
    buf: BytesMut,
    err: Option<PersistError>,
}

impl Saver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` unless an earlier error is already recorded
    pub fn fail(&mut self, err: PersistError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    pub fn error(&self) -> Option<&PersistError> {
        self.err.as_ref()
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Terminal check: returns the written bytes or the sticky error
    pub fn into_bytes(self) -> Result<Bytes, PersistError> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.buf.freeze()),
        }
    }

    pub fn save_byte(&mut self, value: u8) {
        if self.err.is_none() {
            self.buf.put_u8(value);
        }
    }

    pub fn save_bool(&mut self, value: bool) {
        self.save_byte(u8::from(value));
    }

    pub fn save_u16(&mut self, value: u16) {
        if self.err.is_none() {
            self.buf.put_u16_le(value);
        }
    }

    pub fn save_u32(&mut self, value: u32) {
        if self.err.is_none() {
            self.buf.put_u32_le(value);
        }
    }

    pub fn save_u64(&mut self, value: u64) {
        if self.err.is_none() {
            self.buf.put_u64_le(value);
        }
    }

    pub fn save_usize(&mut self, value: usize) {
        self.save_u64(value as u64);
    }

    pub fn save_count(&mut self, count: usize) {
        match u32::try_from(count) {
            Ok(c) => self.save_u32(c),
            Err(_) => self.fail(PersistError::TooLarge(format!("collection of {count} items"))),
        }
    }

    pub fn save_bytes(&mut self, value: &[u8]) {
        self.save_count(value.len());
        if self.err.is_none() {
            self.buf.put_slice(value);
        }
    }

    pub fn save_string(&mut self, value: &str) {
        self.save_bytes(value.as_bytes());
    }

    pub fn save_strings<S: AsRef<str>>(&mut self, values: &[S]) {
        self.save_count(values.len());
        for v in values {
            self.save_string(v.as_ref());
        }
    }

    pub fn save_usizes(&mut self, values: &[usize]) {
        self.save_count(values.len());
        for v in values {
            self.save_usize(*v);
        }
    }

    /// Appends raw bytes without a length prefix
    pub(crate) fn put_raw(&mut self, raw: &[u8]) {
        if self.err.is_none() {
            self.buf.put_slice(raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_and_strings_read_back_in_order() {
        let mut saver = Saver::new();
        saver.save_byte(7);
        saver.save_bool(true);
        saver.save_u16(0xBEEF);
        saver.save_usize(123_456);
        saver.save_string("fmt/43");
        saver.save_strings(&["a", "bc"]);
        saver.save_usizes(&[1, 2, 3]);
        let bytes = saver.into_bytes().unwrap();

        let mut loader = Loader::new(bytes);
        assert_eq!(loader.load_byte(), 7);
        assert!(loader.load_bool());
        assert_eq!(loader.load_u16(), 0xBEEF);
        assert_eq!(loader.load_usize(), 123_456);
        assert_eq!(loader.load_string(), "fmt/43");
        assert_eq!(loader.load_strings(), vec!["a".to_string(), "bc".to_string()]);
        assert_eq!(loader.load_usizes(), vec![1, 2, 3]);
        assert!(loader.finish_exact().is_ok());
    }

    #[test]
    fn truncation_is_sticky_and_reads_degrade_to_zero() {
        let mut loader = Loader::new(Bytes::from_static(&[1, 2]));
        assert_eq!(loader.load_u32(), 0);
        assert!(!loader.is_ok());

        // Data is still there, but the cursor is poisoned.
        assert_eq!(loader.load_byte(), 0);
        assert_eq!(loader.load_string(), "");
        assert!(loader.load_strings().is_empty());

        assert!(matches!(
            loader.finish(),
            Err(PersistError::Truncated { needed: 4, remaining: 2, .. })
        ));
    }

    #[test]
    fn first_error_wins() {
        let mut loader = Loader::new(Bytes::new());
        loader.fail(PersistError::BadMagic);
        loader.fail(PersistError::BadIdentifierLoader(3));
        assert_eq!(loader.finish(), Err(PersistError::BadMagic));
    }

    #[test]
    fn absurd_counts_are_rejected() {
        let mut saver = Saver::new();
        saver.save_u32(1_000_000);
        let mut loader = Loader::new(saver.into_bytes().unwrap());
        assert!(loader.load_strings().is_empty());
        assert!(matches!(loader.finish(), Err(PersistError::Invalid(_))));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut saver = Saver::new();
        saver.save_bytes(&[0xFF, 0xFE]);
        let mut loader = Loader::new(saver.into_bytes().unwrap());
        assert_eq!(loader.load_string(), "");
        assert_eq!(loader.finish(), Err(PersistError::InvalidString(0)));
    }

    #[test]
    fn trailing_bytes_fail_exact_finish() {
        let mut loader = Loader::new(Bytes::from_static(&[1, 2, 3]));
        loader.load_byte();
        assert_eq!(loader.finish_exact(), Err(PersistError::TrailingData(2)));
    }

    #[test]
    fn saver_error_is_sticky() {
        let mut saver = Saver::new();
        saver.fail(PersistError::TooLarge("x".into()));
        saver.save_byte(1);
        assert!(saver.is_empty());
        assert!(saver.into_bytes().is_err());
    }
}
