//! Lock-guarded random access stream shared by every band reader of a product

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

/// Shared handle to the product stream.
///
/// Cloning is cheap; all clones address the same stream. Each
/// [`read_at`](Self::read_at) holds the lock across exactly one seek and
/// one read.
#[derive(Debug)]
pub struct SharedStream<R> {
    inner: Arc<Mutex<R>>,
    len: u64,
}

impl<R> Clone for SharedStream<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            len: self.len,
        }
    }
}

impl<R: Read + Seek> SharedStream<R> {
    /// Wrap a stream, recording its length
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot seek to its end
    pub fn new(mut stream: R) -> io::Result<Self> {
        let len = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(stream)),
            len,
        })
    }

    /// Stream length in bytes
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the stream is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fill `buf` from absolute `offset`
    ///
    /// # Errors
    ///
    /// Returns error if the seek or read fails, or if another reader
    /// panicked while holding the lock
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut stream = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("product stream lock poisoned"))?;
        stream.seek(SeekFrom::Start(offset))?;
        stream.read_exact(buf)
    }

    /// Read one byte at `offset`
    ///
    /// # Errors
    ///
    /// Returns error if the read fails
    pub fn read_u8_at(&self, offset: u64) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.read_at(offset, &mut byte)?;
        Ok(byte[0])
    }
}
