//! Random-access input over stored files, and schema resolution on top of it.

pub mod resolver;

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A seekable byte stream of known length.
pub trait SeekableInput {
    /// Total length of the stream in bytes.
    fn length(&self) -> u64;

    /// Read up to `buf.len()` bytes at the current position. Returns 0 at end.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn seek(&mut self, position: u64) -> io::Result<()>;

    fn tell(&mut self) -> io::Result<u64>;

    fn close(self) -> io::Result<()>
    where
        Self: Sized;

    /// Read the whole stream from the start.
    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.seek(0)?;
        let mut out = Vec::with_capacity(self.length() as usize);
        let mut buf = [0u8; 8192];
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        Ok(out)
    }
}

/// Pass-through [`SeekableInput`] over any `Read + Seek` with a known length.
pub struct FsInput<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> FsInput<R> {
    pub fn new(inner: R, len: u64) -> Self {
        Self { inner, len }
    }
}

impl FsInput<File> {
    /// Open a local file, taking its length from the file metadata.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self::new(file, len))
    }
}

impl<R: Read + Seek> SeekableInput for FsInput<R> {
    fn length(&self) -> u64 {
        self.len
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn seek(&mut self, position: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    fn close(self) -> io::Result<()> {
        drop(self.inner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_cursor_input() {
        let mut input = FsInput::new(Cursor::new(b"hello world".to_vec()), 11);
        assert_eq!(input.length(), 11);

        let mut buf = [0u8; 5];
        assert_eq!(input.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(input.tell().unwrap(), 5);

        input.seek(6).unwrap();
        assert_eq!(input.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(input.read(&mut buf).unwrap(), 0);
        input.close().unwrap();
    }

    #[test]
    fn test_read_all_rewinds() {
        let mut input = FsInput::new(Cursor::new(b"abc".to_vec()), 3);
        input.seek(2).unwrap();
        assert_eq!(input.read_all().unwrap(), b"abc");
    }

    #[test]
    fn test_open_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 20_000]).unwrap();
        file.flush().unwrap();

        let mut input = FsInput::open(file.path()).unwrap();
        assert_eq!(input.length(), 20_000);
        let bytes = input.read_all().unwrap();
        assert_eq!(bytes.len(), 20_000);
        assert_eq!(input.tell().unwrap(), 20_000);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FsInput::open(&dir.path().join("missing")).is_err());
    }
}
