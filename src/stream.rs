//! Resolved Byte Streams
//!
//! A `Stream` is the single open handle behind a `CachedFile`. It can be the
//! local cached copy, a temp file spooled by the backend, in-memory bytes, or
//! an opaque reader such as a network body.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use tempfile::NamedTempFile;

/// Readable handle returned by backends and held by `CachedFile`
pub enum Stream {
    /// Regular file, usually the local cached copy
    File(File),
    /// Temporary file materialized by a backend or by `download`
    Temp(NamedTempFile),
    /// In-memory content
    Memory(Cursor<Vec<u8>>),
    /// Non-seekable reader (network body, pipe, decoder)
    Remote(BufReader<Box<dyn Read + Send>>),
}

impl Stream {
    /// Wrap owned bytes
    pub fn memory(bytes: impl Into<Vec<u8>>) -> Self {
        Stream::Memory(Cursor::new(bytes.into()))
    }

    /// Wrap an arbitrary reader
    pub fn remote<R: Read + Send + 'static>(reader: R) -> Self {
        Stream::Remote(BufReader::new(Box::new(reader)))
    }

    /// Whether the bytes live in a file on disk
    pub fn is_file_backed(&self) -> bool {
        matches!(self, Stream::File(_) | Stream::Temp(_))
    }

    /// Underlying file for file-backed streams
    pub fn as_file_mut(&mut self) -> Option<&mut File> {
        match self {
            Stream::File(file) => Some(file),
            Stream::Temp(tmp) => Some(tmp.as_file_mut()),
            Stream::Memory(_) | Stream::Remote(_) => None,
        }
    }

    /// Filesystem path, known only for temp files
    pub fn path(&self) -> Option<&Path> {
        match self {
            Stream::Temp(tmp) => Some(tmp.path()),
            _ => None,
        }
    }

    /// True once every byte has been read
    pub fn is_eof(&mut self) -> io::Result<bool> {
        match self {
            Stream::File(file) => file_at_end(file),
            Stream::Temp(tmp) => file_at_end(tmp.as_file_mut()),
            Stream::Memory(cursor) => Ok(cursor.position() >= cursor.get_ref().len() as u64),
            Stream::Remote(reader) => Ok(reader.fill_buf()?.is_empty()),
        }
    }
}

fn file_at_end(file: &mut File) -> io::Result<bool> {
    let pos = file.stream_position()?;
    Ok(pos >= file.metadata()?.len())
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::File(file) => file.read(buf),
            Stream::Temp(tmp) => tmp.read(buf),
            Stream::Memory(cursor) => cursor.read(buf),
            Stream::Remote(reader) => reader.read(buf),
        }
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Stream::File(file) => file.seek(pos),
            Stream::Temp(tmp) => tmp.seek(pos),
            Stream::Memory(cursor) => cursor.seek(pos),
            Stream::Remote(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "remote stream is not seekable",
            )),
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::File(_) => f.write_str("Stream::File"),
            Stream::Temp(_) => f.write_str("Stream::Temp"),
            Stream::Memory(cursor) => write!(f, "Stream::Memory({} bytes)", cursor.get_ref().len()),
            Stream::Remote(_) => f.write_str("Stream::Remote"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_eof() {
        let mut stream = Stream::memory("hi");
        assert!(!stream.is_eof().unwrap());
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hi");
        assert!(stream.is_eof().unwrap());
    }

    #[test]
    fn test_remote_eof_does_not_lose_bytes() {
        let mut stream = Stream::remote(Cursor::new(b"hello".to_vec()));
        assert!(!stream.is_eof().unwrap());
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
        assert!(stream.is_eof().unwrap());
    }

    #[test]
    fn test_remote_is_not_seekable() {
        let mut stream = Stream::remote(io::empty());
        let err = stream.rewind().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(!stream.is_file_backed());
        assert!(stream.as_file_mut().is_none());
    }

    #[test]
    fn test_temp_file_backed() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"abc").unwrap();
        tmp.rewind().unwrap();
        let mut stream = Stream::Temp(tmp);

        assert!(stream.is_file_backed());
        assert!(stream.path().is_some());
        assert!(!stream.is_eof().unwrap());

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"abc");
        assert!(stream.is_eof().unwrap());

        stream.rewind().unwrap();
        assert!(!stream.is_eof().unwrap());
    }
}
