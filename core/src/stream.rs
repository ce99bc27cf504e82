//! Positional byte streams.
//!
//! The codec reads and writes through [`ByteStream`],
//! which addresses bytes by absolute position
//! so that lazily loaded buffers can come back to their origin later.
//! [`StreamReader`] and [`StreamWriter`] adapt a stream
//! to the sequential `std::io` traits used by the element decoders and encoders.

use std::convert::TryFrom;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

/// A randomly addressable range of bytes.
#[allow(clippy::len_without_is_empty)]
pub trait ByteStream: Send + Sync + fmt::Debug {
    /// Read bytes starting at `position` into `buf`,
    /// returning how many were read.
    /// Zero signals the end of the data, which is not an error by itself.
    fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf` starting at `position`,
    /// extending the stream if needed.
    fn write_at(&self, position: u64, buf: &[u8]) -> io::Result<()>;

    /// The current size of the stream in bytes.
    fn len(&self) -> io::Result<u64>;

    /// Fill `buf` entirely from `position`.
    /// Reaching the end of the data first is an `UnexpectedEof` error.
    fn read_exact_at(&self, mut position: u64, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(position, buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended before the requested range",
                    ))
                }
                Ok(n) => {
                    position += n as u64;
                    buf = &mut buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// An in-memory byte stream.
#[derive(Debug, Default)]
pub struct MemoryStream {
    data: RwLock<Vec<u8>>,
}

impl MemoryStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream over the given bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        MemoryStream {
            data: RwLock::new(data.into()),
        }
    }

    /// Copy the current contents of the stream.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the contents of the stream.
    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ByteStream for MemoryStream {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let start = match usize::try_from(position) {
            Ok(start) if start < data.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&self, position: u64, buf: &[u8]) -> io::Result<()> {
        let start = usize::try_from(position)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "position out of range"))?;
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.data.read().unwrap_or_else(PoisonError::into_inner).len() as u64)
    }
}

/// A byte stream backed by a file.
#[derive(Debug)]
pub struct FileStream {
    file: Mutex<File>,
}

impl FileStream {
    /// Open an existing file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(FileStream {
            file: Mutex::new(File::open(path)?),
        })
    }

    /// Create (or truncate) a file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(FileStream {
            file: Mutex::new(file),
        })
    }
}

impl From<File> for FileStream {
    fn from(file: File) -> Self {
        FileStream {
            file: Mutex::new(file),
        }
    }
}

impl ByteStream for FileStream {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(position))?;
        file.read(buf)
    }

    fn write_at(&self, position: u64, buf: &[u8]) -> io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(position))?;
        file.write_all(buf)
    }

    fn len(&self) -> io::Result<u64> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(file.metadata()?.len())
    }
}

/// Sequential reader over a byte stream.
#[derive(Debug)]
pub struct StreamReader<'s> {
    stream: &'s dyn ByteStream,
    position: u64,
}

impl<'s> StreamReader<'s> {
    pub fn new(stream: &'s dyn ByteStream, position: u64) -> Self {
        StreamReader { stream, position }
    }

    /// The absolute position of the next byte to read.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move to an absolute position.
    #[inline]
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    /// Skip the given number of bytes without reading them.
    #[inline]
    pub fn skip(&mut self, count: u64) {
        self.position += count;
    }

    pub fn stream(&self) -> &'s dyn ByteStream {
        self.stream
    }

    /// Check whether any byte is left at the current position.
    pub fn at_end(&self) -> io::Result<bool> {
        let mut probe = [0u8; 1];
        Ok(self.stream.read_at(self.position, &mut probe)? == 0)
    }
}

impl Read for StreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stream.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for StreamReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::Current(d) => self.position.checked_add_signed(d),
            SeekFrom::End(d) => self.stream.len()?.checked_add_signed(d),
        };
        self.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;
        Ok(self.position)
    }
}

/// Sequential writer over a byte stream.
#[derive(Debug)]
pub struct StreamWriter<'s> {
    stream: &'s dyn ByteStream,
    position: u64,
}

impl<'s> StreamWriter<'s> {
    pub fn new(stream: &'s dyn ByteStream, position: u64) -> Self {
        StreamWriter { stream, position }
    }

    /// The absolute position of the next byte to write.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Write for StreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write_at(self.position, buf)?;
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_positional_io() {
        let stream = MemoryStream::from_bytes(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 3];
        assert_eq!(stream.read_at(2, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[3, 4]);
        assert_eq!(stream.read_at(4, &mut buf).unwrap(), 0);
        assert_eq!(stream.read_at(100, &mut buf).unwrap(), 0);

        stream.write_at(6, &[9, 9]).unwrap();
        assert_eq!(stream.to_vec(), vec![1, 2, 3, 4, 0, 0, 9, 9]);
        assert_eq!(stream.len().unwrap(), 8);
    }

    #[test]
    fn short_read_is_unexpected_eof() {
        let stream = MemoryStream::from_bytes(vec![1, 2, 3]);
        let mut buf = [0u8; 4];
        let err = stream.read_exact_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn reader_and_writer_track_position() {
        let stream = MemoryStream::new();
        let mut writer = StreamWriter::new(&stream, 0);
        writer.write_all(b"DICM").unwrap();
        writer.write_all(&[0, 1]).unwrap();
        assert_eq!(writer.position(), 6);

        let mut reader = StreamReader::new(&stream, 0);
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).unwrap();
        assert_eq!(&magic, b"DICM");
        reader.skip(1);
        assert_eq!(reader.position(), 5);
        assert!(!reader.at_end().unwrap());
        reader.seek(SeekFrom::End(0)).unwrap();
        assert!(reader.at_end().unwrap());
    }

    #[test]
    fn file_stream_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.bin");
        let stream = FileStream::create(&path).unwrap();
        stream.write_at(0, &[0xAA; 16]).unwrap();
        stream.write_at(16, &[0xBB; 4]).unwrap();
        assert_eq!(stream.len().unwrap(), 20);

        let stream = FileStream::open(&path).unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact_at(16, &mut buf).unwrap();
        assert_eq!(buf, [0xBB; 4]);
    }
}
