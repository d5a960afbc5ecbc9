use super::ElfReader;
use crate::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// An ELF source backed by an in-memory byte slice.
///
/// This is useful for inspecting ELF images that are already in memory,
/// such as those embedded in the binary or received over a network.
///
/// # Examples
/// ```rust
/// use elf_inspect::input::ElfBinary;
///
/// let data = &[]; // In practice, this would be the bytes of an ELF file
/// let binary = ElfBinary::new("liba.so", data);
/// ```
#[derive(Debug)]
pub struct ElfBinary<'bytes> {
    /// The name assigned to this ELF object.
    name: String,
    /// The raw ELF data.
    bytes: &'bytes [u8],
}

impl<'bytes> ElfBinary<'bytes> {
    /// Creates a new memory-based ELF source from a byte slice.
    pub fn new(name: &str, bytes: &'bytes [u8]) -> Self {
        Self {
            name: name.to_string(),
            bytes,
        }
    }

    /// Returns the name of the ELF binary.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ElfReader for ElfBinary<'_> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.bytes.read_at(offset, buf)
    }
}

// Byte slices can be used directly wherever an `ElfReader` is expected.
impl ElfReader for &[u8] {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - offset);
        buf[..n].copy_from_slice(&self[offset..offset + n]);
        Ok(n)
    }
}

/// An ELF source backed by any seekable standard stream.
///
/// Each read seeks to the requested offset first, so the stream position
/// never carries state between decode operations.
pub struct ElfStream<R> {
    inner: R,
}

impl ElfStream<File> {
    /// Opens the file at `path` as an ELF source.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        #[cfg(feature = "log")]
        log::debug!("opening ELF file: {}", path.display());

        let inner = File::open(path).map_err(|e| {
            #[cfg(feature = "log")]
            log::error!("failed to open ELF file {}: {e}", path.display());
            e
        })?;
        Ok(Self { inner })
    }
}

impl<R: Read + Seek> ElfStream<R> {
    /// Wraps an already open seekable stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Consumes the wrapper and returns the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> ElfReader for ElfStream<R> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(self.inner.read(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_reads_are_positioned() {
        let mut src: &[u8] = b"abcdef";
        let mut buf = [0u8; 3];
        assert_eq!(src.read_at(2, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"cde");
    }

    #[test]
    fn slice_reads_shorten_at_eof() {
        let mut src: &[u8] = b"abc";
        let mut buf = [0u8; 8];
        assert_eq!(src.read_at(1, &mut buf).unwrap(), 2);
        assert_eq!(src.read_at(3, &mut buf).unwrap(), 0);
        assert!(src.read_exact_at(1, &mut buf).is_err());
    }

    #[test]
    fn stream_reads_do_not_rely_on_cursor_order() {
        let mut stream = ElfStream::new(std::io::Cursor::new(b"0123456789".to_vec()));
        let mut buf = [0u8; 2];
        stream.read_exact_at(8, &mut buf).unwrap();
        assert_eq!(&buf, b"89");
        stream.read_exact_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"01");
    }
}
