use crate::{Error, Result};

/// A random-access byte source supplying ELF data.
///
/// All parsing in this crate goes through this trait. Reads are positioned
/// explicitly, so the same source can back many lazily materialized views
/// without them trampling on a shared cursor.
pub trait ElfReader {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read. A return of 0 with a non-empty
    /// buffer means the end of the source was reached.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if the source ends before the
    /// buffer is filled.
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut done = 0;
        while done < buf.len() {
            let n = self.read_at(offset + done as u64, &mut buf[done..])?;
            if n == 0 {
                return Err(Error::UnexpectedEof {
                    offset: offset + done as u64,
                });
            }
            done += n;
        }
        Ok(())
    }
}
