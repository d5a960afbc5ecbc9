//! Note tables, shared by note sections and note segments.

use crate::elf::Nhdr;
use crate::file::ElfFile;
use crate::input::ElfReader;
use crate::lazy::Memo;
use crate::Result;
use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Rounds `n` up to the next multiple of 4, the note field alignment.
fn align4(n: u64) -> u64 {
    (n + 3) & !3
}

/// A run of notes inside a `SHT_NOTE` section or a `PT_NOTE` segment.
///
/// The layout of each note is a fixed 12-byte header followed by the name
/// and the description, each padded out to a 4-byte boundary:
///
/// ```text
/// +-------------------+
/// |  namesz  descsz   |
/// |  type             |
/// +-------------------+
/// |  name (aligned)   |
/// +-------------------+
/// |  desc (aligned)   |
/// +-------------------+
/// |  next note ...    |
/// ```
pub struct NoteTable {
    start: u64,
    size: u64,
    // Notes keyed by the file offset they start at.
    cache: RefCell<HashMap<u64, Rc<Note>>>,
}

impl NoteTable {
    pub(crate) fn new(start: u64, size: u64) -> Self {
        Self {
            start,
            size,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Walks the whole extent and returns every note, in file order.
    ///
    /// Notes are cached by their starting offset, so a second walk reuses
    /// the already decoded entries.
    pub fn notes<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Vec<Rc<Note>>> {
        let mut out = Vec::new();
        let mut cursor = self.start;
        while cursor < self.start + self.size {
            let note = self.note_at(elf, cursor)?;
            let nhdr = note.header();
            cursor += Nhdr::SIZE as u64
                + align4(u64::from(nhdr.n_namesz))
                + align4(u64::from(nhdr.n_descsz));
            out.push(note);
        }
        Ok(out)
    }

    fn note_at<R: ElfReader>(&self, elf: &ElfFile<R>, offset: u64) -> Result<Rc<Note>> {
        if let Some(cached) = self.cache.borrow().get(&offset).cloned() {
            return Ok(cached);
        }
        let mut buf = [0u8; Nhdr::SIZE];
        elf.read_exact(offset, &mut buf)?;
        let nhdr = Nhdr::parse(&buf, elf.class(), elf.endian());
        let note = Rc::new(Note::new(nhdr, offset + Nhdr::SIZE as u64));
        Ok(self
            .cache
            .borrow_mut()
            .entry(offset)
            .or_insert(note)
            .clone())
    }
}

/// A single note: a name, a type code and an opaque description blob.
pub struct Note {
    nhdr: Nhdr,
    // File offset of the name region, right after the note header.
    content_offset: u64,
    name: Memo<Rc<[u8]>>,
    desc: Memo<Rc<[u8]>>,
}

impl Note {
    fn new(nhdr: Nhdr, content_offset: u64) -> Self {
        Self {
            nhdr,
            content_offset,
            name: Memo::new(),
            desc: Memo::new(),
        }
    }

    /// The decoded note header.
    pub fn header(&self) -> &Nhdr {
        &self.nhdr
    }

    /// The note type code.
    pub fn note_type(&self) -> u32 {
        self.nhdr.n_type
    }

    /// The name bytes: exactly `n_namesz` bytes, alignment padding never
    /// included. Conventionally NUL-terminated (e.g. `b"GNU\0"`).
    pub fn name<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Rc<[u8]>> {
        self.name.get_or_try_init(|| {
            let mut buf = vec![0u8; self.nhdr.n_namesz as usize];
            elf.read_exact(self.content_offset, &mut buf)?;
            Ok(Rc::from(buf))
        })
    }

    /// The name as a string, with the trailing NUL stripped.
    pub fn name_str<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<String> {
        let raw = self.name(elf)?;
        let trimmed = raw.strip_suffix(&[0u8]).unwrap_or(&raw);
        Ok(String::from_utf8_lossy(trimmed).into_owned())
    }

    /// The description bytes: exactly `n_descsz` bytes from the start of
    /// the aligned description region.
    pub fn desc<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Rc<[u8]>> {
        self.desc.get_or_try_init(|| {
            let offset = self.content_offset + align4(u64::from(self.nhdr.n_namesz));
            let mut buf = vec![0u8; self.nhdr.n_descsz as usize];
            elf.read_exact(offset, &mut buf)?;
            Ok(Rc::from(buf))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_rounds_up_to_four() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(5), 8);
        assert_eq!(align4(6), 8);
    }
}
