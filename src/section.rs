//! Sections and the type-code-driven section dispatch.

use crate::dynamic::DynamicTable;
use crate::elf::abi;
use crate::elf::{Class, Shdr};
use crate::file::ElfFile;
use crate::input::ElfReader;
use crate::lazy::Memo;
use crate::note::NoteTable;
use crate::relocation::RelocTable;
use crate::symbol::SymTab;
use crate::Result;
use std::rc::Rc;

/// A section of an ELF file.
///
/// The specialized behavior of a section is selected once, at construction,
/// by a closed match on `sh_type`; see [`SectionKind`]. The name and the
/// byte payload are resolved lazily and memoized.
pub struct Section {
    index: usize,
    shdr: Shdr,
    kind: SectionKind,
    name: Memo<Rc<str>>,
    data: Memo<Rc<[u8]>>,
}

/// The specialized view of a section, chosen by `sh_type`.
///
/// Type codes without a specialized view fall into `Regular`, which only
/// carries the base contract (`header`, `name`, `data`).
pub enum SectionKind {
    /// `SHT_NULL`, the placeholder at index 0.
    Null,
    /// `SHT_STRTAB`, a NUL-terminated string pool.
    StrTab(StrTab),
    /// `SHT_SYMTAB` or `SHT_DYNSYM`.
    SymTab(SymTab),
    /// `SHT_RELA` or `SHT_REL`.
    Reloc(RelocTable),
    /// `SHT_DYNAMIC`.
    Dynamic(DynamicTable),
    /// `SHT_NOTE`.
    Note(NoteTable),
    /// Everything else.
    Regular,
}

impl SectionKind {
    fn from_shdr(shdr: &Shdr, class: Class) -> Self {
        match shdr.sh_type {
            abi::SHT_NULL => SectionKind::Null,
            abi::SHT_STRTAB => SectionKind::StrTab(StrTab::new(shdr.sh_offset)),
            abi::SHT_SYMTAB | abi::SHT_DYNSYM => SectionKind::SymTab(SymTab::new(shdr)),
            abi::SHT_RELA | abi::SHT_REL => SectionKind::Reloc(RelocTable::new(shdr, class)),
            abi::SHT_DYNAMIC => SectionKind::Dynamic(DynamicTable::new(shdr.sh_offset)),
            abi::SHT_NOTE => SectionKind::Note(NoteTable::new(shdr.sh_offset, shdr.sh_size)),
            _ => SectionKind::Regular,
        }
    }
}

impl Section {
    pub(crate) fn new(index: usize, shdr: Shdr, class: Class) -> Self {
        let kind = SectionKind::from_shdr(&shdr, class);
        Self {
            index,
            shdr,
            kind,
            name: Memo::new(),
            data: Memo::new(),
        }
    }

    /// The 0-based index of this section in the section header table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The decoded section header.
    pub fn header(&self) -> &Shdr {
        &self.shdr
    }

    /// The specialized view of this section.
    pub fn kind(&self) -> &SectionKind {
        &self.kind
    }

    /// Is this the null placeholder section?
    pub fn is_null(&self) -> bool {
        matches!(self.kind, SectionKind::Null)
    }

    /// Resolves the section name through the file's section name string
    /// table. Memoized; a missing or unresolvable name is the empty string.
    pub fn name<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Rc<str>> {
        self.name.get_or_try_init(|| {
            let Some(strtab_section) = elf.strtab_section()? else {
                return Ok(Rc::from(""));
            };
            let Some(strtab) = strtab_section.strtab() else {
                return Ok(Rc::from(""));
            };
            let name = strtab
                .name_at(elf, u64::from(self.shdr.sh_name))?
                .unwrap_or_default();
            Ok(Rc::from(name.as_str()))
        })
    }

    /// The byte payload `[sh_offset, sh_offset + sh_size)`. Memoized.
    pub fn data<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Rc<[u8]>> {
        self.data.get_or_try_init(|| {
            let mut buf = vec![0u8; self.shdr.sh_size as usize];
            elf.read_exact(self.shdr.sh_offset, &mut buf)?;
            Ok(Rc::from(buf))
        })
    }

    /// The string-table view, if this is a `SHT_STRTAB` section.
    pub fn strtab(&self) -> Option<&StrTab> {
        match &self.kind {
            SectionKind::StrTab(table) => Some(table),
            _ => None,
        }
    }

    /// The symbol-table view, if this is a `SHT_SYMTAB`/`SHT_DYNSYM`
    /// section.
    pub fn symtab(&self) -> Option<&SymTab> {
        match &self.kind {
            SectionKind::SymTab(table) => Some(table),
            _ => None,
        }
    }

    /// The relocation-table view, if this is a `SHT_RELA`/`SHT_REL`
    /// section.
    pub fn reloc_table(&self) -> Option<&RelocTable> {
        match &self.kind {
            SectionKind::Reloc(table) => Some(table),
            _ => None,
        }
    }

    /// The dynamic-table view, if this is a `SHT_DYNAMIC` section.
    pub fn dynamic(&self) -> Option<&DynamicTable> {
        match &self.kind {
            SectionKind::Dynamic(table) => Some(table),
            _ => None,
        }
    }

    /// The note-table view, if this is a `SHT_NOTE` section.
    pub fn note_table(&self) -> Option<&NoteTable> {
        match &self.kind {
            SectionKind::Note(table) => Some(table),
            _ => None,
        }
    }
}

/// The string-pool view of a `SHT_STRTAB` section.
pub struct StrTab {
    offset: u64,
}

impl StrTab {
    pub(crate) fn new(offset: u64) -> Self {
        Self { offset }
    }

    /// Reads the NUL-terminated string starting at `offset` bytes into the
    /// pool.
    ///
    /// The bytes are decoded as UTF-8; invalid sequences come back as
    /// U+FFFD replacement characters rather than failing.
    ///
    /// Returns `Ok(None)` when the stream ends before a terminator is
    /// found, which indicates truncated input the caller may tolerate.
    pub fn name_at<R: ElfReader>(&self, elf: &ElfFile<R>, offset: u64) -> Result<Option<String>> {
        let mut pos = self.offset + offset;
        let mut out = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let n = elf.read_at(pos, &mut chunk)?;
            if n == 0 {
                return Ok(None);
            }
            if let Some(end) = chunk[..n].iter().position(|&b| b == 0) {
                out.extend_from_slice(&chunk[..end]);
                return Ok(Some(String::from_utf8_lossy(&out).into_owned()));
            }
            out.extend_from_slice(&chunk[..n]);
            pos += n as u64;
        }
    }
}
