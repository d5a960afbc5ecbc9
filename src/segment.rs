//! Segments and the type-code-driven segment dispatch.

use crate::dynamic::DynamicTable;
use crate::elf::abi;
use crate::elf::{Phdr, SegmentFlags};
use crate::file::ElfFile;
use crate::input::ElfReader;
use crate::lazy::Memo;
use crate::note::NoteTable;
use crate::Result;
use std::rc::Rc;

/// A segment of an ELF file, the loader-oriented view of its contents.
///
/// As with sections, the specialized behavior is chosen once at
/// construction by a closed match on `p_type`; see [`SegmentKind`].
pub struct Segment {
    index: usize,
    phdr: Phdr,
    kind: SegmentKind,
    data: Memo<Rc<[u8]>>,
}

/// The specialized view of a segment, chosen by `p_type`.
pub enum SegmentKind {
    /// `PT_INTERP`, the interpreter path.
    Interp,
    /// `PT_NOTE`.
    Note(NoteTable),
    /// `PT_DYNAMIC`.
    Dynamic(DynamicTable),
    /// `PT_LOAD`, participates in address translation.
    Load,
    /// Everything else.
    Regular,
}

impl SegmentKind {
    fn from_phdr(phdr: &Phdr) -> Self {
        match phdr.p_type {
            abi::PT_INTERP => SegmentKind::Interp,
            abi::PT_NOTE => SegmentKind::Note(NoteTable::new(phdr.p_offset, phdr.p_filesz)),
            abi::PT_DYNAMIC => SegmentKind::Dynamic(DynamicTable::new(phdr.p_offset)),
            abi::PT_LOAD => SegmentKind::Load,
            _ => SegmentKind::Regular,
        }
    }
}

impl Segment {
    pub(crate) fn new(index: usize, phdr: Phdr) -> Self {
        let kind = SegmentKind::from_phdr(&phdr);
        Self {
            index,
            phdr,
            kind,
            data: Memo::new(),
        }
    }

    /// The 0-based index of this segment in the program header table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The decoded program header.
    pub fn header(&self) -> &Phdr {
        &self.phdr
    }

    /// The specialized view of this segment.
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// The byte payload `[p_offset, p_offset + p_filesz)`. Memoized.
    ///
    /// Note this is the *file* size; a segment's memory size may be
    /// larger (e.g. `.bss`), and those extra bytes are not in the file.
    pub fn data<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Rc<[u8]>> {
        self.data.get_or_try_init(|| {
            let mut buf = vec![0u8; self.phdr.p_filesz as usize];
            elf.read_exact(self.phdr.p_offset, &mut buf)?;
            Ok(Rc::from(buf))
        })
    }

    /// Is this segment mapped readable? (`p_flags` bit 2)
    pub fn readable(&self) -> bool {
        self.phdr.flags().contains(SegmentFlags::R)
    }

    /// Is this segment mapped writable? (`p_flags` bit 1)
    pub fn writable(&self) -> bool {
        self.phdr.flags().contains(SegmentFlags::W)
    }

    /// Is this segment mapped executable? (`p_flags` bit 0)
    pub fn executable(&self) -> bool {
        self.phdr.flags().contains(SegmentFlags::X)
    }

    /// The interpreter path with the trailing NUL stripped, for
    /// `PT_INTERP` segments. Returns `Ok(None)` for any other kind.
    pub fn interp_name<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Option<String>> {
        if !matches!(self.kind, SegmentKind::Interp) {
            return Ok(None);
        }
        let data = self.data(elf)?;
        let trimmed = data.strip_suffix(&[0u8]).unwrap_or(&data);
        Ok(Some(String::from_utf8_lossy(trimmed).into_owned()))
    }

    /// The note-table view, if this is a `PT_NOTE` segment.
    pub fn note_table(&self) -> Option<&NoteTable> {
        match &self.kind {
            SegmentKind::Note(table) => Some(table),
            _ => None,
        }
    }

    /// The dynamic-table view, if this is a `PT_DYNAMIC` segment.
    pub fn dynamic(&self) -> Option<&DynamicTable> {
        match &self.kind {
            SegmentKind::Dynamic(table) => Some(table),
            _ => None,
        }
    }

    /// Does `[vma, vma + size)` fall inside this segment's file-backed
    /// virtual address range? The segment start is masked down to its
    /// alignment, so addresses in the alignment slack before `p_vaddr`
    /// still match.
    pub(crate) fn matches_vma(&self, vma: u64, size: u64) -> bool {
        let align = self.phdr.p_align;
        let masked_start = if align <= 1 {
            self.phdr.p_vaddr
        } else {
            self.phdr.p_vaddr & !(align - 1)
        };
        let Some(span_end) = vma.checked_add(size) else {
            return false;
        };
        let Some(extent_end) = self.phdr.p_vaddr.checked_add(self.phdr.p_filesz) else {
            return false;
        };
        vma >= masked_start && span_end <= extent_end
    }
}
