//! Relocation tables and relocation entities.

use crate::elf::abi;
use crate::elf::{Class, Rel, Shdr};
use crate::file::ElfFile;
use crate::input::ElfReader;
use crate::lazy::{LazyArray, Memo};
use crate::Result;
use std::rc::Rc;

/// The relocation-table view of a `SHT_RELA` or `SHT_REL` section.
pub struct RelocTable {
    offset: u64,
    entsize: u64,
    link: u32,
    rela: bool,
    class: Class,
    relocations: LazyArray<Relocation>,
}

impl RelocTable {
    pub(crate) fn new(shdr: &Shdr, class: Class) -> Self {
        let count = if shdr.sh_entsize == 0 {
            0
        } else {
            (shdr.sh_size / shdr.sh_entsize) as usize
        };
        Self {
            offset: shdr.sh_offset,
            entsize: shdr.sh_entsize,
            link: shdr.sh_link,
            rela: shdr.sh_type == abi::SHT_RELA,
            class,
            relocations: LazyArray::new(count),
        }
    }

    /// Does this table carry explicit addends (RELA)?
    pub fn is_rela(&self) -> bool {
        self.rela
    }

    /// Number of relocations, 0 when `sh_entsize` is 0.
    pub fn num_relocations(&self) -> usize {
        self.relocations.len()
    }

    /// Returns the `n`-th relocation, 0-based, or `Ok(None)` out of range.
    pub fn relocation_at<R: ElfReader>(
        &self,
        elf: &ElfFile<R>,
        n: usize,
    ) -> Result<Option<Rc<Relocation>>> {
        self.relocations.get(n, || {
            let mut buf = vec![0u8; Rel::size_of(self.class, self.rela)];
            elf.read_exact(self.offset + n as u64 * self.entsize, &mut buf)?;
            let rel = Rel::parse(&buf, self.class, elf.endian(), self.rela);
            Ok(Relocation::new(rel, self.class, self.link))
        })
    }

    /// Returns all relocations in index order.
    pub fn relocations<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Vec<Rc<Relocation>>> {
        let mut out = Vec::with_capacity(self.num_relocations());
        for n in 0..self.num_relocations() {
            if let Some(relocation) = self.relocation_at(elf, n)? {
                out.push(relocation);
            }
        }
        Ok(out)
    }
}

/// A single relocation entry.
///
/// `r_info` packs the symbol index and the relocation type; the split sits
/// at bit 8 for 32-bit objects and bit 32 for 64-bit objects.
pub struct Relocation {
    rel: Rel,
    class: Class,
    link: u32,
    symbol_name: Memo<Rc<str>>,
}

impl Relocation {
    pub(crate) fn new(rel: Rel, class: Class, link: u32) -> Self {
        Self {
            rel,
            class,
            link,
            symbol_name: Memo::new(),
        }
    }

    /// The decoded relocation record.
    pub fn header(&self) -> &Rel {
        &self.rel
    }

    /// The location the relocation applies to.
    pub fn offset(&self) -> u64 {
        self.rel.r_offset
    }

    /// The symbol index from the high bits of `r_info`.
    pub fn symbol_index(&self) -> u64 {
        self.rel.symbol_index(self.class)
    }

    /// The relocation type from the low bits of `r_info`.
    pub fn r_type(&self) -> u64 {
        self.rel.r_type(self.class)
    }

    /// The explicit addend, `Some` only for RELA entries.
    pub fn addend(&self) -> Option<i64> {
        self.rel.r_addend
    }

    /// Resolves the referenced symbol through the relocation section's
    /// linked symbol table (`sh_link`).
    pub fn symbol<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Option<Rc<crate::symbol::Symbol>>> {
        let Some(section) = elf.section_at(self.link as usize)? else {
            return Ok(None);
        };
        let Some(symtab) = section.symtab() else {
            return Ok(None);
        };
        symtab.symbol_at(elf, self.symbol_index() as usize)
    }

    /// The name of the referenced symbol, or the empty string when the
    /// symbol cannot be resolved. Memoized.
    pub fn symbol_name<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Rc<str>> {
        self.symbol_name.get_or_try_init(|| {
            match self.symbol(elf)? {
                Some(symbol) => symbol.name(elf),
                None => Ok(Rc::from("")),
            }
        })
    }
}
