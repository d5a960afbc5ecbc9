//! Symbol tables and symbol entities.

use crate::elf::{Shdr, Sym};
use crate::file::ElfFile;
use crate::input::ElfReader;
use crate::lazy::{LazyArray, Memo};
use crate::Result;
use std::rc::Rc;

/// The symbol-table view of a `SHT_SYMTAB` or `SHT_DYNSYM` section.
///
/// Symbols are decoded lazily, one entry per first access, and cached.
pub struct SymTab {
    offset: u64,
    entsize: u64,
    link: u32,
    symbols: LazyArray<Symbol>,
}

impl SymTab {
    pub(crate) fn new(shdr: &Shdr) -> Self {
        let count = if shdr.sh_entsize == 0 {
            0
        } else {
            (shdr.sh_size / shdr.sh_entsize) as usize
        };
        Self {
            offset: shdr.sh_offset,
            entsize: shdr.sh_entsize,
            link: shdr.sh_link,
            symbols: LazyArray::new(count),
        }
    }

    /// Number of symbols in the table.
    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// Returns the `n`-th symbol, 0-based, or `Ok(None)` out of range.
    pub fn symbol_at<R: ElfReader>(
        &self,
        elf: &ElfFile<R>,
        n: usize,
    ) -> Result<Option<Rc<Symbol>>> {
        self.symbols.get(n, || {
            let mut buf = vec![0u8; Sym::size_of(elf.class())];
            elf.read_exact(self.offset + n as u64 * self.entsize, &mut buf)?;
            let sym = Sym::parse(&buf, elf.class(), elf.endian());
            Ok(Symbol::new(sym, self.link))
        })
    }

    /// Returns all symbols in index order.
    pub fn symbols<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Vec<Rc<Symbol>>> {
        let mut out = Vec::with_capacity(self.num_symbols());
        for n in 0..self.num_symbols() {
            if let Some(symbol) = self.symbol_at(elf, n)? {
                out.push(symbol);
            }
        }
        Ok(out)
    }

    /// Returns the first symbol whose name equals `name`, scanning in
    /// index order, or `Ok(None)` after a full scan with no match.
    pub fn symbol_by_name<R: ElfReader>(
        &self,
        elf: &ElfFile<R>,
        name: &str,
    ) -> Result<Option<Rc<Symbol>>> {
        for n in 0..self.num_symbols() {
            let Some(symbol) = self.symbol_at(elf, n)? else {
                break;
            };
            if &*symbol.name(elf)? == name {
                return Ok(Some(symbol));
            }
        }
        Ok(None)
    }

    /// Returns the linked string-table section (`sh_link`), which holds
    /// the symbol names.
    pub fn symstr<R: ElfReader>(
        &self,
        elf: &ElfFile<R>,
    ) -> Result<Option<Rc<crate::section::Section>>> {
        elf.section_at(self.link as usize)
    }
}

/// A single symbol-table entry.
pub struct Symbol {
    sym: Sym,
    strtab: u32,
    name: Memo<Rc<str>>,
}

impl Symbol {
    pub(crate) fn new(sym: Sym, strtab: u32) -> Self {
        Self {
            sym,
            strtab,
            name: Memo::new(),
        }
    }

    /// The decoded symbol record.
    pub fn header(&self) -> &Sym {
        &self.sym
    }

    /// Resolves the symbol name through the table's linked string table.
    /// Memoized; a missing name is the empty string.
    pub fn name<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Rc<str>> {
        self.name.get_or_try_init(|| {
            let Some(section) = elf.section_at(self.strtab as usize)? else {
                return Ok(Rc::from(""));
            };
            let Some(strtab) = section.strtab() else {
                return Ok(Rc::from(""));
            };
            let name = strtab
                .name_at(elf, u64::from(self.sym.st_name))?
                .unwrap_or_default();
            Ok(Rc::from(name.as_str()))
        })
    }

    /// Symbol value, usually an address.
    pub fn value(&self) -> u64 {
        self.sym.st_value
    }

    /// Symbol size in bytes.
    pub fn size(&self) -> u64 {
        self.sym.st_size
    }

    /// Index of the section this symbol is defined relative to.
    pub fn shndx(&self) -> u16 {
        self.sym.st_shndx
    }

    /// Symbol binding from the high nibble of `st_info`.
    pub fn bind(&self) -> SymbolBind {
        SymbolBind::from_code(self.sym.st_info >> 4)
    }

    /// Symbol type from the low nibble of `st_info`.
    pub fn sym_type(&self) -> SymbolType {
        SymbolType::from_code(self.sym.st_info & 0xf)
    }

    /// Symbol visibility from the low 3 bits of `st_other`.
    pub fn visibility(&self) -> SymbolVisibility {
        SymbolVisibility::from_code(self.sym.st_other & 0x7)
    }
}

/// Symbol binding, the high nibble of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolBind {
    /// `STB_LOCAL`, not visible outside the defining object.
    Local,
    /// `STB_GLOBAL`, visible to all objects being combined.
    Global,
    /// `STB_WEAK`, global with lower link precedence.
    Weak,
    /// OS- or processor-specific or reserved binding codes.
    Other(u8),
}

impl SymbolBind {
    fn from_code(code: u8) -> Self {
        match code {
            0 => SymbolBind::Local,
            1 => SymbolBind::Global,
            2 => SymbolBind::Weak,
            other => SymbolBind::Other(other),
        }
    }
}

/// Symbol type, the low nibble of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    /// `STT_NOTYPE`, type not specified.
    NoType,
    /// `STT_OBJECT`, a data object.
    Object,
    /// `STT_FUNC`, a function or other executable code.
    Func,
    /// `STT_SECTION`, associated with a section.
    Section,
    /// `STT_FILE`, the source file name.
    File,
    /// `STT_COMMON`, an uninitialized common block.
    Common,
    /// `STT_TLS`, a thread-local storage entity.
    Tls,
    /// OS- or processor-specific or reserved type codes.
    Other(u8),
}

impl SymbolType {
    fn from_code(code: u8) -> Self {
        match code {
            0 => SymbolType::NoType,
            1 => SymbolType::Object,
            2 => SymbolType::Func,
            3 => SymbolType::Section,
            4 => SymbolType::File,
            5 => SymbolType::Common,
            6 => SymbolType::Tls,
            other => SymbolType::Other(other),
        }
    }
}

/// Symbol visibility, the low 3 bits of `st_other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolVisibility {
    /// `STV_DEFAULT`, visibility as specified by the binding.
    Default,
    /// `STV_INTERNAL`, processor-specific hidden class.
    Internal,
    /// `STV_HIDDEN`, not visible to other objects.
    Hidden,
    /// `STV_PROTECTED`, visible but not preemptable.
    Protected,
    /// Reserved visibility codes.
    Other(u8),
}

impl SymbolVisibility {
    fn from_code(code: u8) -> Self {
        match code {
            0 => SymbolVisibility::Default,
            1 => SymbolVisibility::Internal,
            2 => SymbolVisibility::Hidden,
            3 => SymbolVisibility::Protected,
            other => SymbolVisibility::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym_with_info(st_info: u8, st_other: u8) -> Symbol {
        Symbol::new(
            Sym {
                st_name: 0,
                st_info,
                st_other,
                st_shndx: 0,
                st_value: 0,
                st_size: 0,
            },
            0,
        )
    }

    #[test]
    fn info_nibbles_split_into_bind_and_type() {
        let sym = sym_with_info(0x12, 0);
        assert_eq!(sym.bind(), SymbolBind::Global);
        assert_eq!(sym.sym_type(), SymbolType::Func);

        let sym = sym_with_info(0x21, 0);
        assert_eq!(sym.bind(), SymbolBind::Weak);
        assert_eq!(sym.sym_type(), SymbolType::Object);
    }

    #[test]
    fn visibility_uses_low_three_bits_only() {
        let sym = sym_with_info(0, 0xfa);
        assert_eq!(sym.visibility(), SymbolVisibility::Hidden);
    }

    #[test]
    fn reserved_codes_are_preserved() {
        let sym = sym_with_info(0xdd, 0x7);
        assert_eq!(sym.bind(), SymbolBind::Other(13));
        assert_eq!(sym.sym_type(), SymbolType::Other(13));
        assert_eq!(sym.visibility(), SymbolVisibility::Other(7));
    }
}
