//! ELF ABI constants and the name ⇄ code tables behind by-type queries.
//!
//! Values follow the System V ABI as collected in `<elf.h>`. The queryable
//! constant domains (section types, segment types, dynamic tags) each have
//! a table used by the tolerant resolver: queries may name a constant by
//! integer code, by bare name (`"note"`), or by prefixed name (`"PT_NOTE"`),
//! case-insensitively. Machine codes only render forward, through
//! [`machine_name`].

use crate::{Error, Result};

/// The four ELF identification magic bytes.
pub const ELFMAG: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// `EI_CLASS` value for 32-bit objects.
pub const ELFCLASS32: u8 = 1;
/// `EI_CLASS` value for 64-bit objects.
pub const ELFCLASS64: u8 = 2;
/// `EI_DATA` value for little-endian objects.
pub const ELFDATA2LSB: u8 = 1;
/// `EI_DATA` value for big-endian objects.
pub const ELFDATA2MSB: u8 = 2;

// Section header types, recorded in `sh_type`.
pub const SHT_NULL: u32 = 0;
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_HASH: u32 = 5;
pub const SHT_DYNAMIC: u32 = 6;
pub const SHT_NOTE: u32 = 7;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;
pub const SHT_SHLIB: u32 = 10;
pub const SHT_DYNSYM: u32 = 11;
pub const SHT_NUM: u32 = 12;
pub const SHT_LOPROC: u32 = 0x7000_0000;
pub const SHT_HIPROC: u32 = 0x7fff_ffff;
pub const SHT_LOUSER: u32 = 0x8000_0000;
pub const SHT_HIUSER: u32 = 0xffff_ffff;

// Program header types, recorded in `p_type`.
pub const PT_NULL: u32 = 0;
pub const PT_LOAD: u32 = 1;
pub const PT_DYNAMIC: u32 = 2;
pub const PT_INTERP: u32 = 3;
pub const PT_NOTE: u32 = 4;
pub const PT_SHLIB: u32 = 5;
pub const PT_PHDR: u32 = 6;
pub const PT_TLS: u32 = 7;
pub const PT_LOOS: u32 = 0x6000_0000;
pub const PT_HIOS: u32 = 0x6fff_ffff;
pub const PT_LOPROC: u32 = 0x7000_0000;
pub const PT_HIPROC: u32 = 0x7fff_ffff;
pub const PT_GNU_EH_FRAME: u32 = 0x6474_e550;
pub const PT_GNU_STACK: u32 = PT_LOOS + 0x474_e551;
pub const PT_GNU_RELRO: u32 = PT_LOOS + 0x474_e552;

// Dynamic table tags, recorded in `d_tag`.
pub const DT_NULL: i64 = 0;
pub const DT_NEEDED: i64 = 1;
pub const DT_PLTRELSZ: i64 = 2;
pub const DT_PLTGOT: i64 = 3;
pub const DT_HASH: i64 = 4;
pub const DT_STRTAB: i64 = 5;
pub const DT_SYMTAB: i64 = 6;
pub const DT_RELA: i64 = 7;
pub const DT_RELASZ: i64 = 8;
pub const DT_RELAENT: i64 = 9;
pub const DT_STRSZ: i64 = 10;
pub const DT_SYMENT: i64 = 11;
pub const DT_INIT: i64 = 12;
pub const DT_FINI: i64 = 13;
pub const DT_SONAME: i64 = 14;
pub const DT_RPATH: i64 = 15;
pub const DT_SYMBOLIC: i64 = 16;
pub const DT_REL: i64 = 17;
pub const DT_RELSZ: i64 = 18;
pub const DT_RELENT: i64 = 19;
pub const DT_PLTREL: i64 = 20;
pub const DT_DEBUG: i64 = 21;
pub const DT_TEXTREL: i64 = 22;
pub const DT_JMPREL: i64 = 23;
pub const DT_ENCODING: i64 = 32;
pub const DT_LOOS: i64 = 0x6000_000d;
pub const DT_HIOS: i64 = 0x6fff_f000;
pub const DT_VERSYM: i64 = 0x6fff_fff0;
pub const DT_RELACOUNT: i64 = 0x6fff_fff9;
pub const DT_RELCOUNT: i64 = 0x6fff_fffa;
pub const DT_FLAGS_1: i64 = 0x6fff_fffb;
pub const DT_VERDEF: i64 = 0x6fff_fffc;
pub const DT_VERDEFNUM: i64 = 0x6fff_fffd;
pub const DT_VERNEED: i64 = 0x6fff_fffe;
pub const DT_VERNEEDNUM: i64 = 0x6fff_ffff;
pub const DT_LOPROC: i64 = 0x7000_0000;
pub const DT_HIPROC: i64 = 0x7fff_ffff;

// Machine codes, recorded in `e_machine`.
pub const EM_386: u16 = 3;
pub const EM_68K: u16 = 4;
pub const EM_MIPS: u16 = 8;
pub const EM_PPC: u16 = 20;
pub const EM_PPC64: u16 = 21;
pub const EM_S390: u16 = 22;
pub const EM_ARM: u16 = 40;
pub const EM_SPARCV9: u16 = 43;
pub const EM_IA_64: u16 = 50;
pub const EM_X86_64: u16 = 62;
pub const EM_AARCH64: u16 = 183;
pub const EM_RISCV: u16 = 243;
pub const EM_LOONGARCH: u16 = 258;

/// A by-type query argument: either an integer code or a symbolic name.
///
/// Conversions exist for the common integer widths and for strings, so
/// query methods can accept `4`, `"note"`, `"NoTe"` or `"PT_NOTE"` alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeQuery {
    /// A raw constant value.
    Code(i64),
    /// A bare or prefixed constant name.
    Name(String),
}

macro_rules! query_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for TypeQuery {
            fn from(v: $ty) -> Self {
                TypeQuery::Code(v as i64)
            }
        })*
    };
}
query_from_int!(i32, u32, i64, u64, usize);

impl From<&str> for TypeQuery {
    fn from(v: &str) -> Self {
        TypeQuery::Name(v.to_string())
    }
}

impl From<String> for TypeQuery {
    fn from(v: String) -> Self {
        TypeQuery::Name(v)
    }
}

/// A closed name ⇄ code table for one constant domain.
pub(crate) struct ConstantTable {
    pub(crate) domain: &'static str,
    entries: &'static [(&'static str, i64)],
}

impl ConstantTable {
    /// Resolves a tolerant query to a constant value of this domain.
    ///
    /// Integer queries must match a known constant exactly. Name queries are
    /// upper-cased and prefixed with the domain name when the prefix is
    /// missing, then matched against the table.
    pub(crate) fn resolve(&self, query: &TypeQuery) -> Result<i64> {
        match query {
            TypeQuery::Code(value) => {
                if self.entries.iter().any(|&(_, code)| code == *value) {
                    Ok(*value)
                } else {
                    Err(Error::UnknownConstantValue {
                        domain: self.domain,
                        value: *value,
                    })
                }
            }
            TypeQuery::Name(name) => {
                let upper = name.to_ascii_uppercase();
                let full = if upper.starts_with(&format!("{}_", self.domain)) {
                    upper
                } else {
                    format!("{}_{}", self.domain, upper)
                };
                self.entries
                    .iter()
                    .find(|&&(entry, _)| entry == full)
                    .map(|&(_, code)| code)
                    .ok_or(Error::UnknownConstantName {
                        domain: self.domain,
                        name: full,
                    })
            }
        }
    }

    /// Returns the symbolic name of `code`, if the domain defines one.
    pub(crate) fn name_of(&self, code: i64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|&&(_, value)| value == code)
            .map(|&(name, _)| name)
    }
}

macro_rules! constant_table {
    ($table:ident, $domain:literal, [$($name:ident),* $(,)?]) => {
        pub(crate) static $table: ConstantTable = ConstantTable {
            domain: $domain,
            entries: &[$((stringify!($name), $name as i64)),*],
        };
    };
}

constant_table!(SHT, "SHT", [
    SHT_NULL, SHT_PROGBITS, SHT_SYMTAB, SHT_STRTAB, SHT_RELA, SHT_HASH,
    SHT_DYNAMIC, SHT_NOTE, SHT_NOBITS, SHT_REL, SHT_SHLIB, SHT_DYNSYM,
    SHT_NUM, SHT_LOPROC, SHT_HIPROC, SHT_LOUSER, SHT_HIUSER,
]);

constant_table!(PT, "PT", [
    PT_NULL, PT_LOAD, PT_DYNAMIC, PT_INTERP, PT_NOTE, PT_SHLIB, PT_PHDR,
    PT_TLS, PT_LOOS, PT_HIOS, PT_LOPROC, PT_HIPROC, PT_GNU_EH_FRAME,
    PT_GNU_STACK, PT_GNU_RELRO,
]);

constant_table!(DT, "DT", [
    DT_NULL, DT_NEEDED, DT_PLTRELSZ, DT_PLTGOT, DT_HASH, DT_STRTAB,
    DT_SYMTAB, DT_RELA, DT_RELASZ, DT_RELAENT, DT_STRSZ, DT_SYMENT,
    DT_INIT, DT_FINI, DT_SONAME, DT_RPATH, DT_SYMBOLIC, DT_REL, DT_RELSZ,
    DT_RELENT, DT_PLTREL, DT_DEBUG, DT_TEXTREL, DT_JMPREL, DT_ENCODING,
    DT_LOOS, DT_HIOS, DT_VERSYM, DT_RELACOUNT, DT_RELCOUNT, DT_FLAGS_1,
    DT_VERDEF, DT_VERDEFNUM, DT_VERNEED, DT_VERNEEDNUM, DT_LOPROC,
    DT_HIPROC,
]);

/// Returns a human-readable name for an `e_machine` code.
///
/// Unknown codes render as `unknown: 0x<hex>` and are never an error.
pub fn machine_name(machine: u16) -> String {
    let known = match machine {
        EM_386 => "x86",
        EM_68K => "Motorola 68000",
        EM_MIPS => "MIPS",
        EM_PPC => "PowerPC",
        EM_PPC64 => "PowerPC64",
        EM_S390 => "IBM S/390",
        EM_ARM => "ARM",
        EM_SPARCV9 => "SPARC v9",
        EM_IA_64 => "Intel IA-64",
        EM_X86_64 => "x86_64",
        EM_AARCH64 => "AArch64",
        EM_RISCV => "RISC-V",
        EM_LOONGARCH => "LoongArch",
        _ => return format!("unknown: {machine:#x}"),
    };
    known.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_accepts_all_tolerant_forms() {
        for query in [
            TypeQuery::from(PT_NOTE),
            TypeQuery::from(4u32),
            TypeQuery::from("note"),
            TypeQuery::from("NoTe"),
            TypeQuery::from("PT_NOTE"),
            TypeQuery::from("pt_note"),
        ] {
            assert_eq!(PT.resolve(&query).unwrap(), PT_NOTE as i64);
        }
    }

    #[test]
    fn resolver_rejects_unknown_values() {
        match PT.resolve(&TypeQuery::from(1337u32)) {
            Err(Error::UnknownConstantValue { domain: "PT", value: 1337 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        match PT.resolve(&TypeQuery::from("oao")) {
            Err(Error::UnknownConstantName { domain: "PT", name }) => {
                assert_eq!(name, "PT_OAO");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn name_of_reverses_codes() {
        assert_eq!(SHT.name_of(SHT_SYMTAB as i64), Some("SHT_SYMTAB"));
        assert_eq!(DT.name_of(DT_NEEDED), Some("DT_NEEDED"));
        assert_eq!(DT.name_of(12345), None);
    }

    #[test]
    fn machine_names_fall_back_gracefully() {
        assert_eq!(machine_name(EM_X86_64), "x86_64");
        assert_eq!(machine_name(0xbeef), "unknown: 0xbeef");
    }
}
