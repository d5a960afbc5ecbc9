//! Bit-exact record layouts and their width/endianness-aware decoders.
//!
//! Every record decoder takes an explicit `(Class, Endian)` pair and a byte
//! buffer that the caller has already fetched from the right file offset.
//! Decoded records are width-normalized: offsets and addresses widen to
//! `u64`, the signed dynamic tag widens to `i64`, so the rest of the crate
//! never branches on class except where the wire layout itself differs.

use bitflags::bitflags;

/// The ELF file class: 32-bit or 64-bit record layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// `ELFCLASS32`
    Class32,
    /// `ELFCLASS64`
    Class64,
}

impl Class {
    /// Returns the width in bits, 32 or 64.
    pub fn bits(self) -> u32 {
        match self {
            Class::Class32 => 32,
            Class::Class64 => 64,
        }
    }

    /// Size in bytes of an address or offset field of this class.
    pub(crate) fn addr_size(self) -> usize {
        match self {
            Class::Class32 => 4,
            Class::Class64 => 8,
        }
    }

    /// The bit position splitting `r_info` into symbol index and type.
    pub(crate) fn r_info_split(self) -> u32 {
        match self {
            Class::Class32 => 8,
            Class::Class64 => 32,
        }
    }
}

/// The ELF data encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// `ELFDATA2LSB`
    Little,
    /// `ELFDATA2MSB`
    Big,
}

/// A cursor over a pre-fetched record buffer.
///
/// Callers size the buffer with the record's `size_of`, so reads here never
/// run past the end.
pub(crate) struct RecordCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    class: Class,
    endian: Endian,
}

impl<'a> RecordCursor<'a> {
    pub(crate) fn new(buf: &'a [u8], class: Class, endian: Endian) -> Self {
        Self {
            buf,
            pos: 0,
            class,
            endian,
        }
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        bytes
    }

    pub(crate) fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    pub(crate) fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    pub(crate) fn u16(&mut self) -> u16 {
        let b: [u8; 2] = self.take(2).try_into().unwrap();
        match self.endian {
            Endian::Little => u16::from_le_bytes(b),
            Endian::Big => u16::from_be_bytes(b),
        }
    }

    pub(crate) fn u32(&mut self) -> u32 {
        let b: [u8; 4] = self.take(4).try_into().unwrap();
        match self.endian {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        }
    }

    pub(crate) fn u64(&mut self) -> u64 {
        let b: [u8; 8] = self.take(8).try_into().unwrap();
        match self.endian {
            Endian::Little => u64::from_le_bytes(b),
            Endian::Big => u64::from_be_bytes(b),
        }
    }

    /// Reads an address/offset field: `u32` widened on class 32, `u64` on 64.
    pub(crate) fn addr(&mut self) -> u64 {
        match self.class {
            Class::Class32 => u64::from(self.u32()),
            Class::Class64 => self.u64(),
        }
    }

    /// Reads a signed address-width field, sign-extended to `i64`.
    pub(crate) fn saddr(&mut self) -> i64 {
        match self.class {
            Class::Class32 => i64::from(self.u32() as i32),
            Class::Class64 => self.u64() as i64,
        }
    }
}

bitflags! {
    /// Section attribute flags from `sh_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u64 {
        const WRITE = 0x1;
        const ALLOC = 0x2;
        const EXECINSTR = 0x4;
        const MERGE = 0x10;
        const STRINGS = 0x20;
        const INFO_LINK = 0x40;
        const TLS = 0x400;
    }
}

bitflags! {
    /// Segment permission flags from `p_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const X = 0x1;
        const W = 0x2;
        const R = 0x4;
    }
}

/// The decoded ELF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ehdr {
    /// ELF specification version from the identification bytes.
    pub ident_version: u8,
    /// OS/ABI identification.
    pub osabi: u8,
    /// ABI version.
    pub abi_version: u8,
    /// Object file type (`ET_EXEC`, `ET_DYN`, ...).
    pub e_type: u16,
    /// Target machine code, see [`machine_name`](crate::elf::abi::machine_name).
    pub e_machine: u16,
    /// Object file version.
    pub e_version: u32,
    /// Entry point virtual address.
    pub e_entry: u64,
    /// File offset of the program header table.
    pub e_phoff: u64,
    /// File offset of the section header table.
    pub e_shoff: u64,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size of this header.
    pub e_ehsize: u16,
    /// Size of one program header table entry.
    pub e_phentsize: u16,
    /// Number of program header table entries.
    pub e_phnum: u16,
    /// Size of one section header table entry.
    pub e_shentsize: u16,
    /// Number of section header table entries.
    pub e_shnum: u16,
    /// Section header table index of the section name string table.
    pub e_shstrndx: u16,
}

impl Ehdr {
    /// Size in bytes of the file header, identification included.
    pub fn size_of(class: Class) -> usize {
        16 + 2 + 2 + 4 + 3 * class.addr_size() + 4 + 6 * 2
    }

    /// Decodes a file header from a buffer starting at the magic bytes.
    pub(crate) fn parse(buf: &[u8], class: Class, endian: Endian) -> Self {
        let mut cur = RecordCursor::new(buf, class, endian);
        cur.skip(6); // magic, EI_CLASS and EI_DATA were validated at open
        let ident_version = cur.u8();
        let osabi = cur.u8();
        let abi_version = cur.u8();
        cur.skip(7); // identification padding
        Self {
            ident_version,
            osabi,
            abi_version,
            e_type: cur.u16(),
            e_machine: cur.u16(),
            e_version: cur.u32(),
            e_entry: cur.addr(),
            e_phoff: cur.addr(),
            e_shoff: cur.addr(),
            e_flags: cur.u32(),
            e_ehsize: cur.u16(),
            e_phentsize: cur.u16(),
            e_phnum: cur.u16(),
            e_shentsize: cur.u16(),
            e_shnum: cur.u16(),
            e_shstrndx: cur.u16(),
        }
    }
}

/// A decoded section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shdr {
    /// Offset of the section name in the section name string table.
    pub sh_name: u32,
    /// Section type (`SHT_*`).
    pub sh_type: u32,
    /// Section attribute flags.
    pub sh_flags: u64,
    /// Virtual address at execution, 0 if not allocated.
    pub sh_addr: u64,
    /// File offset of the section payload.
    pub sh_offset: u64,
    /// Payload size in bytes.
    pub sh_size: u64,
    /// Section-type-dependent link to another section.
    pub sh_link: u32,
    /// Section-type-dependent extra information.
    pub sh_info: u32,
    /// Required alignment.
    pub sh_addralign: u64,
    /// Entry size for sections holding fixed-size records.
    pub sh_entsize: u64,
}

impl Shdr {
    /// Size in bytes of one section header.
    pub fn size_of(class: Class) -> usize {
        2 * 4 + 6 * class.addr_size() + 2 * 4
    }

    pub(crate) fn parse(buf: &[u8], class: Class, endian: Endian) -> Self {
        let mut cur = RecordCursor::new(buf, class, endian);
        Self {
            sh_name: cur.u32(),
            sh_type: cur.u32(),
            sh_flags: cur.addr(),
            sh_addr: cur.addr(),
            sh_offset: cur.addr(),
            sh_size: cur.addr(),
            sh_link: cur.u32(),
            sh_info: cur.u32(),
            sh_addralign: cur.addr(),
            sh_entsize: cur.addr(),
        }
    }

    /// Returns the attribute flags as a typed view.
    pub fn flags(&self) -> SectionFlags {
        SectionFlags::from_bits_retain(self.sh_flags)
    }
}

/// A decoded program header.
///
/// The 32-bit and 64-bit layouts differ beyond field widths: on 64-bit,
/// `p_flags` moves up to directly follow `p_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phdr {
    /// Segment type (`PT_*`).
    pub p_type: u32,
    /// Segment permission flags.
    pub p_flags: u32,
    /// File offset of the segment payload.
    pub p_offset: u64,
    /// Virtual address of the segment in memory.
    pub p_vaddr: u64,
    /// Physical address, where relevant.
    pub p_paddr: u64,
    /// Number of bytes of the segment present in the file.
    pub p_filesz: u64,
    /// Number of bytes the segment occupies in memory.
    pub p_memsz: u64,
    /// Required alignment.
    pub p_align: u64,
}

impl Phdr {
    /// Size in bytes of one program header.
    pub fn size_of(class: Class) -> usize {
        match class {
            Class::Class32 => 8 * 4,
            Class::Class64 => 2 * 4 + 6 * 8,
        }
    }

    pub(crate) fn parse(buf: &[u8], class: Class, endian: Endian) -> Self {
        let mut cur = RecordCursor::new(buf, class, endian);
        let p_type = cur.u32();
        match class {
            Class::Class32 => {
                let p_offset = cur.addr();
                let p_vaddr = cur.addr();
                let p_paddr = cur.addr();
                let p_filesz = cur.addr();
                let p_memsz = cur.addr();
                let p_flags = cur.u32();
                let p_align = cur.addr();
                Self {
                    p_type,
                    p_flags,
                    p_offset,
                    p_vaddr,
                    p_paddr,
                    p_filesz,
                    p_memsz,
                    p_align,
                }
            }
            Class::Class64 => Self {
                p_type,
                p_flags: cur.u32(),
                p_offset: cur.addr(),
                p_vaddr: cur.addr(),
                p_paddr: cur.addr(),
                p_filesz: cur.addr(),
                p_memsz: cur.addr(),
                p_align: cur.addr(),
            },
        }
    }

    /// Returns the permission flags as a typed view.
    pub fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(self.p_flags)
    }
}

/// A decoded symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sym {
    /// Offset of the symbol name in the linked string table.
    pub st_name: u32,
    /// Bind (high nibble) and type (low nibble).
    pub st_info: u8,
    /// Visibility in the low 3 bits, rest reserved.
    pub st_other: u8,
    /// Index of the section this symbol is defined relative to.
    pub st_shndx: u16,
    /// Symbol value.
    pub st_value: u64,
    /// Symbol size.
    pub st_size: u64,
}

impl Sym {
    /// Size in bytes of one symbol entry.
    pub fn size_of(class: Class) -> usize {
        match class {
            Class::Class32 => 16,
            Class::Class64 => 24,
        }
    }

    pub(crate) fn parse(buf: &[u8], class: Class, endian: Endian) -> Self {
        let mut cur = RecordCursor::new(buf, class, endian);
        match class {
            Class::Class32 => {
                let st_name = cur.u32();
                let st_value = cur.addr();
                let st_size = cur.addr();
                let st_info = cur.u8();
                let st_other = cur.u8();
                let st_shndx = cur.u16();
                Self {
                    st_name,
                    st_info,
                    st_other,
                    st_shndx,
                    st_value,
                    st_size,
                }
            }
            Class::Class64 => Self {
                st_name: cur.u32(),
                st_info: cur.u8(),
                st_other: cur.u8(),
                st_shndx: cur.u16(),
                st_value: cur.addr(),
                st_size: cur.addr(),
            },
        }
    }
}

/// A decoded dynamic table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dyn {
    /// Tag (`DT_*`), the key of the entry.
    pub d_tag: i64,
    /// Value or address union, depending on the tag.
    pub d_val: u64,
}

impl Dyn {
    /// Size in bytes of one dynamic entry.
    pub fn size_of(class: Class) -> usize {
        2 * class.addr_size()
    }

    pub(crate) fn parse(buf: &[u8], class: Class, endian: Endian) -> Self {
        let mut cur = RecordCursor::new(buf, class, endian);
        Self {
            d_tag: cur.saddr(),
            d_val: cur.addr(),
        }
    }
}

/// A decoded note header. Width-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nhdr {
    /// Size of the name field, unpadded.
    pub n_namesz: u32,
    /// Size of the descriptor field, unpadded.
    pub n_descsz: u32,
    /// Note type.
    pub n_type: u32,
}

impl Nhdr {
    /// Size in bytes of a note header.
    pub const SIZE: usize = 12;

    pub(crate) fn parse(buf: &[u8], class: Class, endian: Endian) -> Self {
        let mut cur = RecordCursor::new(buf, class, endian);
        Self {
            n_namesz: cur.u32(),
            n_descsz: cur.u32(),
            n_type: cur.u32(),
        }
    }
}

/// A decoded relocation entry, REL or RELA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rel {
    /// Location the relocation applies to.
    pub r_offset: u64,
    /// Packed symbol index and relocation type, see [`Rel::symbol_index`].
    pub r_info: u64,
    /// Explicit addend, `Some` only for RELA entries.
    pub r_addend: Option<i64>,
}

impl Rel {
    /// Size in bytes of one relocation entry.
    pub fn size_of(class: Class, rela: bool) -> usize {
        class.addr_size() * if rela { 3 } else { 2 }
    }

    pub(crate) fn parse(buf: &[u8], class: Class, endian: Endian, rela: bool) -> Self {
        let mut cur = RecordCursor::new(buf, class, endian);
        Self {
            r_offset: cur.addr(),
            r_info: cur.addr(),
            r_addend: rela.then(|| cur.saddr()),
        }
    }

    /// Extracts the symbol index from the high bits of `r_info`.
    pub fn symbol_index(&self, class: Class) -> u64 {
        self.r_info >> class.r_info_split()
    }

    /// Extracts the relocation type from the low bits of `r_info`.
    pub fn r_type(&self, class: Class) -> u64 {
        self.r_info & ((1u64 << class.r_info_split()) - 1)
    }

    /// Packs a symbol index and type into an `r_info` value.
    pub fn pack_info(symbol_index: u64, r_type: u64, class: Class) -> u64 {
        (symbol_index << class.r_info_split()) | (r_type & ((1u64 << class.r_info_split()) - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes_match_the_abi() {
        assert_eq!(Ehdr::size_of(Class::Class32), 52);
        assert_eq!(Ehdr::size_of(Class::Class64), 64);
        assert_eq!(Shdr::size_of(Class::Class32), 40);
        assert_eq!(Shdr::size_of(Class::Class64), 64);
        assert_eq!(Phdr::size_of(Class::Class32), 32);
        assert_eq!(Phdr::size_of(Class::Class64), 56);
        assert_eq!(Sym::size_of(Class::Class32), 16);
        assert_eq!(Sym::size_of(Class::Class64), 24);
        assert_eq!(Dyn::size_of(Class::Class32), 8);
        assert_eq!(Dyn::size_of(Class::Class64), 16);
        assert_eq!(Rel::size_of(Class::Class32, false), 8);
        assert_eq!(Rel::size_of(Class::Class64, true), 24);
    }

    #[test]
    fn phdr_layouts_differ_by_class() {
        // 64-bit: p_flags immediately follows p_type.
        let mut buf64 = vec![0u8; Phdr::size_of(Class::Class64)];
        buf64[0..4].copy_from_slice(&1u32.to_le_bytes()); // PT_LOAD
        buf64[4..8].copy_from_slice(&5u32.to_le_bytes()); // R+X
        buf64[8..16].copy_from_slice(&0x1000u64.to_le_bytes());
        let phdr = Phdr::parse(&buf64, Class::Class64, Endian::Little);
        assert_eq!(phdr.p_flags, 5);
        assert_eq!(phdr.p_offset, 0x1000);

        // 32-bit: p_flags sits between p_memsz and p_align.
        let mut buf32 = vec![0u8; Phdr::size_of(Class::Class32)];
        buf32[0..4].copy_from_slice(&1u32.to_le_bytes());
        buf32[4..8].copy_from_slice(&0x1000u32.to_le_bytes()); // p_offset
        buf32[24..28].copy_from_slice(&5u32.to_le_bytes()); // p_flags
        let phdr = Phdr::parse(&buf32, Class::Class32, Endian::Little);
        assert_eq!(phdr.p_flags, 5);
        assert_eq!(phdr.p_offset, 0x1000);
    }

    #[test]
    fn sym_layouts_differ_by_class() {
        let mut buf = vec![0u8; Sym::size_of(Class::Class64)];
        buf[0..4].copy_from_slice(&7u32.to_le_bytes()); // st_name
        buf[4] = 0x12; // st_info
        buf[8..16].copy_from_slice(&0xdead_beefu64.to_le_bytes()); // st_value
        let sym = Sym::parse(&buf, Class::Class64, Endian::Little);
        assert_eq!((sym.st_name, sym.st_info, sym.st_value), (7, 0x12, 0xdead_beef));

        let mut buf = vec![0u8; Sym::size_of(Class::Class32)];
        buf[0..4].copy_from_slice(&7u32.to_le_bytes()); // st_name
        buf[4..8].copy_from_slice(&0xbeefu32.to_le_bytes()); // st_value
        buf[12] = 0x12; // st_info
        let sym = Sym::parse(&buf, Class::Class32, Endian::Little);
        assert_eq!((sym.st_name, sym.st_info, sym.st_value), (7, 0x12, 0xbeef));
    }

    #[test]
    fn big_endian_decoding() {
        let mut buf = vec![0u8; Dyn::size_of(Class::Class32)];
        buf[0..4].copy_from_slice(&1i32.to_be_bytes()); // DT_NEEDED
        buf[4..8].copy_from_slice(&0x42u32.to_be_bytes());
        let d = Dyn::parse(&buf, Class::Class32, Endian::Big);
        assert_eq!((d.d_tag, d.d_val), (1, 0x42));
    }

    #[test]
    fn negative_dynamic_tags_sign_extend() {
        let mut buf = vec![0u8; Dyn::size_of(Class::Class32)];
        buf[0..4].copy_from_slice(&(-2i32).to_le_bytes());
        let d = Dyn::parse(&buf, Class::Class32, Endian::Little);
        assert_eq!(d.d_tag, -2);
    }

    #[test]
    fn r_info_round_trips_at_both_widths() {
        for (class, sym, ty) in [
            (Class::Class32, 0xab_cdefu64, 0xffu64),
            (Class::Class32, 1, 7),
            (Class::Class64, 0xdead_beefu64, 0xffff_ffffu64),
            (Class::Class64, 42, 9),
        ] {
            let info = Rel::pack_info(sym, ty, class);
            let rel = Rel {
                r_offset: 0,
                r_info: info,
                r_addend: None,
            };
            assert_eq!(rel.symbol_index(class), sym);
            assert_eq!(rel.r_type(class), ty);
        }
    }
}
