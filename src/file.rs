//! The top-level ELF container.

use crate::elf::abi::{self, TypeQuery};
use crate::elf::{Class, Ehdr, Endian, Phdr, Shdr};
use crate::input::ElfReader;
use crate::lazy::{LazyArray, Memo};
use crate::section::Section;
use crate::segment::Segment;
use crate::{Error, Result};
use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A lazily parsed ELF object.
///
/// `ElfFile` validates the identification bytes once at [`open`](Self::open)
/// and decodes everything else on demand: the header, each section and
/// segment header, and the entities inside them (symbols, relocations,
/// dynamic tags, notes). Every decoded piece is cached, so repeated access
/// to the same index returns the identical object and never re-reads the
/// stream.
///
/// The contained stream is driven by exactly one logical reader at a time;
/// `ElfFile` is not `Sync` and is meant for single-threaded, synchronous
/// inspection.
///
/// # Examples
/// ```no_run
/// use elf_inspect::{ElfFile, input::ElfStream};
///
/// let elf = ElfFile::open(ElfStream::open("/bin/cat").unwrap()).unwrap();
/// println!("machine: {}", elf.machine_name().unwrap());
/// for section in elf.sections().unwrap() {
///     println!("{}", section.name(&elf).unwrap());
/// }
/// ```
pub struct ElfFile<R: ElfReader> {
    reader: RefCell<R>,
    class: Class,
    endian: Endian,
    header: Memo<Ehdr>,
    sections: Memo<Rc<LazyArray<Section>>>,
    segments: Memo<Rc<LazyArray<Segment>>>,
    // Names discovered by section_by_name scans, so repeat queries skip
    // the already-visited prefix of the section table.
    section_names: RefCell<HashMap<String, usize>>,
}

impl<R: ElfReader> ElfFile<R> {
    /// Opens an ELF object, validating only its identification bytes.
    ///
    /// Reads the four magic bytes, the class byte and the data-encoding
    /// byte. Everything else, the file header included, is decoded lazily.
    ///
    /// # Errors
    ///
    /// [`Error::BadMagic`], [`Error::BadClass`] or [`Error::BadEndian`] if
    /// the identification bytes are not a valid ELF signature.
    pub fn open(reader: R) -> Result<Self> {
        let mut reader = reader;
        // The magic is judged on its own before the class and data bytes
        // are demanded, so a short non-ELF input still reports BadMagic.
        let mut magic = [0u8; 4];
        reader.read_exact_at(0, &mut magic)?;
        if magic != abi::ELFMAG {
            return Err(Error::BadMagic { found: magic });
        }
        let mut ident = [0u8; 2];
        reader.read_exact_at(4, &mut ident)?;
        let class = match ident[0] {
            abi::ELFCLASS32 => Class::Class32,
            abi::ELFCLASS64 => Class::Class64,
            other => return Err(Error::BadClass(other)),
        };
        let endian = match ident[1] {
            abi::ELFDATA2LSB => Endian::Little,
            abi::ELFDATA2MSB => Endian::Big,
            other => return Err(Error::BadEndian(other)),
        };
        #[cfg(feature = "log")]
        log::debug!("identified ELF object: class={class:?} endian={endian:?}");
        Ok(Self {
            reader: RefCell::new(reader),
            class,
            endian,
            header: Memo::new(),
            sections: Memo::new(),
            segments: Memo::new(),
            section_names: RefCell::new(HashMap::new()),
        })
    }

    /// Returns the file class, fixed at open time.
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the data encoding, fixed at open time.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Returns the file header, decoded exactly once from offset 0.
    pub fn header(&self) -> Result<Ehdr> {
        self.header.get_or_try_init(|| {
            let mut buf = vec![0u8; Ehdr::size_of(self.class)];
            self.read_exact(0, &mut buf)?;
            Ok(Ehdr::parse(&buf, self.class, self.endian))
        })
    }

    /// Returns a human-readable name of the target machine.
    ///
    /// Unknown machine codes render as `unknown: 0x<hex>`, never an error.
    pub fn machine_name(&self) -> Result<String> {
        Ok(abi::machine_name(self.header()?.e_machine))
    }

    /// Returns the GNU build id as a hex string.
    ///
    /// Looks for the section literally named `.note.gnu.build-id` and hex
    /// encodes the description of its first note. Returns `Ok(None)` when
    /// the section or the note is absent.
    pub fn build_id(&self) -> Result<Option<String>> {
        let Some(section) = self.section_by_name(".note.gnu.build-id")? else {
            return Ok(None);
        };
        let Some(table) = section.note_table() else {
            return Ok(None);
        };
        let notes = table.notes(self)?;
        let Some(note) = notes.first() else {
            return Ok(None);
        };
        let desc = note.desc(self)?;
        Ok(Some(desc.iter().map(|b| format!("{b:02x}")).collect()))
    }

    /// Number of entries in the section header table.
    pub fn num_sections(&self) -> Result<usize> {
        Ok(self.header()?.e_shnum as usize)
    }

    /// Returns the `n`-th section, 0-based.
    ///
    /// Sections are decoded lazily and cached; two calls with the same
    /// index return the identical `Rc`. Out-of-range indices yield
    /// `Ok(None)`.
    pub fn section_at(&self, n: usize) -> Result<Option<Rc<Section>>> {
        let table = self.section_table()?;
        table.get(n, || self.decode_section(n))
    }

    /// Returns all sections in index order.
    pub fn sections(&self) -> Result<Vec<Rc<Section>>> {
        let mut out = Vec::with_capacity(self.num_sections()?);
        for n in 0..self.num_sections()? {
            if let Some(section) = self.section_at(n)? {
                out.push(section);
            }
        }
        Ok(out)
    }

    /// Returns the section name string table, the section at `e_shstrndx`.
    pub fn strtab_section(&self) -> Result<Option<Rc<Section>>> {
        let index = self.header()?.e_shstrndx as usize;
        self.section_at(index)
    }

    /// Returns the first section whose resolved name equals `name`.
    ///
    /// Sections are scanned in index order and every name seen on the way
    /// is memoized, so later queries resume cheaply. The empty string
    /// matches the null section. Returns `Ok(None)` after a full scan with
    /// no match.
    pub fn section_by_name(&self, name: &str) -> Result<Option<Rc<Section>>> {
        let cached = self.section_names.borrow().get(name).copied();
        if let Some(index) = cached {
            return self.section_at(index);
        }
        for n in 0..self.num_sections()? {
            let Some(section) = self.section_at(n)? else {
                break;
            };
            let section_name = section.name(self)?;
            self.section_names
                .borrow_mut()
                .entry(section_name.to_string())
                .or_insert(n);
            if &*section_name == name {
                return Ok(Some(section));
            }
        }
        Ok(None)
    }

    /// Returns all sections of the given type, in index order.
    ///
    /// `sh_type` may be named by integer code, bare name (`"symtab"`) or
    /// prefixed name (`"SHT_SYMTAB"`).
    ///
    /// # Errors
    ///
    /// A lookup error if the type does not resolve to a known constant.
    pub fn sections_by_type(&self, sh_type: impl Into<TypeQuery>) -> Result<Vec<Rc<Section>>> {
        let code = abi::SHT.resolve(&sh_type.into())?;
        let mut out = Vec::new();
        for section in self.sections()? {
            if i64::from(section.header().sh_type) == code {
                out.push(section);
            }
        }
        Ok(out)
    }

    /// Number of entries in the program header table.
    pub fn num_segments(&self) -> Result<usize> {
        Ok(self.header()?.e_phnum as usize)
    }

    /// Returns the `n`-th segment, 0-based.
    ///
    /// Segments are decoded lazily and cached; out-of-range indices yield
    /// `Ok(None)`.
    pub fn segment_at(&self, n: usize) -> Result<Option<Rc<Segment>>> {
        let table = self.segment_table()?;
        table.get(n, || self.decode_segment(n))
    }

    /// Returns all segments in index order.
    pub fn segments(&self) -> Result<Vec<Rc<Segment>>> {
        let mut out = Vec::with_capacity(self.num_segments()?);
        for n in 0..self.num_segments()? {
            if let Some(segment) = self.segment_at(n)? {
                out.push(segment);
            }
        }
        Ok(out)
    }

    /// Returns all segments of the given type, in index order.
    ///
    /// Accepts the same tolerant type forms as
    /// [`sections_by_type`](Self::sections_by_type).
    pub fn segments_by_type(&self, p_type: impl Into<TypeQuery>) -> Result<Vec<Rc<Segment>>> {
        let code = abi::PT.resolve(&p_type.into())?;
        let mut out = Vec::new();
        for segment in self.segments()? {
            if i64::from(segment.header().p_type) == code {
                out.push(segment);
            }
        }
        Ok(out)
    }

    /// Returns the first segment of the given type, or `Ok(None)` if the
    /// file has none.
    pub fn segment_by_type(&self, p_type: impl Into<TypeQuery>) -> Result<Option<Rc<Segment>>> {
        let code = abi::PT.resolve(&p_type.into())?;
        for n in 0..self.num_segments()? {
            let Some(segment) = self.segment_at(n)? else {
                break;
            };
            if i64::from(segment.header().p_type) == code {
                return Ok(Some(segment));
            }
        }
        Ok(None)
    }

    /// Translates a virtual memory address to a file offset using the LOAD
    /// segments.
    ///
    /// A segment matches when `vma` lies at or above its alignment-masked
    /// start address and `vma + size` stays within its file-backed extent.
    /// Works for PIE and non-PIE objects alike since only the declared
    /// address ranges are consulted. Returns `Ok(None)` when no LOAD
    /// segment matches.
    pub fn offset_from_vma(&self, vma: u64, size: u64) -> Result<Option<u64>> {
        for n in 0..self.num_segments()? {
            let Some(segment) = self.segment_at(n)? else {
                break;
            };
            let phdr = segment.header();
            if phdr.p_type == abi::PT_LOAD && segment.matches_vma(vma, size) {
                return Ok(Some(vma - phdr.p_vaddr + phdr.p_offset));
            }
        }
        Ok(None)
    }

    pub(crate) fn read_exact(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.reader.borrow_mut().read_exact_at(offset, buf)
    }

    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.reader.borrow_mut().read_at(offset, buf)
    }

    fn section_table(&self) -> Result<Rc<LazyArray<Section>>> {
        let len = self.num_sections()?;
        self.sections.get_or_try_init(|| Ok(Rc::new(LazyArray::new(len))))
    }

    fn segment_table(&self) -> Result<Rc<LazyArray<Segment>>> {
        let len = self.num_segments()?;
        self.segments.get_or_try_init(|| Ok(Rc::new(LazyArray::new(len))))
    }

    fn decode_section(&self, n: usize) -> Result<Section> {
        let ehdr = self.header()?;
        let offset = ehdr.e_shoff + n as u64 * u64::from(ehdr.e_shentsize);
        let mut buf = vec![0u8; Shdr::size_of(self.class)];
        self.read_exact(offset, &mut buf)?;
        let shdr = Shdr::parse(&buf, self.class, self.endian);
        #[cfg(feature = "log")]
        log::trace!("decoded section {n}: type={:#x}", shdr.sh_type);
        Ok(Section::new(n, shdr, self.class))
    }

    fn decode_segment(&self, n: usize) -> Result<Segment> {
        let ehdr = self.header()?;
        let offset = ehdr.e_phoff + n as u64 * u64::from(ehdr.e_phentsize);
        let mut buf = vec![0u8; Phdr::size_of(self.class)];
        self.read_exact(offset, &mut buf)?;
        let phdr = Phdr::parse(&buf, self.class, self.endian);
        #[cfg(feature = "log")]
        log::trace!("decoded segment {n}: type={:#x}", phdr.p_type);
        Ok(Segment::new(n, phdr))
    }
}
