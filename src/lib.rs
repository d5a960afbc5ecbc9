//! # elf_inspect
//!
//! **elf_inspect** reads the ELF binary container from a random-access byte
//! source and exposes its structural contents (file header, sections,
//! segments, symbols, relocations, dynamic tags and notes) through a
//! lazily evaluated, strongly typed object model, without loading the
//! whole file into memory.
//!
//! ## Core Features
//!
//! * **Lazy everywhere**: headers, sections, segments and the entities
//!   inside them are decoded on first access and cached; nothing is parsed
//!   twice and nothing is parsed that is never asked for.
//! * **Both widths, both endians**: ELF32 and ELF64 records under little
//!   or big endianness, decoded bit-exactly from explicit file offsets.
//! * **Typed dispatch**: a section or segment header turns into the right
//!   specialized view (string table, symbol table, relocation table,
//!   dynamic table, note table, interpreter, load segment) once, at
//!   construction.
//! * **Cross-referencing**: names resolve through string tables, symbols
//!   through symbol tables, and virtual addresses translate to file
//!   offsets through the program headers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use elf_inspect::{ElfFile, input::ElfStream};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let elf = ElfFile::open(ElfStream::open("/bin/cat")?)?;
//!
//!     println!("machine : {}", elf.machine_name()?);
//!     if let Some(build_id) = elf.build_id()? {
//!         println!("build id: {build_id}");
//!     }
//!     if let Some(section) = elf.section_by_name(".symtab")? {
//!         let symtab = section.symtab().expect("SYMTAB sections expose symbols");
//!         for symbol in symtab.symbols(&elf)? {
//!             println!("{}", symbol.name(&elf)?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
#![warn(
    clippy::unnecessary_wraps,
    clippy::unnecessary_lazy_evaluations,
    clippy::collapsible_if,
    clippy::cast_lossless,
    clippy::explicit_iter_loop,
    clippy::needless_question_mark,
    clippy::needless_return,
    clippy::redundant_clone,
    clippy::redundant_else,
    clippy::redundant_static_lifetimes
)]
#![allow(clippy::len_without_is_empty, clippy::unnecessary_cast)]

pub mod elf;
pub mod input;

mod dynamic;
mod error;
mod file;
mod lazy;
mod note;
mod relocation;
mod section;
mod segment;
mod symbol;

pub use dynamic::{DynamicTable, DynamicTag};
pub use elf::abi::TypeQuery;
pub use error::Error;
pub use file::ElfFile;
pub use lazy::LazyArray;
pub use note::{Note, NoteTable};
pub use relocation::{RelocTable, Relocation};
pub use section::{Section, SectionKind, StrTab};
pub use segment::{Segment, SegmentKind};
pub use symbol::{SymTab, Symbol, SymbolBind, SymbolType, SymbolVisibility};

/// A type alias for `Result`s returned by `elf_inspect` functions.
///
/// This is a convenience alias that eliminates the need to repeatedly
/// specify the `Error` type in function signatures.
pub type Result<T> = core::result::Result<T, Error>;
