//! ELF (Executable and Linkable Format) wire-format layer.
//!
//! This module holds the bit-exact record layouts of the System V ABI
//! (file header, section headers, program headers, symbols, dynamic
//! entries, notes and relocations) together with the constant tables for
//! their type codes. Records decode from explicit `(Class, Endian)` pairs;
//! the higher-level object model lives in the crate root modules.

pub mod abi;
mod defs;

pub use defs::{
    Class, Dyn, Ehdr, Endian, Nhdr, Phdr, Rel, SectionFlags, SegmentFlags, Shdr, Sym,
};
