//! Byte-source abstraction and data sources.
//!
//! This module provides the trait and implementations for reading ELF data
//! from diverse sources, such as files in a filesystem or byte buffers in
//! memory. Every read names an explicit file offset; no backend keeps an
//! ambient cursor that parsing code could accidentally rely on surviving
//! between calls.

pub use backend::{ElfBinary, ElfStream};
pub use traits::ElfReader;

mod backend;
mod traits;
