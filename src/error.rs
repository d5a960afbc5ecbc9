//! Error types for ELF parsing and lookups.

use thiserror::Error;

/// The error type returned by all fallible operations in this crate.
///
/// Errors fall into three groups:
/// * format errors raised while identifying a file (`BadMagic`, `BadClass`,
///   `BadEndian`),
/// * lookup errors raised when a by-type query names a constant that does
///   not exist (`UnknownConstantName`, `UnknownConstantValue`),
/// * stream errors (`Io`, `UnexpectedEof`).
///
/// Conditions a caller may reasonably tolerate, such as an index out of
/// range or a name that is never found, are reported as `Ok(None)` rather
/// than as errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The first four bytes of the stream are not `\x7fELF`.
    #[error("invalid ELF magic {found:02x?}")]
    BadMagic {
        /// The bytes actually found at offset 0.
        found: [u8; 4],
    },

    /// The `EI_CLASS` byte is neither 1 (32-bit) nor 2 (64-bit).
    #[error("invalid EI_CLASS byte {0:#04x}")]
    BadClass(u8),

    /// The `EI_DATA` byte is neither 1 (little endian) nor 2 (big endian).
    #[error("invalid EI_DATA byte {0:#04x}")]
    BadEndian(u8),

    /// A symbolic constant name passed to a by-type query does not exist
    /// in the queried domain.
    #[error("no {domain} constant named {name:?}")]
    UnknownConstantName {
        /// The constant domain, e.g. `"PT"` or `"DT"`.
        domain: &'static str,
        /// The fully prefixed name that was looked up, e.g. `"PT_OAO"`.
        name: String,
    },

    /// An integer constant passed to a by-type query does not exist in the
    /// queried domain.
    #[error("no {domain} constant is {value}")]
    UnknownConstantValue {
        /// The constant domain, e.g. `"PT"` or `"DT"`.
        domain: &'static str,
        /// The integer that was looked up.
        value: i64,
    },

    /// The stream ended in the middle of a fixed-size record.
    #[error("unexpected end of stream at offset {offset:#x}")]
    UnexpectedEof {
        /// The offset at which more bytes were expected.
        offset: u64,
    },

    /// An I/O error reported by the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
