//! Error types for geometry decoding.

use thiserror::Error;

/// Errors raised while decoding well-known binary geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The buffer ended before the geometry was complete.
    #[error("unexpected end of WKB at byte {offset} ({needed} more bytes needed)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// The byte order marker was neither 0 nor 1.
    #[error("invalid byte order marker {0:#04x}")]
    InvalidByteOrder(u8),

    /// The geometry type code is not one of the seven simple feature types.
    #[error("unsupported WKB geometry type {0}")]
    UnsupportedType(u32),

    /// A multi-geometry contained a member of the wrong type.
    #[error("{found} is not allowed inside {container}")]
    InvalidMember {
        container: &'static str,
        found: &'static str,
    },

    /// A declared element count cannot fit in the remaining bytes.
    #[error("declared count {count} exceeds the {remaining} bytes left")]
    ImplausibleCount { count: u32, remaining: usize },

    /// Bytes were left over after a complete geometry.
    #[error("{0} trailing bytes after geometry")]
    TrailingBytes(usize),

    /// Collections were nested deeper than the decoder allows.
    #[error("geometry nesting deeper than {0} levels")]
    TooDeep(usize),
}
