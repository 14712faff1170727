//! # Utility Functions and Types
//!
//! This module provides the low-level building blocks used throughout the
//! tsio library:
//!
//! - Bit-level writing and byte-cursor reading
//! - MPEG-2 CRC32 calculation and a pass-through CRC writer
//!
//! ## Bit Writing
//!
//! ```rust
//! use tsio::utils::BitWriter;
//!
//! let mut out = Vec::new();
//! let mut w = BitWriter::new(&mut out);
//! w.write_bits(0x47, 8);
//! w.status().unwrap();
//! assert_eq!(out, [0x47]);
//! ```
//!
//! ## CRC Calculation
//!
//! ```rust
//! use tsio::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::new();
//! let checksum = crc.calculate(b"section body");
//! println!("CRC32: {:08x}", checksum);
//! ```

/// Bit-level writer and byte-cursor reader
pub mod bits;

/// CRC calculation implementations
pub mod crc;

// Re-export commonly used types
pub use bits::{BitWriter, ByteReader};
pub use crc::{Crc32Mpeg2, Crc32Writer};
