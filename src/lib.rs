#![doc(html_root_url = "https://docs.rs/tsio/0.1.0")]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsio - MPEG Transport Stream codec
//!
//! `tsio` is the bit-level core of an MPEG-2 Transport Stream toolchain:
//! a synchronous, allocation-light parser and serializer for the two
//! hardest wire formats in a TS pipeline, fixed 188-byte transport
//! packets and the PSI/SI descriptor family.
//!
//! ## Features
//!
//! ### Packet codec
//! - 188-byte framing with sync-byte validation and 0xFF stuffing
//! - Adaptation fields: PCR/OPCR, splice countdown, transport private
//!   data, adaptation extension (LTW, piecewise rate, seamless splice)
//! - Caller-supplied skip predicates for cheap PID filtering
//!
//! ### Descriptor codec
//! - Tag-dispatched parsing for the ETSI EN 300 468 descriptor catalog
//!   (AC-3, component, content, events, subtitling, teletext, VBI, ...)
//! - User-defined (0x80..=0xFE) and unknown-tag fallbacks that preserve
//!   content verbatim
//! - Declared-length framing: corrupted payloads never desynchronize the
//!   enclosing list
//! - Pure length computation for precomputing outer section sizes
//!
//! ### Primitives
//! - MSB-first bit writer with a latched error model, byte-cursor reader
//! - MPEG-2 CRC32 with a pass-through section writer
//! - 33+9-bit clock references, PTS/DTS wire layout, DVB MJD/BCD times
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tsio = "0.1.0"
//! ```
//!
//! ### Parsing a packet
//!
//! ```rust
//! use tsio::ts::{parse_packet, PACKET_SIZE};
//! use tsio::utils::ByteReader;
//!
//! # fn main() -> tsio::Result<()> {
//! let mut buf = vec![0xFF; PACKET_SIZE];
//! buf[0] = 0x47; // sync byte
//! buf[1] = 0x1F; // PID 0x1FFF (null packet)
//! buf[3] = 0x10; // payload only
//!
//! let mut r = ByteReader::new(&buf);
//! let packet = parse_packet(&mut r, None)?;
//! assert_eq!(packet.header.pid, 0x1FFF);
//! # Ok(())
//! # }
//! ```
//!
//! ### Round-tripping descriptors
//!
//! ```rust
//! use tsio::ts::descriptor::{DescriptorStreamIdentifier, DESCRIPTOR_TAG_STREAM_IDENTIFIER};
//! use tsio::ts::{parse_descriptors, write_descriptors_with_length, Descriptor, DescriptorData};
//! use tsio::utils::{BitWriter, ByteReader};
//!
//! # fn main() -> tsio::Result<()> {
//! let ds = vec![Descriptor::new(
//!     DESCRIPTOR_TAG_STREAM_IDENTIFIER,
//!     DescriptorData::StreamIdentifier(DescriptorStreamIdentifier { component_tag: 0xA7 }),
//! )];
//!
//! let mut out = Vec::new();
//! let mut w = BitWriter::new(&mut out);
//! write_descriptors_with_length(&mut w, &ds)?;
//!
//! let mut r = ByteReader::new(&out);
//! assert_eq!(parse_descriptors(&mut r)?, ds);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `ts`: the packet and descriptor codecs plus clock/DVB primitives
//! - `utils`: bit writer, byte reader, CRC32
//! - `error`: error types and the crate-wide `Result` alias

/// Error types and utilities
pub mod error;

/// Transport stream packet and descriptor codecs
pub mod ts;

/// Common utilities and helper functions
pub mod utils;

pub use error::{Result, TsError};
