//! # MPEG Transport Stream codec
//!
//! This module implements the bit-level core of an MPEG-2 Transport Stream
//! codec (ISO/IEC 13818-1 packets, ETSI EN 300 468 descriptors):
//!
//! - **Packet codec**: parse and serialize fixed 188-byte transport
//!   packets, including adaptation fields with PCR/OPCR, splice
//!   countdowns, private data and the adaptation extension
//! - **Descriptor codec**: tag-dispatched parse and serialize for the
//!   PSI/SI descriptor family, with user-defined and unknown fallbacks
//!   and 12-bit length-prefixed list framing
//! - **Clock primitives**: 33+9-bit clock references, PCR and PTS/DTS
//!   wire layouts
//! - **DVB time**: MJD/BCD wall-clock and duration encodings
//!
//! Higher-level concerns (PSI section assembly, PES packetization,
//! demuxing, I/O) live with the callers; this module only moves bits.
//!
//! ## Example
//!
//! ```rust
//! use tsio::ts::{parse_packet, write_packet, Packet, PacketHeader, PACKET_SIZE};
//! use tsio::utils::{BitWriter, ByteReader};
//!
//! # fn main() -> tsio::Result<()> {
//! let packet = Packet::new(PacketHeader {
//!     pid: 0x100,
//!     ..Default::default()
//! })
//! .with_payload(vec![0x00, 0x01, 0x02]);
//!
//! let mut out = Vec::new();
//! let mut w = BitWriter::new(&mut out);
//! write_packet(&mut w, &packet, PACKET_SIZE)?;
//! assert_eq!(out.len(), PACKET_SIZE);
//!
//! let mut r = ByteReader::new(&out);
//! let parsed = parse_packet(&mut r, None)?;
//! assert_eq!(parsed.header.pid, 0x100);
//! # Ok(())
//! # }
//! ```

/// Clock reference primitives (PCR, PTS/DTS)
pub mod clock;

/// DVB time and duration encodings
pub mod dvb;

/// Descriptor family codec
pub mod descriptor;

/// Transport packet codec
pub mod packet;

// Re-export the codec surface
pub use clock::{parse_pcr, parse_pts_or_dts, write_pcr, write_pts_or_dts, ClockReference};
pub use descriptor::{
    calc_descriptors_length, parse_descriptor, parse_descriptors, write_descriptor,
    write_descriptors, write_descriptors_with_length, Descriptor, DescriptorData,
};
pub use packet::{
    parse_packet, write_packet, AdaptationExtension, AdaptationField, LegalTimeWindow, Packet,
    PacketHeader, PacketSkipper, ScramblingControl, SeamlessSplice, PACKET_SIZE, SYNC_BYTE,
};
