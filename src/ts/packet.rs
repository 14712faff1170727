use crate::error::{Result, ResultExt, TsError};
use crate::ts::clock::{
    parse_pcr, parse_pts_or_dts, write_pcr, write_pts_or_dts, ClockReference, PCR_BYTES_SIZE,
    PTS_OR_DTS_BYTE_LENGTH,
};
use crate::utils::{BitWriter, ByteReader};
use bytes::Bytes;
use std::io;

/// First byte of every transport packet
pub const SYNC_BYTE: u8 = 0x47;
/// Size of a Transport Stream packet in bytes
pub const PACKET_SIZE: usize = 188;
/// Size of the packet header after the sync byte, in bytes
const PACKET_HEADER_SIZE: usize = 3;

/// Payload scrambling mode carried in the 2-bit
/// transport_scrambling_control field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScramblingControl {
    /// Payload is not scrambled
    #[default]
    NotScrambled,
    /// Reserved for future use
    Reserved,
    /// Scrambled with the even key
    EvenKey,
    /// Scrambled with the odd key
    OddKey,
}

impl ScramblingControl {
    /// Decodes the 2-bit field value
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => ScramblingControl::NotScrambled,
            1 => ScramblingControl::Reserved,
            2 => ScramblingControl::EvenKey,
            _ => ScramblingControl::OddKey,
        }
    }

    /// Encodes back to the 2-bit field value
    pub fn bits(self) -> u8 {
        match self {
            ScramblingControl::NotScrambled => 0,
            ScramblingControl::Reserved => 1,
            ScramblingControl::EvenKey => 2,
            ScramblingControl::OddKey => 3,
        }
    }
}

/// A 188-byte Transport Stream packet: header, optional adaptation field,
/// opaque payload.
///
/// Each packet is an independent framing unit; no state is kept between
/// packets and continuity-counter monotonicity is a stream-level concern
/// left to callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Packet {
    /// The 3-byte packet header following the sync byte
    pub header: PacketHeader,
    /// Adaptation field, present when the header flags it
    pub adaptation_field: Option<AdaptationField>,
    /// Payload content only (no header bytes)
    pub payload: Bytes,
}

impl Packet {
    /// Creates a packet with the given header and no payload
    pub fn new(header: PacketHeader) -> Self {
        Self {
            header,
            adaptation_field: None,
            payload: Bytes::new(),
        }
    }

    /// Attaches an adaptation field and sets the header flag
    pub fn with_adaptation_field(mut self, af: AdaptationField) -> Self {
        self.header.has_adaptation_field = true;
        self.adaptation_field = Some(af);
        self
    }

    /// Attaches a payload and sets the header flag
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.header.has_payload = true;
        self.payload = payload.into();
        self
    }
}

/// The fixed 3-byte packet header following the sync byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    /// Set when a demodulator could not correct errors in this packet
    pub transport_error: bool,
    /// Set when a PES packet or PSI section begins in this packet's payload
    pub payload_unit_start: bool,
    /// Set when this packet has priority over others with the same PID
    pub transport_priority: bool,
    /// Packet Identifier (13-bit), naming the sub-stream this packet
    /// belongs to
    pub pid: u16,
    /// Payload scrambling mode
    pub scrambling_control: ScramblingControl,
    /// Set when an adaptation field follows the header
    pub has_adaptation_field: bool,
    /// Set when a payload follows the adaptation field
    pub has_payload: bool,
    /// Sequence number (0..=15, wrapping) of payload-carrying packets
    /// within this PID
    pub continuity_counter: u8,
}

impl Default for PacketHeader {
    fn default() -> Self {
        Self {
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: ScramblingControl::NotScrambled,
            has_adaptation_field: false,
            has_payload: true,
            continuity_counter: 0,
        }
    }
}

impl PacketHeader {
    /// Parses the 3 header bytes following the sync byte
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let bs = r.next_bytes_nocopy(PACKET_HEADER_SIZE)?;
        Ok(PacketHeader {
            transport_error: bs[0] & 0x80 > 0,
            payload_unit_start: bs[0] & 0x40 > 0,
            transport_priority: bs[0] & 0x20 > 0,
            pid: u16::from(bs[0] & 0x1F) << 8 | u16::from(bs[1]),
            scrambling_control: ScramblingControl::from_bits(bs[2] >> 6),
            has_adaptation_field: bs[2] & 0x20 > 0,
            has_payload: bs[2] & 0x10 > 0,
            continuity_counter: bs[2] & 0xF,
        })
    }

    /// Serializes the 3 header bytes; returns the byte count
    pub fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<usize> {
        w.write_bit(self.transport_error);
        w.write_bit(self.payload_unit_start);
        w.write_bit(self.transport_priority);
        w.write_bits(u64::from(self.pid), 13);
        w.write_bits(u64::from(self.scrambling_control.bits()), 2);
        w.write_bit(self.has_adaptation_field); // adaptation_field_control high bit
        w.write_bit(self.has_payload); // adaptation_field_control low bit
        w.write_bits(u64::from(self.continuity_counter), 4);
        w.status()?;
        Ok(PACKET_HEADER_SIZE)
    }
}

/// The optional variable-length adaptation field.
///
/// `length` holds the wire value on parse; serialization recomputes it
/// from the populated fields plus `stuffing_length`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdaptationField {
    /// Field length as declared on the wire (bytes after the length byte)
    pub length: usize,
    /// Set when this packet is in a discontinuity state
    pub discontinuity: bool,
    /// Set when the stream may be decoded without errors from this point
    pub random_access: bool,
    /// Set when this elementary stream is high priority
    pub es_priority: bool,
    /// Program Clock Reference
    pub pcr: Option<ClockReference>,
    /// Original Program Clock Reference, kept when one TS is copied into
    /// another
    pub opcr: Option<ClockReference>,
    /// Packets until a splicing point (two's complement; may be negative)
    pub splice_countdown: Option<i8>,
    /// Transport private data bytes
    pub transport_private_data: Option<Vec<u8>>,
    /// Adaptation extension field
    pub extension: Option<AdaptationExtension>,
    /// Count of trailing 0xFF stuffing bytes inside the field
    pub stuffing_length: usize,
    /// When set, the whole field serializes as the single byte 0x00 with
    /// no flag byte. Not part of the TS format itself
    pub is_one_byte_stuffing: bool,
}

impl AdaptationField {
    /// Builds an adaptation field that is nothing but stuffing, sized to
    /// fill exactly `bytes_to_stuff` bytes on the wire
    pub fn stuffing(bytes_to_stuff: usize) -> Self {
        if bytes_to_stuff == 1 {
            return AdaptationField {
                is_one_byte_stuffing: true,
                ..Default::default()
            };
        }
        AdaptationField {
            // one byte for the length and one for the flags
            stuffing_length: bytes_to_stuff.saturating_sub(2),
            ..Default::default()
        }
    }

    /// Parses an adaptation field starting at its length byte
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let mut a = AdaptationField {
            length: usize::from(r.next_byte()?),
            ..Default::default()
        };

        let start_offset = r.offset();

        if a.length > 0 {
            let flags = r.next_byte()?;
            a.discontinuity = flags & 0x80 > 0;
            a.random_access = flags & 0x40 > 0;
            a.es_priority = flags & 0x20 > 0;
            let has_pcr = flags & 0x10 > 0;
            let has_opcr = flags & 0x08 > 0;
            let has_splice_countdown = flags & 0x04 > 0;
            let has_transport_private_data = flags & 0x02 > 0;
            let has_extension = flags & 0x01 > 0;

            if has_pcr {
                a.pcr = Some(parse_pcr(r).context("PCR")?);
            }

            if has_opcr {
                a.opcr = Some(parse_pcr(r).context("OPCR")?);
            }

            if has_splice_countdown {
                a.splice_countdown = Some(r.next_byte()? as i8);
            }

            if has_transport_private_data {
                let private_data_length = usize::from(r.next_byte()?);
                a.transport_private_data = Some(r.next_bytes(private_data_length)?);
            }

            if has_extension {
                a.extension = Some(AdaptationExtension::parse(r).context("adaptation extension")?);
            }
        }

        // Whatever the declared length covers beyond the parsed fields is
        // trailing 0xFF stuffing; it is not consumed here, the payload seek
        // jumps over it.
        a.stuffing_length = a.length.saturating_sub(r.offset() - start_offset);

        Ok(a)
    }

    /// Computes the value of the length byte: flags plus every populated
    /// sub-field plus the requested stuffing
    pub fn calc_length(&self) -> usize {
        let mut length = 1;
        if self.pcr.is_some() {
            length += PCR_BYTES_SIZE;
        }
        if self.opcr.is_some() {
            length += PCR_BYTES_SIZE;
        }
        if self.splice_countdown.is_some() {
            length += 1;
        }
        if let Some(data) = &self.transport_private_data {
            length += 1 + data.len();
        }
        if let Some(ext) = &self.extension {
            length += 1 + ext.calc_length();
        }
        length + self.stuffing_length
    }

    /// Serializes the adaptation field; returns the byte count
    pub fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<usize> {
        if self.is_one_byte_stuffing {
            w.write_byte(0);
            w.status()?;
            return Ok(1);
        }

        let length = self.calc_length();
        w.write_byte(length as u8);
        let mut written = 1;

        w.write_bit(self.discontinuity);
        w.write_bit(self.random_access);
        w.write_bit(self.es_priority);
        w.write_bit(self.pcr.is_some());
        w.write_bit(self.opcr.is_some());
        w.write_bit(self.splice_countdown.is_some());
        w.write_bit(self.transport_private_data.is_some());
        w.write_bit(self.extension.is_some());
        written += 1;

        if let Some(pcr) = &self.pcr {
            written += write_pcr(w, pcr)?;
        }

        if let Some(opcr) = &self.opcr {
            written += write_pcr(w, opcr)?;
        }

        if let Some(countdown) = self.splice_countdown {
            w.write_byte(countdown as u8);
            written += 1;
        }

        if let Some(data) = &self.transport_private_data {
            w.write_byte(data.len() as u8);
            w.write_slice(data);
            written += 1 + data.len();
        }

        if let Some(ext) = &self.extension {
            written += ext.write_to(w)?;
        }

        for _ in 0..self.stuffing_length {
            w.write_byte(0xFF);
            written += 1;
        }

        w.status()?;
        Ok(written)
    }
}

/// The adaptation extension field nested at the end of an adaptation field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdaptationExtension {
    /// Extension length as declared on the wire
    pub length: usize,
    /// Legal time window, for rebroadcasters to reason about buffer state
    pub legal_time_window: Option<LegalTimeWindow>,
    /// Stream rate measured in 188-byte packets, defining the LTW end time
    /// (22-bit)
    pub piecewise_rate: Option<u32>,
    /// Seamless splice point parameters
    pub seamless_splice: Option<SeamlessSplice>,
}

/// Legal time window carried in the adaptation extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalTimeWindow {
    /// Whether the offset below is valid
    pub is_valid: bool,
    /// 15-bit offset
    pub offset: u16,
}

/// Seamless splice parameters carried in the adaptation extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeamlessSplice {
    /// Parameters of the H.262 splice (4-bit)
    pub splice_type: u8,
    /// PES DTS of the splice point, in PTS/DTS marker-bit layout
    pub dts_next_access_unit: ClockReference,
}

impl AdaptationExtension {
    /// Parses an adaptation extension starting at its length byte
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let mut ext = AdaptationExtension {
            length: usize::from(r.next_byte()?),
            ..Default::default()
        };

        if ext.length > 0 {
            let flags = r.next_byte()?;
            let has_legal_time_window = flags & 0x80 > 0;
            let has_piecewise_rate = flags & 0x40 > 0;
            let has_seamless_splice = flags & 0x20 > 0;

            if has_legal_time_window {
                let bs = r.next_bytes_nocopy(2)?;
                ext.legal_time_window = Some(LegalTimeWindow {
                    is_valid: bs[0] & 0x80 > 0,
                    offset: u16::from(bs[0] & 0x7F) << 8 | u16::from(bs[1]),
                });
            }

            if has_piecewise_rate {
                let bs = r.next_bytes_nocopy(3)?;
                ext.piecewise_rate = Some(
                    u32::from(bs[0] & 0x3F) << 16 | u32::from(bs[1]) << 8 | u32::from(bs[2]),
                );
            }

            if has_seamless_splice {
                let splice_type = r.next_byte()? >> 4;
                // The splice type nibble shares its byte with the start of
                // the DTS encoding; rewind so the DTS parser sees it too.
                r.skip(-1);
                ext.seamless_splice = Some(SeamlessSplice {
                    splice_type,
                    dts_next_access_unit: parse_pts_or_dts(r).context("DTS")?,
                });
            }
        }

        Ok(ext)
    }

    /// Computes the value of the extension length byte
    pub fn calc_length(&self) -> usize {
        let mut length = 1;
        if self.legal_time_window.is_some() {
            length += 2;
        }
        if self.piecewise_rate.is_some() {
            length += 3;
        }
        if self.seamless_splice.is_some() {
            length += PTS_OR_DTS_BYTE_LENGTH;
        }
        length
    }

    /// Serializes the adaptation extension; returns the byte count
    pub fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<usize> {
        let length = self.calc_length();
        w.write_byte(length as u8);
        let mut written = 1;

        w.write_bit(self.legal_time_window.is_some());
        w.write_bit(self.piecewise_rate.is_some());
        w.write_bit(self.seamless_splice.is_some());
        w.write_bits(0xFF, 5); // reserved
        written += 1;

        if let Some(ltw) = &self.legal_time_window {
            w.write_bit(ltw.is_valid);
            w.write_bits(u64::from(ltw.offset), 15);
            written += 2;
        }

        if let Some(rate) = self.piecewise_rate {
            w.write_bits(0xFF, 2);
            w.write_bits(u64::from(rate), 22);
            written += 3;
        }

        if let Some(splice) = &self.seamless_splice {
            written += write_pts_or_dts(w, splice.splice_type, &splice.dts_next_access_unit)?;
        }

        w.status()?;
        Ok(written)
    }
}

/// Predicate consulted by [`parse_packet`] after the header and adaptation
/// field are known; returning true short-circuits with the
/// [`TsError::SkippedPacket`] sentinel before the payload is copied
pub type PacketSkipper = dyn Fn(&Packet) -> bool;

/// Parses one 188-byte transport packet from the reader.
///
/// The reader is expected to hold one packet candidate; when the buffer is
/// larger than 188 bytes only the trailing 188 matter (the cursor is
/// re-seated right after the sync byte of that window). A candidate whose
/// first byte is not 0x47 fails with [`TsError::MissingSyncByte`] without
/// consuming further.
pub fn parse_packet(r: &mut ByteReader<'_>, skipper: Option<&PacketSkipper>) -> Result<Packet> {
    let b = r.next_byte().context("packet")?;
    if b != SYNC_BYTE {
        return Err(TsError::MissingSyncByte);
    }

    // In case the buffer is bigger than 188 bytes, the leading bytes don't
    // matter; re-seat right after the sync byte of the trailing window.
    r.seek((r.len() + 1).saturating_sub(PACKET_SIZE));
    let offset_start = r.offset();

    let header = PacketHeader::parse(r).context("packet header")?;

    let adaptation_field = if header.has_adaptation_field {
        Some(AdaptationField::parse(r).context("packet adaptation field")?)
    } else {
        None
    };

    let mut packet = Packet {
        header,
        adaptation_field,
        payload: Bytes::new(),
    };

    if let Some(skip) = skipper {
        if skip(&packet) {
            log::trace!("skipping packet with PID {}", packet.header.pid);
            return Err(TsError::SkippedPacket);
        }
    }

    if packet.header.has_payload {
        r.seek(payload_offset(
            offset_start,
            &packet.header,
            packet.adaptation_field.as_ref(),
        ));
        packet.payload = Bytes::copy_from_slice(r.dump());
    }

    Ok(packet)
}

fn payload_offset(offset_start: usize, h: &PacketHeader, af: Option<&AdaptationField>) -> usize {
    let mut offset = offset_start + PACKET_HEADER_SIZE;
    if h.has_adaptation_field {
        if let Some(af) = af {
            offset += 1 + af.length;
        }
    }
    offset
}

/// Serializes one transport packet, always producing exactly
/// `target_packet_size` bytes (0xFF padding after the payload).
///
/// Fails with [`TsError::PayloadOverflow`] when the payload cannot fit.
pub fn write_packet<W: io::Write>(
    w: &mut BitWriter<W>,
    p: &Packet,
    target_packet_size: usize,
) -> Result<usize> {
    w.write_byte(SYNC_BYTE);
    let mut written = 1;

    written += p.header.write_to(w)?;

    if p.header.has_adaptation_field {
        let af = p.adaptation_field.as_ref().ok_or_else(|| {
            TsError::InvalidData("adaptation field flagged but not present".to_string())
        })?;
        written += af.write_to(w)?;
    }

    let available = target_packet_size.saturating_sub(written);
    if available < p.payload.len() {
        return Err(TsError::PayloadOverflow {
            payload: p.payload.len(),
            available,
        });
    }

    if p.header.has_payload {
        w.write_slice(&p.payload);
        written += p.payload.len();
    }

    while written < target_packet_size {
        w.write_byte(0xFF);
        written += 1;
    }

    w.status()?;
    Ok(written)
}
