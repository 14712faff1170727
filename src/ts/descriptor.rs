//! Tag-dispatched codec for the PSI/SI descriptor family
//! (ETSI EN 300 468 v1.15.1 and ISO/IEC 13818-1).
//!
//! Every descriptor travels as a `tag, length, payload` envelope. The
//! declared length names the byte span of the payload and always wins over
//! the inner structure: after a variant parser returns, the reader is
//! hard-seeked to the declared end, so a corrupted payload can never
//! desynchronize the enclosing list.

use crate::error::{Result, ResultExt, TsError};
use crate::ts::dvb::{
    parse_dvb_duration_minutes, parse_dvb_time, write_dvb_duration_minutes, write_dvb_time,
};
use crate::utils::{BitWriter, ByteReader};
use chrono::NaiveDateTime;
use std::io;
use std::time::Duration;

// Descriptor tags
// Chapter 6.1, ETSI EN 300 468 v1.15.1
/// AC-3 descriptor tag
pub const DESCRIPTOR_TAG_AC3: u8 = 0x6A;
/// AVC video descriptor tag
pub const DESCRIPTOR_TAG_AVC_VIDEO: u8 = 0x28;
/// Component descriptor tag
pub const DESCRIPTOR_TAG_COMPONENT: u8 = 0x50;
/// Content descriptor tag
pub const DESCRIPTOR_TAG_CONTENT: u8 = 0x54;
/// Data stream alignment descriptor tag
pub const DESCRIPTOR_TAG_DATA_STREAM_ALIGNMENT: u8 = 0x06;
/// Enhanced AC-3 descriptor tag
pub const DESCRIPTOR_TAG_ENHANCED_AC3: u8 = 0x7A;
/// Extended event descriptor tag
pub const DESCRIPTOR_TAG_EXTENDED_EVENT: u8 = 0x4E;
/// Extension descriptor tag
pub const DESCRIPTOR_TAG_EXTENSION: u8 = 0x7F;
/// ISO 639 language and audio type descriptor tag
pub const DESCRIPTOR_TAG_ISO639_LANGUAGE_AND_AUDIO_TYPE: u8 = 0x0A;
/// Local time offset descriptor tag
pub const DESCRIPTOR_TAG_LOCAL_TIME_OFFSET: u8 = 0x58;
/// Maximum bitrate descriptor tag
pub const DESCRIPTOR_TAG_MAXIMUM_BITRATE: u8 = 0x0E;
/// Network name descriptor tag
pub const DESCRIPTOR_TAG_NETWORK_NAME: u8 = 0x40;
/// Parental rating descriptor tag
pub const DESCRIPTOR_TAG_PARENTAL_RATING: u8 = 0x55;
/// Private data indicator descriptor tag
pub const DESCRIPTOR_TAG_PRIVATE_DATA_INDICATOR: u8 = 0x0F;
/// Private data specifier descriptor tag
pub const DESCRIPTOR_TAG_PRIVATE_DATA_SPECIFIER: u8 = 0x5F;
/// Registration descriptor tag
pub const DESCRIPTOR_TAG_REGISTRATION: u8 = 0x05;
/// Service descriptor tag
pub const DESCRIPTOR_TAG_SERVICE: u8 = 0x48;
/// Short event descriptor tag
pub const DESCRIPTOR_TAG_SHORT_EVENT: u8 = 0x4D;
/// Stream identifier descriptor tag
pub const DESCRIPTOR_TAG_STREAM_IDENTIFIER: u8 = 0x52;
/// Subtitling descriptor tag
pub const DESCRIPTOR_TAG_SUBTITLING: u8 = 0x59;
/// Teletext descriptor tag
pub const DESCRIPTOR_TAG_TELETEXT: u8 = 0x56;
/// VBI data descriptor tag
pub const DESCRIPTOR_TAG_VBI_DATA: u8 = 0x45;
/// VBI teletext descriptor tag
pub const DESCRIPTOR_TAG_VBI_TELETEXT: u8 = 0x46;

// Descriptor extension tags
// Chapter 6.3, ETSI EN 300 468 v1.15.1
/// Supplementary audio extension descriptor tag
pub const DESCRIPTOR_TAG_EXTENSION_SUPPLEMENTARY_AUDIO: u8 = 0x06;

// Audio types
/// Clean effects audio type
pub const AUDIO_TYPE_CLEAN_EFFECTS: u8 = 0x1;
/// Hearing impaired audio type
pub const AUDIO_TYPE_HEARING_IMPAIRED: u8 = 0x2;
/// Visual impaired commentary audio type
pub const AUDIO_TYPE_VISUAL_IMPAIRED_COMMENTARY: u8 = 0x3;

// Data stream alignments
// Chapter 2.6.11, ISO/IEC 13818-1
/// Audio sync word alignment
pub const DATA_STREAM_ALIGNMENT_AUDIO_SYNC_WORD: u8 = 0x1;
/// Video slice or access unit alignment
pub const DATA_STREAM_ALIGNMENT_VIDEO_SLICE_OR_ACCESS_UNIT: u8 = 0x1;
/// Video access unit alignment
pub const DATA_STREAM_ALIGNMENT_VIDEO_ACCESS_UNIT: u8 = 0x2;
/// Video GOP or SEQ alignment
pub const DATA_STREAM_ALIGNMENT_VIDEO_GOP_OR_SEQ: u8 = 0x3;
/// Video SEQ alignment
pub const DATA_STREAM_ALIGNMENT_VIDEO_SEQ: u8 = 0x4;

// Service types
// Chapter 6.2.33, ETSI EN 300 468 v1.15.1
/// Digital television service
pub const SERVICE_TYPE_DIGITAL_TELEVISION_SERVICE: u8 = 0x1;

// Teletext types
// Chapter 6.2.43, ETSI EN 300 468 v1.15.1
/// Initial teletext page
pub const TELETEXT_TYPE_INITIAL_TELETEXT_PAGE: u8 = 0x1;
/// Teletext subtitle page
pub const TELETEXT_TYPE_TELETEXT_SUBTITLE_PAGE: u8 = 0x2;
/// Additional information page
pub const TELETEXT_TYPE_ADDITIONAL_INFORMATION_PAGE: u8 = 0x3;
/// Program schedule page
pub const TELETEXT_TYPE_PROGRAM_SCHEDULE_PAGE: u8 = 0x4;
/// Teletext subtitle page for hearing impaired people
pub const TELETEXT_TYPE_TELETEXT_SUBTITLE_PAGE_FOR_HEARING_IMPAIRED: u8 = 0x5;

// VBI data service ids
// Chapter 6.2.47, ETSI EN 300 468 v1.15.1
/// EBU teletext VBI service
pub const VBI_DATA_SERVICE_ID_EBU_TELETEXT: u8 = 0x1;
/// Inverted teletext VBI service
pub const VBI_DATA_SERVICE_ID_INVERTED_TELETEXT: u8 = 0x2;
/// VPS VBI service
pub const VBI_DATA_SERVICE_ID_VPS: u8 = 0x4;
/// WSS VBI service
pub const VBI_DATA_SERVICE_ID_WSS: u8 = 0x5;
/// Closed captioning VBI service
pub const VBI_DATA_SERVICE_ID_CLOSED_CAPTIONING: u8 = 0x6;
/// Monochrome 4:2:2 samples VBI service
pub const VBI_DATA_SERVICE_ID_MONOCHROME_442_SAMPLES: u8 = 0x7;

/// A descriptor as carried in PSI/SI tables: tag, declared length, payload.
///
/// `length` is the wire value observed on parse; serialization always emits
/// the computed [`Descriptor::calc_length`] instead, so a freshly built
/// descriptor and its re-parsed image compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Wire tag; defines the payload structure
    pub tag: u8,
    /// Payload byte span as declared on the wire
    pub length: u8,
    /// Decoded payload
    pub data: DescriptorData,
}

impl Descriptor {
    /// Builds a descriptor with a computed length field
    pub fn new(tag: u8, data: DescriptorData) -> Self {
        let length = data.calc_length() as u8;
        Self { tag, length, data }
    }

    /// Computes the payload length this descriptor serializes to
    pub fn calc_length(&self) -> u8 {
        self.data.calc_length() as u8
    }
}

/// Decoded descriptor payload, one variant per recognized tag plus the
/// user-defined (tags 0x80..=0xFE) and unknown fallbacks.
///
/// For the fallback variants the original tag lives in the enclosing
/// [`Descriptor::tag`]; their content round-trips byte-exactly.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum DescriptorData {
    /// AC-3 descriptor (0x6A)
    AC3(DescriptorAC3),
    /// AVC video descriptor (0x28)
    AVCVideo(DescriptorAVCVideo),
    /// Component descriptor (0x50)
    Component(DescriptorComponent),
    /// Content descriptor (0x54)
    Content(DescriptorContent),
    /// Data stream alignment descriptor (0x06)
    DataStreamAlignment(DescriptorDataStreamAlignment),
    /// Enhanced AC-3 descriptor (0x7A)
    EnhancedAC3(DescriptorEnhancedAC3),
    /// Extended event descriptor (0x4E)
    ExtendedEvent(DescriptorExtendedEvent),
    /// Extension descriptor (0x7F)
    Extension(DescriptorExtension),
    /// ISO 639 language and audio type descriptor (0x0A)
    ISO639LanguageAndAudioType(DescriptorISO639LanguageAndAudioType),
    /// Local time offset descriptor (0x58)
    LocalTimeOffset(DescriptorLocalTimeOffset),
    /// Maximum bitrate descriptor (0x0E)
    MaximumBitrate(DescriptorMaximumBitrate),
    /// Network name descriptor (0x40)
    NetworkName(DescriptorNetworkName),
    /// Parental rating descriptor (0x55)
    ParentalRating(DescriptorParentalRating),
    /// Private data indicator descriptor (0x0F)
    PrivateDataIndicator(DescriptorPrivateDataIndicator),
    /// Private data specifier descriptor (0x5F)
    PrivateDataSpecifier(DescriptorPrivateDataSpecifier),
    /// Registration descriptor (0x05)
    Registration(DescriptorRegistration),
    /// Service descriptor (0x48)
    Service(DescriptorService),
    /// Short event descriptor (0x4D)
    ShortEvent(DescriptorShortEvent),
    /// Stream identifier descriptor (0x52)
    StreamIdentifier(DescriptorStreamIdentifier),
    /// Subtitling descriptor (0x59)
    Subtitling(DescriptorSubtitling),
    /// Teletext descriptor (0x56)
    Teletext(DescriptorTeletext),
    /// VBI data descriptor (0x45)
    VBIData(DescriptorVBIData),
    /// VBI teletext descriptor (0x46); same shape as teletext
    VBITeletext(DescriptorTeletext),
    /// User-defined blob, tags 0x80..=0xFE
    UserDefined(Vec<u8>),
    /// Unrecognized tag, content captured verbatim
    Unknown(Vec<u8>),
}

fn read_code3(r: &mut ByteReader<'_>) -> Result<[u8; 3]> {
    let bs = r.next_bytes_nocopy(3)?;
    Ok([bs[0], bs[1], bs[2]])
}

/// AC-3 descriptor
/// Annex D, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorAC3 {
    /// Component type byte
    pub component_type: Option<u8>,
    /// Bit stream identification
    pub bsid: Option<u8>,
    /// Main audio service id
    pub main_id: Option<u8>,
    /// Associated service id
    pub asvc: Option<u8>,
    /// Trailing additional info bytes
    pub additional_info: Vec<u8>,
}

impl DescriptorAC3 {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let flags = r.next_byte()?;
        let mut d = DescriptorAC3::default();

        if flags & 0x80 > 0 {
            d.component_type = Some(r.next_byte()?);
        }
        if flags & 0x40 > 0 {
            d.bsid = Some(r.next_byte()?);
        }
        if flags & 0x20 > 0 {
            d.main_id = Some(r.next_byte()?);
        }
        if flags & 0x10 > 0 {
            d.asvc = Some(r.next_byte()?);
        }
        if r.offset() < offset_end {
            d.additional_info = r.next_bytes(offset_end - r.offset())?;
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        1 + usize::from(self.component_type.is_some())
            + usize::from(self.bsid.is_some())
            + usize::from(self.main_id.is_some())
            + usize::from(self.asvc.is_some())
            + self.additional_info.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_bit(self.component_type.is_some());
        w.write_bit(self.bsid.is_some());
        w.write_bit(self.main_id.is_some());
        w.write_bit(self.asvc.is_some());
        w.write_bits(0xFF, 4);

        for field in [self.component_type, self.bsid, self.main_id, self.asvc]
            .into_iter()
            .flatten()
        {
            w.write_byte(field);
        }
        w.write_slice(&self.additional_info);
        w.status()
    }
}

/// AVC video descriptor (ISO/IEC 13818-1)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorAVCVideo {
    /// AVC profile indication
    pub profile_idc: u8,
    /// constraint_set0_flag
    pub constraint_set0: bool,
    /// constraint_set1_flag
    pub constraint_set1: bool,
    /// constraint_set2_flag
    pub constraint_set2: bool,
    /// Remaining compatibility flags (5-bit)
    pub compatible_flags: u8,
    /// AVC level indication
    pub level_idc: u8,
    /// Set when AVC still pictures may be present
    pub avc_still_present: bool,
    /// Set when 24-hour pictures may be present
    pub avc_24_hour_picture: bool,
}

impl DescriptorAVCVideo {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let mut d = DescriptorAVCVideo {
            profile_idc: r.next_byte()?,
            ..Default::default()
        };

        let b = r.next_byte()?;
        d.constraint_set0 = b & 0x80 > 0;
        d.constraint_set1 = b & 0x40 > 0;
        d.constraint_set2 = b & 0x20 > 0;
        d.compatible_flags = b & 0x1F;

        d.level_idc = r.next_byte()?;

        let b = r.next_byte()?;
        d.avc_still_present = b & 0x80 > 0;
        d.avc_24_hour_picture = b & 0x40 > 0;
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        4
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_byte(self.profile_idc);

        w.write_bit(self.constraint_set0);
        w.write_bit(self.constraint_set1);
        w.write_bit(self.constraint_set2);
        w.write_bits(u64::from(self.compatible_flags), 5);

        w.write_byte(self.level_idc);

        w.write_bit(self.avc_still_present);
        w.write_bit(self.avc_24_hour_picture);
        w.write_bits(0xFF, 6);
        w.status()
    }
}

/// Component descriptor
/// Chapter 6.2.8, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorComponent {
    /// Stream content extension nibble
    pub stream_content_ext: u8,
    /// Stream content nibble
    pub stream_content: u8,
    /// Component type
    pub component_type: u8,
    /// Component tag
    pub component_tag: u8,
    /// ISO 639 language code
    pub iso639_language_code: [u8; 3],
    /// Text description
    pub text: Vec<u8>,
}

impl DescriptorComponent {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let b = r.next_byte()?;
        let stream_content_ext = b >> 4;
        let stream_content = b & 0xF;
        let component_type = r.next_byte()?;
        let component_tag = r.next_byte()?;
        let iso639_language_code = read_code3(r)?;
        let text = if r.offset() < offset_end {
            r.next_bytes(offset_end - r.offset())?
        } else {
            Vec::new()
        };
        Ok(DescriptorComponent {
            stream_content_ext,
            stream_content,
            component_type,
            component_tag,
            iso639_language_code,
            text,
        })
    }

    fn calc_length(&self) -> usize {
        6 + self.text.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_bits(u64::from(self.stream_content_ext), 4);
        w.write_bits(u64::from(self.stream_content), 4);
        w.write_byte(self.component_type);
        w.write_byte(self.component_tag);
        w.write_slice(&self.iso639_language_code);
        w.write_slice(&self.text);
        w.status()
    }
}

/// Content descriptor
/// Chapter 6.2.9, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorContent {
    /// Content classification items
    pub items: Vec<DescriptorContentItem>,
}

/// One content classification item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorContentItem {
    /// First-level content nibble
    pub content_nibble_level_1: u8,
    /// Second-level content nibble
    pub content_nibble_level_2: u8,
    /// Broadcaster-defined byte
    pub user_byte: u8,
}

impl DescriptorContent {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let mut d = DescriptorContent::default();
        while r.offset() < offset_end {
            let bs = r.next_bytes_nocopy(2)?;
            d.items.push(DescriptorContentItem {
                content_nibble_level_1: bs[0] >> 4,
                content_nibble_level_2: bs[0] & 0xF,
                user_byte: bs[1],
            });
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        2 * self.items.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        for item in &self.items {
            w.write_bits(u64::from(item.content_nibble_level_1), 4);
            w.write_bits(u64::from(item.content_nibble_level_2), 4);
            w.write_byte(item.user_byte);
        }
        w.status()
    }
}

/// Data stream alignment descriptor (ISO/IEC 13818-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorDataStreamAlignment {
    /// Alignment type code
    pub alignment_type: u8,
}

impl DescriptorDataStreamAlignment {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(DescriptorDataStreamAlignment {
            alignment_type: r.next_byte()?,
        })
    }

    fn calc_length(&self) -> usize {
        1
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_byte(self.alignment_type);
        w.status()
    }
}

/// Enhanced AC-3 descriptor
/// Annex D, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorEnhancedAC3 {
    /// Component type byte
    pub component_type: Option<u8>,
    /// Bit stream identification
    pub bsid: Option<u8>,
    /// Main audio service id
    pub main_id: Option<u8>,
    /// Associated service id
    pub asvc: Option<u8>,
    /// Set when mixing metadata is carried in the stream
    pub mix_info_exists: bool,
    /// First independent substream type
    pub substream1: Option<u8>,
    /// Second independent substream type
    pub substream2: Option<u8>,
    /// Third independent substream type
    pub substream3: Option<u8>,
    /// Trailing additional info bytes
    pub additional_info: Vec<u8>,
}

impl DescriptorEnhancedAC3 {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let flags = r.next_byte()?;
        let mut d = DescriptorEnhancedAC3 {
            mix_info_exists: flags & 0x08 > 0,
            ..Default::default()
        };

        if flags & 0x80 > 0 {
            d.component_type = Some(r.next_byte()?);
        }
        if flags & 0x40 > 0 {
            d.bsid = Some(r.next_byte()?);
        }
        if flags & 0x20 > 0 {
            d.main_id = Some(r.next_byte()?);
        }
        if flags & 0x10 > 0 {
            d.asvc = Some(r.next_byte()?);
        }
        if flags & 0x04 > 0 {
            d.substream1 = Some(r.next_byte()?);
        }
        if flags & 0x02 > 0 {
            d.substream2 = Some(r.next_byte()?);
        }
        if flags & 0x01 > 0 {
            d.substream3 = Some(r.next_byte()?);
        }
        if r.offset() < offset_end {
            d.additional_info = r.next_bytes(offset_end - r.offset())?;
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        1 + usize::from(self.component_type.is_some())
            + usize::from(self.bsid.is_some())
            + usize::from(self.main_id.is_some())
            + usize::from(self.asvc.is_some())
            + usize::from(self.substream1.is_some())
            + usize::from(self.substream2.is_some())
            + usize::from(self.substream3.is_some())
            + self.additional_info.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_bit(self.component_type.is_some());
        w.write_bit(self.bsid.is_some());
        w.write_bit(self.main_id.is_some());
        w.write_bit(self.asvc.is_some());
        w.write_bit(self.mix_info_exists);
        w.write_bit(self.substream1.is_some());
        w.write_bit(self.substream2.is_some());
        w.write_bit(self.substream3.is_some());

        for field in [
            self.component_type,
            self.bsid,
            self.main_id,
            self.asvc,
            self.substream1,
            self.substream2,
            self.substream3,
        ]
        .into_iter()
        .flatten()
        {
            w.write_byte(field);
        }
        w.write_slice(&self.additional_info);
        w.status()
    }
}

/// Extended event descriptor
/// Chapter 6.2.15, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorExtendedEvent {
    /// Number of this descriptor within the chain (4-bit)
    pub number: u8,
    /// Number of the last descriptor in the chain (4-bit)
    pub last_descriptor_number: u8,
    /// ISO 639 language code
    pub iso639_language_code: [u8; 3],
    /// Itemized event information
    pub items: Vec<DescriptorExtendedEventItem>,
    /// Free-form event text
    pub text: Vec<u8>,
}

/// One itemized entry of an extended event descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorExtendedEventItem {
    /// Item description
    pub description: Vec<u8>,
    /// Item content
    pub content: Vec<u8>,
}

impl DescriptorExtendedEventItem {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let description_length = usize::from(r.next_byte()?);
        let description = r.next_bytes(description_length)?;
        let content_length = usize::from(r.next_byte()?);
        let content = r.next_bytes(content_length)?;
        Ok(DescriptorExtendedEventItem {
            description,
            content,
        })
    }
}

impl DescriptorExtendedEvent {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let b = r.next_byte()?;
        let mut d = DescriptorExtendedEvent {
            number: b >> 4,
            last_descriptor_number: b & 0xF,
            iso639_language_code: read_code3(r)?,
            ..Default::default()
        };

        let items_length = usize::from(r.next_byte()?);
        let offset_end = r.offset() + items_length;
        while r.offset() < offset_end {
            d.items
                .push(DescriptorExtendedEventItem::parse(r).context("extended event item")?);
        }

        let text_length = usize::from(r.next_byte()?);
        d.text = r.next_bytes(text_length)?;
        Ok(d)
    }

    fn items_length(&self) -> usize {
        self.items
            .iter()
            .map(|item| 2 + item.description.len() + item.content.len())
            .sum()
    }

    fn calc_length(&self) -> usize {
        // numbers byte, language, items length byte, items, text length
        // byte, text
        1 + 3 + 1 + self.items_length() + 1 + self.text.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_bits(u64::from(self.number), 4);
        w.write_bits(u64::from(self.last_descriptor_number), 4);
        w.write_slice(&self.iso639_language_code);

        w.write_byte(self.items_length() as u8);
        for item in &self.items {
            w.write_byte(item.description.len() as u8);
            w.write_slice(&item.description);
            w.write_byte(item.content.len() as u8);
            w.write_slice(&item.content);
        }

        w.write_byte(self.text.len() as u8);
        w.write_slice(&self.text);
        w.status()
    }
}

/// Extension descriptor
/// Chapter 6.2.16, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorExtension {
    /// Extension tag, defining the nested payload structure
    pub tag: u8,
    /// Nested payload
    pub data: DescriptorExtensionData,
}

/// Decoded extension descriptor payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorExtensionData {
    /// Supplementary audio descriptor (extension tag 0x06)
    SupplementaryAudio(DescriptorExtensionSupplementaryAudio),
    /// Unrecognized extension tag, content captured verbatim
    Unknown(Vec<u8>),
}

impl DescriptorExtension {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let tag = r.next_byte()?;
        let data = match tag {
            DESCRIPTOR_TAG_EXTENSION_SUPPLEMENTARY_AUDIO => {
                DescriptorExtensionData::SupplementaryAudio(
                    DescriptorExtensionSupplementaryAudio::parse(r, offset_end)
                        .context("extension supplementary audio descriptor")?,
                )
            }
            _ => {
                let remaining = offset_end.saturating_sub(r.offset());
                DescriptorExtensionData::Unknown(r.next_bytes(remaining)?)
            }
        };
        Ok(DescriptorExtension { tag, data })
    }

    fn calc_length(&self) -> usize {
        1 + match &self.data {
            DescriptorExtensionData::SupplementaryAudio(d) => d.calc_length(),
            DescriptorExtensionData::Unknown(content) => content.len(),
        }
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_byte(self.tag);
        match &self.data {
            DescriptorExtensionData::SupplementaryAudio(d) => d.write_to(w)?,
            DescriptorExtensionData::Unknown(content) => w.write_slice(content),
        }
        w.status()
    }
}

/// Supplementary audio extension descriptor
/// Chapter 6.4.10, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorExtensionSupplementaryAudio {
    /// Set for a supplementary stream, unset for a self-contained mix
    pub mix_type: bool,
    /// Editorial classification (5-bit)
    pub editorial_classification: u8,
    /// ISO 639 language code, when signalled
    pub language_code: Option<[u8; 3]>,
    /// Trailing private bytes
    pub private_data: Vec<u8>,
}

impl DescriptorExtensionSupplementaryAudio {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let b = r.next_byte()?;
        let mut d = DescriptorExtensionSupplementaryAudio {
            mix_type: b & 0x80 > 0,
            editorial_classification: b >> 2 & 0x1F,
            ..Default::default()
        };
        if b & 0x1 > 0 {
            d.language_code = Some(read_code3(r)?);
        }
        if r.offset() < offset_end {
            d.private_data = r.next_bytes(offset_end - r.offset())?;
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        1 + if self.language_code.is_some() { 3 } else { 0 } + self.private_data.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_bit(self.mix_type);
        w.write_bits(u64::from(self.editorial_classification), 5);
        w.write_bit(true); // reserved
        w.write_bit(self.language_code.is_some());

        if let Some(code) = &self.language_code {
            w.write_slice(code);
        }
        w.write_slice(&self.private_data);
        w.status()
    }
}

/// ISO 639 language and audio type descriptor (ISO/IEC 13818-1)
///
/// Some real streams declare a 3-byte payload carrying only a 2-byte
/// language; whatever bytes arrived are preserved and round-trip verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorISO639LanguageAndAudioType {
    /// Language code bytes (ordinarily 3)
    pub language: Vec<u8>,
    /// Audio type
    pub audio_type: u8,
}

impl DescriptorISO639LanguageAndAudioType {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let bs = r.next_bytes(offset_end.saturating_sub(r.offset()))?;
        let (audio_type, language) = bs
            .split_last()
            .ok_or_else(|| TsError::InvalidData("empty ISO639 language payload".to_string()))?;
        Ok(DescriptorISO639LanguageAndAudioType {
            language: language.to_vec(),
            audio_type: *audio_type,
        })
    }

    fn calc_length(&self) -> usize {
        self.language.len() + 1
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_slice(&self.language);
        w.write_byte(self.audio_type);
        w.status()
    }
}

/// Local time offset descriptor
/// Chapter 6.2.20, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorLocalTimeOffset {
    /// Per-country offset items
    pub items: Vec<DescriptorLocalTimeOffsetItem>,
}

/// One local time offset item (13 bytes on the wire)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorLocalTimeOffsetItem {
    /// ISO 3166 country code
    pub country_code: [u8; 3],
    /// Country region id (6-bit)
    pub country_region_id: u8,
    /// Offset polarity; set means the offset is subtracted from UTC
    pub local_time_offset_polarity: bool,
    /// Current offset from UTC
    pub local_time_offset: Duration,
    /// When the next offset takes effect
    pub time_of_change: NaiveDateTime,
    /// Offset from UTC after the change
    pub next_time_offset: Duration,
}

impl DescriptorLocalTimeOffset {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let mut d = DescriptorLocalTimeOffset::default();
        while r.offset() < offset_end {
            let country_code = read_code3(r)?;
            let b = r.next_byte()?;
            d.items.push(DescriptorLocalTimeOffsetItem {
                country_code,
                country_region_id: b >> 2,
                local_time_offset_polarity: b & 0x1 > 0,
                local_time_offset: parse_dvb_duration_minutes(r).context("DVB duration minutes")?,
                time_of_change: parse_dvb_time(r).context("DVB time")?,
                next_time_offset: parse_dvb_duration_minutes(r).context("DVB duration minutes")?,
            });
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        13 * self.items.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        for item in &self.items {
            w.write_slice(&item.country_code);
            w.write_bits(u64::from(item.country_region_id), 6);
            w.write_bit(true); // reserved
            w.write_bit(item.local_time_offset_polarity);
            write_dvb_duration_minutes(w, &item.local_time_offset)?;
            write_dvb_time(w, &item.time_of_change)?;
            write_dvb_duration_minutes(w, &item.next_time_offset)?;
        }
        w.status()
    }
}

/// Maximum bitrate descriptor (ISO/IEC 13818-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorMaximumBitrate {
    /// Maximum bitrate in bytes per second; carried on the wire in units
    /// of 50 bytes/second
    pub bitrate: u32,
}

impl DescriptorMaximumBitrate {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let bs = r.next_bytes_nocopy(3)?;
        Ok(DescriptorMaximumBitrate {
            bitrate: (u32::from(bs[0] & 0x3F) << 16 | u32::from(bs[1]) << 8 | u32::from(bs[2]))
                * 50,
        })
    }

    fn calc_length(&self) -> usize {
        3
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_bits(0xFF, 2);
        w.write_bits(u64::from(self.bitrate / 50), 22);
        w.status()
    }
}

/// Network name descriptor
/// Chapter 6.2.27, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorNetworkName {
    /// Network name bytes
    pub name: Vec<u8>,
}

impl DescriptorNetworkName {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        Ok(DescriptorNetworkName {
            name: r.next_bytes(offset_end.saturating_sub(r.offset()))?,
        })
    }

    fn calc_length(&self) -> usize {
        self.name.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_slice(&self.name);
        w.status()
    }
}

/// Parental rating descriptor
/// Chapter 6.2.28, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorParentalRating {
    /// Per-country rating items
    pub items: Vec<DescriptorParentalRatingItem>,
}

/// One parental rating item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorParentalRatingItem {
    /// ISO 3166 country code
    pub country_code: [u8; 3],
    /// Encoded rating
    pub rating: u8,
}

impl DescriptorParentalRatingItem {
    /// Minimum recommended age in years, 0 for undefined or
    /// broadcaster-defined ratings
    pub fn minimum_age(&self) -> u8 {
        if self.rating == 0 || self.rating > 0x10 {
            return 0;
        }
        self.rating + 3
    }
}

impl DescriptorParentalRating {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let mut d = DescriptorParentalRating::default();
        while r.offset() < offset_end {
            let bs = r.next_bytes_nocopy(4)?;
            d.items.push(DescriptorParentalRatingItem {
                country_code: [bs[0], bs[1], bs[2]],
                rating: bs[3],
            });
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        4 * self.items.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        for item in &self.items {
            w.write_slice(&item.country_code);
            w.write_byte(item.rating);
        }
        w.status()
    }
}

/// Private data indicator descriptor (ISO/IEC 13818-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPrivateDataIndicator {
    /// Indicator value
    pub indicator: u32,
}

impl DescriptorPrivateDataIndicator {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let bs = r.next_bytes_nocopy(4)?;
        Ok(DescriptorPrivateDataIndicator {
            indicator: u32::from_be_bytes([bs[0], bs[1], bs[2], bs[3]]),
        })
    }

    fn calc_length(&self) -> usize {
        4
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_u32(self.indicator);
        w.status()
    }
}

/// Private data specifier descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPrivateDataSpecifier {
    /// Specifier value, assigned by the DVB project office
    pub specifier: u32,
}

impl DescriptorPrivateDataSpecifier {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let bs = r.next_bytes_nocopy(4)?;
        Ok(DescriptorPrivateDataSpecifier {
            specifier: u32::from_be_bytes([bs[0], bs[1], bs[2], bs[3]]),
        })
    }

    fn calc_length(&self) -> usize {
        4
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_u32(self.specifier);
        w.status()
    }
}

/// Registration descriptor (ISO/IEC 13818-1)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorRegistration {
    /// Format identifier assigned by the SMPTE registration authority
    pub format_identifier: u32,
    /// Trailing identification bytes
    pub additional_identification_info: Vec<u8>,
}

impl DescriptorRegistration {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let bs = r.next_bytes_nocopy(4)?;
        let format_identifier = u32::from_be_bytes([bs[0], bs[1], bs[2], bs[3]]);
        let additional_identification_info = if r.offset() < offset_end {
            r.next_bytes(offset_end - r.offset())?
        } else {
            Vec::new()
        };
        Ok(DescriptorRegistration {
            format_identifier,
            additional_identification_info,
        })
    }

    fn calc_length(&self) -> usize {
        4 + self.additional_identification_info.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_u32(self.format_identifier);
        w.write_slice(&self.additional_identification_info);
        w.status()
    }
}

/// Service descriptor
/// Chapter 6.2.33, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorService {
    /// Service type
    pub service_type: u8,
    /// Service provider name bytes
    pub provider: Vec<u8>,
    /// Service name bytes
    pub name: Vec<u8>,
}

impl DescriptorService {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let service_type = r.next_byte()?;
        let provider_length = usize::from(r.next_byte()?);
        let provider = r.next_bytes(provider_length)?;
        let name_length = usize::from(r.next_byte()?);
        let name = r.next_bytes(name_length)?;
        Ok(DescriptorService {
            service_type,
            provider,
            name,
        })
    }

    fn calc_length(&self) -> usize {
        3 + self.provider.len() + self.name.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_byte(self.service_type);
        w.write_byte(self.provider.len() as u8);
        w.write_slice(&self.provider);
        w.write_byte(self.name.len() as u8);
        w.write_slice(&self.name);
        w.status()
    }
}

/// Short event descriptor
/// Chapter 6.2.37, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorShortEvent {
    /// ISO 639 language code
    pub language: [u8; 3],
    /// Event name bytes
    pub event_name: Vec<u8>,
    /// Event text bytes
    pub text: Vec<u8>,
}

impl DescriptorShortEvent {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let language = read_code3(r)?;
        let event_length = usize::from(r.next_byte()?);
        let event_name = r.next_bytes(event_length)?;
        let text_length = usize::from(r.next_byte()?);
        let text = r.next_bytes(text_length)?;
        Ok(DescriptorShortEvent {
            language,
            event_name,
            text,
        })
    }

    fn calc_length(&self) -> usize {
        3 + 1 + self.event_name.len() + 1 + self.text.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_slice(&self.language);
        w.write_byte(self.event_name.len() as u8);
        w.write_slice(&self.event_name);
        w.write_byte(self.text.len() as u8);
        w.write_slice(&self.text);
        w.status()
    }
}

/// Stream identifier descriptor
/// Chapter 6.2.39, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorStreamIdentifier {
    /// Component tag binding this stream to a component descriptor
    pub component_tag: u8,
}

impl DescriptorStreamIdentifier {
    fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(DescriptorStreamIdentifier {
            component_tag: r.next_byte()?,
        })
    }

    fn calc_length(&self) -> usize {
        1
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        w.write_byte(self.component_tag);
        w.status()
    }
}

/// Subtitling descriptor
/// Chapter 6.2.41, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorSubtitling {
    /// Per-language subtitle items
    pub items: Vec<DescriptorSubtitlingItem>,
}

/// One subtitling item (8 bytes on the wire)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSubtitlingItem {
    /// ISO 639 language code
    pub language: [u8; 3],
    /// Subtitling type
    pub subtitling_type: u8,
    /// Composition page id
    pub composition_page_id: u16,
    /// Ancillary page id
    pub ancillary_page_id: u16,
}

impl DescriptorSubtitling {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let mut d = DescriptorSubtitling::default();
        while r.offset() < offset_end {
            let language = read_code3(r)?;
            let subtitling_type = r.next_byte()?;
            let bs = r.next_bytes_nocopy(2)?;
            let composition_page_id = u16::from(bs[0]) << 8 | u16::from(bs[1]);
            let bs = r.next_bytes_nocopy(2)?;
            let ancillary_page_id = u16::from(bs[0]) << 8 | u16::from(bs[1]);
            d.items.push(DescriptorSubtitlingItem {
                language,
                subtitling_type,
                composition_page_id,
                ancillary_page_id,
            });
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        8 * self.items.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        for item in &self.items {
            w.write_slice(&item.language);
            w.write_byte(item.subtitling_type);
            w.write_u16(item.composition_page_id);
            w.write_u16(item.ancillary_page_id);
        }
        w.status()
    }
}

/// Teletext descriptor; also the shape of the VBI teletext descriptor
/// Chapter 6.2.43, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorTeletext {
    /// Per-page teletext items
    pub items: Vec<DescriptorTeletextItem>,
}

/// One teletext item (5 bytes on the wire)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTeletextItem {
    /// ISO 639 language code
    pub language: [u8; 3],
    /// Teletext type (5-bit)
    pub teletext_type: u8,
    /// Magazine number (3-bit)
    pub magazine: u8,
    /// Page number, carried as two BCD nibbles
    pub page: u8,
}

impl DescriptorTeletext {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let mut d = DescriptorTeletext::default();
        while r.offset() < offset_end {
            let language = read_code3(r)?;
            let b = r.next_byte()?;
            let teletext_type = b >> 3;
            let magazine = b & 0x7;
            let b = r.next_byte()?;
            let page = (b >> 4) * 10 + (b & 0xF);
            d.items.push(DescriptorTeletextItem {
                language,
                teletext_type,
                magazine,
                page,
            });
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        5 * self.items.len()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        for item in &self.items {
            w.write_slice(&item.language);
            w.write_bits(u64::from(item.teletext_type), 5);
            w.write_bits(u64::from(item.magazine), 3);
            w.write_bits(u64::from(item.page / 10), 4);
            w.write_bits(u64::from(item.page % 10), 4);
        }
        w.status()
    }
}

/// VBI data descriptor
/// Chapter 6.2.47, ETSI EN 300 468 v1.15.1
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorVBIData {
    /// VBI services carried in the stream
    pub services: Vec<DescriptorVBIDataService>,
}

/// One VBI data service entry.
///
/// For unknown service ids the payload bytes are consumed but not
/// reconstructed, and the writer emits a single reserved `0x01 0xFF` pair
/// instead, so serializing a parsed unknown service is framing-safe but
/// not byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorVBIDataService {
    /// VBI data service id
    pub data_service_id: u8,
    /// Line descriptors, populated for the known service ids
    pub items: Vec<DescriptorVBIDataItem>,
}

/// One VBI line descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorVBIDataItem {
    /// Field parity; set means first field of a frame
    pub field_parity: bool,
    /// Line offset (5-bit)
    pub line_offset: u8,
}

fn is_known_vbi_service(id: u8) -> bool {
    matches!(
        id,
        VBI_DATA_SERVICE_ID_CLOSED_CAPTIONING
            | VBI_DATA_SERVICE_ID_EBU_TELETEXT
            | VBI_DATA_SERVICE_ID_INVERTED_TELETEXT
            | VBI_DATA_SERVICE_ID_MONOCHROME_442_SAMPLES
            | VBI_DATA_SERVICE_ID_VPS
            | VBI_DATA_SERVICE_ID_WSS
    )
}

impl DescriptorVBIData {
    fn parse(r: &mut ByteReader<'_>, offset_end: usize) -> Result<Self> {
        let mut d = DescriptorVBIData::default();
        while r.offset() < offset_end {
            let data_service_id = r.next_byte()?;
            let mut service = DescriptorVBIDataService {
                data_service_id,
                items: Vec::new(),
            };

            let data_length = usize::from(r.next_byte()?);
            let offset_data_end = r.offset() + data_length;
            while r.offset() < offset_data_end {
                let b = r.next_byte()?;
                if is_known_vbi_service(data_service_id) {
                    service.items.push(DescriptorVBIDataItem {
                        field_parity: b & 0x20 > 0,
                        line_offset: b & 0x1F,
                    });
                }
            }

            d.services.push(service);
        }
        Ok(d)
    }

    fn calc_length(&self) -> usize {
        self.services
            .iter()
            .map(|s| {
                if is_known_vbi_service(s.data_service_id) {
                    2 + s.items.len()
                } else {
                    3
                }
            })
            .sum()
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        for service in &self.services {
            w.write_byte(service.data_service_id);

            if is_known_vbi_service(service.data_service_id) {
                w.write_byte(service.items.len() as u8); // each item is one byte
                for item in &service.items {
                    w.write_bits(0xFF, 2);
                    w.write_bit(item.field_parity);
                    w.write_bits(u64::from(item.line_offset), 5);
                }
            } else {
                // One reserved byte keeps the framing decodable.
                w.write_byte(0x01);
                w.write_byte(0xFF);
            }
        }
        w.status()
    }
}

impl DescriptorData {
    /// Computes the payload length in bytes this variant serializes to.
    ///
    /// Serialization emits exactly this many bytes after the two envelope
    /// bytes; the length byte on the wire carries this value.
    pub fn calc_length(&self) -> usize {
        match self {
            DescriptorData::AC3(d) => d.calc_length(),
            DescriptorData::AVCVideo(d) => d.calc_length(),
            DescriptorData::Component(d) => d.calc_length(),
            DescriptorData::Content(d) => d.calc_length(),
            DescriptorData::DataStreamAlignment(d) => d.calc_length(),
            DescriptorData::EnhancedAC3(d) => d.calc_length(),
            DescriptorData::ExtendedEvent(d) => d.calc_length(),
            DescriptorData::Extension(d) => d.calc_length(),
            DescriptorData::ISO639LanguageAndAudioType(d) => d.calc_length(),
            DescriptorData::LocalTimeOffset(d) => d.calc_length(),
            DescriptorData::MaximumBitrate(d) => d.calc_length(),
            DescriptorData::NetworkName(d) => d.calc_length(),
            DescriptorData::ParentalRating(d) => d.calc_length(),
            DescriptorData::PrivateDataIndicator(d) => d.calc_length(),
            DescriptorData::PrivateDataSpecifier(d) => d.calc_length(),
            DescriptorData::Registration(d) => d.calc_length(),
            DescriptorData::Service(d) => d.calc_length(),
            DescriptorData::ShortEvent(d) => d.calc_length(),
            DescriptorData::StreamIdentifier(d) => d.calc_length(),
            DescriptorData::Subtitling(d) => d.calc_length(),
            DescriptorData::Teletext(d) => d.calc_length(),
            DescriptorData::VBIData(d) => d.calc_length(),
            DescriptorData::VBITeletext(d) => d.calc_length(),
            DescriptorData::UserDefined(content) => content.len(),
            DescriptorData::Unknown(content) => content.len(),
        }
    }

    fn write_to<W: io::Write>(&self, w: &mut BitWriter<W>) -> Result<()> {
        match self {
            DescriptorData::AC3(d) => d.write_to(w),
            DescriptorData::AVCVideo(d) => d.write_to(w),
            DescriptorData::Component(d) => d.write_to(w),
            DescriptorData::Content(d) => d.write_to(w),
            DescriptorData::DataStreamAlignment(d) => d.write_to(w),
            DescriptorData::EnhancedAC3(d) => d.write_to(w),
            DescriptorData::ExtendedEvent(d) => d.write_to(w),
            DescriptorData::Extension(d) => d.write_to(w),
            DescriptorData::ISO639LanguageAndAudioType(d) => d.write_to(w),
            DescriptorData::LocalTimeOffset(d) => d.write_to(w),
            DescriptorData::MaximumBitrate(d) => d.write_to(w),
            DescriptorData::NetworkName(d) => d.write_to(w),
            DescriptorData::ParentalRating(d) => d.write_to(w),
            DescriptorData::PrivateDataIndicator(d) => d.write_to(w),
            DescriptorData::PrivateDataSpecifier(d) => d.write_to(w),
            DescriptorData::Registration(d) => d.write_to(w),
            DescriptorData::Service(d) => d.write_to(w),
            DescriptorData::ShortEvent(d) => d.write_to(w),
            DescriptorData::StreamIdentifier(d) => d.write_to(w),
            DescriptorData::Subtitling(d) => d.write_to(w),
            DescriptorData::Teletext(d) => d.write_to(w),
            DescriptorData::VBIData(d) => d.write_to(w),
            DescriptorData::VBITeletext(d) => d.write_to(w),
            DescriptorData::UserDefined(content) | DescriptorData::Unknown(content) => {
                w.write_slice(content);
                w.status()
            }
        }
    }
}

fn parse_descriptor_data(
    r: &mut ByteReader<'_>,
    tag: u8,
    length: u8,
    offset_end: usize,
) -> Result<DescriptorData> {
    Ok(match tag {
        DESCRIPTOR_TAG_AC3 => {
            DescriptorData::AC3(DescriptorAC3::parse(r, offset_end).context("AC3 descriptor")?)
        }
        DESCRIPTOR_TAG_AVC_VIDEO => DescriptorData::AVCVideo(
            DescriptorAVCVideo::parse(r).context("AVC Video descriptor")?,
        ),
        DESCRIPTOR_TAG_COMPONENT => DescriptorData::Component(
            DescriptorComponent::parse(r, offset_end).context("Component descriptor")?,
        ),
        DESCRIPTOR_TAG_CONTENT => DescriptorData::Content(
            DescriptorContent::parse(r, offset_end).context("Content descriptor")?,
        ),
        DESCRIPTOR_TAG_DATA_STREAM_ALIGNMENT => DescriptorData::DataStreamAlignment(
            DescriptorDataStreamAlignment::parse(r).context("Data Stream Alignment descriptor")?,
        ),
        DESCRIPTOR_TAG_ENHANCED_AC3 => DescriptorData::EnhancedAC3(
            DescriptorEnhancedAC3::parse(r, offset_end).context("Enhanced AC3 descriptor")?,
        ),
        DESCRIPTOR_TAG_EXTENDED_EVENT => DescriptorData::ExtendedEvent(
            DescriptorExtendedEvent::parse(r).context("Extended event descriptor")?,
        ),
        DESCRIPTOR_TAG_EXTENSION => DescriptorData::Extension(
            DescriptorExtension::parse(r, offset_end).context("Extension descriptor")?,
        ),
        DESCRIPTOR_TAG_ISO639_LANGUAGE_AND_AUDIO_TYPE => {
            DescriptorData::ISO639LanguageAndAudioType(
                DescriptorISO639LanguageAndAudioType::parse(r, offset_end)
                    .context("ISO639 Language and Audio Type descriptor")?,
            )
        }
        DESCRIPTOR_TAG_LOCAL_TIME_OFFSET => DescriptorData::LocalTimeOffset(
            DescriptorLocalTimeOffset::parse(r, offset_end)
                .context("Local Time Offset descriptor")?,
        ),
        DESCRIPTOR_TAG_MAXIMUM_BITRATE => DescriptorData::MaximumBitrate(
            DescriptorMaximumBitrate::parse(r).context("Maximum Bitrate descriptor")?,
        ),
        DESCRIPTOR_TAG_NETWORK_NAME => DescriptorData::NetworkName(
            DescriptorNetworkName::parse(r, offset_end).context("Network Name descriptor")?,
        ),
        DESCRIPTOR_TAG_PARENTAL_RATING => DescriptorData::ParentalRating(
            DescriptorParentalRating::parse(r, offset_end).context("Parental Rating descriptor")?,
        ),
        DESCRIPTOR_TAG_PRIVATE_DATA_INDICATOR => DescriptorData::PrivateDataIndicator(
            DescriptorPrivateDataIndicator::parse(r)
                .context("Private Data Indicator descriptor")?,
        ),
        DESCRIPTOR_TAG_PRIVATE_DATA_SPECIFIER => DescriptorData::PrivateDataSpecifier(
            DescriptorPrivateDataSpecifier::parse(r)
                .context("Private Data Specifier descriptor")?,
        ),
        DESCRIPTOR_TAG_REGISTRATION => DescriptorData::Registration(
            DescriptorRegistration::parse(r, offset_end).context("Registration descriptor")?,
        ),
        DESCRIPTOR_TAG_SERVICE => {
            DescriptorData::Service(DescriptorService::parse(r).context("Service descriptor")?)
        }
        DESCRIPTOR_TAG_SHORT_EVENT => DescriptorData::ShortEvent(
            DescriptorShortEvent::parse(r).context("Short Event descriptor")?,
        ),
        DESCRIPTOR_TAG_STREAM_IDENTIFIER => DescriptorData::StreamIdentifier(
            DescriptorStreamIdentifier::parse(r).context("Stream Identifier descriptor")?,
        ),
        DESCRIPTOR_TAG_SUBTITLING => DescriptorData::Subtitling(
            DescriptorSubtitling::parse(r, offset_end).context("Subtitling descriptor")?,
        ),
        DESCRIPTOR_TAG_TELETEXT => DescriptorData::Teletext(
            DescriptorTeletext::parse(r, offset_end).context("Teletext descriptor")?,
        ),
        DESCRIPTOR_TAG_VBI_DATA => DescriptorData::VBIData(
            DescriptorVBIData::parse(r, offset_end).context("VBI Data descriptor")?,
        ),
        DESCRIPTOR_TAG_VBI_TELETEXT => DescriptorData::VBITeletext(
            DescriptorTeletext::parse(r, offset_end).context("VBI Teletext descriptor")?,
        ),
        _ => {
            log::debug!("unknown descriptor tag 0x{:02x}", tag);
            DescriptorData::Unknown(
                r.next_bytes(usize::from(length))
                    .context("unknown descriptor")?,
            )
        }
    })
}

/// Parses a single descriptor envelope: tag, length, tag-dispatched payload.
///
/// Whatever the inner parser consumed, the reader ends up exactly
/// `length` bytes past the length byte; declared lengths always win over
/// inner structure.
pub fn parse_descriptor(r: &mut ByteReader<'_>) -> Result<Descriptor> {
    let bs = r.next_bytes_nocopy(2)?;
    let tag = bs[0];
    let length = bs[1];

    let mut d = Descriptor {
        tag,
        length,
        data: if (0x80..=0xFE).contains(&tag) {
            DescriptorData::UserDefined(Vec::new())
        } else {
            DescriptorData::Unknown(Vec::new())
        },
    };

    if length > 0 {
        // There is no way to be sure the declared length matches the real
        // payload, so the payload parsers fetch what they understand and
        // the envelope seeks to the declared end.
        let offset_end = r.offset() + usize::from(length);

        if (0x80..=0xFE).contains(&tag) {
            d.data = DescriptorData::UserDefined(
                r.next_bytes(usize::from(length))
                    .context("user defined descriptor")?,
            );
        } else {
            d.data = parse_descriptor_data(r, tag, length, offset_end)?;
        }

        r.seek(offset_end);
    }

    Ok(d)
}

/// Parses a 12-bit length-prefixed descriptor list (the
/// `program_info_length`-style framing used throughout PSI tables)
pub fn parse_descriptors(r: &mut ByteReader<'_>) -> Result<Vec<Descriptor>> {
    let bs = r.next_bytes_nocopy(2)?;
    let length = usize::from(u16::from(bs[0] & 0xF) << 8 | u16::from(bs[1]));

    let mut descriptors = Vec::new();
    if length > 0 {
        let offset_end = r.offset() + length;
        // A declared span with fewer than 2 bytes left cannot hold another
        // envelope; such a tail is ignored.
        while r.offset() + 2 <= offset_end {
            descriptors.push(parse_descriptor(r)?);
        }
    }
    Ok(descriptors)
}

/// Serializes one descriptor; the length byte is computed, never taken
/// from [`Descriptor::length`]. Returns the total byte count including the
/// two envelope bytes
pub fn write_descriptor<W: io::Write>(w: &mut BitWriter<W>, d: &Descriptor) -> Result<usize> {
    let length = d.calc_length();

    w.write_byte(d.tag);
    w.write_byte(length);
    w.status()?;

    d.data.write_to(w)?;
    Ok(usize::from(length) + 2)
}

/// Serializes a descriptor list without any length prefix
pub fn write_descriptors<W: io::Write>(w: &mut BitWriter<W>, ds: &[Descriptor]) -> Result<usize> {
    let mut written = 0;
    for d in ds {
        written += write_descriptor(w, d)?;
    }
    Ok(written)
}

/// Serializes a descriptor list behind its 12-bit length prefix
/// (4 reserved bits written as 1s). Returns the total byte count including
/// the prefix
pub fn write_descriptors_with_length<W: io::Write>(
    w: &mut BitWriter<W>,
    ds: &[Descriptor],
) -> Result<usize> {
    let length = calc_descriptors_length(ds);

    w.write_bits(0xFF, 4); // reserved
    w.write_bits(u64::from(length), 12);
    w.status()?;

    let written = write_descriptors(w, ds)?;
    Ok(written + 2)
}

/// Computes the byte count of a serialized descriptor list, excluding the
/// 12-bit length prefix. Used by callers to precompute outer section
/// lengths; always equal to what [`write_descriptors`] produces
pub fn calc_descriptors_length(ds: &[Descriptor]) -> u16 {
    ds.iter()
        .map(|d| 2 + u16::from(d.calc_length()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn parse_one(bytes: &[u8]) -> Descriptor {
        let mut r = ByteReader::new(bytes);
        let d = parse_descriptor(&mut r).unwrap();
        assert_eq!(r.offset(), bytes.len(), "descriptor must consume its span");
        d
    }

    fn write_one(d: &Descriptor) -> Vec<u8> {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        let written = write_descriptor(&mut w, d).unwrap();
        assert_eq!(written, out.len());
        out
    }

    fn assert_round_trip(bytes: &[u8]) -> Descriptor {
        let d = parse_one(bytes);
        assert_eq!(write_one(&d), bytes);
        d
    }

    #[test]
    fn test_stream_identifier_round_trip() {
        let d = assert_round_trip(&[0x52, 0x01, 0xA7]);
        assert_eq!(d.tag, DESCRIPTOR_TAG_STREAM_IDENTIFIER);
        assert_eq!(d.length, 1);
        assert_eq!(
            d.data,
            DescriptorData::StreamIdentifier(DescriptorStreamIdentifier { component_tag: 0xA7 })
        );
    }

    #[test]
    fn test_maximum_bitrate_scaling() {
        let d = assert_round_trip(&[0x0E, 0x03, 0xC0, 0x00, 0x64]);
        assert_eq!(
            d.data,
            DescriptorData::MaximumBitrate(DescriptorMaximumBitrate { bitrate: 5000 })
        );

        // Serializing a constructed value writes the reserved bits as 1s.
        let built = Descriptor::new(
            DESCRIPTOR_TAG_MAXIMUM_BITRATE,
            DescriptorData::MaximumBitrate(DescriptorMaximumBitrate { bitrate: 5000 }),
        );
        assert_eq!(write_one(&built), [0x0E, 0x03, 0xC0, 0x00, 0x64]);
    }

    #[test]
    fn test_parental_rating_minimum_age() {
        let d = assert_round_trip(&[0x55, 0x08, 0x46, 0x52, 0x41, 0x05, 0x55, 0x53, 0x41, 0x10]);
        let items = match &d.data {
            DescriptorData::ParentalRating(pr) => &pr.items,
            other => panic!("wrong variant: {other:?}"),
        };
        assert_eq!(items.len(), 2);
        assert_eq!(&items[0].country_code, b"FRA");
        assert_eq!(items[0].rating, 0x05);
        assert_eq!(items[0].minimum_age(), 8);
        assert_eq!(&items[1].country_code, b"USA");
        assert_eq!(items[1].rating, 0x10);
        assert_eq!(items[1].minimum_age(), 19);

        // Undefined and user-defined ratings map to age 0.
        let undefined = DescriptorParentalRatingItem {
            country_code: *b"FRA",
            rating: 0,
        };
        assert_eq!(undefined.minimum_age(), 0);
        let user_defined = DescriptorParentalRatingItem {
            country_code: *b"FRA",
            rating: 0x11,
        };
        assert_eq!(user_defined.minimum_age(), 0);
    }

    #[test]
    fn test_envelope_over_length_recovery() {
        // Outer length 8; the first entry declares 2 bytes but its parser
        // only understands 1, the envelope skips the stray byte.
        let bytes = [0xF0, 0x08, 0x52, 0x02, 0xAA, 0xBB, 0x52, 0x01, 0xCC];
        let mut r = ByteReader::new(&bytes);
        let ds = parse_descriptors(&mut r).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds[0].data,
            DescriptorData::StreamIdentifier(DescriptorStreamIdentifier { component_tag: 0xAA })
        );
        assert_eq!(
            ds[1].data,
            DescriptorData::StreamIdentifier(DescriptorStreamIdentifier { component_tag: 0xCC })
        );
        assert_eq!(r.offset(), bytes.len());
    }

    #[test]
    fn test_teletext_bcd_page() {
        let bytes = [0x56, 0x05, 0x65, 0x6E, 0x67, 0x11, 0x23];
        let d = assert_round_trip(&bytes);
        let items = match &d.data {
            DescriptorData::Teletext(t) => &t.items,
            other => panic!("wrong variant: {other:?}"),
        };
        assert_eq!(
            items[0],
            DescriptorTeletextItem {
                language: *b"eng",
                teletext_type: TELETEXT_TYPE_TELETEXT_SUBTITLE_PAGE,
                magazine: 1,
                page: 23,
            }
        );
    }

    #[test]
    fn test_vbi_teletext_shares_teletext_shape() {
        let d = assert_round_trip(&[0x46, 0x05, 0x65, 0x6E, 0x67, 0x11, 0x23]);
        assert!(matches!(d.data, DescriptorData::VBITeletext(_)));
    }

    #[test]
    fn test_ac3_flags_and_additional_info() {
        // component type + main id present, plus two info bytes; the low
        // nibble of the flag byte is reserved and serialized as 1s.
        let bytes = [0x6A, 0x05, 0xAF, 0x42, 0x01, 0xDE, 0xAD];
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::AC3(DescriptorAC3 {
                component_type: Some(0x42),
                bsid: None,
                main_id: Some(0x01),
                asvc: None,
                additional_info: vec![0xDE, 0xAD],
            })
        );
    }

    #[test]
    fn test_enhanced_ac3_substreams() {
        let built = Descriptor::new(
            DESCRIPTOR_TAG_ENHANCED_AC3,
            DescriptorData::EnhancedAC3(DescriptorEnhancedAC3 {
                component_type: Some(0x10),
                bsid: Some(0x11),
                main_id: None,
                asvc: None,
                mix_info_exists: true,
                substream1: Some(0x21),
                substream2: None,
                substream3: Some(0x23),
                additional_info: vec![0x99],
            }),
        );
        let bytes = write_one(&built);
        // flags: component|bsid|mix|sub1|sub3 = 0xC0 | 0x08 | 0x04 | 0x01
        assert_eq!(
            bytes,
            [0x7A, 0x06, 0xCD, 0x10, 0x11, 0x21, 0x23, 0x99]
        );
        assert_eq!(parse_one(&bytes), built);
    }

    #[test]
    fn test_avc_video() {
        let bytes = [0x28, 0x04, 0x64, 0xE5, 0x28, 0xBF];
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::AVCVideo(DescriptorAVCVideo {
                profile_idc: 0x64,
                constraint_set0: true,
                constraint_set1: true,
                constraint_set2: true,
                compatible_flags: 0x05,
                level_idc: 0x28,
                avc_still_present: true,
                avc_24_hour_picture: false,
            })
        );
    }

    #[test]
    fn test_component() {
        let mut bytes = vec![0x50, 0x0B, 0x12, 0x03, 0x42];
        bytes.extend_from_slice(b"fra");
        bytes.extend_from_slice(b"hello");
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::Component(DescriptorComponent {
                stream_content_ext: 0x1,
                stream_content: 0x2,
                component_type: 0x03,
                component_tag: 0x42,
                iso639_language_code: *b"fra",
                text: b"hello".to_vec(),
            })
        );
    }

    #[test]
    fn test_content_items() {
        let bytes = [0x54, 0x04, 0x12, 0x34, 0x56, 0x78];
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::Content(DescriptorContent {
                items: vec![
                    DescriptorContentItem {
                        content_nibble_level_1: 0x1,
                        content_nibble_level_2: 0x2,
                        user_byte: 0x34,
                    },
                    DescriptorContentItem {
                        content_nibble_level_1: 0x5,
                        content_nibble_level_2: 0x6,
                        user_byte: 0x78,
                    },
                ],
            })
        );
    }

    #[test]
    fn test_extended_event() {
        let mut bytes = vec![0x4E];
        let mut body = vec![0x12];
        body.extend_from_slice(b"eng");
        body.push(8); // items length
        body.push(3);
        body.extend_from_slice(b"key");
        body.push(3);
        body.extend_from_slice(b"val");
        body.push(4); // text length
        body.extend_from_slice(b"text");
        bytes.push(body.len() as u8);
        bytes.extend_from_slice(&body);

        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::ExtendedEvent(DescriptorExtendedEvent {
                number: 1,
                last_descriptor_number: 2,
                iso639_language_code: *b"eng",
                items: vec![DescriptorExtendedEventItem {
                    description: b"key".to_vec(),
                    content: b"val".to_vec(),
                }],
                text: b"text".to_vec(),
            })
        );
    }

    #[test]
    fn test_extension_supplementary_audio() {
        let mut bytes = vec![0x7F, 0x09, 0x06, 0x83];
        bytes.extend_from_slice(b"eng");
        bytes.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::Extension(DescriptorExtension {
                tag: DESCRIPTOR_TAG_EXTENSION_SUPPLEMENTARY_AUDIO,
                data: DescriptorExtensionData::SupplementaryAudio(
                    DescriptorExtensionSupplementaryAudio {
                        mix_type: true,
                        editorial_classification: 0,
                        language_code: Some(*b"eng"),
                        private_data: vec![0x01, 0x02, 0x03, 0x04],
                    }
                ),
            })
        );
    }

    #[test]
    fn test_extension_unknown_sub_tag() {
        let bytes = [0x7F, 0x03, 0x42, 0xAB, 0xCD];
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::Extension(DescriptorExtension {
                tag: 0x42,
                data: DescriptorExtensionData::Unknown(vec![0xAB, 0xCD]),
            })
        );
    }

    #[test]
    fn test_iso639_nominal_and_short_language() {
        let bytes = [0x0A, 0x04, 0x65, 0x6E, 0x67, 0x03];
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::ISO639LanguageAndAudioType(DescriptorISO639LanguageAndAudioType {
                language: b"eng".to_vec(),
                audio_type: AUDIO_TYPE_VISUAL_IMPAIRED_COMMENTARY,
            })
        );

        // Two-byte language observed in real streams round-trips verbatim.
        let short = [0x0A, 0x03, 0x65, 0x6E, 0x01];
        let d = assert_round_trip(&short);
        assert_eq!(
            d.data,
            DescriptorData::ISO639LanguageAndAudioType(DescriptorISO639LanguageAndAudioType {
                language: b"en".to_vec(),
                audio_type: AUDIO_TYPE_CLEAN_EFFECTS,
            })
        );
    }

    #[test]
    fn test_local_time_offset() {
        let mut bytes = vec![0x58, 0x0D];
        bytes.extend_from_slice(b"FRA");
        bytes.push(0x02 << 2 | 0x02 | 0x01); // region 2, reserved 1, polarity 1
        bytes.extend_from_slice(&[0x01, 0x00]); // offset 1h
        bytes.extend_from_slice(&[0xC0, 0x79, 0x12, 0x45, 0x00]); // 1993-10-13 12:45:00
        bytes.extend_from_slice(&[0x02, 0x00]); // next offset 2h

        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::LocalTimeOffset(DescriptorLocalTimeOffset {
                items: vec![DescriptorLocalTimeOffsetItem {
                    country_code: *b"FRA",
                    country_region_id: 2,
                    local_time_offset_polarity: true,
                    local_time_offset: Duration::from_secs(3600),
                    time_of_change: NaiveDate::from_ymd_opt(1993, 10, 13)
                        .unwrap()
                        .and_hms_opt(12, 45, 0)
                        .unwrap(),
                    next_time_offset: Duration::from_secs(7200),
                }],
            })
        );
    }

    #[test]
    fn test_network_name() {
        let mut bytes = vec![0x40, 0x04];
        bytes.extend_from_slice(b"name");
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::NetworkName(DescriptorNetworkName {
                name: b"name".to_vec(),
            })
        );
    }

    #[test]
    fn test_registration() {
        let bytes = [0x05, 0x06, 0x41, 0x43, 0x2D, 0x33, 0xAA, 0xBB];
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::Registration(DescriptorRegistration {
                format_identifier: 0x41432D33, // "AC-3"
                additional_identification_info: vec![0xAA, 0xBB],
            })
        );
    }

    #[test]
    fn test_private_data_indicator_and_specifier() {
        let d = assert_round_trip(&[0x0F, 0x04, 0x00, 0x00, 0xBE, 0xEF]);
        assert_eq!(
            d.data,
            DescriptorData::PrivateDataIndicator(DescriptorPrivateDataIndicator {
                indicator: 0xBEEF,
            })
        );

        let d = assert_round_trip(&[0x5F, 0x04, 0x00, 0x00, 0x00, 0x28]);
        assert_eq!(
            d.data,
            DescriptorData::PrivateDataSpecifier(DescriptorPrivateDataSpecifier {
                specifier: 0x28,
            })
        );
    }

    #[test]
    fn test_service() {
        let mut bytes = vec![0x48, 0x0E, 0x01, 0x08];
        bytes.extend_from_slice(b"provider");
        bytes.push(0x03);
        bytes.extend_from_slice(b"svc");
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::Service(DescriptorService {
                service_type: SERVICE_TYPE_DIGITAL_TELEVISION_SERVICE,
                provider: b"provider".to_vec(),
                name: b"svc".to_vec(),
            })
        );
    }

    #[test]
    fn test_short_event() {
        let mut bytes = vec![0x4D, 0x0E];
        bytes.extend_from_slice(b"eng");
        bytes.push(0x05);
        bytes.extend_from_slice(b"event");
        bytes.push(0x04);
        bytes.extend_from_slice(b"text");
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::ShortEvent(DescriptorShortEvent {
                language: *b"eng",
                event_name: b"event".to_vec(),
                text: b"text".to_vec(),
            })
        );
    }

    #[test]
    fn test_subtitling() {
        let mut bytes = vec![0x59, 0x10];
        bytes.extend_from_slice(b"fra");
        bytes.extend_from_slice(&[0x10, 0x12, 0x34, 0x56, 0x78]);
        bytes.extend_from_slice(b"deu");
        bytes.extend_from_slice(&[0x20, 0x9A, 0xBC, 0xDE, 0xF0]);
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::Subtitling(DescriptorSubtitling {
                items: vec![
                    DescriptorSubtitlingItem {
                        language: *b"fra",
                        subtitling_type: 0x10,
                        composition_page_id: 0x1234,
                        ancillary_page_id: 0x5678,
                    },
                    DescriptorSubtitlingItem {
                        language: *b"deu",
                        subtitling_type: 0x20,
                        composition_page_id: 0x9ABC,
                        ancillary_page_id: 0xDEF0,
                    },
                ],
            })
        );
    }

    #[test]
    fn test_vbi_data_known_service() {
        let bytes = [0x45, 0x04, 0x01, 0x02, 0xE5, 0xD2];
        let d = assert_round_trip(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::VBIData(DescriptorVBIData {
                services: vec![DescriptorVBIDataService {
                    data_service_id: VBI_DATA_SERVICE_ID_EBU_TELETEXT,
                    items: vec![
                        DescriptorVBIDataItem {
                            field_parity: true,
                            line_offset: 0x05,
                        },
                        DescriptorVBIDataItem {
                            field_parity: false,
                            line_offset: 0x12,
                        },
                    ],
                }],
            })
        );
    }

    #[test]
    fn test_vbi_data_unknown_service_is_not_identity() {
        // Unknown service id 0x03 with a 2-byte payload; items are not
        // reconstructed and the writer substitutes the reserved pair.
        let bytes = [0x45, 0x04, 0x03, 0x02, 0x11, 0x22];
        let d = parse_one(&bytes);
        assert_eq!(
            d.data,
            DescriptorData::VBIData(DescriptorVBIData {
                services: vec![DescriptorVBIDataService {
                    data_service_id: 0x03,
                    items: Vec::new(),
                }],
            })
        );
        assert_eq!(write_one(&d), [0x45, 0x03, 0x03, 0x01, 0xFF]);
    }

    #[test]
    fn test_user_defined_and_unknown() {
        let d = assert_round_trip(&[0x90, 0x03, 0x01, 0x02, 0x03]);
        assert_eq!(d.data, DescriptorData::UserDefined(vec![0x01, 0x02, 0x03]));

        // 0x53 is not in the catalog and not user-defined.
        let d = assert_round_trip(&[0x53, 0x02, 0xCA, 0xFE]);
        assert_eq!(d.data, DescriptorData::Unknown(vec![0xCA, 0xFE]));
    }

    #[test]
    fn test_zero_length_descriptor() {
        let d = assert_round_trip(&[0x52, 0x00]);
        assert_eq!(d.length, 0);
        assert_eq!(d.data, DescriptorData::Unknown(Vec::new()));
    }

    fn catalog() -> Vec<Descriptor> {
        vec![
            Descriptor::new(
                DESCRIPTOR_TAG_STREAM_IDENTIFIER,
                DescriptorData::StreamIdentifier(DescriptorStreamIdentifier {
                    component_tag: 0x07,
                }),
            ),
            Descriptor::new(
                DESCRIPTOR_TAG_AC3,
                DescriptorData::AC3(DescriptorAC3 {
                    component_type: Some(0x42),
                    bsid: Some(0x08),
                    main_id: None,
                    asvc: None,
                    additional_info: vec![0x01],
                }),
            ),
            Descriptor::new(
                DESCRIPTOR_TAG_SERVICE,
                DescriptorData::Service(DescriptorService {
                    service_type: 0x01,
                    provider: b"prov".to_vec(),
                    name: b"name".to_vec(),
                }),
            ),
            Descriptor::new(
                DESCRIPTOR_TAG_TELETEXT,
                DescriptorData::Teletext(DescriptorTeletext {
                    items: vec![DescriptorTeletextItem {
                        language: *b"eng",
                        teletext_type: 2,
                        magazine: 1,
                        page: 23,
                    }],
                }),
            ),
            Descriptor::new(0x90, DescriptorData::UserDefined(vec![0xAB, 0xCD])),
        ]
    }

    #[test]
    fn test_length_agreement() {
        for d in catalog() {
            let bytes = write_one(&d);
            assert_eq!(bytes.len(), 2 + usize::from(d.calc_length()));
            assert_eq!(bytes[1], d.calc_length());
        }
    }

    #[test]
    fn test_descriptor_list_round_trip_and_length() {
        let ds = catalog();
        let list_length = calc_descriptors_length(&ds);

        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        let written = write_descriptors_with_length(&mut w, &ds).unwrap();
        assert_eq!(written, out.len());
        assert_eq!(written, 2 + usize::from(list_length));

        // The reserved nibble is written as 1s around the 12-bit length.
        assert_eq!(u16::from(out[0] & 0xF) << 8 | u16::from(out[1]), list_length);
        assert_eq!(out[0] & 0xF0, 0xF0);

        let mut r = ByteReader::new(&out);
        let parsed = parse_descriptors(&mut r).unwrap();
        assert_eq!(parsed, ds);
    }

    #[test]
    fn test_empty_descriptor_list() {
        let mut out = Vec::new();
        let mut w = BitWriter::new(&mut out);
        assert_eq!(write_descriptors_with_length(&mut w, &[]).unwrap(), 2);
        assert_eq!(out, [0xF0, 0x00]);

        let mut r = ByteReader::new(&out);
        assert_eq!(parse_descriptors(&mut r).unwrap(), Vec::new());
    }

    #[test]
    fn test_inner_error_carries_variant_context() {
        // Service descriptor whose provider length overruns the buffer.
        let bytes = [0x48, 0x03, 0x01, 0x10, 0x41];
        let mut r = ByteReader::new(&bytes);
        let err = parse_descriptor(&mut r).unwrap_err();
        assert_eq!(
            err.to_string(),
            "parsing Service descriptor failed: read past end of data"
        );
    }
}
