use pretty_assertions::assert_eq;
use tsio::ts::descriptor::{
    DescriptorISO639LanguageAndAudioType, DescriptorService, DescriptorStreamIdentifier,
    DescriptorTeletext, DescriptorTeletextItem, DESCRIPTOR_TAG_ISO639_LANGUAGE_AND_AUDIO_TYPE,
    DESCRIPTOR_TAG_SERVICE, DESCRIPTOR_TAG_STREAM_IDENTIFIER, DESCRIPTOR_TAG_TELETEXT,
};
use tsio::ts::{
    calc_descriptors_length, parse_descriptors, parse_packet, write_descriptors_with_length,
    write_packet, AdaptationField, ClockReference, Descriptor, DescriptorData, Packet,
    PacketHeader, PACKET_SIZE,
};
use tsio::utils::{BitWriter, ByteReader, Crc32Writer};

fn sample_descriptors() -> Vec<Descriptor> {
    vec![
        Descriptor::new(
            DESCRIPTOR_TAG_STREAM_IDENTIFIER,
            DescriptorData::StreamIdentifier(DescriptorStreamIdentifier { component_tag: 0x42 }),
        ),
        Descriptor::new(
            DESCRIPTOR_TAG_ISO639_LANGUAGE_AND_AUDIO_TYPE,
            DescriptorData::ISO639LanguageAndAudioType(DescriptorISO639LanguageAndAudioType {
                language: b"fra".to_vec(),
                audio_type: 0x01,
            }),
        ),
        Descriptor::new(
            DESCRIPTOR_TAG_SERVICE,
            DescriptorData::Service(DescriptorService {
                service_type: 0x01,
                provider: b"tsio".to_vec(),
                name: b"test channel".to_vec(),
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
        Descriptor::new(0xA5, DescriptorData::UserDefined(vec![0x01, 0x02, 0x03])),
    ]
}

/// A descriptor list framed behind its 12-bit length prefix survives a trip
/// through a transport packet payload.
#[test]
fn test_descriptor_list_through_packet() {
    let ds = sample_descriptors();

    // Serialize the list into what would be a section's program-info loop.
    let mut section = Vec::new();
    let mut w = BitWriter::new(&mut section);
    let written = write_descriptors_with_length(&mut w, &ds).unwrap();
    assert_eq!(written, section.len());
    assert_eq!(written, 2 + usize::from(calc_descriptors_length(&ds)));

    // Carry it as a packet payload.
    let packet = Packet::new(PacketHeader {
        payload_unit_start: true,
        pid: 0x1000,
        continuity_counter: 7,
        ..Default::default()
    })
    .with_payload(section.clone());

    let mut wire = Vec::new();
    let mut w = BitWriter::new(&mut wire);
    assert_eq!(
        write_packet(&mut w, &packet, PACKET_SIZE).unwrap(),
        PACKET_SIZE
    );

    // Read it all back.
    let mut r = ByteReader::new(&wire);
    let parsed = parse_packet(&mut r, None).unwrap();
    assert_eq!(parsed.header.pid, 0x1000);
    assert_eq!(&parsed.payload[..section.len()], &section[..]);
    // 0xFF padding after the payload.
    assert!(parsed.payload[section.len()..].iter().all(|&b| b == 0xFF));

    let mut r = ByteReader::new(&parsed.payload);
    assert_eq!(parse_descriptors(&mut r).unwrap(), ds);
}

/// A packet carrying a PCR adaptation field round-trips byte-exactly.
#[test]
fn test_pcr_packet_round_trip() {
    let mut af = AdaptationField {
        random_access: true,
        pcr: Some(ClockReference::new(0x1_0000_0000, 0x100)),
        stuffing_length: 3,
        ..Default::default()
    };
    af.length = af.calc_length();

    let packet = Packet::new(PacketHeader {
        pid: 0x101,
        ..Default::default()
    })
    .with_adaptation_field(af)
    .with_payload(vec![0xAB; 100]);

    let mut wire = Vec::new();
    let mut w = BitWriter::new(&mut wire);
    write_packet(&mut w, &packet, PACKET_SIZE).unwrap();
    assert_eq!(wire.len(), PACKET_SIZE);

    let mut r = ByteReader::new(&wire);
    let parsed = parse_packet(&mut r, None).unwrap();
    assert_eq!(parsed.header, packet.header);
    assert_eq!(parsed.adaptation_field, packet.adaptation_field);
    assert_eq!(&parsed.payload[..100], &packet.payload[..]);

    // The parsed packet (payload now including the 0xFF padding) writes
    // back to the identical 188 bytes.
    let mut wire2 = Vec::new();
    let mut w = BitWriter::new(&mut wire2);
    write_packet(&mut w, &parsed, PACKET_SIZE).unwrap();
    assert_eq!(wire2, wire);
}

/// Sections emitted through the CRC writer carry the checksum their bytes
/// actually hash to.
#[test]
fn test_section_crc_trailer() {
    let ds = sample_descriptors();

    let mut section = Vec::new();
    let mut w = BitWriter::new(&mut section);
    let mut cw = Crc32Writer::new(&mut w);

    // A minimal section body: just the descriptor loop.
    let mut body = Vec::new();
    let mut bw = BitWriter::new(&mut body);
    write_descriptors_with_length(&mut bw, &ds).unwrap();
    cw.write_slice(&body);

    let sum = cw.sum32();
    cw.writer().write_u32(sum);
    w.status().unwrap();

    assert_eq!(section.len(), body.len() + 4);
    assert_eq!(
        &section[section.len() - 4..],
        sum.to_be_bytes().as_slice()
    );
}
