//! Fixed little-endian wire codecs
//!
//! Every packet starts with a generic header (type, declared length,
//! transaction id) followed by a type-specific header and, for data kinds,
//! a payload. The declared length counts everything after the generic
//! header and is fully attacker-controlled: [`max_wire_length`] must be
//! consulted *before* buffering or allocating for a packet body, and
//! [`decode_body`] re-validates the exact layout afterwards.
//!
//! The transaction id is 32 bits wide unless both sides negotiated
//! [`Capability::Ids64Bit`]; hello packets always use the 32-bit form since
//! they precede negotiation.

use crate::caps::{CAPS_WORDS, Capability, CapabilitySet};
use crate::error::{ProtocolError, Result};
use crate::packet::{Packet, PacketKind};
use crate::types::*;
use crate::version::{VERSION_STRING_SIZE, decode_version, encode_version};
use bytes::{Buf, BufMut, Bytes};

/// Generic header size with 32-bit transaction ids.
pub const GENERIC_HEADER_32: usize = 12;
/// Generic header size once 64-bit transaction ids are negotiated.
pub const GENERIC_HEADER_64: usize = 16;

/// Hard cap on the declared body length of any packet.
///
/// The first line of defense against memory exhaustion from a hostile
/// length field; per-kind maxima below are all tighter or equal.
pub const MAX_PACKET_SIZE: u32 = 32 * 1024 * 1024;

/// Payload cap for transfers whose wire length field is 16 bits wide
/// (control, iso, interrupt, bulk without [`Capability::Bulk32BitLength`])
/// and for filter rule text.
pub const MAX_TRANSFER_PAYLOAD: u32 = 64 * 1024;

const CONTROL_HEADER: usize = 10;
const BULK_HEADER_SHORT: usize = 8;
const BULK_HEADER_LONG: usize = 10;
const ISO_HEADER: usize = 4;
const INTERRUPT_HEADER: usize = 4;
const BUFFERED_BULK_HEADER: usize = 10;
const INTERFACE_INFO_LEN: usize = 4 + 4 * ENDPOINT_SLOTS;
const EP_INFO_BASE: usize = 3 * ENDPOINT_SLOTS;
const EP_INFO_WITH_MPS: usize = EP_INFO_BASE + 2 * ENDPOINT_SLOTS;
const EP_INFO_FULL: usize = EP_INFO_WITH_MPS + 4 * ENDPOINT_SLOTS;
const DEVICE_CONNECT_SHORT: usize = 8;
const DEVICE_CONNECT_LONG: usize = 10;

/// Generic header size for the given id width.
pub fn generic_header_len(wide_ids: bool) -> usize {
    if wide_ids {
        GENERIC_HEADER_64
    } else {
        GENERIC_HEADER_32
    }
}

/// The decoded generic header of a packet.
///
/// `kind_raw` is kept as received so the framer can report unknown types;
/// `id` is widened to u64 regardless of the wire width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericHeader {
    pub kind_raw: u32,
    pub length: u32,
    pub id: u64,
}

impl GenericHeader {
    /// Decode from the front of `buf`, or `None` if too few bytes are
    /// buffered yet.
    pub fn decode(buf: &[u8], wide_ids: bool) -> Option<GenericHeader> {
        if buf.len() < generic_header_len(wide_ids) {
            return None;
        }
        let mut b = buf;
        let kind_raw = b.get_u32_le();
        let length = b.get_u32_le();
        let id = if wide_ids {
            b.get_u64_le()
        } else {
            u64::from(b.get_u32_le())
        };
        Some(GenericHeader {
            kind_raw,
            length,
            id,
        })
    }
}

/// Maximum body length a packet of `kind` may declare under the given
/// effective capabilities.
///
/// Checking against this bound before buffering the body is the no-overflow
/// invariant of the read path: nothing larger than the bound is ever
/// allocated, no matter what the peer declares.
pub fn max_wire_length(kind: PacketKind, caps: &CapabilitySet) -> u32 {
    use PacketKind::*;
    match kind {
        Hello => (VERSION_STRING_SIZE + 4 * CAPS_WORDS) as u32,
        DeviceConnect => DEVICE_CONNECT_LONG as u32,
        DeviceDisconnect | Reset | GetConfiguration | CancelDataPacket | FilterReject
        | DeviceDisconnectAck => 0,
        InterfaceInfo => INTERFACE_INFO_LEN as u32,
        EpInfo => EP_INFO_FULL as u32,
        SetConfiguration => 1,
        ConfigurationStatus => 2,
        SetAltSetting => 2,
        GetAltSetting => 1,
        AltSettingStatus => 3,
        StartIsoStream => 3,
        StopIsoStream => 1,
        IsoStreamStatus => 2,
        StartInterruptReceiving | StopInterruptReceiving => 1,
        InterruptReceivingStatus => 2,
        AllocBulkStreams => 8,
        FreeBulkStreams => 4,
        BulkStreamsStatus => 9,
        StartBulkReceiving => 10,
        StopBulkReceiving => 5,
        BulkReceivingStatus => 6,
        FilterFilter => MAX_TRANSFER_PAYLOAD,
        ControlPacket => CONTROL_HEADER as u32 + MAX_TRANSFER_PAYLOAD,
        IsoPacket => ISO_HEADER as u32 + MAX_TRANSFER_PAYLOAD,
        InterruptPacket => INTERRUPT_HEADER as u32 + MAX_TRANSFER_PAYLOAD,
        BulkPacket => {
            if caps.has(Capability::Bulk32BitLength) {
                MAX_PACKET_SIZE
            } else {
                BULK_HEADER_SHORT as u32 + MAX_TRANSFER_PAYLOAD
            }
        }
        BufferedBulkPacket => MAX_PACKET_SIZE,
    }
}

fn expect_len(kind: PacketKind, body: &[u8], expected: usize) -> Result<()> {
    if body.len() != expected {
        return Err(ProtocolError::HeaderLengthMismatch {
            kind,
            declared: body.len() as u32,
        });
    }
    Ok(())
}

fn split_payload(kind: PacketKind, body: Bytes, header_len: usize) -> Result<(Bytes, Bytes)> {
    if body.len() < header_len {
        return Err(ProtocolError::HeaderLengthMismatch {
            kind,
            declared: body.len() as u32,
        });
    }
    let payload = body.slice(header_len..);
    Ok((body, payload))
}

/// Decode a complete packet body (everything after the generic header).
///
/// `body.len()` must already have passed the [`max_wire_length`] bound.
/// Capability-gated trailing fields are decoded when present on the wire
/// and read as zero when the capability is not in `caps`, regardless of
/// what the peer sent.
pub fn decode_body(kind: PacketKind, body: Bytes, caps: &CapabilitySet) -> Result<Packet> {
    use PacketKind::*;
    match kind {
        Hello => decode_hello(&body),
        DeviceConnect => decode_device_connect(&body, caps),
        DeviceDisconnect => {
            expect_len(kind, &body, 0)?;
            Ok(Packet::DeviceDisconnect)
        }
        Reset => {
            expect_len(kind, &body, 0)?;
            Ok(Packet::Reset)
        }
        InterfaceInfo => decode_interface_info(&body),
        EpInfo => decode_ep_info(&body, caps),
        SetConfiguration => {
            expect_len(kind, &body, 1)?;
            Ok(Packet::SetConfiguration(SetConfigurationHeader {
                configuration: body[0],
            }))
        }
        GetConfiguration => {
            expect_len(kind, &body, 0)?;
            Ok(Packet::GetConfiguration)
        }
        ConfigurationStatus => {
            expect_len(kind, &body, 2)?;
            Ok(Packet::ConfigurationStatus(ConfigurationStatusHeader {
                status: body[0],
                configuration: body[1],
            }))
        }
        SetAltSetting => {
            expect_len(kind, &body, 2)?;
            Ok(Packet::SetAltSetting(SetAltSettingHeader {
                interface: body[0],
                alt: body[1],
            }))
        }
        GetAltSetting => {
            expect_len(kind, &body, 1)?;
            Ok(Packet::GetAltSetting(GetAltSettingHeader {
                interface: body[0],
            }))
        }
        AltSettingStatus => {
            expect_len(kind, &body, 3)?;
            Ok(Packet::AltSettingStatus(AltSettingStatusHeader {
                status: body[0],
                interface: body[1],
                alt: body[2],
            }))
        }
        StartIsoStream => {
            expect_len(kind, &body, 3)?;
            Ok(Packet::StartIsoStream(StartIsoStreamHeader {
                endpoint: body[0],
                pkts_per_transfer: body[1],
                transfer_count: body[2],
            }))
        }
        StopIsoStream => {
            expect_len(kind, &body, 1)?;
            Ok(Packet::StopIsoStream(StopIsoStreamHeader {
                endpoint: body[0],
            }))
        }
        IsoStreamStatus => {
            expect_len(kind, &body, 2)?;
            Ok(Packet::IsoStreamStatus(IsoStreamStatusHeader {
                status: body[0],
                endpoint: body[1],
            }))
        }
        StartInterruptReceiving => {
            expect_len(kind, &body, 1)?;
            Ok(Packet::StartInterruptReceiving(
                StartInterruptReceivingHeader { endpoint: body[0] },
            ))
        }
        StopInterruptReceiving => {
            expect_len(kind, &body, 1)?;
            Ok(Packet::StopInterruptReceiving(
                StopInterruptReceivingHeader { endpoint: body[0] },
            ))
        }
        InterruptReceivingStatus => {
            expect_len(kind, &body, 2)?;
            Ok(Packet::InterruptReceivingStatus(
                InterruptReceivingStatusHeader {
                    status: body[0],
                    endpoint: body[1],
                },
            ))
        }
        AllocBulkStreams => {
            expect_len(kind, &body, 8)?;
            let mut b = &body[..];
            Ok(Packet::AllocBulkStreams(AllocBulkStreamsHeader {
                endpoints: b.get_u32_le(),
                stream_count: b.get_u32_le(),
            }))
        }
        FreeBulkStreams => {
            expect_len(kind, &body, 4)?;
            let mut b = &body[..];
            Ok(Packet::FreeBulkStreams(FreeBulkStreamsHeader {
                endpoints: b.get_u32_le(),
            }))
        }
        BulkStreamsStatus => {
            expect_len(kind, &body, 9)?;
            let mut b = &body[..];
            Ok(Packet::BulkStreamsStatus(BulkStreamsStatusHeader {
                endpoints: b.get_u32_le(),
                stream_count: b.get_u32_le(),
                status: b.get_u8(),
            }))
        }
        CancelDataPacket => {
            expect_len(kind, &body, 0)?;
            Ok(Packet::CancelDataPacket)
        }
        FilterReject => {
            expect_len(kind, &body, 0)?;
            Ok(Packet::FilterReject)
        }
        FilterFilter => {
            // Tolerate one trailing NUL; some senders terminate the text.
            let end = match body.last() {
                Some(0) => body.len() - 1,
                _ => body.len(),
            };
            Ok(Packet::FilterFilter {
                rules_text: body.slice(..end),
            })
        }
        DeviceDisconnectAck => {
            expect_len(kind, &body, 0)?;
            Ok(Packet::DeviceDisconnectAck)
        }
        StartBulkReceiving => {
            expect_len(kind, &body, 10)?;
            let mut b = &body[..];
            Ok(Packet::StartBulkReceiving(StartBulkReceivingHeader {
                stream_id: b.get_u32_le(),
                bytes_per_transfer: b.get_u32_le(),
                endpoint: b.get_u8(),
                transfer_count: b.get_u8(),
            }))
        }
        StopBulkReceiving => {
            expect_len(kind, &body, 5)?;
            let mut b = &body[..];
            Ok(Packet::StopBulkReceiving(StopBulkReceivingHeader {
                stream_id: b.get_u32_le(),
                endpoint: b.get_u8(),
            }))
        }
        BulkReceivingStatus => {
            expect_len(kind, &body, 6)?;
            let mut b = &body[..];
            Ok(Packet::BulkReceivingStatus(BulkReceivingStatusHeader {
                stream_id: b.get_u32_le(),
                endpoint: b.get_u8(),
                status: b.get_u8(),
            }))
        }
        ControlPacket => {
            let (body, data) = split_payload(kind, body, CONTROL_HEADER)?;
            let mut b = &body[..];
            Ok(Packet::ControlPacket {
                header: ControlPacketHeader {
                    endpoint: b.get_u8(),
                    request: b.get_u8(),
                    requesttype: b.get_u8(),
                    status: b.get_u8(),
                    value: b.get_u16_le(),
                    index: b.get_u16_le(),
                    length: b.get_u16_le(),
                },
                data,
            })
        }
        BulkPacket => decode_bulk(body, caps),
        IsoPacket => {
            let (body, data) = split_payload(kind, body, ISO_HEADER)?;
            let mut b = &body[..];
            Ok(Packet::IsoPacket {
                header: IsoPacketHeader {
                    endpoint: b.get_u8(),
                    status: b.get_u8(),
                    length: b.get_u16_le(),
                },
                data,
            })
        }
        InterruptPacket => {
            let (body, data) = split_payload(kind, body, INTERRUPT_HEADER)?;
            let mut b = &body[..];
            Ok(Packet::InterruptPacket {
                header: InterruptPacketHeader {
                    endpoint: b.get_u8(),
                    status: b.get_u8(),
                    length: b.get_u16_le(),
                },
                data,
            })
        }
        BufferedBulkPacket => {
            let (body, data) = split_payload(kind, body, BUFFERED_BULK_HEADER)?;
            let mut b = &body[..];
            Ok(Packet::BufferedBulkPacket {
                header: BufferedBulkPacketHeader {
                    stream_id: b.get_u32_le(),
                    length: b.get_u32_le(),
                    endpoint: b.get_u8(),
                    status: b.get_u8(),
                },
                data,
            })
        }
    }
}

fn decode_hello(body: &[u8]) -> Result<Packet> {
    if body.len() < VERSION_STRING_SIZE {
        return Err(ProtocolError::MalformedHello {
            reason: "version field truncated",
        });
    }
    let caps_bytes = body.len() - VERSION_STRING_SIZE;
    if caps_bytes % 4 != 0 {
        return Err(ProtocolError::MalformedHello {
            reason: "capability array not word-aligned",
        });
    }
    let n_words = caps_bytes / 4;
    if n_words > CAPS_WORDS {
        return Err(ProtocolError::MalformedHello {
            reason: "capability array too long",
        });
    }
    let version = decode_version(&body[..VERSION_STRING_SIZE]);
    let mut words = [0u32; CAPS_WORDS];
    let mut b = &body[VERSION_STRING_SIZE..];
    for word in words.iter_mut().take(n_words) {
        *word = b.get_u32_le();
    }
    Ok(Packet::Hello {
        version,
        capabilities: CapabilitySet::from_words(&words),
    })
}

fn decode_device_connect(body: &[u8], caps: &CapabilitySet) -> Result<Packet> {
    if body.len() != DEVICE_CONNECT_SHORT && body.len() != DEVICE_CONNECT_LONG {
        return Err(ProtocolError::HeaderLengthMismatch {
            kind: PacketKind::DeviceConnect,
            declared: body.len() as u32,
        });
    }
    let mut b = body;
    let mut header = DeviceConnectHeader {
        speed: b.get_u8(),
        device_class: b.get_u8(),
        device_subclass: b.get_u8(),
        device_protocol: b.get_u8(),
        vendor_id: b.get_u16_le(),
        product_id: b.get_u16_le(),
        device_version_bcd: 0,
    };
    if body.len() == DEVICE_CONNECT_LONG && caps.has(Capability::ConnectDeviceVersion) {
        header.device_version_bcd = b.get_u16_le();
    }
    Ok(Packet::DeviceConnect(header))
}

fn decode_interface_info(body: &[u8]) -> Result<Packet> {
    expect_len(PacketKind::InterfaceInfo, body, INTERFACE_INFO_LEN)?;
    let mut b = body;
    let mut header = InterfaceInfoHeader {
        interface_count: b.get_u32_le(),
        ..Default::default()
    };
    if header.interface_count > ENDPOINT_SLOTS as u32 {
        return Err(ProtocolError::InterfaceCountOutOfRange {
            count: header.interface_count,
            max: ENDPOINT_SLOTS as u32,
        });
    }
    b.copy_to_slice(&mut header.interface);
    b.copy_to_slice(&mut header.interface_class);
    b.copy_to_slice(&mut header.interface_subclass);
    b.copy_to_slice(&mut header.interface_protocol);
    Ok(Packet::InterfaceInfo(header))
}

fn decode_ep_info(body: &[u8], caps: &CapabilitySet) -> Result<Packet> {
    if body.len() != EP_INFO_BASE && body.len() != EP_INFO_WITH_MPS && body.len() != EP_INFO_FULL {
        return Err(ProtocolError::HeaderLengthMismatch {
            kind: PacketKind::EpInfo,
            declared: body.len() as u32,
        });
    }
    let mut b = body;
    let mut header = EpInfoHeader::default();
    b.copy_to_slice(&mut header.ep_type);
    b.copy_to_slice(&mut header.interval);
    b.copy_to_slice(&mut header.interface);
    if body.len() >= EP_INFO_WITH_MPS {
        if caps.has(Capability::EpInfoMaxPacketSize) {
            for slot in header.max_packet_size.iter_mut() {
                *slot = b.get_u16_le();
            }
        } else {
            b.advance(2 * ENDPOINT_SLOTS);
        }
    }
    if body.len() == EP_INFO_FULL {
        if caps.has(Capability::BulkStreams) {
            for slot in header.max_streams.iter_mut() {
                *slot = b.get_u32_le();
            }
        } else {
            b.advance(4 * ENDPOINT_SLOTS);
        }
    }
    Ok(Packet::EpInfo(header))
}

fn decode_bulk(body: Bytes, caps: &CapabilitySet) -> Result<Packet> {
    let header_len = if caps.has(Capability::Bulk32BitLength) {
        BULK_HEADER_LONG
    } else {
        BULK_HEADER_SHORT
    };
    let (body, data) = split_payload(PacketKind::BulkPacket, body, header_len)?;
    let mut b = &body[..];
    let mut header = BulkPacketHeader {
        endpoint: b.get_u8(),
        status: b.get_u8(),
        length: b.get_u16_le(),
        stream_id: b.get_u32_le(),
        length_high: 0,
    };
    if header_len == BULK_HEADER_LONG {
        header.length_high = b.get_u16_le();
    }
    Ok(Packet::BulkPacket { header, data })
}

fn check_payload(kind: PacketKind, len: usize, max: u32) -> Result<()> {
    if len as u64 > u64::from(max) {
        return Err(ProtocolError::PayloadTooLarge { kind, len, max });
    }
    Ok(())
}

/// Serialize a complete packet: generic header, type header, payload.
///
/// `caps` is the session's effective set; it selects the id width, which
/// capability-gated fields go on the wire, and the payload bounds. Gated
/// kinds fail here with [`ProtocolError::CapabilityRequired`] rather than
/// producing a packet the peer would reject.
pub fn encode_packet(packet: &Packet, id: u64, caps: &CapabilitySet) -> Result<Vec<u8>> {
    let kind = packet.kind();
    if let Some(cap) = kind.required_capability() {
        if !caps.has(cap) {
            return Err(ProtocolError::CapabilityRequired { kind, cap });
        }
    }

    let wide_ids = kind != PacketKind::Hello && caps.has(Capability::Ids64Bit);
    if !wide_ids && id > u64::from(u32::MAX) {
        return Err(ProtocolError::IdOutOfRange { id });
    }

    let mut body: Vec<u8> = Vec::new();
    encode_body(packet, caps, &mut body)?;
    debug_assert!(body.len() as u32 <= max_wire_length(kind, caps));

    let mut out = Vec::with_capacity(generic_header_len(wide_ids) + body.len());
    out.put_u32_le(kind.to_wire());
    out.put_u32_le(body.len() as u32);
    if wide_ids {
        out.put_u64_le(id);
    } else {
        out.put_u32_le(id as u32);
    }
    out.extend_from_slice(&body);
    Ok(out)
}

fn encode_body(packet: &Packet, caps: &CapabilitySet, out: &mut Vec<u8>) -> Result<()> {
    match packet {
        Packet::Hello {
            version,
            capabilities,
        } => {
            out.extend_from_slice(&encode_version(version));
            for word in capabilities.words() {
                out.put_u32_le(*word);
            }
        }
        Packet::DeviceConnect(h) => {
            out.put_u8(h.speed);
            out.put_u8(h.device_class);
            out.put_u8(h.device_subclass);
            out.put_u8(h.device_protocol);
            out.put_u16_le(h.vendor_id);
            out.put_u16_le(h.product_id);
            if caps.has(Capability::ConnectDeviceVersion) {
                out.put_u16_le(h.device_version_bcd);
            }
        }
        Packet::DeviceDisconnect
        | Packet::Reset
        | Packet::GetConfiguration
        | Packet::CancelDataPacket
        | Packet::FilterReject
        | Packet::DeviceDisconnectAck => {}
        Packet::InterfaceInfo(h) => {
            if h.interface_count > ENDPOINT_SLOTS as u32 {
                return Err(ProtocolError::InterfaceCountOutOfRange {
                    count: h.interface_count,
                    max: ENDPOINT_SLOTS as u32,
                });
            }
            out.put_u32_le(h.interface_count);
            out.extend_from_slice(&h.interface);
            out.extend_from_slice(&h.interface_class);
            out.extend_from_slice(&h.interface_subclass);
            out.extend_from_slice(&h.interface_protocol);
        }
        Packet::EpInfo(h) => {
            out.extend_from_slice(&h.ep_type);
            out.extend_from_slice(&h.interval);
            out.extend_from_slice(&h.interface);
            if caps.has(Capability::EpInfoMaxPacketSize) {
                for slot in &h.max_packet_size {
                    out.put_u16_le(*slot);
                }
                if caps.has(Capability::BulkStreams) {
                    for slot in &h.max_streams {
                        out.put_u32_le(*slot);
                    }
                }
            }
        }
        Packet::SetConfiguration(h) => out.put_u8(h.configuration),
        Packet::ConfigurationStatus(h) => {
            out.put_u8(h.status);
            out.put_u8(h.configuration);
        }
        Packet::SetAltSetting(h) => {
            out.put_u8(h.interface);
            out.put_u8(h.alt);
        }
        Packet::GetAltSetting(h) => out.put_u8(h.interface),
        Packet::AltSettingStatus(h) => {
            out.put_u8(h.status);
            out.put_u8(h.interface);
            out.put_u8(h.alt);
        }
        Packet::StartIsoStream(h) => {
            out.put_u8(h.endpoint);
            out.put_u8(h.pkts_per_transfer);
            out.put_u8(h.transfer_count);
        }
        Packet::StopIsoStream(h) => out.put_u8(h.endpoint),
        Packet::IsoStreamStatus(h) => {
            out.put_u8(h.status);
            out.put_u8(h.endpoint);
        }
        Packet::StartInterruptReceiving(h) => out.put_u8(h.endpoint),
        Packet::StopInterruptReceiving(h) => out.put_u8(h.endpoint),
        Packet::InterruptReceivingStatus(h) => {
            out.put_u8(h.status);
            out.put_u8(h.endpoint);
        }
        Packet::AllocBulkStreams(h) => {
            out.put_u32_le(h.endpoints);
            out.put_u32_le(h.stream_count);
        }
        Packet::FreeBulkStreams(h) => out.put_u32_le(h.endpoints),
        Packet::BulkStreamsStatus(h) => {
            out.put_u32_le(h.endpoints);
            out.put_u32_le(h.stream_count);
            out.put_u8(h.status);
        }
        Packet::FilterFilter { rules_text } => {
            check_payload(
                PacketKind::FilterFilter,
                rules_text.len(),
                MAX_TRANSFER_PAYLOAD,
            )?;
            out.extend_from_slice(rules_text);
        }
        Packet::StartBulkReceiving(h) => {
            out.put_u32_le(h.stream_id);
            out.put_u32_le(h.bytes_per_transfer);
            out.put_u8(h.endpoint);
            out.put_u8(h.transfer_count);
        }
        Packet::StopBulkReceiving(h) => {
            out.put_u32_le(h.stream_id);
            out.put_u8(h.endpoint);
        }
        Packet::BulkReceivingStatus(h) => {
            out.put_u32_le(h.stream_id);
            out.put_u8(h.endpoint);
            out.put_u8(h.status);
        }
        Packet::ControlPacket { header: h, data } => {
            check_payload(PacketKind::ControlPacket, data.len(), MAX_TRANSFER_PAYLOAD)?;
            out.put_u8(h.endpoint);
            out.put_u8(h.request);
            out.put_u8(h.requesttype);
            out.put_u8(h.status);
            out.put_u16_le(h.value);
            out.put_u16_le(h.index);
            out.put_u16_le(h.length);
            out.extend_from_slice(data);
        }
        Packet::BulkPacket { header: h, data } => {
            let wide = caps.has(Capability::Bulk32BitLength);
            if !wide && h.length_high != 0 {
                return Err(ProtocolError::CapabilityRequired {
                    kind: PacketKind::BulkPacket,
                    cap: Capability::Bulk32BitLength,
                });
            }
            let max = if wide {
                MAX_PACKET_SIZE - BULK_HEADER_LONG as u32
            } else {
                MAX_TRANSFER_PAYLOAD
            };
            check_payload(PacketKind::BulkPacket, data.len(), max)?;
            out.put_u8(h.endpoint);
            out.put_u8(h.status);
            out.put_u16_le(h.length);
            out.put_u32_le(h.stream_id);
            if wide {
                out.put_u16_le(h.length_high);
            }
            out.extend_from_slice(data);
        }
        Packet::IsoPacket { header: h, data } => {
            check_payload(PacketKind::IsoPacket, data.len(), MAX_TRANSFER_PAYLOAD)?;
            out.put_u8(h.endpoint);
            out.put_u8(h.status);
            out.put_u16_le(h.length);
            out.extend_from_slice(data);
        }
        Packet::InterruptPacket { header: h, data } => {
            check_payload(PacketKind::InterruptPacket, data.len(), MAX_TRANSFER_PAYLOAD)?;
            out.put_u8(h.endpoint);
            out.put_u8(h.status);
            out.put_u16_le(h.length);
            out.extend_from_slice(data);
        }
        Packet::BufferedBulkPacket { header: h, data } => {
            check_payload(
                PacketKind::BufferedBulkPacket,
                data.len(),
                MAX_PACKET_SIZE - BUFFERED_BULK_HEADER as u32,
            )?;
            out.put_u32_le(h.stream_id);
            out.put_u32_le(h.length);
            out.put_u8(h.endpoint);
            out.put_u8(h.status);
            out.extend_from_slice(data);
        }
    }
    Ok(())
}
