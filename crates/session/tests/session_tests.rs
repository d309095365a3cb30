//! Integration tests for the session engine: negotiation, framing,
//! dispatch order, write queue behavior and direction/capability legality.

mod common;

use bytes::Bytes;
use common::*;
use protocol::types::*;
use protocol::{Capability, CapabilitySet, Packet, encode_packet};
use session::{Session, SessionError};

fn typical_caps() -> Vec<Capability> {
    vec![
        Capability::ConnectDeviceVersion,
        Capability::Filter,
        Capability::EpInfoMaxPacketSize,
    ]
}

#[test]
fn test_hello_exchange_fixes_intersection() {
    let mut host = Session::new(host_config(&[
        Capability::ConnectDeviceVersion,
        Capability::Filter,
        Capability::Ids64Bit,
    ]))
    .unwrap();
    let mut guest = Session::new(guest_config(&[
        Capability::ConnectDeviceVersion,
        Capability::Filter,
    ]))
    .unwrap();

    let (host_handler, guest_handler) = exchange_hellos(&mut host, &mut guest);

    for session in [&host, &guest] {
        let effective = session.effective_capabilities();
        assert!(effective.has(Capability::ConnectDeviceVersion));
        assert!(effective.has(Capability::Filter));
        assert!(!effective.has(Capability::Ids64Bit));
    }
    assert!(host_handler.events[0].starts_with("hello usb-bridge"));
    assert!(guest_handler.events[0].starts_with("hello usb-bridge"));
}

#[test]
fn test_packet_before_hello_rejected() {
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let mut handler = RecordingHandler::new();

    let stray = encode_packet(
        &Packet::DeviceConnect(DeviceConnectHeader::default()),
        0,
        &CapabilitySet::new(),
    )
    .unwrap();
    let result = feed(&mut guest, &stray, &mut handler);
    assert!(matches!(
        result,
        Err(SessionError::PacketBeforeHello { .. })
    ));
    assert!(handler.events.is_empty());
}

#[test]
fn test_second_hello_rejected() {
    let mut host = Session::new(host_config(&[])).unwrap();
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let hello = drain(&mut guest);

    let mut handler = RecordingHandler::new();
    feed(&mut host, &hello, &mut handler).unwrap();
    assert!(host.is_negotiated());

    let result = feed(&mut host, &hello, &mut handler);
    assert!(matches!(result, Err(SessionError::UnexpectedHello)));
}

/// Builds a host-to-guest stream with several packet shapes: the host's
/// hello, device metadata, and data packets with payloads.
fn host_stream() -> Vec<u8> {
    let mut host = Session::new(host_config(&typical_caps())).unwrap();
    let mut guest = Session::new(guest_config(&typical_caps())).unwrap();
    let guest_hello = drain(&mut guest);
    let mut handler = RecordingHandler::new();
    feed(&mut host, &guest_hello, &mut handler).unwrap();

    host.enqueue(
        0,
        &Packet::DeviceConnect(DeviceConnectHeader {
            speed: speed::HIGH,
            device_class: 0,
            device_subclass: 0,
            device_protocol: 0,
            vendor_id: 0x0951,
            product_id: 0x1666,
            device_version_bcd: 0x0110,
        }),
    )
    .unwrap();

    let mut ep_info = EpInfoHeader::default();
    ep_info.ep_type[1] = ep_type::BULK;
    ep_info.max_packet_size[1] = 512;
    host.enqueue(0, &Packet::EpInfo(ep_info)).unwrap();

    host.enqueue(
        7,
        &Packet::ControlPacket {
            header: ControlPacketHeader {
                endpoint: 0x80,
                request: 6,
                requesttype: 0x80,
                status: transfer_status::SUCCESS,
                value: 0x0100,
                index: 0,
                length: 18,
            },
            data: Bytes::from_static(&[0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x40]),
        },
    )
    .unwrap();

    host.enqueue(
        8,
        &Packet::InterruptPacket {
            header: InterruptPacketHeader {
                endpoint: 0x81,
                status: transfer_status::SUCCESS,
                length: 8,
            },
            data: Bytes::from_static(&[0, 0, 4, 0, 0, 0, 0, 0]),
        },
    )
    .unwrap();

    drain(&mut host)
}

fn dispatch_events(stream_parts: &[&[u8]]) -> Vec<String> {
    let mut guest = Session::new(guest_config(&typical_caps())).unwrap();
    let mut handler = RecordingHandler::new();
    for part in stream_parts {
        feed(&mut guest, part, &mut handler).expect("read step");
    }
    handler.events
}

#[test]
fn test_split_stream_dispatches_identically() {
    let stream = host_stream();
    let whole = dispatch_events(&[&stream]);
    assert_eq!(whole.len(), 5); // hello + four packets

    for split in 1..stream.len() {
        let parts = dispatch_events(&[&stream[..split], &stream[split..]]);
        assert_eq!(parts, whole, "split at {split} changed dispatch");
    }
}

#[test]
fn test_byte_at_a_time_delivery() {
    let stream = host_stream();
    let mut guest = Session::new(guest_config(&typical_caps())).unwrap();
    let mut handler = RecordingHandler::new();
    for byte in &stream {
        feed(&mut guest, std::slice::from_ref(byte), &mut handler).unwrap();
    }
    assert_eq!(handler.events, dispatch_events(&[&stream]));
}

#[test]
fn test_oversized_length_aborts_without_dispatch() {
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let mut host = Session::new(host_config(&[])).unwrap();
    let mut handler = RecordingHandler::new();
    feed(&mut guest, &drain(&mut host), &mut handler).unwrap();
    let dispatched_before = handler.events.len();

    // Bulk packet claiming 64 MiB, no 32-bit length capability
    let mut bogus = Vec::new();
    bogus.extend_from_slice(&101u32.to_le_bytes());
    bogus.extend_from_slice(&(64 * 1024 * 1024u32).to_le_bytes());
    bogus.extend_from_slice(&0u32.to_le_bytes());

    let result = feed(&mut guest, &bogus, &mut handler);
    assert!(matches!(result, Err(SessionError::Protocol(_))));
    assert_eq!(handler.events.len(), dispatched_before);
}

#[test]
fn test_enqueue_requires_negotiation() {
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let result = guest.enqueue(0, &Packet::Reset);
    assert!(matches!(result, Err(SessionError::NotNegotiated)));
}

#[test]
fn test_direction_legality_enforced() {
    let mut host = Session::new(host_config(&[])).unwrap();
    let mut guest = Session::new(guest_config(&[])).unwrap();
    exchange_hellos(&mut host, &mut guest);

    let result = guest.enqueue(0, &Packet::DeviceConnect(DeviceConnectHeader::default()));
    assert!(matches!(
        result,
        Err(SessionError::IllegalDirection { .. })
    ));

    let result = host.enqueue(0, &Packet::Reset);
    assert!(matches!(
        result,
        Err(SessionError::IllegalDirection { .. })
    ));

    // The legal directions go through
    guest.enqueue(0, &Packet::Reset).unwrap();
    host.enqueue(0, &Packet::DeviceConnect(DeviceConnectHeader::default()))
        .unwrap();
}

#[test]
fn test_write_queue_is_fifo_under_partial_acceptance() {
    let mut host = Session::new(host_config(&[])).unwrap();
    let mut guest = Session::new(guest_config(&[])).unwrap();
    exchange_hellos(&mut host, &mut guest);

    for i in 0..5u8 {
        guest
            .enqueue(
                u64::from(i),
                &Packet::InterruptPacket {
                    header: InterruptPacketHeader {
                        endpoint: 0x02,
                        status: 0,
                        length: 4,
                    },
                    data: Bytes::copy_from_slice(&[i, i, i, i]),
                },
            )
            .unwrap();
    }

    // Reference: an unconstrained drain of an identically-built session
    let mut reference = Session::new(guest_config(&[])).unwrap();
    let mut host2 = Session::new(host_config(&[])).unwrap();
    exchange_hellos(&mut host2, &mut reference);
    for i in 0..5u8 {
        reference
            .enqueue(
                u64::from(i),
                &Packet::InterruptPacket {
                    header: InterruptPacketHeader {
                        endpoint: 0x02,
                        status: 0,
                        length: 4,
                    },
                    data: Bytes::copy_from_slice(&[i, i, i, i]),
                },
            )
            .unwrap();
    }
    let expected = drain(&mut reference);

    let mut transport = VecTransport::new();
    transport.write_chunk = 3;
    while guest.has_pending() {
        guest.write_step(&mut transport).unwrap();
    }
    assert_eq!(transport.outgoing, expected);
}

#[test]
fn test_cancel_is_advisory() {
    let mut host = Session::new(host_config(&[])).unwrap();
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let (mut host_handler, mut guest_handler) = exchange_hellos(&mut host, &mut guest);

    // Guest cancels request 99, host sees the hint
    guest.enqueue(99, &Packet::CancelDataPacket).unwrap();
    feed(&mut host, &drain(&mut guest), &mut host_handler).unwrap();
    assert!(host_handler.events.contains(&"cancel_data_packet 99".to_string()));

    // The response arrives anyway and is still dispatched
    host.enqueue(
        99,
        &Packet::ControlPacket {
            header: ControlPacketHeader {
                status: transfer_status::CANCELLED,
                ..Default::default()
            },
            data: Bytes::new(),
        },
    )
    .unwrap();
    feed(&mut guest, &drain(&mut host), &mut guest_handler).unwrap();
    assert!(
        guest_handler
            .events
            .iter()
            .any(|e| e.starts_with("control_packet 99"))
    );
}

#[test]
fn test_wide_ids_end_to_end() {
    let caps = [Capability::Ids64Bit];
    let mut host = Session::new(host_config(&caps)).unwrap();
    let mut guest = Session::new(guest_config(&caps)).unwrap();
    let (mut host_handler, _) = exchange_hellos(&mut host, &mut guest);

    let big_id = 1u64 << 40;
    guest
        .enqueue(big_id, &Packet::GetConfiguration)
        .unwrap();
    feed(&mut host, &drain(&mut guest), &mut host_handler).unwrap();
    assert!(
        host_handler
            .events
            .contains(&format!("get_configuration {big_id}"))
    );
}

#[test]
fn test_narrow_session_rejects_wide_id() {
    let mut host = Session::new(host_config(&[])).unwrap();
    let mut guest = Session::new(guest_config(&[])).unwrap();
    exchange_hellos(&mut host, &mut guest);

    let result = guest.enqueue(1u64 << 40, &Packet::GetConfiguration);
    assert!(matches!(result, Err(SessionError::Protocol(_))));
}

#[test]
fn test_transaction_ids_monotonic() {
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let ids: Vec<u64> = (0..4).map(|_| guest.next_transaction_id()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[test]
fn test_gated_field_zeroed_when_peer_lacks_capability() {
    // Host offers the bcd-version field, guest does not: the effective set
    // drops it and the field must arrive zeroed.
    let mut host = Session::new(host_config(&[Capability::ConnectDeviceVersion])).unwrap();
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let (_, mut guest_handler) = exchange_hellos(&mut host, &mut guest);

    host.enqueue(
        0,
        &Packet::DeviceConnect(DeviceConnectHeader {
            vendor_id: 0x1d6b,
            product_id: 0x0002,
            device_version_bcd: 0x0123,
            ..Default::default()
        }),
    )
    .unwrap();
    feed(&mut guest, &drain(&mut host), &mut guest_handler).unwrap();

    let event = guest_handler
        .events
        .iter()
        .find(|e| e.starts_with("device_connect"))
        .expect("device connect dispatched");
    assert!(event.contains("device_version_bcd: 0"));
    assert!(!event.contains("device_version_bcd: 291")); // 0x0123
}

#[test]
fn test_gated_kind_rejected_on_receive_without_capability() {
    let mut host = Session::new(host_config(&[])).unwrap();
    let mut guest = Session::new(guest_config(&[])).unwrap();
    let (mut host_handler, _) = exchange_hellos(&mut host, &mut guest);

    // Craft a filter packet as a peer that (wrongly) assumes the capability
    let filter_caps = CapabilitySet::with(&[Capability::Filter]);
    let rogue = encode_packet(
        &Packet::FilterFilter {
            rules_text: Bytes::from_static(b"-1,-1,-1,-1,1"),
        },
        0,
        &filter_caps,
    )
    .unwrap();

    let result = feed(&mut host, &rogue, &mut host_handler);
    assert!(matches!(result, Err(SessionError::Protocol(_))));
    assert!(!host_handler.events.iter().any(|e| e.starts_with("filter")));
}

#[test]
fn test_filter_rules_reach_handler_with_capability() {
    let caps = [Capability::Filter];
    let mut host = Session::new(host_config(&caps)).unwrap();
    let mut guest = Session::new(guest_config(&caps)).unwrap();
    let (mut host_handler, _) = exchange_hellos(&mut host, &mut guest);

    guest
        .enqueue(
            0,
            &Packet::FilterFilter {
                rules_text: Bytes::from_static(b"0x08,-1,-1,-1,0|-1,-1,-1,-1,1"),
            },
        )
        .unwrap();
    feed(&mut host, &drain(&mut guest), &mut host_handler).unwrap();
    assert!(
        host_handler
            .events
            .contains(&"filter_filter 0x08,-1,-1,-1,0|-1,-1,-1,-1,1".to_string())
    );
}
