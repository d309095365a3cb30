//! Wire protocol for usb-bridge
//!
//! This crate defines the framed binary protocol used to operate a USB device
//! across a byte-stream transport: packet kinds, their fixed little-endian
//! header layouts, the capability bit set negotiated at session start, and
//! the structural limits a receiver must enforce before trusting a declared
//! packet length.
//!
//! The crate performs no I/O. The `session` crate drives these codecs from
//! its read framer and write queue.
//!
//! # Example
//!
//! ```
//! use protocol::{Capability, CapabilitySet, Packet, PacketKind};
//! use protocol::types::DeviceConnectHeader;
//!
//! let mut caps = CapabilitySet::default();
//! caps.set(Capability::ConnectDeviceVersion);
//!
//! let packet = Packet::DeviceConnect(DeviceConnectHeader {
//!     speed: protocol::types::speed::HIGH,
//!     device_class: 0x08,
//!     device_subclass: 0x06,
//!     device_protocol: 0x50,
//!     vendor_id: 0x1234,
//!     product_id: 0x5678,
//!     device_version_bcd: 0x0100,
//! });
//! assert_eq!(packet.kind(), PacketKind::DeviceConnect);
//!
//! let bytes = protocol::encode_packet(&packet, 0, &caps).unwrap();
//! assert_eq!(&bytes[..4], &1u32.to_le_bytes());
//! ```

pub mod caps;
pub mod error;
pub mod packet;
pub mod types;
pub mod version;
pub mod wire;

pub use caps::{CAPS_WORDS, Capability, CapabilitySet};
pub use error::{ProtocolError, Result};
pub use packet::{Packet, PacketKind};
pub use version::{BRIDGE_VERSION, VERSION_STRING_SIZE};
pub use wire::{
    GENERIC_HEADER_32, GENERIC_HEADER_64, GenericHeader, MAX_PACKET_SIZE, MAX_TRANSFER_PAYLOAD,
    decode_body, encode_packet, generic_header_len, max_wire_length,
};
