//! Packet model
//!
//! [`PacketKind`] is the closed set of packet type tags carried in the
//! generic header; [`Packet`] is the decoded discriminated union the
//! dispatcher matches on. Data-bearing variants own their payload as a
//! [`Bytes`] buffer: ownership moves to the handler on dispatch and the
//! buffer is released by dropping it.

use crate::caps::Capability;
use crate::error::{ProtocolError, Result};
use crate::types::*;
use bytes::Bytes;

/// Wire tag of every packet type, as carried in the generic header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PacketKind {
    Hello = 0,
    DeviceConnect = 1,
    DeviceDisconnect = 2,
    Reset = 3,
    InterfaceInfo = 4,
    EpInfo = 5,
    SetConfiguration = 6,
    GetConfiguration = 7,
    ConfigurationStatus = 8,
    SetAltSetting = 9,
    GetAltSetting = 10,
    AltSettingStatus = 11,
    StartIsoStream = 12,
    StopIsoStream = 13,
    IsoStreamStatus = 14,
    StartInterruptReceiving = 15,
    StopInterruptReceiving = 16,
    InterruptReceivingStatus = 17,
    AllocBulkStreams = 18,
    FreeBulkStreams = 19,
    BulkStreamsStatus = 20,
    CancelDataPacket = 21,
    FilterReject = 22,
    FilterFilter = 23,
    DeviceDisconnectAck = 24,
    StartBulkReceiving = 25,
    StopBulkReceiving = 26,
    BulkReceivingStatus = 27,
    ControlPacket = 100,
    BulkPacket = 101,
    IsoPacket = 102,
    InterruptPacket = 103,
    BufferedBulkPacket = 104,
}

impl PacketKind {
    /// Map a wire value to a kind, rejecting values this version does not
    /// know. Unknown types are a framing error, never silently skipped: the
    /// declared length cannot be trusted to resynchronize the stream.
    pub fn from_wire(value: u32) -> Result<Self> {
        use PacketKind::*;
        Ok(match value {
            0 => Hello,
            1 => DeviceConnect,
            2 => DeviceDisconnect,
            3 => Reset,
            4 => InterfaceInfo,
            5 => EpInfo,
            6 => SetConfiguration,
            7 => GetConfiguration,
            8 => ConfigurationStatus,
            9 => SetAltSetting,
            10 => GetAltSetting,
            11 => AltSettingStatus,
            12 => StartIsoStream,
            13 => StopIsoStream,
            14 => IsoStreamStatus,
            15 => StartInterruptReceiving,
            16 => StopInterruptReceiving,
            17 => InterruptReceivingStatus,
            18 => AllocBulkStreams,
            19 => FreeBulkStreams,
            20 => BulkStreamsStatus,
            21 => CancelDataPacket,
            22 => FilterReject,
            23 => FilterFilter,
            24 => DeviceDisconnectAck,
            25 => StartBulkReceiving,
            26 => StopBulkReceiving,
            27 => BulkReceivingStatus,
            100 => ControlPacket,
            101 => BulkPacket,
            102 => IsoPacket,
            103 => InterruptPacket,
            104 => BufferedBulkPacket,
            value => return Err(ProtocolError::UnknownPacketType { value }),
        })
    }

    /// Wire value of this kind.
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    /// True for the kinds that may carry a variable-length payload.
    pub fn is_data(self) -> bool {
        matches!(
            self,
            PacketKind::ControlPacket
                | PacketKind::BulkPacket
                | PacketKind::IsoPacket
                | PacketKind::InterruptPacket
                | PacketKind::BufferedBulkPacket
                | PacketKind::FilterFilter
        )
    }

    /// Capability gating this kind, if any.
    ///
    /// A gated kind is a protocol violation when sent or received without
    /// the capability in the session's effective set.
    pub fn required_capability(self) -> Option<Capability> {
        match self {
            PacketKind::FilterReject | PacketKind::FilterFilter => Some(Capability::Filter),
            PacketKind::DeviceDisconnectAck => Some(Capability::DeviceDisconnectAck),
            PacketKind::AllocBulkStreams
            | PacketKind::FreeBulkStreams
            | PacketKind::BulkStreamsStatus => Some(Capability::BulkStreams),
            PacketKind::StartBulkReceiving
            | PacketKind::StopBulkReceiving
            | PacketKind::BulkReceivingStatus
            | PacketKind::BufferedBulkPacket => Some(Capability::BulkReceiving),
            _ => None,
        }
    }

    /// True for kinds whose generic-header id correlates a request with its
    /// status or response packet. The id field is present on the wire for
    /// every kind but is meaningless for the others.
    pub fn carries_id(self) -> bool {
        !matches!(
            self,
            PacketKind::Hello
                | PacketKind::DeviceConnect
                | PacketKind::DeviceDisconnect
                | PacketKind::Reset
                | PacketKind::InterfaceInfo
                | PacketKind::EpInfo
                | PacketKind::FilterReject
                | PacketKind::FilterFilter
                | PacketKind::DeviceDisconnectAck
        )
    }
}

/// A complete decoded packet.
///
/// Every kind in the protocol has exactly one variant here, so dispatch
/// matches are checked for exhaustiveness at build time.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Hello {
        version: String,
        capabilities: crate::CapabilitySet,
    },
    DeviceConnect(DeviceConnectHeader),
    DeviceDisconnect,
    Reset,
    InterfaceInfo(InterfaceInfoHeader),
    EpInfo(EpInfoHeader),
    SetConfiguration(SetConfigurationHeader),
    GetConfiguration,
    ConfigurationStatus(ConfigurationStatusHeader),
    SetAltSetting(SetAltSettingHeader),
    GetAltSetting(GetAltSettingHeader),
    AltSettingStatus(AltSettingStatusHeader),
    StartIsoStream(StartIsoStreamHeader),
    StopIsoStream(StopIsoStreamHeader),
    IsoStreamStatus(IsoStreamStatusHeader),
    StartInterruptReceiving(StartInterruptReceivingHeader),
    StopInterruptReceiving(StopInterruptReceivingHeader),
    InterruptReceivingStatus(InterruptReceivingStatusHeader),
    AllocBulkStreams(AllocBulkStreamsHeader),
    FreeBulkStreams(FreeBulkStreamsHeader),
    BulkStreamsStatus(BulkStreamsStatusHeader),
    CancelDataPacket,
    FilterReject,
    /// Serialized filter rule text; the embedder parses it with the
    /// `filter` crate
    FilterFilter { rules_text: Bytes },
    DeviceDisconnectAck,
    StartBulkReceiving(StartBulkReceivingHeader),
    StopBulkReceiving(StopBulkReceivingHeader),
    BulkReceivingStatus(BulkReceivingStatusHeader),
    ControlPacket {
        header: ControlPacketHeader,
        data: Bytes,
    },
    BulkPacket {
        header: BulkPacketHeader,
        data: Bytes,
    },
    IsoPacket {
        header: IsoPacketHeader,
        data: Bytes,
    },
    InterruptPacket {
        header: InterruptPacketHeader,
        data: Bytes,
    },
    BufferedBulkPacket {
        header: BufferedBulkPacketHeader,
        data: Bytes,
    },
}

impl Packet {
    /// Wire kind of this packet.
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Hello { .. } => PacketKind::Hello,
            Packet::DeviceConnect(_) => PacketKind::DeviceConnect,
            Packet::DeviceDisconnect => PacketKind::DeviceDisconnect,
            Packet::Reset => PacketKind::Reset,
            Packet::InterfaceInfo(_) => PacketKind::InterfaceInfo,
            Packet::EpInfo(_) => PacketKind::EpInfo,
            Packet::SetConfiguration(_) => PacketKind::SetConfiguration,
            Packet::GetConfiguration => PacketKind::GetConfiguration,
            Packet::ConfigurationStatus(_) => PacketKind::ConfigurationStatus,
            Packet::SetAltSetting(_) => PacketKind::SetAltSetting,
            Packet::GetAltSetting(_) => PacketKind::GetAltSetting,
            Packet::AltSettingStatus(_) => PacketKind::AltSettingStatus,
            Packet::StartIsoStream(_) => PacketKind::StartIsoStream,
            Packet::StopIsoStream(_) => PacketKind::StopIsoStream,
            Packet::IsoStreamStatus(_) => PacketKind::IsoStreamStatus,
            Packet::StartInterruptReceiving(_) => PacketKind::StartInterruptReceiving,
            Packet::StopInterruptReceiving(_) => PacketKind::StopInterruptReceiving,
            Packet::InterruptReceivingStatus(_) => PacketKind::InterruptReceivingStatus,
            Packet::AllocBulkStreams(_) => PacketKind::AllocBulkStreams,
            Packet::FreeBulkStreams(_) => PacketKind::FreeBulkStreams,
            Packet::BulkStreamsStatus(_) => PacketKind::BulkStreamsStatus,
            Packet::CancelDataPacket => PacketKind::CancelDataPacket,
            Packet::FilterReject => PacketKind::FilterReject,
            Packet::FilterFilter { .. } => PacketKind::FilterFilter,
            Packet::DeviceDisconnectAck => PacketKind::DeviceDisconnectAck,
            Packet::StartBulkReceiving(_) => PacketKind::StartBulkReceiving,
            Packet::StopBulkReceiving(_) => PacketKind::StopBulkReceiving,
            Packet::BulkReceivingStatus(_) => PacketKind::BulkReceivingStatus,
            Packet::ControlPacket { .. } => PacketKind::ControlPacket,
            Packet::BulkPacket { .. } => PacketKind::BulkPacket,
            Packet::IsoPacket { .. } => PacketKind::IsoPacket,
            Packet::InterruptPacket { .. } => PacketKind::InterruptPacket,
            Packet::BufferedBulkPacket { .. } => PacketKind::BufferedBulkPacket,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_through_wire_value() {
        for value in (0..=27).chain(100..=104) {
            let kind = PacketKind::from_wire(value).unwrap();
            assert_eq!(kind.to_wire(), value);
        }
    }

    #[test]
    fn test_unknown_kinds_rejected() {
        for value in [28, 50, 99, 105, u32::MAX] {
            assert!(matches!(
                PacketKind::from_wire(value),
                Err(ProtocolError::UnknownPacketType { .. })
            ));
        }
    }

    #[test]
    fn test_data_kinds() {
        assert!(PacketKind::BulkPacket.is_data());
        assert!(PacketKind::FilterFilter.is_data());
        assert!(!PacketKind::Hello.is_data());
        assert!(!PacketKind::BulkStreamsStatus.is_data());
    }

    #[test]
    fn test_capability_gates() {
        assert_eq!(
            PacketKind::BufferedBulkPacket.required_capability(),
            Some(Capability::BulkReceiving)
        );
        assert_eq!(
            PacketKind::FilterReject.required_capability(),
            Some(Capability::Filter)
        );
        assert_eq!(PacketKind::BulkPacket.required_capability(), None);
    }
}
