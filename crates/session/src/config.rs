//! Session configuration
//!
//! Everything a session needs at creation time: the version string it
//! announces, the capabilities it offers, and which side of the redirection
//! it is. The role decides which packet kinds this side may originate.

use protocol::{BRIDGE_VERSION, CapabilitySet, PacketKind};
use serde::{Deserialize, Serialize};

/// Which end of the redirection this session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The side with the physical device: announces it, answers requests,
    /// pushes transfer results
    UsbHost,
    /// The side operating the device remotely: configures it, submits
    /// transfer requests
    UsbGuest,
}

impl Role {
    /// True if this side may originate `kind`.
    ///
    /// Hello, filter rules and the plain data kinds flow in both directions;
    /// everything else belongs to exactly one side.
    pub fn may_send(self, kind: PacketKind) -> bool {
        use PacketKind::*;
        match kind {
            Hello | FilterFilter | ControlPacket | BulkPacket | IsoPacket | InterruptPacket => true,
            DeviceConnect | DeviceDisconnect | InterfaceInfo | EpInfo | ConfigurationStatus
            | AltSettingStatus | IsoStreamStatus | InterruptReceivingStatus | BulkStreamsStatus
            | BulkReceivingStatus | BufferedBulkPacket => self == Role::UsbHost,
            Reset | SetConfiguration | GetConfiguration | SetAltSetting | GetAltSetting
            | StartIsoStream | StopIsoStream | StartInterruptReceiving | StopInterruptReceiving
            | AllocBulkStreams | FreeBulkStreams | CancelDataPacket | FilterReject
            | DeviceDisconnectAck | StartBulkReceiving | StopBulkReceiving => {
                self == Role::UsbGuest
            }
        }
    }
}

/// Immutable per-session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Version string announced in this side's hello
    pub version: String,
    /// Capabilities this side offers; the effective set is the AND with the
    /// peer's announcement
    pub capabilities: CapabilitySet,
    /// Which side of the redirection this session is
    pub role: Role,
}

impl SessionConfig {
    /// Configuration with the crate's own version string and no optional
    /// capabilities.
    pub fn new(role: Role) -> Self {
        Self {
            version: BRIDGE_VERSION.to_string(),
            capabilities: CapabilitySet::new(),
            role,
        }
    }

    /// Replace the announced capability set.
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }
}
