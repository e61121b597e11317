//! Command vocabulary.
//!
//! Every instrument class exposes a fixed set of protocol opcodes. Each set
//! is an enum implementing [`Command`], which maps a variant to its wire
//! token and to the positional layout of its accepted-response arguments.
//! [`DeviceCommand`] holds the identification commands every KCP instrument
//! implements.

use std::fmt;

use crate::decode::FieldKind;

/// A protocol opcode understood by some instrument class.
pub trait Command: fmt::Debug + Send + Sync {
    /// The command token sent on the wire (e.g. `"I4"`).
    fn token(&self) -> &'static str;

    /// Positional layout of the arguments in an accepted response.
    ///
    /// Positions past the end of the layout decode as text, so commands
    /// that only return text can keep the empty default.
    fn response_fields(&self) -> &'static [FieldKind] {
        &[]
    }
}

/// Commands common to every KCP instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCommand {
    /// `@` -- abort any running command, including continuous transmission.
    Cancel,
    /// `I0` -- list implemented commands, one per begun frame.
    ListAllImplementedKcpCommands,
    /// `I1` -- KCP levels and versions.
    QueryKcpLevelsAndKcpVersions,
    /// `I2` -- device type and capacity.
    QueryDeviceInformationTypeCapacity,
    /// `I3` -- device software version.
    QueryDeviceSoftwareVersion,
    /// `I4` -- serial number.
    QuerySerialNumber,
    /// `I5` -- software identification number.
    QuerySoftwareIdentificationNumber,
    /// `IBIM` -- query or set the balance's external model number.
    QuerySetBalanceExternalModelNumber,
}

impl DeviceCommand {
    /// Every universal command, in protocol order.
    pub const ALL: [DeviceCommand; 8] = [
        DeviceCommand::Cancel,
        DeviceCommand::ListAllImplementedKcpCommands,
        DeviceCommand::QueryKcpLevelsAndKcpVersions,
        DeviceCommand::QueryDeviceInformationTypeCapacity,
        DeviceCommand::QueryDeviceSoftwareVersion,
        DeviceCommand::QuerySerialNumber,
        DeviceCommand::QuerySoftwareIdentificationNumber,
        DeviceCommand::QuerySetBalanceExternalModelNumber,
    ];

    /// Look up a universal command by wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }
}

impl Command for DeviceCommand {
    fn token(&self) -> &'static str {
        match self {
            DeviceCommand::Cancel => "@",
            DeviceCommand::ListAllImplementedKcpCommands => "I0",
            DeviceCommand::QueryKcpLevelsAndKcpVersions => "I1",
            DeviceCommand::QueryDeviceInformationTypeCapacity => "I2",
            DeviceCommand::QueryDeviceSoftwareVersion => "I3",
            DeviceCommand::QuerySerialNumber => "I4",
            DeviceCommand::QuerySoftwareIdentificationNumber => "I5",
            DeviceCommand::QuerySetBalanceExternalModelNumber => "IBIM",
        }
    }

    fn response_fields(&self) -> &'static [FieldKind] {
        match self {
            // I0 B <index> <command>
            DeviceCommand::ListAllImplementedKcpCommands => {
                &[FieldKind::SignedInteger, FieldKind::Text]
            }
            _ => &[],
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
