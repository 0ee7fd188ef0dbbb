//! Receiver command model
//!
//! A [`Command`] pairs a [`Control`] with the textual value the receiver uses
//! for it. Zone-scoped controls carry their [`ZoneId`] inside the variant, so a
//! zone command without a zone (or a main-zone command with one) cannot be
//! built.

use std::fmt;

use thiserror::Error;

/// Value sent to ask the receiver for the current state of a control.
pub const QUERY: &str = "?";

/// Errors for zone ids outside the addressable range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneIdError {
    /// Zone 1 is the main zone and is addressed through the plain controls
    #[error("zone {0} is the main zone, use the non-zone controls")]
    MainZone(u8),

    #[error("zone {0} is above the highest supported zone {max}", max = ZoneId::MAX)]
    OutOfRange(u8),
}

/// Secondary zone index, always in `2..=ZoneId::MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(u8);

impl ZoneId {
    /// Lowest secondary zone
    pub const MIN: u8 = 2;

    /// Zone tokens carry a single decimal digit
    pub const MAX: u8 = 9;

    pub fn new(id: u8) -> Result<Self, ZoneIdError> {
        match id {
            0 | 1 => Err(ZoneIdError::MainZone(id)),
            id if id > Self::MAX => Err(ZoneIdError::OutOfRange(id)),
            id => Ok(Self(id)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ZoneId {
    type Error = ZoneIdError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every control the bridge exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Power,
    Volume,
    Mute,
    Input,
    SurroundMode,
    TunerFrequency,
    TunerMode,
    ZonePower(ZoneId),
    ZoneVolume(ZoneId),
    ZoneMute(ZoneId),
    ZoneInput(ZoneId),
}

impl Control {
    /// Main zone controls in the order they are queried on startup
    pub const ALL_MAIN: [Control; 7] = [
        Control::Power,
        Control::Volume,
        Control::Mute,
        Control::Input,
        Control::SurroundMode,
        Control::TunerFrequency,
        Control::TunerMode,
    ];

    /// Zone controls for `zone` in the order they are queried on startup
    pub fn zone_controls(zone: ZoneId) -> [Control; 4] {
        [
            Control::ZonePower(zone),
            Control::ZoneVolume(zone),
            Control::ZoneMute(zone),
            Control::ZoneInput(zone),
        ]
    }

    pub fn zone(&self) -> Option<ZoneId> {
        match self {
            Control::ZonePower(zone)
            | Control::ZoneVolume(zone)
            | Control::ZoneMute(zone)
            | Control::ZoneInput(zone) => Some(*zone),
            Control::Power
            | Control::Volume
            | Control::Mute
            | Control::Input
            | Control::SurroundMode
            | Control::TunerFrequency
            | Control::TunerMode => None,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Power => write!(f, "Power"),
            Control::Volume => write!(f, "Volume"),
            Control::Mute => write!(f, "Mute"),
            Control::Input => write!(f, "Input"),
            Control::SurroundMode => write!(f, "SurroundMode"),
            Control::TunerFrequency => write!(f, "TunerFrequency"),
            Control::TunerMode => write!(f, "TunerMode"),
            Control::ZonePower(zone) => write!(f, "Zone{}Power", zone),
            Control::ZoneVolume(zone) => write!(f, "Zone{}Volume", zone),
            Control::ZoneMute(zone) => write!(f, "Zone{}Mute", zone),
            Control::ZoneInput(zone) => write!(f, "Zone{}Input", zone),
        }
    }
}

/// A single receiver interaction, in either direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub control: Control,
    pub value: String,
}

impl Command {
    pub fn new(control: Control, value: impl Into<String>) -> Self {
        Self {
            control,
            value: value.into(),
        }
    }

    /// Builds a request for the current value of `control`
    pub fn query(control: Control) -> Self {
        Self::new(control, QUERY)
    }

    pub fn is_query(&self) -> bool {
        self.value == QUERY
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.control, self.value)
    }
}
