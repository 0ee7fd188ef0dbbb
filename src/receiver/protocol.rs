//! Line protocol adapter
//!
//! Maps commands to and from the receiver's two-letter line format
//! (`PWON`, `MV45`, `Z2DVD`, ...). Only the controls the bridge exposes are
//! recognized; every other line is left to the caller as raw traffic.

use super::command::{Command, Control, ZoneId};

const POWER: &str = "PW";
const VOLUME: &str = "MV";
const MUTE: &str = "MU";
const INPUT: &str = "SI";
const SURROUND_MODE: &str = "MS";
const TUNER_FREQUENCY: &str = "TFAN";
const TUNER_MODE: &str = "TMAN";
const ZONE: &str = "Z";

// Zone sub-parameters that share the `Z<n>` prefix but are not exposed.
const ZONE_IGNORED: [&str; 8] = ["CS", "CV", "PS", "SLP", "STBY", "HPF", "QUICK", "SMART"];

/// Renders the line for `command`, without terminator
pub fn encode(command: &Command) -> String {
    let value = &command.value;
    match command.control {
        Control::Power => format!("{POWER}{value}"),
        Control::Volume => format!("{VOLUME}{value}"),
        Control::Mute => format!("{MUTE}{value}"),
        Control::Input => format!("{INPUT}{value}"),
        Control::SurroundMode => format!("{SURROUND_MODE}{value}"),
        Control::TunerFrequency => format!("{TUNER_FREQUENCY}{value}"),
        Control::TunerMode => format!("{TUNER_MODE}{value}"),
        // Power, volume and input share the bare zone prefix.
        Control::ZonePower(zone) | Control::ZoneVolume(zone) | Control::ZoneInput(zone) => {
            format!("{ZONE}{zone}{value}")
        }
        Control::ZoneMute(zone) => format!("{ZONE}{zone}{MUTE}{value}"),
    }
}

/// Parses a line reported by the receiver
///
/// Returns `None` for anything outside the exposed controls, including
/// status lines such as `MVMAX 98`.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();

    if let Some(value) = line.strip_prefix(TUNER_FREQUENCY) {
        return with_value(Control::TunerFrequency, value);
    }
    if let Some(value) = line.strip_prefix(TUNER_MODE) {
        return with_value(Control::TunerMode, value);
    }
    if let Some(value) = line.strip_prefix(VOLUME) {
        if value.starts_with("MAX") {
            return None;
        }
        return with_value(Control::Volume, value);
    }

    let (prefix, value) = (line.get(..2)?, line.get(2..)?);
    match prefix {
        POWER => with_value(Control::Power, value),
        MUTE => with_value(Control::Mute, value),
        INPUT => with_value(Control::Input, value),
        SURROUND_MODE => with_value(Control::SurroundMode, value),
        _ => parse_zone(line),
    }
}

fn parse_zone(line: &str) -> Option<Command> {
    let rest = line.strip_prefix(ZONE)?;
    let digit = rest.chars().next()?.to_digit(10)?;
    let zone = ZoneId::new(u8::try_from(digit).ok()?).ok()?;
    let value = &rest[1..];

    if let Some(mute) = value.strip_prefix(MUTE) {
        return with_value(Control::ZoneMute(zone), mute);
    }
    if ZONE_IGNORED.iter().any(|param| value.starts_with(param)) {
        return None;
    }
    match value {
        "ON" | "OFF" => with_value(Control::ZonePower(zone), value),
        v if v.starts_with(|c: char| c.is_ascii_digit()) => {
            with_value(Control::ZoneVolume(zone), value)
        }
        _ => with_value(Control::ZoneInput(zone), value),
    }
}

fn with_value(control: Control, value: &str) -> Option<Command> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(Command::new(control, value))
    }
}
