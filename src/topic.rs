//! # Topic Codec
//!
//! Pure mapping between MQTT topics and receiver commands.
//!
//! ```text
//! <category>/<device>/controls/<commandType>/set   inbound, decoded into a Command
//! <category>/<device>/controls/<commandType>       outbound, encoded from a Command
//! ```
//!
//! `commandType` is one of the fixed main-zone tokens (`power`, `volume`, ...)
//! or a zone token `zone<N>Power|Volume|Mute|Input`. Anything else decodes to
//! `None`; unknown topics are not an error.

use std::fmt;

use crate::receiver::{Command, Control, ZoneId};

/// Category segment used for every bridged receiver
pub const DEVICE_CATEGORY: &str = "denon";

const CONTROLS: &str = "controls";
const SET: &str = "set";
const STATUS: &str = "status";
const ZONE_PREFIX: &str = "zone";

/// Namespace prefix for a single bridged device, `<category>/<device>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicRoot(String);

impl TopicRoot {
    pub fn new(category: &str, device_name: &str) -> Self {
        Self(format!("{}/{}", category, device_name))
    }

    pub fn for_device(device_name: &str) -> Self {
        Self::new(DEVICE_CATEGORY, device_name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The single wildcard filter covering every command topic of the device
    pub fn subscription(&self) -> String {
        format!("{}/{}/+/{}", self.0, CONTROLS, SET)
    }

    pub fn command_topic(&self, control: &Control) -> String {
        format!("{}/{}", self.state_topic(control), SET)
    }

    pub fn state_topic(&self, control: &Control) -> String {
        format!("{}/{}/{}", self.0, CONTROLS, encode(control))
    }

    /// Retained bridge availability (`online` / `offline`)
    pub fn status_topic(&self) -> String {
        format!("{}/{}", self.0, STATUS)
    }

    /// Extracts `commandType` from `<root>/controls/<commandType>/set`
    pub fn command_type<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let rest = topic.strip_prefix(self.0.as_str())?;
        let rest = rest.strip_prefix('/')?.strip_prefix(CONTROLS)?;
        let rest = rest.strip_prefix('/')?.strip_suffix(SET)?;
        let command_type = rest.strip_suffix('/')?;
        (!command_type.is_empty() && !command_type.contains('/')).then_some(command_type)
    }

    /// Decodes an inbound command topic; `None` if the topic is not a known control
    pub fn decode(&self, topic: &str, payload: &str) -> Option<Command> {
        decode(self.command_type(topic)?, payload)
    }
}

impl fmt::Display for TopicRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a `commandType` token and payload to a command
pub fn decode(command_type: &str, payload: &str) -> Option<Command> {
    parse_command_type(command_type).map(|control| Command::new(control, payload))
}

/// Maps a control to its `commandType` token
///
/// Total over [`Control`]: every variant has a token, so every receiver event
/// the command model can represent has a topic.
pub fn encode(control: &Control) -> String {
    match control {
        Control::Power => "power".to_string(),
        Control::Volume => "volume".to_string(),
        Control::Mute => "mute".to_string(),
        Control::Input => "input".to_string(),
        Control::SurroundMode => "surroundMode".to_string(),
        Control::TunerFrequency => "tunerFrequency".to_string(),
        Control::TunerMode => "tunerMode".to_string(),
        Control::ZonePower(zone) => format!("{ZONE_PREFIX}{zone}Power"),
        Control::ZoneVolume(zone) => format!("{ZONE_PREFIX}{zone}Volume"),
        Control::ZoneMute(zone) => format!("{ZONE_PREFIX}{zone}Mute"),
        Control::ZoneInput(zone) => format!("{ZONE_PREFIX}{zone}Input"),
    }
}

fn parse_command_type(command_type: &str) -> Option<Control> {
    match command_type {
        "power" => Some(Control::Power),
        "volume" => Some(Control::Volume),
        "mute" => Some(Control::Mute),
        "input" => Some(Control::Input),
        "surroundMode" => Some(Control::SurroundMode),
        "tunerFrequency" => Some(Control::TunerFrequency),
        "tunerMode" => Some(Control::TunerMode),
        other => parse_zone_command_type(other),
    }
}

fn parse_zone_command_type(command_type: &str) -> Option<Control> {
    let rest = command_type.strip_prefix(ZONE_PREFIX)?;
    let mut chars = rest.chars();
    let digit = chars.next()?.to_digit(10)?;
    let zone = ZoneId::new(u8::try_from(digit).ok()?).ok()?;

    match chars.as_str() {
        "Power" => Some(Control::ZonePower(zone)),
        "Volume" => Some(Control::ZoneVolume(zone)),
        "Mute" => Some(Control::ZoneMute(zone)),
        "Input" => Some(Control::ZoneInput(zone)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn root() -> TopicRoot {
        TopicRoot::for_device("livingroom")
    }

    fn all_controls() -> Vec<Control> {
        let mut controls = Control::ALL_MAIN.to_vec();
        for id in ZoneId::MIN..=ZoneId::MAX {
            controls.extend(Control::zone_controls(ZoneId::new(id).unwrap()));
        }
        controls
    }

    #[test]
    fn builds_topics_under_root() {
        let root = root();
        assert_eq!(root.as_str(), "denon/livingroom");
        assert_eq!(root.subscription(), "denon/livingroom/controls/+/set");
        assert_eq!(root.state_topic(&Control::Power), "denon/livingroom/controls/power");
        assert_eq!(
            root.command_topic(&Control::ZoneInput(ZoneId::new(2).unwrap())),
            "denon/livingroom/controls/zone2Input/set"
        );
        assert_eq!(root.status_topic(), "denon/livingroom/status");
    }

    #[test]
    fn round_trips_every_control() {
        let root = root();
        for control in all_controls() {
            let topic = root.command_topic(&control);
            let command = root.decode(&topic, "payload-42").unwrap();

            assert_eq!(command.control, control);
            assert_eq!(command.value, "payload-42");
            assert_eq!(format!("{}/set", root.state_topic(&command.control)), topic);
        }
    }

    #[test]
    fn decodes_main_zone_volume() {
        let command = root().decode("denon/livingroom/controls/volume/set", "50");
        assert_eq!(command, Some(Command::new(Control::Volume, "50")));
    }

    #[test]
    fn decodes_zone_input() {
        let command = root().decode("denon/livingroom/controls/zone2Input/set", "DVD");
        assert_eq!(
            command,
            Some(Command::new(Control::ZoneInput(ZoneId::new(2).unwrap()), "DVD"))
        );
    }

    #[test]
    fn unknown_command_types_decode_to_nothing() {
        let root = root();
        assert_eq!(root.decode("denon/livingroom/controls/brightness/set", "1"), None);
        assert_eq!(root.decode("denon/livingroom/controls/zoneXPower/set", "ON"), None);
        assert_eq!(root.decode("denon/livingroom/controls/zone2Brightness/set", "1"), None);
        assert_eq!(root.decode("denon/livingroom/controls/zone2power/set", "ON"), None);
        assert_eq!(root.decode("denon/livingroom/controls/zone23Power/set", "ON"), None);
        assert_eq!(root.decode("denon/livingroom/controls/zone/set", "ON"), None);
        assert_eq!(root.decode("denon/livingroom/controls/Power/set", "ON"), None);
    }

    #[test]
    fn main_zone_is_not_addressable_as_a_zone() {
        assert_eq!(root().decode("denon/livingroom/controls/zone1Power/set", "ON"), None);
        assert_eq!(root().decode("denon/livingroom/controls/zone0Power/set", "ON"), None);
    }

    #[test]
    fn topics_outside_the_command_surface_decode_to_nothing() {
        let root = root();
        assert_eq!(root.decode("denon/livingroom/controls/power", "ON"), None);
        assert_eq!(root.decode("denon/kitchen/controls/power/set", "ON"), None);
        assert_eq!(root.decode("denon/livingroomx/controls/power/set", "ON"), None);
        assert_eq!(root.decode("denon/livingroom/controls/power/extra/set", "ON"), None);
        assert_eq!(root.decode("denon/livingroom/controls//set", "ON"), None);
    }

    #[test]
    fn empty_payload_is_passed_through() {
        let command = root().decode("denon/livingroom/controls/mute/set", "");
        assert_eq!(command, Some(Command::new(Control::Mute, "")));
    }
}
