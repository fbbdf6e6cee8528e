use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::DriverError;

/// A remote-control key understood by the `/keypress`, `/keydown` and
/// `/keyup` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RokuKey {
    Home,
    Rev,
    Fwd,
    Play,
    Select,
    Left,
    Right,
    Down,
    Up,
    Back,
    InstantReplay,
    Info,
    Backspace,
    Search,
    Enter,
    VolumeDown,
    VolumeMute,
    VolumeUp,
    PowerOff,
    ChannelUp,
    ChannelDown,
    InputTuner,
    InputHdmi1,
    InputHdmi2,
    InputHdmi3,
    InputHdmi4,
    InputAv1,
    FindRemote,
    /// Types a single character (`Lit_<char>`)
    Literal(char),
}

const NAMED_KEYS: &[(RokuKey, &str)] = &[
    (RokuKey::Home, "Home"),
    (RokuKey::Rev, "Rev"),
    (RokuKey::Fwd, "Fwd"),
    (RokuKey::Play, "Play"),
    (RokuKey::Select, "Select"),
    (RokuKey::Left, "Left"),
    (RokuKey::Right, "Right"),
    (RokuKey::Down, "Down"),
    (RokuKey::Up, "Up"),
    (RokuKey::Back, "Back"),
    (RokuKey::InstantReplay, "InstantReplay"),
    (RokuKey::Info, "Info"),
    (RokuKey::Backspace, "Backspace"),
    (RokuKey::Search, "Search"),
    (RokuKey::Enter, "Enter"),
    (RokuKey::VolumeDown, "VolumeDown"),
    (RokuKey::VolumeMute, "VolumeMute"),
    (RokuKey::VolumeUp, "VolumeUp"),
    (RokuKey::PowerOff, "PowerOff"),
    (RokuKey::ChannelUp, "ChannelUp"),
    (RokuKey::ChannelDown, "ChannelDown"),
    (RokuKey::InputTuner, "InputTuner"),
    (RokuKey::InputHdmi1, "InputHDMI1"),
    (RokuKey::InputHdmi2, "InputHDMI2"),
    (RokuKey::InputHdmi3, "InputHDMI3"),
    (RokuKey::InputHdmi4, "InputHDMI4"),
    (RokuKey::InputAv1, "InputAV1"),
    (RokuKey::FindRemote, "FindRemote"),
];

impl RokuKey {
    /// Path segment sent to the device, percent-encoded for literals.
    pub fn as_ecp(&self) -> String {
        match self {
            RokuKey::Literal(c) => {
                let mut buf = [0u8; 4];
                format!("Lit_{}", urlencoding::encode(c.encode_utf8(&mut buf)))
            }
            named => NAMED_KEYS
                .iter()
                .find(|(key, _)| key == named)
                .map(|(_, name)| (*name).to_string())
                .unwrap_or_default(),
        }
    }

    /// One literal key per character of `text`.
    pub fn literals(text: &str) -> Vec<RokuKey> {
        text.chars().map(RokuKey::Literal).collect()
    }
}

impl fmt::Display for RokuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RokuKey::Literal(c) => write!(f, "Lit_{}", c),
            _ => write!(f, "{}", self.as_ecp()),
        }
    }
}

impl FromStr for RokuKey {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Some(rest) = trimmed.strip_prefix("Lit_") {
            let decoded = urlencoding::decode(rest)
                .map_err(|e| DriverError::InvalidArgument(format!("bad literal key '{}': {}", s, e)))?;
            let mut chars = decoded.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(RokuKey::Literal(c)),
                _ => Err(DriverError::InvalidArgument(format!(
                    "literal key '{}' must carry exactly one character",
                    s
                ))),
            };
        }

        NAMED_KEYS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(trimmed))
            .map(|(key, _)| key.clone())
            .ok_or_else(|| DriverError::InvalidArgument(format!("unknown remote key '{}'", s)))
    }
}

impl Serialize for RokuKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
