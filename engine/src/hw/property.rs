//! Property selectors and addresses for the system audio object, plus the
//! short codes handed to watcher callbacks.

use serde::Serialize;
use std::fmt;

/// Build a CoreAudio-style four-character code from its ASCII bytes.
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// Render a four-character code as a string.
///
/// Printable codes are returned as text with trailing spaces removed
/// (`'dIn '` becomes `"dIn"`); anything else is formatted as hex.
pub fn fourcc_string(code: u32) -> String {
    let bytes = code.to_be_bytes();
    if bytes.iter().all(|b| (0x20..=0x7E).contains(b)) {
        bytes
            .iter()
            .map(|&b| b as char)
            .collect::<String>()
            .trim_end_matches(' ')
            .to_string()
    } else {
        format!("{code:#010X}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertySelector(pub u32);

impl PropertySelector {
    /// `kAudioHardwarePropertyDevices`
    pub const DEVICES: Self = Self(fourcc(b"dev#"));
    /// `kAudioHardwarePropertyDefaultInputDevice`
    pub const DEFAULT_INPUT_DEVICE: Self = Self(fourcc(b"dIn "));
    /// `kAudioHardwarePropertyDefaultOutputDevice`
    pub const DEFAULT_OUTPUT_DEVICE: Self = Self(fourcc(b"dOut"));
    /// `kAudioHardwarePropertyDefaultSystemOutputDevice`
    pub const DEFAULT_SYSTEM_OUTPUT_DEVICE: Self = Self(fourcc(b"sOut"));

    /// Code passed to watcher callbacks for this selector.
    pub fn code(self) -> String {
        fourcc_string(self.0)
    }
}

impl fmt::Display for PropertySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.code())
    }
}

/// Selectors the hardware watcher listens to, in registration order.
pub const WATCHED_SELECTORS: [PropertySelector; 4] = [
    PropertySelector::DEVICES,
    PropertySelector::DEFAULT_INPUT_DEVICE,
    PropertySelector::DEFAULT_OUTPUT_DEVICE,
    PropertySelector::DEFAULT_SYSTEM_OUTPUT_DEVICE,
];

/// `kAudioObjectPropertyScopeGlobal`
pub const SCOPE_GLOBAL: u32 = fourcc(b"glob");
/// `kAudioObjectPropertyElementMain`
pub const ELEMENT_MAIN: u32 = 0;
/// `kAudioObjectPropertyElementWildcard`
pub const ELEMENT_WILDCARD: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAddress {
    pub selector: PropertySelector,
    pub scope: u32,
    pub element: u32,
}

impl PropertyAddress {
    /// Global scope, wildcard element: the address the watcher registers with.
    pub const fn global(selector: PropertySelector) -> Self {
        Self {
            selector,
            scope: SCOPE_GLOBAL,
            element: ELEMENT_WILDCARD,
        }
    }

    /// Whether a registration at `self` covers a change reported at `changed`.
    pub fn matches(&self, changed: &PropertyAddress) -> bool {
        self.selector == changed.selector
            && self.scope == changed.scope
            && (self.element == ELEMENT_WILDCARD
                || changed.element == ELEMENT_WILDCARD
                || self.element == changed.element)
    }
}

/// Typed view over callback codes.
///
/// Codes outside the watched set land in `Other`; consumers must not treat
/// the known variants as exhaustive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareEvent {
    DeviceList,
    DefaultInput,
    DefaultOutput,
    DefaultSystemOutput,
    Other(String),
}

impl HardwareEvent {
    pub fn from_code(code: &str) -> Self {
        match code {
            "dev#" => Self::DeviceList,
            "dIn" => Self::DefaultInput,
            "dOut" => Self::DefaultOutput,
            "sOut" => Self::DefaultSystemOutput,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::DeviceList => "dev#",
            Self::DefaultInput => "dIn",
            Self::DefaultOutput => "dOut",
            Self::DefaultSystemOutput => "sOut",
            Self::Other(code) => code,
        }
    }
}

impl From<PropertySelector> for HardwareEvent {
    fn from(selector: PropertySelector) -> Self {
        Self::from_code(&selector.code())
    }
}

/// Parse a code typed by a user (`dOut`, `dIn`, `'dev#'`) back into a selector.
///
/// Short codes are padded with spaces to four bytes; hex (`0x...`) is
/// accepted for non-printable selectors.
pub fn parse_selector(code: &str) -> Option<PropertySelector> {
    let code = code.trim().trim_matches('\'');
    if let Some(hex) = code
        .strip_prefix("0x")
        .or_else(|| code.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16).ok().map(PropertySelector);
    }
    if code.is_empty() || code.len() > 4 || !code.is_ascii() {
        return None;
    }
    let mut bytes = [b' '; 4];
    bytes[..code.len()].copy_from_slice(code.as_bytes());
    Some(PropertySelector(fourcc(&bytes)))
}
