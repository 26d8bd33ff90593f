use std::fmt;

/// A raw CoreAudio `OSStatus`, displayed through [`os_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsStatus(pub i32);

impl fmt::Display for OsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&os_status(self.0))
    }
}

/// Format a CoreAudio `OSStatus` code into a human-readable string.
///
/// Known error codes are returned with their symbolic name; four-character
/// statuses (`'who?'`, `'!obj'`) are shown as text; anything else is hex.
pub fn os_status(code: i32) -> String {
    match code {
        0 => "kAudioHardwareNoError (0)".to_string(),
        -1500 => "kAudioHardwareUnspecifiedError (-1500)".to_string(),
        -1501 => "kAudioHardwareNotRunningError (-1501)".to_string(),
        -1502 => "kAudioHardwareUnknownPropertyError (-1502)".to_string(),
        -1503 => "kAudioHardwareBadPropertySizeError (-1503)".to_string(),
        -1504 => "kAudioHardwareIllegalOperationError (-1504)".to_string(),
        -1505 => "kAudioHardwareBadObjectError (-1505)".to_string(),
        -1506 => "kAudioHardwareBadDeviceError (-1506)".to_string(),
        -1507 => "kAudioHardwareBadStreamError (-1507)".to_string(),
        0x7768_6F3F => "kAudioHardwareUnknownPropertyError ('who?')".to_string(),
        0x216F_626A => "kAudioHardwareBadObjectError ('!obj')".to_string(),
        0x6E6F_7065 => "kAudioHardwareIllegalOperationError ('nope')".to_string(),
        0x756E_6F70 => "kAudioHardwareUnsupportedOperationError ('unop')".to_string(),
        other => format!("OSStatus {other} ({other:#X})"),
    }
}

/// Build a CoreAudio error string from an operation description and `OSStatus`.
pub fn ca_error(operation: &str, code: i32) -> String {
    format!("CoreAudio {operation} failed: {}", os_status(code))
}
