//! Shared types, error enums, and small lookup tables for modes-core.

use serde::Serialize;
use thiserror::Error;

use crate::cpr::CprParity;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a raw line could not be turned into a [`Frame`](crate::frame::Frame).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame too short: {len} hex characters")]
    TooShort { len: usize },
    #[error("odd-length payload: {len} hex characters")]
    OddLength { len: usize },
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("heartbeat frame carries no data")]
    Heartbeat,
    #[error("DF{df} expects {expected} bytes, got {actual}")]
    LengthMismatch {
        df: u8,
        expected: usize,
        actual: usize,
    },
    #[error("checksum mismatch: computed {computed:06X}, transmitted {transmitted:06X}")]
    ChecksumMismatch { computed: u32, transmitted: u32 },
}

/// CPR construction and resolution failures. The resolver keeps its halves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CprError {
    #[error("raw CPR values must fit in 17 bits, got {lat},{lon}")]
    RawOutOfRange { lat: u32, lon: u32 },
    #[error("need both odd and even half-positions, have {have:?}")]
    MissingPair { have: Option<CprParity> },
    #[error("latitude zones differ: even NL={even} odd NL={odd}")]
    InconsistentZone { even: u32, odd: u32 },
    #[error("half-positions {seconds:.1}s apart")]
    TimingSkew { seconds: f64 },
    #[error("latitude {0:.6} out of range")]
    LatitudeOutOfRange(f64),
    #[error("surface decode needs a reference position")]
    NoReference,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error("location {lat:.4},{lon:.4} out of range")]
    LocationOutOfRange { lat: f64, lon: f64 },
}

/// SBS1 (BaseStation) record failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SbsError {
    #[error("expected 22 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid ICAO address: {0:?}")]
    InvalidIcao(String),
}

/// All errors produced by modes-core.
#[derive(Debug, Error)]
pub enum ModesError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Cpr(#[from] CprError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Sbs(#[from] SbsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ModesError>;

// ---------------------------------------------------------------------------
// Downlink Format metadata
// ---------------------------------------------------------------------------

/// Metadata for a Downlink Format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfInfo {
    pub name: &'static str,
    pub bytes: usize,
}

const fn df(name: &'static str, bytes: usize) -> DfInfo {
    DfInfo { name, bytes }
}

/// Known Downlink Format table.
pub const DF_TABLE: &[(u8, DfInfo)] = &[
    (0, df("Short air-air surveillance (TCAS)", 7)),
    (4, df("Surveillance altitude reply", 7)),
    (5, df("Surveillance identity reply", 7)),
    (11, df("All-call reply", 7)),
    (16, df("Long air-air surveillance (TCAS)", 14)),
    (17, df("ADS-B extended squitter", 14)),
    (18, df("TIS-B / ADS-R extended squitter", 14)),
    (19, df("Military extended squitter", 14)),
    (20, df("Comm-B altitude reply", 14)),
    (21, df("Comm-B identity reply", 14)),
    (24, df("Comm-D extended length message", 14)),
];

/// Look up DF metadata. Returns `None` for unrecognized DFs.
pub fn df_info(df: u8) -> Option<&'static DfInfo> {
    DF_TABLE
        .iter()
        .find(|(d, _)| *d == df)
        .map(|(_, info)| info)
}

/// Frame length in bytes implied by the DF: bit 0x10 set means a 112-bit frame.
pub fn frame_len(df: u8) -> usize {
    if df & 0x10 != 0 {
        14
    } else {
        7
    }
}

// ---------------------------------------------------------------------------
// ICAO address helpers
// ---------------------------------------------------------------------------

/// Format a 24-bit ICAO address as 6-char uppercase hex.
pub fn icao_to_string(icao: u32) -> String {
    format!("{:06X}", icao & 0xFF_FFFF)
}

/// Parse a 6-char hex string into a 24-bit ICAO address.
pub fn icao_from_hex(hex: &str) -> Option<u32> {
    let hex = hex.trim();
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Read a 24-bit big-endian value from three bytes.
pub fn u24(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if !hex.len().is_multiple_of(2) {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ADS-B callsign character set
// ---------------------------------------------------------------------------

/// AIS character set for callsign encoding (6 bits per character).
pub const CALLSIGN_CHARSET: &[u8; 64] =
    b"#ABCDEFGHIJKLMNOPQRSTUVWXYZ##### ###############0123456789######";

// ---------------------------------------------------------------------------
// Altitude
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AltitudeUnit {
    #[default]
    Feet,
    Metres,
}

impl std::fmt::Display for AltitudeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AltitudeUnit::Feet => write!(f, "feet"),
            AltitudeUnit::Metres => write!(f, "metres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Altitude {
    pub value: i32,
    pub unit: AltitudeUnit,
}

impl Altitude {
    pub fn feet(value: i32) -> Self {
        Altitude {
            value,
            unit: AltitudeUnit::Feet,
        }
    }

    pub fn metres(value: i32) -> Self {
        Altitude {
            value,
            unit: AltitudeUnit::Metres,
        }
    }
}

// ---------------------------------------------------------------------------
// Flight status (DF4/5/20/21) and capability (DF11/17)
// ---------------------------------------------------------------------------

const FLIGHT_STATUS_TABLE: [&str; 8] = [
    "Normal, airborne",
    "Normal, on the ground",
    "Alert, airborne",
    "Alert, on the ground",
    "Alert and SPI, airborne or on the ground",
    "SPI, airborne or on the ground",
    "Not assigned",
    "Not assigned",
];

/// 3-bit flight status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlightStatus(pub u8);

impl FlightStatus {
    /// `None` when the status does not say (SPI and unassigned values).
    pub fn on_ground(self) -> Option<bool> {
        match self.0 {
            0 | 2 => Some(false),
            1 | 3 => Some(true),
            _ => None,
        }
    }

    pub fn alert(self) -> bool {
        matches!(self.0, 2..=4)
    }

    pub fn special_position(self) -> bool {
        matches!(self.0, 4 | 5)
    }

    pub fn description(self) -> &'static str {
        FLIGHT_STATUS_TABLE[(self.0 & 7) as usize]
    }
}

const CAPABILITY_TABLE: [&str; 8] = [
    "Level 1 (surveillance only)",
    "Level 2 (DF0,4,5,11)",
    "Level 3 (DF0,4,5,11,20,21)",
    "Level 4 (DF0,4,5,11,20,21,24)",
    "Level 2+ on the ground",
    "Level 2+ airborne",
    "Level 2+ airborne or on the ground",
    "Level 7",
];

/// 3-bit transponder capability field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Capability(pub u8);

impl Capability {
    pub fn on_ground(self) -> Option<bool> {
        match self.0 {
            4 => Some(true),
            5 => Some(false),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        CAPABILITY_TABLE[(self.0 & 7) as usize]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
