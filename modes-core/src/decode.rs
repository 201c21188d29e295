//! Turn one raw text line into a [`Frame`].
//!
//! Accepted line shapes:
//! - `8D4840D6202CC371C32CE0576098`        bare hex
//! - `*8D4840D6202CC371C32CE0576098;`      AVR
//! - `@000000EF31C08D4840D6...;`           Beast AVR with MLAT counter
//!
//! Per-format field extraction goes through a fixed dispatch table keyed on
//! the downlink format. Formats without an entry decode to `Payload::Other`.

use chrono::{DateTime, Utc};

use crate::adsb::decode_message;
use crate::bits::{bit, decode_ac13, decode_callsign, decode_identity, extract_bits};
use crate::crc::{checksum, ChecksumPolicy};
use crate::frame::{Frame, FrameMode, Payload, Squitter};
use crate::types::{frame_len, hex_decode, u24, Capability, DecodeError, FlightStatus};

/// Shortest payload we accept: a 56-bit frame.
const MIN_PAYLOAD_CHARS: usize = 14;

/// `@` marker plus the receiver counter.
const MLAT_PREFIX_CHARS: usize = 13;

type PayloadDecoder = fn(&[u8]) -> Payload;

const DISPATCH: &[(u8, PayloadDecoder)] = &[
    (0, decode_air_air),
    (4, decode_surveillance_altitude),
    (5, decode_surveillance_identity),
    (11, decode_all_call),
    (16, decode_air_air),
    (17, decode_extended_squitter),
    (18, decode_non_transponder),
    (20, decode_comm_b_altitude),
    (21, decode_comm_b_identity),
];

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Decode a line with the default checksum policy (compute, never reject).
///
/// `fallback_time` becomes the frame timestamp.
pub fn decode(raw_line: &str, fallback_time: DateTime<Utc>) -> Result<Frame, DecodeError> {
    decode_with_policy(raw_line, fallback_time, ChecksumPolicy::default())
}

pub fn decode_with_policy(
    raw_line: &str,
    fallback_time: DateTime<Utc>,
    policy: ChecksumPolicy,
) -> Result<Frame, DecodeError> {
    let line = raw_line.trim_matches(|c: char| c.is_whitespace() || c == ';');

    let (mode, payload_hex) = split_prefix(line)?;

    if payload_hex.len() < MIN_PAYLOAD_CHARS {
        return Err(DecodeError::TooShort {
            len: payload_hex.len(),
        });
    }
    if payload_hex.len() == MIN_PAYLOAD_CHARS && payload_hex.bytes().all(|b| b == b'0') {
        return Err(DecodeError::Heartbeat);
    }
    if !payload_hex.len().is_multiple_of(2) {
        return Err(DecodeError::OddLength {
            len: payload_hex.len(),
        });
    }
    let message =
        hex_decode(payload_hex).ok_or_else(|| DecodeError::InvalidHex(payload_hex.to_string()))?;

    let df = downlink_format(message[0]);
    let expected = frame_len(df);
    if message.len() != expected {
        return Err(DecodeError::LengthMismatch {
            df,
            expected,
            actual: message.len(),
        });
    }

    let checksum = checksum(&message);
    if policy.rejects(df, &checksum) {
        return Err(DecodeError::ChecksumMismatch {
            computed: checksum.computed,
            transmitted: checksum.transmitted,
        });
    }

    let payload = DISPATCH
        .iter()
        .find(|(d, _)| *d == df)
        .map_or(Payload::Other, |(_, decoder)| decoder(&message));

    Ok(Frame {
        raw: payload_hex.to_string(),
        mode,
        timestamp: fallback_time,
        downlink_format: df,
        checksum,
        payload,
    })
}

fn split_prefix(line: &str) -> Result<(FrameMode, &str), DecodeError> {
    if line.starts_with('@') {
        if line.len() < MLAT_PREFIX_CHARS {
            return Err(DecodeError::TooShort { len: line.len() });
        }
        let (counter, payload) = line
            .get(1..MLAT_PREFIX_CHARS - 1)
            .zip(line.get(MLAT_PREFIX_CHARS..))
            .ok_or_else(|| DecodeError::InvalidHex(line.to_string()))?;
        let ticks = u64::from_str_radix(counter, 16)
            .map_err(|_| DecodeError::InvalidHex(counter.to_string()))?;
        return Ok((FrameMode::Mlat { ticks }, payload));
    }
    if let Some(rest) = line.strip_prefix('*') {
        return Ok((FrameMode::Normal, rest));
    }
    Ok((FrameMode::Normal, line))
}

/// DF from the first byte. The two leading bits set mean DF24 regardless
/// of the remaining three.
fn downlink_format(first: u8) -> u8 {
    if first >> 6 == 0b11 {
        24
    } else {
        first >> 3
    }
}

// ---------------------------------------------------------------------------
// Per-format decoders
// ---------------------------------------------------------------------------

fn decode_air_air(message: &[u8]) -> Payload {
    Payload::AirAir {
        on_ground: bit(message, 5),
        cross_link: bit(message, 6),
        sensitivity_level: extract_bits(message, 8, 11) as u8,
        reply_information: extract_bits(message, 13, 17) as u8,
        altitude: decode_ac13(message),
    }
}

fn flight_status(message: &[u8]) -> FlightStatus {
    FlightStatus(message[0] & 0x07)
}

fn decode_surveillance_altitude(message: &[u8]) -> Payload {
    Payload::SurveillanceAltitude {
        flight_status: flight_status(message),
        downlink_request: extract_bits(message, 8, 13) as u8,
        utility_message: extract_bits(message, 13, 19) as u8,
        altitude: decode_ac13(message),
    }
}

fn decode_surveillance_identity(message: &[u8]) -> Payload {
    Payload::SurveillanceIdentity {
        flight_status: flight_status(message),
        downlink_request: extract_bits(message, 8, 13) as u8,
        utility_message: extract_bits(message, 13, 19) as u8,
        squawk: decode_identity(message, [2, 3]),
    }
}

fn decode_all_call(message: &[u8]) -> Payload {
    Payload::AllCall {
        capability: Capability(message[0] & 0x07),
        icao: u24(&message[1..4]),
    }
}

fn squitter(message: &[u8]) -> Squitter {
    Squitter {
        icao: u24(&message[1..4]),
        message_type: message[4] >> 3,
        message_subtype: message[4] & 0x07,
        message: decode_message(message),
    }
}

fn decode_extended_squitter(message: &[u8]) -> Payload {
    Payload::ExtendedSquitter {
        capability: Capability(message[0] & 0x07),
        squitter: squitter(message),
    }
}

fn decode_non_transponder(message: &[u8]) -> Payload {
    let control_field = message[0] & 0x07;
    Payload::NonTransponder {
        control_field,
        address: u24(&message[1..4]),
        squitter: (control_field == 0).then(|| squitter(message)),
    }
}

/// Comm-B MB field carrying BDS 2,0 (aircraft identification).
fn comm_b_identification(message: &[u8]) -> Option<String> {
    (message[4] == 0x20).then(|| decode_callsign(message, 40).trim_end().to_string())
}

fn decode_comm_b_altitude(message: &[u8]) -> Payload {
    Payload::CommBAltitude {
        flight_status: flight_status(message),
        altitude: decode_ac13(message),
        identification: comm_b_identification(message),
    }
}

fn decode_comm_b_identity(message: &[u8]) -> Payload {
    Payload::CommBIdentity {
        flight_status: flight_status(message),
        squawk: decode_identity(message, [2, 3]),
        identification: comm_b_identification(message),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
