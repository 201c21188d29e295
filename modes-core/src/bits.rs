//! Bit-level field extraction and the Mode S altitude / identity codecs.
//!
//! Bit numbering is big-endian across the whole message: bit 0 is the most
//! significant bit of byte 0, bit 32 is the first bit of the ADS-B ME field.

use crate::types::{Altitude, CALLSIGN_CHARSET};

/// Extract bits `[start, end)` as an unsigned integer.
///
/// Spans may cross byte boundaries and be up to 64 bits wide. Callers pass
/// fixed offsets for a buffer whose length was already checked against the
/// downlink format, so the span is only checked in debug builds.
pub fn extract_bits(buf: &[u8], start: usize, end: usize) -> u64 {
    debug_assert!(start <= end && end - start <= 64 && end <= buf.len() * 8);
    (start..end).fold(0u64, |acc, bit| {
        (acc << 1) | ((buf[bit / 8] >> (7 - bit % 8)) & 1) as u64
    })
}

/// Single-bit flag at `bit`.
pub fn bit(buf: &[u8], bit: usize) -> bool {
    extract_bits(buf, bit, bit + 1) == 1
}

// ---------------------------------------------------------------------------
// Altitude
// ---------------------------------------------------------------------------

/// Gray-coded (Gillham) altitude to feet.
pub fn gillham_to_altitude(code: u32) -> i32 {
    gillham_hundreds(code) * 100
}

fn gillham_hundreds(code: u32) -> i32 {
    let mut t = (code ^ (code >> 8)) as i32;
    t ^= t >> 4;
    t ^= t >> 2;
    t ^= t >> 1;
    t -= (t >> 4) * 6 + ((t % 16) / 5) * 2;
    t - 13
}

/// Decode the 12-bit AC12 altitude of an airborne position message.
///
/// Q set: 25 ft steps. Q clear: Gillham code with M=0 re-inserted at bit 6.
pub fn decode_ac12(field: u32) -> i32 {
    if field & 0x10 != 0 {
        let n = ((field & 0x0FE0) >> 1) | (field & 0x000F);
        return n as i32 * 25 - 1000;
    }
    let code = ((field & 0x0FC0) << 1) | (field & 0x003F);
    let hundreds = gillham_hundreds(code);
    if hundreds < -12 {
        return 0;
    }
    hundreds * 100
}

/// Decode the 13-bit AC13 altitude at bits 19..32 of DF0/4/16/20.
///
/// Returns `None` when the field is zero (altitude not available).
pub fn decode_ac13(message: &[u8]) -> Option<Altitude> {
    let field = extract_bits(message, 19, 32) as u32;
    if field == 0 {
        return None;
    }
    let m_bit = field & 0x40 != 0;
    let q_bit = field & 0x10 != 0;

    if m_bit {
        let n = ((field & 0x1F80) >> 1) | (field & 0x003F);
        return Some(Altitude::metres(n as i32));
    }
    if q_bit {
        let n = ((field & 0x1F80) >> 2) | ((field & 0x0020) >> 1) | (field & 0x000F);
        return Some(Altitude::feet(n as i32 * 25 - 1000));
    }
    Some(Altitude::feet(gillham_to_altitude(field)))
}

// ---------------------------------------------------------------------------
// Identity (squawk)
// ---------------------------------------------------------------------------

/// De-interleave the 13-bit identity code spread over two bytes.
///
/// Layout: C1 A1 C2 A2 C4 A4 X B1 D1 B2 D2 B4 D4, starting at bit 3 of
/// `message[bytes[0]]`. Returns the squawk as `A*1000 + B*100 + C*10 + D`.
pub fn decode_identity(message: &[u8], bytes: [usize; 2]) -> u32 {
    let m2 = message[bytes[0]] as u32;
    let m3 = message[bytes[1]] as u32;

    let a = ((m3 & 0x80) >> 5) | (m2 & 0x02) | ((m2 & 0x08) >> 3);
    let b = ((m3 & 0x02) << 1) | ((m3 & 0x08) >> 2) | ((m3 & 0x20) >> 5);
    let c = ((m2 & 0x01) << 2) | ((m2 & 0x04) >> 1) | ((m2 & 0x10) >> 4);
    let d = ((m3 & 0x01) << 2) | ((m3 & 0x04) >> 1) | ((m3 & 0x10) >> 4);

    a * 1000 + b * 100 + c * 10 + d
}

// ---------------------------------------------------------------------------
// Callsign and surface movement
// ---------------------------------------------------------------------------

/// Eight 6-bit AIS characters starting at `start_bit`.
pub fn decode_callsign(message: &[u8], start_bit: usize) -> String {
    (0..8)
        .map(|i| {
            let idx = extract_bits(message, start_bit + i * 6, start_bit + i * 6 + 6);
            CALLSIGN_CHARSET[idx as usize] as char
        })
        .collect()
}

/// Surface ground-movement code to knots.
///
/// Codes 0 (no information) and 125..=127 (reserved) have no speed.
pub fn decode_movement(code: u32) -> Option<f64> {
    let knots = match code {
        0 | 125.. => return None,
        1..=8 => 0,
        9..=12 => ((code - 6) >> 2) + 1,
        13..=38 => ((code - 11) >> 1) + 2,
        39..=93 => (code - 38) + 15,
        94..=108 => (code - 93) * 2 + 70,
        109..=123 => (code - 108) * 5 + 100,
        124 => 199,
    };
    Some(knots as f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
