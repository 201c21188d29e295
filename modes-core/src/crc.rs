//! CRC-24 parity for Mode S messages.
//!
//! Generator 0xFFF409 (x^24 + x^23 + ... + x^10 + x^3 + 1).
//!
//! DF11/17/18 carry the bare CRC in their last 24 bits, so a clean frame has
//! computed == transmitted. DF0/4/5/16/20/21 overlay the aircraft address on
//! the parity, so the residual `computed ^ transmitted` is the address itself.

use serde::Serialize;

const GENERATOR: u32 = 0xFFF409;

// ---------------------------------------------------------------------------
// Lookup tables (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x800000 != 0 {
                crc = (crc << 1) ^ GENERATOR;
            } else {
                crc <<= 1;
            }
            crc &= 0xFFFFFF;
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Contribution of each of the 112 message bits when set on its own.
///
/// Entries for the last 24 bits are zero: they are the parity field.
const fn build_bit_table() -> [u32; 112] {
    let mut table = [0u32; 112];
    // Bit 87 (last data bit) contributes the generator itself.
    let mut crc = GENERATOR;
    let mut i = 88;
    while i > 0 {
        i -= 1;
        table[i] = crc;
        crc <<= 1;
        if crc & 0x1000000 != 0 {
            crc ^= GENERATOR;
        }
        crc &= 0xFFFFFF;
    }
    table
}

static CRC_TABLE: [u32; 256] = build_crc_table();
static BIT_TABLE: [u32; 112] = build_bit_table();

// ---------------------------------------------------------------------------
// CRC computation
// ---------------------------------------------------------------------------

/// CRC-24 over the data bytes of a message (everything but the last three).
///
/// Works for both 56-bit and 112-bit frames.
pub fn crc24(message: &[u8]) -> u32 {
    let payload_len = message.len().saturating_sub(3);
    message[..payload_len].iter().fold(0u32, |crc, &byte| {
        ((crc << 8) ^ CRC_TABLE[((crc >> 16) ^ byte as u32) as usize & 0xFF]) & 0xFFFFFF
    })
}

/// Bitwise CRC-24 using the per-bit table.
///
/// A short frame occupies the last 56 positions of the table, so the offset
/// shifts accordingly.
pub fn crc24_bitwise(message: &[u8]) -> u32 {
    let bits = message.len() * 8;
    let offset = BIT_TABLE.len().saturating_sub(bits);
    let data_bits = bits.saturating_sub(24);
    (0..data_bits)
        .filter(|&j| message[j / 8] & (0x80 >> (j % 8)) != 0)
        .fold(0u32, |crc, j| crc ^ BIT_TABLE[offset + j])
}

/// Computed and transmitted parity of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Checksum {
    pub computed: u32,
    pub transmitted: u32,
}

impl Checksum {
    pub fn ok(&self) -> bool {
        self.computed == self.transmitted
    }

    /// `computed ^ transmitted`. Zero for a clean DF11/17/18 frame, the
    /// aircraft address for address/parity formats.
    pub fn residual(&self) -> u32 {
        self.computed ^ self.transmitted
    }
}

/// Compute the checksum of a full message.
pub fn checksum(message: &[u8]) -> Checksum {
    let n = message.len();
    let transmitted = if n >= 3 {
        crate::types::u24(&message[n - 3..])
    } else {
        0
    };
    Checksum {
        computed: crc24(message),
        transmitted,
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What the decoder does with a checksum mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Compute and expose the checksum, never reject.
    #[default]
    Ignore,
    /// Reject DF11/17/18 frames whose parity does not match.
    Enforce,
}

impl ChecksumPolicy {
    /// True when a frame of this DF with this checksum must be rejected.
    ///
    /// Address/parity formats are never rejected: their residual is the
    /// address, not an error indicator.
    pub fn rejects(self, df: u8, checksum: &Checksum) -> bool {
        self == ChecksumPolicy::Enforce && matches!(df, 11 | 17 | 18) && !checksum.ok()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Some(ChecksumPolicy::Ignore),
            "enforce" => Some(ChecksumPolicy::Enforce),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumPolicy::Ignore => "ignore",
            ChecksumPolicy::Enforce => "enforce",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
