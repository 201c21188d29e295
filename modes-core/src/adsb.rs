//! ADS-B extended squitter bodies (the 56-bit ME field of DF17/18).
//!
//! Dispatch is on the type code (bits 32..37) and subtype (bits 37..40):
//! - TC 1-4:   Aircraft identification and category
//! - TC 5-8:   Surface position
//! - TC 9-18:  Airborne position (barometric altitude)
//! - TC 19:    Airborne velocity (ground speed or airspeed)
//! - TC 23/7:  Test message carrying a squawk
//! - TC 28:    Emergency status / TCAS resolution advisory
//! - TC 29:    Target state and status
//! - TC 31:    Operational status
//!
//! Everything else (including GNSS-height positions, TC 20-22) is `Reserved`.

use serde::Serialize;

use crate::bits::{
    bit, decode_ac12, decode_callsign, decode_identity, decode_movement, extract_bits,
};
use crate::cpr::{CprParity, CprPosition};

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Emitter category, indexed by [4 - type code][subtype].
const CATEGORY_TABLE: [[&str; 8]; 4] = [
    [
        "No ADS-B emitter category information",
        "Light (< 15500 lbs)",
        "Small (15500 to 75000 lbs)",
        "Large (75000 to 300000 lbs)",
        "High vortex large",
        "Heavy (> 300000 lbs)",
        "High performance (> 5g acceleration and 400 kts)",
        "Rotorcraft",
    ],
    [
        "No ADS-B emitter category information",
        "Glider / sailplane",
        "Lighter-than-air",
        "Parachutist / skydiver",
        "Ultralight / hang-glider / paraglider",
        "Reserved",
        "Unmanned aerial vehicle",
        "Space / trans-atmospheric vehicle",
    ],
    [
        "No ADS-B emitter category information",
        "Surface vehicle - emergency vehicle",
        "Surface vehicle - service vehicle",
        "Point obstacle",
        "Cluster obstacle",
        "Line obstacle",
        "Reserved",
        "Reserved",
    ],
    ["Reserved"; 8],
];

const EMERGENCY_TABLE: [&str; 8] = [
    "No emergency",
    "General emergency (squawk 7700)",
    "Lifeguard/Medical",
    "Minimum fuel",
    "No communications (squawk 7600)",
    "Unlawful interference (squawk 7500)",
    "Downed Aircraft",
    "Reserved",
];

/// Surface airframe length and width in metres, indexed by the 4-bit L/W code.
const AIRFRAME_DIMENSIONS: [Option<(f32, f32)>; 16] = [
    None,
    Some((15.0, 23.0)),
    Some((25.0, 28.5)),
    Some((25.0, 34.0)),
    Some((35.0, 33.0)),
    Some((35.0, 38.0)),
    Some((45.0, 39.5)),
    Some((45.0, 45.0)),
    Some((55.0, 45.0)),
    Some((55.0, 52.0)),
    Some((65.0, 59.5)),
    Some((65.0, 67.0)),
    Some((75.0, 72.5)),
    Some((75.0, 80.0)),
    Some((85.0, 80.0)),
    Some((85.0, 90.0)),
];

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// Decoded ME field, one variant per message kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdsbMessage {
    Identification(Identification),
    SurfacePosition(SurfacePosition),
    AirbornePosition(AirbornePosition),
    GroundSpeed(GroundSpeed),
    Airspeed(Airspeed),
    TestMessage { squawk: Option<u32> },
    EmergencyStatus(EmergencyStatus),
    TcasResolutionAdvisory,
    TargetState { subtype: u8 },
    OperationalStatus(OperationalStatus),
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    /// Category set A (TC 4) to D (TC 1).
    pub category_set: char,
    pub category: u8,
    pub callsign: String,
}

impl Identification {
    pub fn category_description(&self) -> &'static str {
        let set = (self.category_set as u8).saturating_sub(b'A') as usize;
        CATEGORY_TABLE[set.min(3)][(self.category & 7) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfacePosition {
    /// Ground speed in knots.
    pub movement: Option<f64>,
    pub heading: Option<f64>,
    pub cpr: CprPosition,
    pub time_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirbornePosition {
    pub surveillance_status: u8,
    pub nic_supplement_b: bool,
    /// Barometric altitude in feet; `None` when the field is zero.
    pub altitude: Option<i32>,
    pub cpr: CprPosition,
    pub time_flag: bool,
}

/// Fields common to both velocity subtypes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityCommon {
    pub supersonic: bool,
    pub intent_change: bool,
    pub ifr_capable: bool,
    pub nac_v: u8,
    /// 0 = GNSS, 1 = barometric.
    pub vertical_rate_source: u8,
    /// Feet per minute, positive up.
    pub vertical_rate: Option<i32>,
    /// GNSS height minus barometric altitude, in feet.
    pub gnss_baro_diff: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundSpeed {
    /// 0 = east, 1 = west.
    pub ew_direction: u8,
    /// Signed east-west component in knots (negative = west).
    pub ew_velocity: Option<i32>,
    /// 0 = north, 1 = south.
    pub ns_direction: u8,
    pub ns_velocity: Option<i32>,
    pub velocity: Option<f64>,
    pub heading: Option<f64>,
    #[serde(flatten)]
    pub common: VelocityCommon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AirspeedType {
    Indicated,
    True,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airspeed {
    pub airspeed: Option<f64>,
    pub airspeed_type: AirspeedType,
    /// Magnetic heading in degrees.
    pub heading: Option<f64>,
    #[serde(flatten)]
    pub common: VelocityCommon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyStatus {
    pub state: u8,
    pub squawk: u32,
}

impl EmergencyStatus {
    pub fn description(&self) -> &'static str {
        EMERGENCY_TABLE[(self.state & 7) as usize]
    }

    pub fn is_emergency(&self) -> bool {
        self.state != 0
    }
}

/// Capability class codes of an operational status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum CapabilityClass {
    Airborne {
        tcas_operational: bool,
        es_1090_in: bool,
        air_referenced_velocity: bool,
        target_state_report: bool,
        target_change_report: u8,
        uat_in: bool,
    },
    Surface {
        position_offset: bool,
        es_1090_in: bool,
        b2_low: bool,
        uat_in: bool,
        nac_v: u8,
        nic_supplement_c: bool,
    },
    /// Reserved bits set; the code is kept but not interpreted.
    Unknown { code: u16 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationalStatus {
    pub capability: CapabilityClass,
    pub operational_mode: u16,
    pub version: u8,
    pub nic_supplement_a: bool,
    pub nac_p: u8,
    pub gva: u8,
    pub sil: u8,
    /// NICbaro when airborne, track/heading when on the surface.
    pub nic_baro_or_track_heading: bool,
    /// Horizontal reference direction: false = true north, true = magnetic north.
    pub horizontal_reference: bool,
    /// Surface length/width code.
    pub length_width: Option<u8>,
}

impl OperationalStatus {
    /// Airframe (length, width) in metres for surface reports.
    pub fn airframe_dimensions(&self) -> Option<(f32, f32)> {
        self.length_width
            .and_then(|code| AIRFRAME_DIMENSIONS[(code & 0x0F) as usize])
    }
}

impl AdsbMessage {
    /// Human-readable message kind.
    pub fn name(&self) -> &'static str {
        match self {
            AdsbMessage::Identification(_) => "Aircraft identification and category",
            AdsbMessage::SurfacePosition(_) => "Surface position",
            AdsbMessage::AirbornePosition(_) => "Airborne position (barometric altitude)",
            AdsbMessage::GroundSpeed(_) => "Airborne velocity (ground speed)",
            AdsbMessage::Airspeed(_) => "Airborne velocity (airspeed)",
            AdsbMessage::TestMessage { .. } => "Test message",
            AdsbMessage::EmergencyStatus(_) => "Emergency/priority status",
            AdsbMessage::TcasResolutionAdvisory => "TCAS resolution advisory",
            AdsbMessage::TargetState { .. } => "Target state and status",
            AdsbMessage::OperationalStatus(_) => "Aircraft operational status",
            AdsbMessage::Reserved => "Reserved",
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode the ME field of a 14-byte extended squitter.
pub fn decode_message(message: &[u8]) -> AdsbMessage {
    let type_code = message[4] >> 3;
    let subtype = message[4] & 0x07;

    match (type_code, subtype) {
        (1..=4, _) => AdsbMessage::Identification(decode_identification(message, type_code)),
        (5..=8, _) => AdsbMessage::SurfacePosition(decode_surface_position(message)),
        (9..=18, _) => AdsbMessage::AirbornePosition(decode_airborne_position(message)),
        (19, 1 | 2) => AdsbMessage::GroundSpeed(decode_ground_speed(message, subtype)),
        (19, 3 | 4) => AdsbMessage::Airspeed(decode_airspeed(message, subtype)),
        (23, 7) => AdsbMessage::TestMessage {
            squawk: Some(decode_identity(message, [5, 6])),
        },
        (23, _) => AdsbMessage::TestMessage { squawk: None },
        (28, 1) => AdsbMessage::EmergencyStatus(EmergencyStatus {
            state: extract_bits(message, 40, 43) as u8,
            squawk: decode_identity(message, [5, 6]),
        }),
        (28, 2) => AdsbMessage::TcasResolutionAdvisory,
        (29, _) => AdsbMessage::TargetState { subtype },
        (31, 0 | 1) => AdsbMessage::OperationalStatus(decode_operational_status(message, subtype)),
        _ => AdsbMessage::Reserved,
    }
}

fn decode_cpr(message: &[u8]) -> CprPosition {
    CprPosition {
        parity: CprParity::from_bit(bit(message, 53)),
        lat: extract_bits(message, 54, 71) as u32,
        lon: extract_bits(message, 71, 88) as u32,
    }
}

fn decode_identification(message: &[u8], type_code: u8) -> Identification {
    Identification {
        category_set: (b'A' + (4 - type_code)) as char,
        category: message[4] & 0x07,
        callsign: decode_callsign(message, 40).trim_end().to_string(),
    }
}

fn decode_surface_position(message: &[u8]) -> SurfacePosition {
    let heading = bit(message, 44)
        .then(|| extract_bits(message, 45, 52) as f64 * 360.0 / 128.0);

    SurfacePosition {
        movement: decode_movement(extract_bits(message, 37, 44) as u32),
        heading,
        cpr: decode_cpr(message),
        time_flag: bit(message, 52),
    }
}

fn decode_airborne_position(message: &[u8]) -> AirbornePosition {
    let field = extract_bits(message, 40, 52) as u32;

    AirbornePosition {
        surveillance_status: extract_bits(message, 37, 39) as u8,
        nic_supplement_b: bit(message, 39),
        altitude: (field != 0).then(|| decode_ac12(field)),
        cpr: decode_cpr(message),
        time_flag: bit(message, 52),
    }
}

fn decode_velocity_common(message: &[u8], supersonic: bool) -> VelocityCommon {
    let vr_raw = extract_bits(message, 69, 78) as i32;
    let vertical_rate = (vr_raw != 0).then(|| {
        let rate = (vr_raw - 1) * 64;
        if bit(message, 68) {
            -rate
        } else {
            rate
        }
    });

    let diff_raw = extract_bits(message, 81, 88) as i32;
    let gnss_baro_diff = (diff_raw != 0).then(|| {
        let diff = (diff_raw - 1) * 25;
        if bit(message, 80) {
            -diff
        } else {
            diff
        }
    });

    VelocityCommon {
        supersonic,
        intent_change: bit(message, 40),
        ifr_capable: bit(message, 41),
        nac_v: extract_bits(message, 42, 45) as u8,
        vertical_rate_source: extract_bits(message, 67, 68) as u8,
        vertical_rate,
        gnss_baro_diff,
    }
}

/// Signed velocity component: raw 0 means unavailable.
fn velocity_component(raw: u64, negative: bool, supersonic: bool) -> Option<i32> {
    if raw == 0 {
        return None;
    }
    let mut v = raw as i32 - 1;
    if supersonic {
        v *= 4;
    }
    Some(if negative { -v } else { v })
}

fn decode_ground_speed(message: &[u8], subtype: u8) -> GroundSpeed {
    let supersonic = subtype == 2;
    let ew_direction = extract_bits(message, 45, 46) as u8;
    let ns_direction = extract_bits(message, 56, 57) as u8;
    let ew_velocity =
        velocity_component(extract_bits(message, 46, 56), ew_direction == 1, supersonic);
    let ns_velocity =
        velocity_component(extract_bits(message, 57, 67), ns_direction == 1, supersonic);

    let (velocity, heading) = match (ew_velocity, ns_velocity) {
        (None, None) => (None, None),
        (ew, ns) => {
            let vx = ew.unwrap_or(0) as f64;
            let vy = ns.unwrap_or(0) as f64;
            let hdg = vx.atan2(vy).to_degrees().rem_euclid(360.0);
            (Some(vx.hypot(vy)), Some(hdg))
        }
    };

    GroundSpeed {
        ew_direction,
        ew_velocity,
        ns_direction,
        ns_velocity,
        velocity,
        heading,
        common: decode_velocity_common(message, supersonic),
    }
}

fn decode_airspeed(message: &[u8], subtype: u8) -> Airspeed {
    let supersonic = subtype == 4;
    let raw = extract_bits(message, 57, 67);
    let airspeed = (raw != 0).then(|| {
        let knots = raw as f64 - 1.0;
        if supersonic {
            knots * 4.0
        } else {
            knots
        }
    });
    let heading = bit(message, 45)
        .then(|| extract_bits(message, 46, 53) as f64 * 360.0 / 128.0);

    Airspeed {
        airspeed,
        airspeed_type: if bit(message, 56) {
            AirspeedType::True
        } else {
            AirspeedType::Indicated
        },
        heading,
        common: decode_velocity_common(message, supersonic),
    }
}

fn decode_operational_status(message: &[u8], subtype: u8) -> OperationalStatus {
    let (capability, length_width) = if subtype == 0 {
        let cc = extract_bits(message, 40, 56) as u16;
        let capability = if cc & 0xC000 == 0 {
            CapabilityClass::Airborne {
                tcas_operational: cc & 0x2000 != 0,
                es_1090_in: cc & 0x1000 != 0,
                air_referenced_velocity: cc & 0x0200 != 0,
                target_state_report: cc & 0x0100 != 0,
                target_change_report: ((cc & 0x00C0) >> 6) as u8,
                uat_in: cc & 0x0020 != 0,
            }
        } else {
            CapabilityClass::Unknown { code: cc }
        };
        (capability, None)
    } else {
        let cc = extract_bits(message, 40, 52) as u16;
        let capability = if cc & 0x0C00 == 0 {
            CapabilityClass::Surface {
                position_offset: cc & 0x0200 != 0,
                es_1090_in: cc & 0x0100 != 0,
                b2_low: cc & 0x0020 != 0,
                uat_in: cc & 0x0010 != 0,
                nac_v: ((cc & 0x000E) >> 1) as u8,
                nic_supplement_c: cc & 0x0001 != 0,
            }
        } else {
            CapabilityClass::Unknown { code: cc }
        };
        (capability, Some(extract_bits(message, 52, 56) as u8))
    };

    OperationalStatus {
        capability,
        operational_mode: extract_bits(message, 56, 72) as u16,
        version: extract_bits(message, 72, 75) as u8,
        nic_supplement_a: bit(message, 75),
        nac_p: extract_bits(message, 76, 80) as u8,
        gva: extract_bits(message, 80, 82) as u8,
        sil: extract_bits(message, 82, 84) as u8,
        nic_baro_or_track_heading: bit(message, 84),
        horizontal_reference: bit(message, 85),
        length_width,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hex_decode;

    fn decode_hex(hex: &str) -> AdsbMessage {
        decode_message(&hex_decode(hex).unwrap())
    }

    #[test]
    fn test_identification() {
        match decode_hex("8D4840D6202CC371C32CE0576098") {
            AdsbMessage::Identification(id) => {
                assert_eq!(id.callsign, "KLM1023");
                assert_eq!(id.category_set, 'A');
                assert_eq!(id.category, 0);
                assert_eq!(id.category_description(), "No ADS-B emitter category information");
            }
            other => panic!("expected identification, got {other:?}"),
        }
    }

    #[test]
    fn test_airborne_position_even() {
        match decode_hex("8D75804B580FF2CF7E9BA6F701D0") {
            AdsbMessage::AirbornePosition(pos) => {
                assert_eq!(pos.altitude, Some(2175));
                assert_eq!(pos.cpr.parity, CprParity::Even);
                assert_eq!((pos.cpr.lat, pos.cpr.lon), (92095, 39846));
                assert!(!pos.time_flag);
            }
            other => panic!("expected airborne position, got {other:?}"),
        }
    }

    #[test]
    fn test_airborne_position_odd() {
        match decode_hex("8D75804B580FF6B283EB7A157117") {
            AdsbMessage::AirbornePosition(pos) => {
                assert_eq!(pos.altitude, Some(2175));
                assert_eq!(pos.cpr.parity, CprParity::Odd);
                assert_eq!((pos.cpr.lat, pos.cpr.lon), (88385, 125818));
            }
            other => panic!("expected airborne position, got {other:?}"),
        }
    }

    #[test]
    fn test_ground_speed_westbound_north() {
        match decode_hex("8D7C451C99C4182CA0A4164A8C70") {
            AdsbMessage::GroundSpeed(v) => {
                assert_eq!(v.ew_direction, 1);
                assert_eq!(v.ew_velocity, Some(-23));
                assert_eq!(v.ns_direction, 0);
                assert_eq!(v.ns_velocity, Some(356));
                assert!(!v.common.supersonic);
                let speed = v.velocity.unwrap();
                assert!((speed - 356.742).abs() < 0.001, "speed {speed}");
                let hdg = v.heading.unwrap();
                assert!((hdg - 356.303).abs() < 0.001, "heading {hdg}");
                assert_eq!(v.common.vertical_rate, Some(2560));
                assert_eq!(v.common.gnss_baro_diff, Some(525));
            }
            other => panic!("expected ground speed, got {other:?}"),
        }
    }

    #[test]
    fn test_ground_speed_descending() {
        match decode_hex("8D485020994409940838175B284F") {
            AdsbMessage::GroundSpeed(v) => {
                assert_eq!(v.ew_velocity, Some(-8));
                assert_eq!(v.ns_velocity, Some(-159));
                assert!((v.velocity.unwrap() - 159.20).abs() < 0.01);
                assert!((v.heading.unwrap() - 182.88).abs() < 0.01);
                assert_eq!(v.common.vertical_rate, Some(-832));
            }
            other => panic!("expected ground speed, got {other:?}"),
        }
    }

    #[test]
    fn test_airspeed() {
        match decode_hex("8DA05F219B06B6AF189400CBC33F") {
            AdsbMessage::Airspeed(v) => {
                assert_eq!(v.airspeed, Some(375.0));
                assert_eq!(v.airspeed_type, AirspeedType::True);
                assert_eq!(v.heading, Some(241.875));
                assert_eq!(v.common.vertical_rate, Some(-2304));
                assert_eq!(v.common.vertical_rate_source, 1);
            }
            other => panic!("expected airspeed, got {other:?}"),
        }
    }

    #[test]
    fn test_surface_position() {
        match decode_hex("8C4841753AAB238733C8CD4020B1") {
            AdsbMessage::SurfacePosition(pos) => {
                assert_eq!(pos.cpr.parity, CprParity::Even);
                assert_eq!((pos.cpr.lat, pos.cpr.lon), (115609, 116941));
                // movement code 42
                assert_eq!(pos.movement, Some(19.0));
                assert_eq!(pos.heading, Some(140.625));
            }
            other => panic!("expected surface position, got {other:?}"),
        }
    }

    #[test]
    fn test_velocity_unavailable_components() {
        // TC19/1 with both velocity fields zero
        let mut msg = hex_decode("8D485020994409940838175B284F").unwrap();
        msg[5] &= 0xFC;
        msg[6] = 0;
        msg[7] &= 0x80;
        msg[8] &= 0x1F;
        match decode_message(&msg) {
            AdsbMessage::GroundSpeed(v) => {
                assert_eq!(v.velocity, None);
                assert_eq!(v.heading, None);
            }
            other => panic!("expected ground speed, got {other:?}"),
        }
    }

    #[test]
    fn test_emergency_status() {
        // TC28/1, state 1 (general), squawk 7700
        let mut msg = vec![0x8D, 0x48, 0x40, 0xD6, (28 << 3) | 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let id13: u32 = 0b0_1_0_1_0_1_0_1_0_1_0_1_0;
        msg[5] = (1 << 5) | (id13 >> 8) as u8;
        msg[6] = id13 as u8;
        match decode_message(&msg) {
            AdsbMessage::EmergencyStatus(e) => {
                assert_eq!(e.state, 1);
                assert_eq!(e.squawk, 7700);
                assert!(e.is_emergency());
                assert_eq!(e.description(), "General emergency (squawk 7700)");
            }
            other => panic!("expected emergency status, got {other:?}"),
        }
    }

    #[test]
    fn test_test_message_squawk_only_subtype_7() {
        let mut msg = vec![0x8D, 0x48, 0x40, 0xD6, (23 << 3) | 7, 0x0A, 0xAA, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            decode_message(&msg),
            AdsbMessage::TestMessage { squawk: Some(_) }
        ));
        msg[4] = 23 << 3;
        assert_eq!(decode_message(&msg), AdsbMessage::TestMessage { squawk: None });
    }

    #[test]
    fn test_operational_status_airborne() {
        let mut msg = vec![0x8D, 0x48, 0x40, 0xD6, 31 << 3, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        // CC: TCAS + 1090ES in + TS
        msg[5] = 0x31;
        // version 2, NIC-A, NACp 9
        msg[9] = (2 << 5) | 0x10 | 0x09;
        // GVA 2, SIL 3, NICbaro
        msg[10] = (2 << 6) | (3 << 4) | 0x08;
        match decode_message(&msg) {
            AdsbMessage::OperationalStatus(op) => {
                assert_eq!(
                    op.capability,
                    CapabilityClass::Airborne {
                        tcas_operational: true,
                        es_1090_in: true,
                        air_referenced_velocity: false,
                        target_state_report: true,
                        target_change_report: 0,
                        uat_in: false,
                    }
                );
                assert_eq!(op.version, 2);
                assert!(op.nic_supplement_a);
                assert_eq!(op.nac_p, 9);
                assert_eq!(op.gva, 2);
                assert_eq!(op.sil, 3);
                assert!(op.nic_baro_or_track_heading);
                assert_eq!(op.length_width, None);
            }
            other => panic!("expected operational status, got {other:?}"),
        }
    }

    #[test]
    fn test_operational_status_surface_dimensions() {
        let mut msg = vec![0x8D, 0x48, 0x40, 0xD6, (31 << 3) | 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        // CC 12 bits = 0x10E (1090ES in, NACv 7), L/W code 4
        msg[5] = 0x10;
        msg[6] = 0xE4;
        match decode_message(&msg) {
            AdsbMessage::OperationalStatus(op) => {
                assert!(matches!(
                    op.capability,
                    CapabilityClass::Surface { es_1090_in: true, nac_v: 7, .. }
                ));
                assert_eq!(op.length_width, Some(4));
                assert_eq!(op.airframe_dimensions(), Some((35.0, 33.0)));
            }
            other => panic!("expected operational status, got {other:?}"),
        }
    }

    #[test]
    fn test_reserved_types() {
        for tc in [0u8, 20, 21, 22, 24, 25, 26, 27, 30] {
            let msg = [0x8D, 0x48, 0x40, 0xD6, tc << 3, 0, 0, 0, 0, 0, 0, 0, 0, 0];
            assert_eq!(decode_message(&msg), AdsbMessage::Reserved, "TC{tc}");
        }
        let msg = [0x8D, 0x48, 0x40, 0xD6, (29 << 3) | 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(decode_message(&msg), AdsbMessage::TargetState { subtype: 1 });
    }
}
