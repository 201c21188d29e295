//! BaseStation (SBS1) CSV records.
//!
//! Every line has exactly 22 comma-separated fields. Which of them carry data
//! depends on the message type and, for `MSG`, the transmission subtype; the
//! rest are ignored even when filled in.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::types::{icao_from_hex, SbsError};

const FIELD_COUNT: usize = 22;

const MSG_TYPE: usize = 0;
const TRANSMISSION_TYPE: usize = 1;
const ICAO: usize = 4;
const GENERATED_DATE: usize = 6;
const GENERATED_TIME: usize = 7;
const CALLSIGN: usize = 10;
const ALTITUDE: usize = 11;
const GROUND_SPEED: usize = 12;
const TRACK: usize = 13;
const LAT: usize = 14;
const LON: usize = 15;
const VERTICAL_RATE: usize = 16;
const SQUAWK: usize = 17;
const ALERT: usize = 18;
const EMERGENCY: usize = 19;
const SPI: usize = 20;
const ON_GROUND: usize = 21;

/// Record kind from field 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SbsMessageType {
    /// SEL: selection change
    Selection,
    /// ID: new identification
    NewId,
    /// AIR: new aircraft
    NewAircraft,
    /// STA: status change
    Status,
    /// CLK: click
    Click,
    /// MSG with its transmission subtype 1..=8.
    Transmission(u8),
    Unknown,
}

impl SbsMessageType {
    fn parse(kind: &str, subtype: &str) -> Self {
        match kind {
            "SEL" => SbsMessageType::Selection,
            "ID" => SbsMessageType::NewId,
            "AIR" => SbsMessageType::NewAircraft,
            "STA" => SbsMessageType::Status,
            "CLK" => SbsMessageType::Click,
            "MSG" => subtype
                .trim()
                .parse()
                .map(SbsMessageType::Transmission)
                .unwrap_or(SbsMessageType::Unknown),
            _ => SbsMessageType::Unknown,
        }
    }
}

/// One parsed SBS1 line. Fields the record type does not carry stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SbsRecord {
    pub message_type: SbsMessageType,
    pub icao: u32,
    /// Generation time from fields 6/7, or the arrival time when those are
    /// missing or malformed.
    pub timestamp: DateTime<Utc>,
    pub callsign: Option<String>,
    pub altitude: Option<i32>,
    pub ground_speed: Option<f64>,
    pub track: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub vertical_rate: Option<i32>,
    pub squawk: Option<u32>,
    pub alert: Option<bool>,
    pub emergency: Option<bool>,
    pub spi: Option<bool>,
    pub on_ground: Option<bool>,
}

impl SbsRecord {
    fn empty(message_type: SbsMessageType, icao: u32, timestamp: DateTime<Utc>) -> Self {
        SbsRecord {
            message_type,
            icao,
            timestamp,
            callsign: None,
            altitude: None,
            ground_speed: None,
            track: None,
            lat: None,
            lon: None,
            vertical_rate: None,
            squawk: None,
            alert: None,
            emergency: None,
            spi: None,
            on_ground: None,
        }
    }

    /// Both coordinates, when the record carried them.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// Parse one SBS1 line.
pub fn parse(line: &str, received_at: DateTime<Utc>) -> Result<SbsRecord, SbsError> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(SbsError::FieldCount(fields.len()));
    }

    let icao_str = fields[ICAO].trim();
    let icao = icao_from_hex(icao_str).ok_or_else(|| SbsError::InvalidIcao(icao_str.to_string()))?;
    let message_type = SbsMessageType::parse(fields[MSG_TYPE], fields[TRANSMISSION_TYPE]);
    let timestamp =
        parse_time(fields[GENERATED_DATE], fields[GENERATED_TIME]).unwrap_or(received_at);

    let mut rec = SbsRecord::empty(message_type, icao, timestamp);
    let f = |i: usize| fields[i].trim();

    match message_type {
        SbsMessageType::Selection | SbsMessageType::NewId => rec.callsign = text(f(CALLSIGN)),
        SbsMessageType::Transmission(sub) => {
            match sub {
                1 => rec.callsign = text(f(CALLSIGN)),
                2 => {
                    rec.altitude = number(f(ALTITUDE));
                    rec.ground_speed = number(f(GROUND_SPEED));
                    rec.track = number(f(TRACK));
                    rec.lat = number(f(LAT));
                    rec.lon = number(f(LON));
                }
                3 => {
                    rec.altitude = number(f(ALTITUDE));
                    rec.lat = number(f(LAT));
                    rec.lon = number(f(LON));
                    rec.alert = flag(f(ALERT));
                    rec.emergency = flag(f(EMERGENCY));
                }
                4 => {
                    rec.ground_speed = number(f(GROUND_SPEED));
                    rec.track = number(f(TRACK));
                    rec.vertical_rate = number(f(VERTICAL_RATE));
                }
                5 => {
                    rec.altitude = number(f(ALTITUDE));
                    rec.alert = flag(f(ALERT));
                    rec.callsign = text(f(CALLSIGN));
                }
                6 => {
                    rec.callsign = text(f(CALLSIGN));
                    rec.altitude = number(f(ALTITUDE));
                    rec.squawk = squawk(f(SQUAWK));
                    rec.alert = flag(f(ALERT));
                    rec.emergency = flag(f(EMERGENCY));
                }
                7 => rec.altitude = number(f(ALTITUDE)),
                _ => {}
            }
            if (1..=8).contains(&sub) && sub != 1 {
                rec.on_ground = flag(f(ON_GROUND));
            }
            if matches!(sub, 3 | 5 | 6) {
                rec.spi = flag(f(SPI));
            }
        }
        _ => {}
    }

    Ok(rec)
}

fn parse_time(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let s = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&s, "%Y/%m/%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn text(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn number<T: std::str::FromStr>(s: &str) -> Option<T> {
    s.parse().ok()
}

/// BaseStation flags are `-1` for set and `0` for clear.
fn flag(s: &str) -> Option<bool> {
    match s {
        "-1" | "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Squawk codes are written as four octal digits; keep their digits.
fn squawk(s: &str) -> Option<u32> {
    if s.len() == 4 && s.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        s.parse().ok()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_airborne_position() {
        let line = "MSG,3,1,1,4CA2D6,1,2016/06/03,00:00:38.350,2016/06/03,00:00:38.350,,37000,,,51.45735,-1.02826,,,0,0,0,0";
        let rec = parse(line, now()).unwrap();
        assert_eq!(rec.message_type, SbsMessageType::Transmission(3));
        assert_eq!(rec.icao, 0x4CA2D6);
        assert_eq!(rec.altitude, Some(37000));
        assert_eq!(rec.position(), Some((51.45735, -1.02826)));
        assert_eq!(rec.alert, Some(false));
        assert_eq!(rec.on_ground, Some(false));
        assert_eq!(rec.vertical_rate, None, "not carried by subtype 3");
        let expected = Utc.with_ymd_and_hms(2016, 6, 3, 0, 0, 38).unwrap()
            + chrono::Duration::milliseconds(350);
        assert_eq!(rec.timestamp, expected);
    }

    #[test]
    fn test_identification() {
        let line = "MSG,1,1,1,7C1BE8,1,2016/06/03,00:00:38.350,2016/06/03,00:00:38.350,QFA123 ,,,,,,,,,,,";
        let rec = parse(line, now()).unwrap();
        assert_eq!(rec.icao, 8133608);
        assert_eq!(rec.callsign.as_deref(), Some("QFA123"));
        assert_eq!(rec.on_ground, None, "subtype 1 has no ground flag");
    }

    #[test]
    fn test_velocity_field_selection() {
        // altitude and position present in the line but not part of subtype 4
        let line = "MSG,4,1,1,4CA2D6,1,2016/06/03,00:00:38.350,2016/06/03,00:00:38.350,,37000,451,270.5,51.0,-1.0,-640,,,,,0";
        let rec = parse(line, now()).unwrap();
        assert_eq!(rec.ground_speed, Some(451.0));
        assert_eq!(rec.track, Some(270.5));
        assert_eq!(rec.vertical_rate, Some(-640));
        assert_eq!(rec.altitude, None);
        assert_eq!(rec.position(), None);
    }

    #[test]
    fn test_surveillance_id() {
        let line = "MSG,6,1,1,4CA2D6,1,2016/06/03,00:00:38.350,2016/06/03,00:00:38.350,RYR1AB,12000,,,,,,7700,-1,-1,0,-1";
        let rec = parse(line, now()).unwrap();
        assert_eq!(rec.squawk, Some(7700));
        assert_eq!(rec.alert, Some(true));
        assert_eq!(rec.emergency, Some(true));
        assert_eq!(rec.spi, Some(false));
        assert_eq!(rec.on_ground, Some(true));
        assert_eq!(rec.callsign.as_deref(), Some("RYR1AB"));
    }

    #[test]
    fn test_unparseable_numbers_left_unset() {
        let line = "MSG,2,1,1,4CA2D6,1,2016/06/03,00:00:38.350,2016/06/03,00:00:38.350,,abc,12,x,51.0,,,,,,,-1";
        let rec = parse(line, now()).unwrap();
        assert_eq!(rec.altitude, None);
        assert_eq!(rec.ground_speed, Some(12.0));
        assert_eq!(rec.track, None);
        assert_eq!(rec.lat, Some(51.0));
        assert_eq!(rec.position(), None, "lon missing");
        assert_eq!(rec.on_ground, Some(true));
    }

    #[test]
    fn test_non_transmission_types() {
        let line = "AIR,,1,1,4CA2D6,1,2016/06/03,00:00:38.350,2016/06/03,00:00:38.350,,,,,,,,,,,,";
        let rec = parse(line, now()).unwrap();
        assert_eq!(rec.message_type, SbsMessageType::NewAircraft);
        let line = "ID,,1,1,4CA2D6,1,,,,,EZY12,,,,,,,,,,,";
        let rec = parse(line, now()).unwrap();
        assert_eq!(rec.callsign.as_deref(), Some("EZY12"));
        assert_eq!(rec.timestamp, now(), "missing date falls back to arrival time");
    }

    #[test]
    fn test_field_count() {
        assert!(matches!(parse("MSG,3,1", now()), Err(SbsError::FieldCount(3))));
        let long = format!("{},x", "MSG,1,1,1,4CA2D6,1,,,,,,,,,,,,,,,,");
        assert!(matches!(parse(&long, now()), Err(SbsError::FieldCount(23))));
    }

    #[test]
    fn test_invalid_icao() {
        let line = "MSG,1,1,1,ZZZZZZ,1,,,,,,,,,,,,,,,,";
        assert!(matches!(parse(line, now()), Err(SbsError::InvalidIcao(s)) if s == "ZZZZZZ"));
    }
}
