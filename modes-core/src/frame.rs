//! Decoded Mode S frames.
//!
//! A `Frame` is only ever built whole by [`crate::decode::decode`]: the raw
//! payload text, the reception mode, the checksum and a tagged payload with
//! one variant per downlink format. The accessors below give a flat view
//! across formats for consumers such as the track store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adsb::AdsbMessage;
use crate::cpr::CprPosition;
use crate::crc::Checksum;
use crate::types::{df_info, Altitude, Capability, FlightStatus};

/// How the frame reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FrameMode {
    Normal,
    /// Beast/AVR MLAT prefix. The receiver counter is kept but not converted
    /// into a time (its epoch is receiver start-up).
    Mlat { ticks: u64 },
}

/// ADS-B body shared by DF17 and DF18.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Squitter {
    pub icao: u32,
    pub message_type: u8,
    pub message_subtype: u8,
    pub message: AdsbMessage,
}

/// Format-specific fields, one variant per downlink format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Payload {
    /// DF0 and DF16.
    AirAir {
        on_ground: bool,
        cross_link: bool,
        sensitivity_level: u8,
        reply_information: u8,
        altitude: Option<Altitude>,
    },
    /// DF4
    SurveillanceAltitude {
        flight_status: FlightStatus,
        downlink_request: u8,
        utility_message: u8,
        altitude: Option<Altitude>,
    },
    /// DF5
    SurveillanceIdentity {
        flight_status: FlightStatus,
        downlink_request: u8,
        utility_message: u8,
        squawk: u32,
    },
    /// DF11
    AllCall { capability: Capability, icao: u32 },
    /// DF17
    ExtendedSquitter {
        capability: Capability,
        squitter: Squitter,
    },
    /// DF18. The ADS-B body is only decoded for control field 0.
    NonTransponder {
        control_field: u8,
        address: u32,
        squitter: Option<Squitter>,
    },
    /// DF20
    CommBAltitude {
        flight_status: FlightStatus,
        altitude: Option<Altitude>,
        identification: Option<String>,
    },
    /// DF21
    CommBIdentity {
        flight_status: FlightStatus,
        squawk: u32,
        identification: Option<String>,
    },
    /// DF19, DF24 and anything without a decoder.
    Other,
}

/// A fully decoded Mode S frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Payload hex exactly as received, prefix and terminator removed.
    pub raw: String,
    pub mode: FrameMode,
    pub timestamp: DateTime<Utc>,
    pub downlink_format: u8,
    pub checksum: Checksum,
    pub payload: Payload,
}

impl Frame {
    pub fn downlink_format(&self) -> u8 {
        self.downlink_format
    }

    /// Human-readable Downlink Format name.
    pub fn df_name(&self) -> &'static str {
        df_info(self.downlink_format)
            .map(|info| info.name)
            .unwrap_or("Unknown")
    }

    pub fn checksum_ok(&self) -> bool {
        self.checksum.ok()
    }

    /// The ADS-B body for DF17, or DF18 with control field 0.
    pub fn squitter(&self) -> Option<&Squitter> {
        match &self.payload {
            Payload::ExtendedSquitter { squitter, .. } => Some(squitter),
            Payload::NonTransponder { squitter, .. } => squitter.as_ref(),
            _ => None,
        }
    }

    pub fn adsb(&self) -> Option<&AdsbMessage> {
        self.squitter().map(|sq| &sq.message)
    }

    /// 24-bit aircraft address.
    ///
    /// Explicit for DF11/17/18; recovered from the address/parity field for
    /// DF0/4/5/16/20/21 (see [`Frame::address_from_parity`]).
    pub fn icao(&self) -> Option<u32> {
        match &self.payload {
            Payload::AllCall { icao, .. } => Some(*icao),
            Payload::ExtendedSquitter { squitter, .. } => Some(squitter.icao),
            Payload::NonTransponder { address, .. } => Some(*address),
            Payload::Other => None,
            _ => Some(self.checksum.residual()),
        }
    }

    /// True when [`Frame::icao`] came out of the parity field. Such
    /// addresses are only as good as the bits received.
    pub fn address_from_parity(&self) -> bool {
        matches!(
            self.payload,
            Payload::AirAir { .. }
                | Payload::SurveillanceAltitude { .. }
                | Payload::SurveillanceIdentity { .. }
                | Payload::CommBAltitude { .. }
                | Payload::CommBIdentity { .. }
        )
    }

    pub fn altitude(&self) -> Option<Altitude> {
        match &self.payload {
            Payload::AirAir { altitude, .. }
            | Payload::SurveillanceAltitude { altitude, .. }
            | Payload::CommBAltitude { altitude, .. } => *altitude,
            _ => match self.adsb()? {
                AdsbMessage::AirbornePosition(pos) => pos.altitude.map(Altitude::feet),
                _ => None,
            },
        }
    }

    /// Raw CPR half-position of a surface or airborne position message.
    pub fn cpr(&self) -> Option<CprPosition> {
        match self.adsb()? {
            AdsbMessage::SurfacePosition(pos) => Some(pos.cpr),
            AdsbMessage::AirbornePosition(pos) => Some(pos.cpr),
            _ => None,
        }
    }

    /// Speed in knots: ground speed, airspeed or surface movement.
    pub fn velocity(&self) -> Option<f64> {
        match self.adsb()? {
            AdsbMessage::GroundSpeed(v) => v.velocity,
            AdsbMessage::Airspeed(v) => v.airspeed,
            AdsbMessage::SurfacePosition(pos) => pos.movement,
            _ => None,
        }
    }

    pub fn heading(&self) -> Option<f64> {
        match self.adsb()? {
            AdsbMessage::GroundSpeed(v) => v.heading,
            AdsbMessage::Airspeed(v) => v.heading,
            AdsbMessage::SurfacePosition(pos) => pos.heading,
            _ => None,
        }
    }

    pub fn vertical_rate(&self) -> Option<i32> {
        match self.adsb()? {
            AdsbMessage::GroundSpeed(v) => v.common.vertical_rate,
            AdsbMessage::Airspeed(v) => v.common.vertical_rate,
            _ => None,
        }
    }

    pub fn callsign(&self) -> Option<&str> {
        match &self.payload {
            Payload::CommBAltitude { identification, .. }
            | Payload::CommBIdentity { identification, .. } => identification.as_deref(),
            _ => match self.adsb()? {
                AdsbMessage::Identification(id) => Some(&id.callsign),
                _ => None,
            },
        }
    }

    pub fn squawk(&self) -> Option<u32> {
        match &self.payload {
            Payload::SurveillanceIdentity { squawk, .. }
            | Payload::CommBIdentity { squawk, .. } => Some(*squawk),
            _ => match self.adsb()? {
                AdsbMessage::TestMessage { squawk } => *squawk,
                AdsbMessage::EmergencyStatus(e) => Some(e.squawk),
                _ => None,
            },
        }
    }

    pub fn flight_status(&self) -> Option<FlightStatus> {
        match &self.payload {
            Payload::SurveillanceAltitude { flight_status, .. }
            | Payload::SurveillanceIdentity { flight_status, .. }
            | Payload::CommBAltitude { flight_status, .. }
            | Payload::CommBIdentity { flight_status, .. } => Some(*flight_status),
            _ => None,
        }
    }

    /// `None` when the frame says nothing about it.
    pub fn on_ground(&self) -> Option<bool> {
        match &self.payload {
            Payload::AirAir { on_ground, .. } => Some(*on_ground),
            Payload::AllCall { capability, .. } => capability.on_ground(),
            Payload::ExtendedSquitter { capability, squitter } => {
                match &squitter.message {
                    AdsbMessage::SurfacePosition(_) => Some(true),
                    AdsbMessage::AirbornePosition(_)
                    | AdsbMessage::GroundSpeed(_)
                    | AdsbMessage::Airspeed(_) => Some(false),
                    _ => capability.on_ground(),
                }
            }
            Payload::NonTransponder { .. } => match self.adsb()? {
                AdsbMessage::SurfacePosition(_) => Some(true),
                AdsbMessage::AirbornePosition(_) => Some(false),
                _ => None,
            },
            _ => self.flight_status()?.on_ground(),
        }
    }

    pub fn alert(&self) -> bool {
        match self.adsb() {
            Some(AdsbMessage::EmergencyStatus(e)) => e.is_emergency(),
            _ => self.flight_status().is_some_and(FlightStatus::alert),
        }
    }

    pub fn special_position(&self) -> bool {
        self.flight_status()
            .is_some_and(FlightStatus::special_position)
    }

    /// Name of the ADS-B message kind, for DF17/18 only.
    pub fn message_type_name(&self) -> Option<&'static str> {
        self.adsb().map(AdsbMessage::name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
