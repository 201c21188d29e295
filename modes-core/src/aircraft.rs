//! Per-aircraft state: current kinematics, bounded position history and
//! the rolling frame-rate window.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::cpr::CprResolver;
use crate::types::{icao_to_string, AltitudeUnit, FlightStatus, TrackError};

/// Mean Earth radius used for great-circle distances, in metres.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Mach 1 at sea level, m/s. Fastest plausible ground speed.
const MAX_SPEED_MPS: f64 = 343.0;

/// Upper bound on the admissible jump, whatever the elapsed time.
const MAX_JUMP_M: f64 = 50_000.0;

/// Length of the message-rate window, seconds.
pub const RATE_WINDOW_SECS: i64 = 10;

/// Great-circle distance in metres between two points given in degrees.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (la1, la2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = la2 - la1;
    let dlon = (lon2 - lon1).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + la1.cos() * la2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// One point of an aircraft's state. The current location keeps changing as
/// frames arrive; points in history are frozen except for `track_broken`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AircraftLocation {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<i32>,
    pub altitude_unit: AltitudeUnit,
    pub heading: Option<f64>,
    /// Knots.
    pub velocity: Option<f64>,
    /// ft/min
    pub vertical_rate: Option<i32>,
    pub on_ground: bool,
    pub timestamp: Option<DateTime<Utc>>,
    /// Metres from the previous point.
    pub distance: f64,
    /// Seconds since the previous point.
    pub duration: f64,
    /// The next point was too far away to be the same track.
    pub track_broken: bool,
}

impl AircraftLocation {
    pub fn has_position(&self) -> bool {
        self.lat != 0.0 && self.lon != 0.0
    }
}

// ---------------------------------------------------------------------------
// Aircraft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecialStatus {
    Alert,
    Emergency,
    /// Special position identification (IDENT pressed).
    Spi,
}

/// Everything known about one aircraft.
#[derive(Debug, Clone, Serialize)]
pub struct Aircraft {
    #[serde(serialize_with = "serialize_icao")]
    pub icao: u32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub num_updates: u64,
    pub location: AircraftLocation,
    /// Resolved positions, oldest first.
    pub history: Vec<AircraftLocation>,
    pub flight_id: Option<String>,
    pub category: Option<String>,
    pub squawk: Option<u32>,
    pub flight_status: Option<FlightStatus>,
    pub special: Option<SpecialStatus>,
    #[serde(skip)]
    frame_times: VecDeque<DateTime<Utc>>,
    #[serde(skip)]
    pub resolver: CprResolver,
}

fn serialize_icao<S: Serializer>(icao: &u32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&icao_to_string(*icao))
}

impl Aircraft {
    /// A zeroed record: no position, empty history, empty CPR resolver.
    pub fn new(icao: u32) -> Self {
        Aircraft {
            icao,
            first_seen: None,
            last_seen: None,
            num_updates: 0,
            location: AircraftLocation::default(),
            history: Vec::new(),
            flight_id: None,
            category: None,
            squawk: None,
            flight_status: None,
            special: None,
            frame_times: VecDeque::new(),
            resolver: CprResolver::new(),
        }
    }

    pub fn icao_hex(&self) -> String {
        icao_to_string(self.icao)
    }

    /// Widen `first_seen..last_seen` to include `at`. Frames may arrive out
    /// of order, so neither end ever moves inwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.first_seen = Some(self.first_seen.map_or(at, |first| first.min(at)));
        self.last_seen = self.last_seen.max(Some(at));
    }

    /// Append a resolved position.
    ///
    /// The new point inherits altitude, heading and speed from the current
    /// location. A jump the aircraft could not have flown since the previous
    /// point flags that point as the end of a track; the new point is still
    /// appended. `history_cap == 0` disables eviction.
    pub fn add_location(
        &mut self,
        lat: f64,
        lon: f64,
        at: DateTime<Utc>,
        history_cap: usize,
    ) -> Result<(), TrackError> {
        if !(-95.0..=95.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(TrackError::LocationOutOfRange { lat, lon });
        }

        let mut distance = 0.0;
        let mut duration = 0.0;
        if let Some(prev) = self.history.last_mut().filter(|p| p.has_position()) {
            duration = prev
                .timestamp
                .map(|t| (at - t).num_milliseconds() as f64 / 1000.0)
                .unwrap_or(0.0)
                .max(1.0);
            distance = haversine(prev.lat, prev.lon, lat, lon);
            let ceiling = (duration * MAX_SPEED_MPS).min(MAX_JUMP_M);
            if distance > ceiling {
                debug!(
                    icao = %icao_to_string(self.icao),
                    distance, duration, "position jump, starting new track"
                );
                prev.track_broken = true;
            }
        }

        if history_cap > 0 && self.history.len() >= history_cap {
            let excess = self.history.len() + 1 - history_cap;
            self.history.drain(..excess);
        }

        let point = AircraftLocation {
            lat,
            lon,
            timestamp: Some(at),
            distance,
            duration,
            track_broken: false,
            ..self.location.clone()
        };
        self.location = point.clone();
        self.history.push(point);
        Ok(())
    }

    /// Record a frame arrival and drop arrivals that fall out of the rate
    /// window behind the newest one seen.
    pub fn mark_frame_time(&mut self, at: DateTime<Utc>) {
        let newest = self.frame_times.back().map_or(at, |&last| last.max(at));
        let cutoff = newest - chrono::Duration::seconds(RATE_WINDOW_SECS);
        if at <= cutoff {
            return;
        }
        // keep the window sorted so the oldest arrivals sit at the front
        let idx = self.frame_times.partition_point(|&t| t <= at);
        self.frame_times.insert(idx, at);
        while self.frame_times.front().is_some_and(|t| *t <= cutoff) {
            self.frame_times.pop_front();
        }
    }

    pub fn recent_frame_count(&self) -> usize {
        self.frame_times.len()
    }

    /// Frames per second over the rate window.
    pub fn message_rate(&self) -> f64 {
        self.frame_times.len() as f64 / RATE_WINDOW_SECS as f64
    }

    /// Latest resolved position, if any.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.history.last().map(|p| (p.lat, p.lon))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
