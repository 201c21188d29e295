//! Concurrent per-aircraft track store.
//!
//! Aircraft records live in a sharded map keyed by 24-bit ICAO address. All
//! mutation of one record happens under that record's shard write lock, so
//! concurrent decoders never lose each other's updates.
//!
//! Frames are fused by downlink format: surveillance replies contribute
//! altitude, flight status and squawk; extended squitters add identity,
//! velocity and CPR half-positions, which are resolved into positions as
//! soon as a usable pair is held.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info, trace};

use crate::adsb::AdsbMessage;
use crate::aircraft::{Aircraft, SpecialStatus};
use crate::frame::Frame;
use crate::sbs::SbsRecord;
use crate::types::icao_to_string;

/// Default number of positions kept per aircraft.
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// Default silence after which an aircraft may be evicted, seconds.
pub const DEFAULT_STALE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Positions kept per aircraft. Zero keeps everything.
    pub history_cap: usize,
    pub stale_after: Duration,
    /// Receiver location (lat, lon), used as the surface CPR reference.
    pub receiver: Option<(f64, f64)>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            history_cap: DEFAULT_HISTORY_CAP,
            stale_after: Duration::seconds(DEFAULT_STALE_SECS),
            receiver: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct TrackStore {
    aircraft: DashMap<u32, Aircraft>,
    config: TrackerConfig,
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl TrackStore {
    pub fn new(config: TrackerConfig) -> Self {
        TrackStore {
            aircraft: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Snapshot of the record for `icao`, creating an empty one first if
    /// needed.
    pub fn get_or_create(&self, icao: u32) -> Aircraft {
        self.aircraft
            .entry(icao)
            .or_insert_with(|| new_aircraft(icao))
            .value()
            .clone()
    }

    /// Replace the stored record with `updated`, counting one update.
    pub fn apply(&self, icao: u32, mut updated: Aircraft, at: DateTime<Utc>) {
        updated.icao = icao;
        updated.num_updates += 1;
        updated.touch(at);
        self.aircraft.insert(icao, updated);
    }

    /// Get-or-create the record and run `f` on it under the shard lock.
    /// Counts as one update.
    pub fn update<R>(
        &self,
        icao: u32,
        at: DateTime<Utc>,
        f: impl FnOnce(&mut Aircraft) -> R,
    ) -> R {
        let mut entry = self
            .aircraft
            .entry(icao)
            .or_insert_with(|| new_aircraft(icao));
        entry.num_updates += 1;
        entry.touch(at);
        f(entry.value_mut())
    }

    /// Like [`TrackStore::update`] but only for aircraft already tracked.
    fn update_existing<R>(
        &self,
        icao: u32,
        at: DateTime<Utc>,
        f: impl FnOnce(&mut Aircraft) -> R,
    ) -> Option<R> {
        let mut entry = self.aircraft.get_mut(&icao)?;
        entry.num_updates += 1;
        entry.touch(at);
        Some(f(entry.value_mut()))
    }

    pub fn get(&self, icao: u32) -> Option<Aircraft> {
        self.aircraft.get(&icao).map(|ac| ac.value().clone())
    }

    pub fn contains(&self, icao: u32) -> bool {
        self.aircraft.contains_key(&icao)
    }

    /// Copies of every record.
    pub fn snapshot(&self) -> Vec<Aircraft> {
        self.aircraft.iter().map(|ac| ac.value().clone()).collect()
    }

    /// Visit a snapshot of all aircraft. No lock is held while `visitor`
    /// runs, so it may call back into the store.
    pub fn for_each(&self, mut visitor: impl FnMut(&Aircraft)) {
        for ac in self.snapshot() {
            visitor(&ac);
        }
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn clear(&self) {
        self.aircraft.clear();
    }

    /// Drop aircraft not heard from for longer than `max_age`. Records that
    /// were never updated count as stale. Returns the number removed.
    pub fn evict_stale(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - max_age;
        let mut removed = 0;
        self.aircraft.retain(|icao, ac| {
            let keep = ac.last_seen.is_some_and(|seen| seen >= cutoff);
            if !keep {
                info!(
                    icao = %icao_to_string(*icao),
                    last_seen = ?ac.last_seen,
                    "evicting stale aircraft"
                );
                removed += 1;
            }
            keep
        });
        removed
    }

    /// [`TrackStore::evict_stale`] with the configured timeout.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        self.evict_stale(self.config.stale_after, now)
    }

    // -----------------------------------------------------------------------
    // Fusion
    // -----------------------------------------------------------------------

    /// Fold one decoded frame into the store.
    ///
    /// Frames without an address are ignored. Addresses recovered from the
    /// parity field only update aircraft that are already tracked, since a
    /// single bit error there invents a new aircraft. Returns a snapshot of
    /// the aircraft when any of its fields changed.
    pub fn apply_frame(&self, frame: &Frame) -> Option<Aircraft> {
        let icao = frame.icao().filter(|&icao| icao != 0)?;
        let at = frame.timestamp;
        trace!(
            icao = %icao_to_string(icao),
            df = frame.downlink_format,
            kind = frame.message_type_name().unwrap_or(frame.df_name()),
            "frame"
        );

        let fuse = |ac: &mut Aircraft| {
            ac.mark_frame_time(at);
            fuse_frame(ac, frame, &self.config).then(|| ac.clone())
        };

        if frame.address_from_parity() {
            self.update_existing(icao, at, fuse).flatten()
        } else {
            self.update(icao, at, fuse)
        }
    }

    /// Fold one SBS1 record into the store.
    pub fn apply_sbs(&self, record: &SbsRecord) -> Option<Aircraft> {
        let at = record.timestamp;
        self.update(record.icao, at, |ac| {
            ac.mark_frame_time(at);
            fuse_sbs(ac, record, self.config.history_cap).then(|| ac.clone())
        })
    }
}

fn new_aircraft(icao: u32) -> Aircraft {
    info!(icao = %icao_to_string(icao), "new aircraft");
    Aircraft::new(icao)
}

/// Store `value` in `slot`, reporting whether it differed.
fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Special status a frame reports, or `None` when it says nothing about it.
///
/// An emergency is held until an emergency status message reports none.
/// Alert and SPI follow the latest surveillance or flight status.
fn reported_special(
    frame: &Frame,
    current: Option<SpecialStatus>,
) -> Option<Option<SpecialStatus>> {
    let held = current == Some(SpecialStatus::Emergency);
    match frame.adsb() {
        Some(AdsbMessage::EmergencyStatus(status)) if status.is_emergency() => {
            Some(Some(SpecialStatus::Emergency))
        }
        Some(AdsbMessage::EmergencyStatus(_)) => held.then_some(None),
        _ if held => None,
        Some(AdsbMessage::AirbornePosition(pos)) => Some(match pos.surveillance_status {
            1 | 2 => Some(SpecialStatus::Alert),
            3 => Some(SpecialStatus::Spi),
            _ => None,
        }),
        Some(_) => None,
        None => {
            let status = frame.flight_status()?;
            Some(if status.alert() {
                Some(SpecialStatus::Alert)
            } else if status.special_position() {
                Some(SpecialStatus::Spi)
            } else {
                None
            })
        }
    }
}

fn fuse_frame(ac: &mut Aircraft, frame: &Frame, config: &TrackerConfig) -> bool {
    let mut changed = false;
    let at = frame.timestamp;

    if let Some(alt) = frame.altitude() {
        changed |= assign(&mut ac.location.altitude, Some(alt.value));
        changed |= assign(&mut ac.location.altitude_unit, alt.unit);
    }
    if let Some(on_ground) = frame.on_ground() {
        changed |= assign(&mut ac.location.on_ground, on_ground);
    }
    if let Some(status) = frame.flight_status() {
        changed |= assign(&mut ac.flight_status, Some(status));
    }
    if let Some(squawk) = frame.squawk() {
        changed |= assign(&mut ac.squawk, Some(squawk));
    }
    if let Some(callsign) = frame.callsign().filter(|c| !c.is_empty()) {
        if ac.flight_id.as_deref() != Some(callsign) {
            ac.flight_id = Some(callsign.to_string());
            changed = true;
        }
    }
    if let Some(heading) = frame.heading() {
        changed |= assign(&mut ac.location.heading, Some(heading));
    }
    if let Some(velocity) = frame.velocity() {
        changed |= assign(&mut ac.location.velocity, Some(velocity));
    }
    if let Some(rate) = frame.vertical_rate() {
        changed |= assign(&mut ac.location.vertical_rate, Some(rate));
    }

    if let Some(AdsbMessage::Identification(id)) = frame.adsb() {
        let category = id.category_description();
        if ac.category.as_deref() != Some(category) {
            ac.category = Some(category.to_string());
            changed = true;
        }
    }
    if let Some(special) = reported_special(frame, ac.special) {
        changed |= assign(&mut ac.special, special);
    }

    if let Some(cpr) = frame.cpr() {
        let surface = matches!(frame.adsb(), Some(AdsbMessage::SurfacePosition(_)));
        let stored = if surface {
            ac.resolver.update_surface(cpr.parity, cpr.lat, cpr.lon, at)
        } else {
            ac.resolver.update(cpr.parity, cpr.lat, cpr.lon, at)
        };
        if let Err(e) = stored {
            debug!(icao = %ac.icao_hex(), error = %e, "CPR half rejected");
            return changed;
        }
        let resolved = if surface {
            let (ref_lat, ref_lon) = config
                .receiver
                .or_else(|| ac.position())
                .unwrap_or((0.0, 0.0));
            ac.resolver.resolve_surface(ref_lat, ref_lon)
        } else {
            ac.resolver.resolve_airborne()
        };
        match resolved {
            Ok(pos) => match ac.add_location(pos.lat, pos.lon, at, config.history_cap) {
                Ok(()) => changed = true,
                Err(e) => debug!(icao = %ac.icao_hex(), error = %e, "resolved position rejected"),
            },
            Err(e) => debug!(icao = %ac.icao_hex(), error = %e, "CPR not resolved"),
        }
    }

    changed
}

fn fuse_sbs(ac: &mut Aircraft, rec: &SbsRecord, history_cap: usize) -> bool {
    let mut changed = false;

    if let Some(callsign) = rec.callsign.as_ref().filter(|c| !c.is_empty()) {
        changed |= assign(&mut ac.flight_id, Some(callsign.clone()));
    }
    if let Some(alt) = rec.altitude {
        changed |= assign(&mut ac.location.altitude, Some(alt));
    }
    if let Some(speed) = rec.ground_speed {
        changed |= assign(&mut ac.location.velocity, Some(speed));
    }
    if let Some(track) = rec.track {
        changed |= assign(&mut ac.location.heading, Some(track));
    }
    if let Some(rate) = rec.vertical_rate {
        changed |= assign(&mut ac.location.vertical_rate, Some(rate));
    }
    if let Some(squawk) = rec.squawk {
        changed |= assign(&mut ac.squawk, Some(squawk));
    }
    if let Some(on_ground) = rec.on_ground {
        changed |= assign(&mut ac.location.on_ground, on_ground);
    }
    let current = match rec.emergency {
        Some(true) => Some(SpecialStatus::Emergency),
        Some(false) if ac.special == Some(SpecialStatus::Emergency) => None,
        _ => ac.special,
    };
    let special = if current == Some(SpecialStatus::Emergency) {
        current
    } else {
        match (rec.alert, rec.spi) {
            (Some(true), _) => Some(SpecialStatus::Alert),
            (_, Some(true)) => Some(SpecialStatus::Spi),
            (Some(false), _) | (_, Some(false)) => None,
            _ => current,
        }
    };
    changed |= assign(&mut ac.special, special);
    if let Some((lat, lon)) = rec.position() {
        match ac.add_location(lat, lon, rec.timestamp, history_cap) {
            Ok(()) => changed = true,
            Err(e) => debug!(icao = %ac.icao_hex(), error = %e, "SBS position rejected"),
        }
    }

    changed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
