//! Compact Position Reporting: global airborne and surface decoding.
//!
//! An aircraft alternates even and odd position messages, each carrying a
//! 17-bit latitude and longitude relative to a zone grid. One of each parity,
//! received within 10 seconds, resolves to an unambiguous position.
//!
//! Key constants:
//! - NZ = 15 latitude zones per hemisphere
//! - Nb = 17 bits per coordinate
//! - Airborne range 360 degrees, surface range 90 degrees (four quadrants)

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::CprError;

/// 2^17, the scale of a raw CPR coordinate.
const CPR_MAX: f64 = 131072.0;

/// Largest raw CPR value.
pub const CPR_RAW_MAX: u32 = 131071;

/// Maximum time between even and odd halves for global decode (seconds).
pub const MAX_PAIR_AGE: f64 = 10.0;

const AIRBORNE_RANGE: f64 = 360.0;
const SURFACE_RANGE: f64 = 90.0;

/// Latitude thresholds for NL = 59 down to 2 (1090-WP-9-14).
static NL_TABLE: [f64; 58] = [
    10.47047130, 14.82817437, 18.18626357, 21.02939493, 23.54504487, 25.82924707,
    27.93898710, 29.91135686, 31.77209708, 33.53993436, 35.22899598, 36.85025108,
    38.41241892, 39.92256684, 41.38651832, 42.80914012, 44.19454951, 45.54626723,
    46.86733252, 48.16039128, 49.42776439, 50.67150166, 51.89342469, 53.09516153,
    54.27817472, 55.44378444, 56.59318756, 57.72747354, 58.84763776, 59.95459277,
    61.04917774, 62.13216659, 63.20427479, 64.26616523, 65.31845310, 66.36171008,
    67.39646774, 68.42322022, 69.44242631, 70.45451075, 71.45986473, 72.45884545,
    73.45177442, 74.43893416, 75.42056257, 76.39684391, 77.36789461, 78.33374083,
    79.29428225, 80.24923213, 81.19801349, 82.13956981, 83.07199445, 83.99173563,
    84.89166191, 85.75541621, 86.53536998, 87.00000000,
];

/// Number of longitude zones at a latitude: 59 at the equator, 1 at the poles.
pub fn nl(lat: f64) -> u32 {
    let lat = lat.abs();
    NL_TABLE
        .iter()
        .position(|&threshold| lat < threshold)
        .map_or(1, |i| 59 - i as u32)
}

/// Modulo that always returns a non-negative result.
fn modulo(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which half of a CPR pair a position message carries (the F bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CprParity {
    Even,
    Odd,
}

impl CprParity {
    pub fn from_bit(odd: bool) -> Self {
        if odd {
            CprParity::Odd
        } else {
            CprParity::Even
        }
    }

    fn index(self) -> u32 {
        match self {
            CprParity::Even => 0,
            CprParity::Odd => 1,
        }
    }
}

/// Raw half-position as carried in one position message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CprPosition {
    pub parity: CprParity,
    pub lat: u32,
    pub lon: u32,
}

/// Which position message a half came from. The encodings differ in range
/// (360 degrees airborne, 90 degrees surface), so halves never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CprKind {
    #[default]
    Airborne,
    Surface,
}

/// One received half-position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CprHalf {
    pub raw_lat: u32,
    pub raw_lon: u32,
    pub kind: CprKind,
    pub received_at: DateTime<Utc>,
}

impl CprHalf {
    pub fn new(
        raw_lat: u32,
        raw_lon: u32,
        kind: CprKind,
        received_at: DateTime<Utc>,
    ) -> Result<Self, CprError> {
        if raw_lat > CPR_RAW_MAX || raw_lon > CPR_RAW_MAX {
            return Err(CprError::RawOutOfRange {
                lat: raw_lat,
                lon: raw_lon,
            });
        }
        Ok(CprHalf {
            raw_lat,
            raw_lon,
            kind,
            received_at,
        })
    }
}

/// A resolved position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Holds the latest even and latest odd half for one aircraft.
///
/// A new half replaces the previous one of the same parity. A half of the
/// other kind (surface vs airborne) drops the stored opposite half, so a
/// pair is always of one kind. Resolution reads both halves without
/// consuming them, so a failed attempt leaves the state as it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CprResolver {
    even: Option<CprHalf>,
    odd: Option<CprHalf>,
}

impl CprResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an airborne half-position, replacing any previous one of the
    /// same parity.
    pub fn update(
        &mut self,
        parity: CprParity,
        raw_lat: u32,
        raw_lon: u32,
        at: DateTime<Utc>,
    ) -> Result<(), CprError> {
        self.store(parity, CprHalf::new(raw_lat, raw_lon, CprKind::Airborne, at)?);
        Ok(())
    }

    /// Store a surface half-position.
    pub fn update_surface(
        &mut self,
        parity: CprParity,
        raw_lat: u32,
        raw_lon: u32,
        at: DateTime<Utc>,
    ) -> Result<(), CprError> {
        self.store(parity, CprHalf::new(raw_lat, raw_lon, CprKind::Surface, at)?);
        Ok(())
    }

    fn store(&mut self, parity: CprParity, half: CprHalf) {
        let (slot, other) = match parity {
            CprParity::Even => (&mut self.even, &mut self.odd),
            CprParity::Odd => (&mut self.odd, &mut self.even),
        };
        if other.is_some_and(|o| o.kind != half.kind) {
            *other = None;
        }
        *slot = Some(half);
    }

    pub fn half(&self, parity: CprParity) -> Option<&CprHalf> {
        match parity {
            CprParity::Even => self.even.as_ref(),
            CprParity::Odd => self.odd.as_ref(),
        }
    }

    pub fn has_pair(&self) -> bool {
        self.even.is_some() && self.odd.is_some()
    }

    pub fn clear(&mut self) {
        self.even = None;
        self.odd = None;
    }

    /// Global airborne decode from the stored pair.
    pub fn resolve_airborne(&self) -> Result<LatLon, CprError> {
        self.resolve(CprKind::Airborne, None)
    }

    /// Global surface decode. The reference picks the quadrant; (0, 0) means
    /// no reference is known.
    pub fn resolve_surface(&self, ref_lat: f64, ref_lon: f64) -> Result<LatLon, CprError> {
        if ref_lat == 0.0 && ref_lon == 0.0 {
            return Err(CprError::NoReference);
        }
        self.resolve(CprKind::Surface, Some((ref_lat, ref_lon)))
    }

    /// Both halves, when both are of `kind`.
    fn pair(&self, kind: CprKind) -> Result<(&CprHalf, &CprHalf), CprError> {
        let even = self.even.as_ref().filter(|h| h.kind == kind);
        let odd = self.odd.as_ref().filter(|h| h.kind == kind);
        match (even, odd) {
            (Some(even), Some(odd)) => Ok((even, odd)),
            (Some(_), None) => Err(CprError::MissingPair {
                have: Some(CprParity::Even),
            }),
            (None, Some(_)) => Err(CprError::MissingPair {
                have: Some(CprParity::Odd),
            }),
            (None, None) => Err(CprError::MissingPair { have: None }),
        }
    }

    fn resolve(&self, kind: CprKind, reference: Option<(f64, f64)>) -> Result<LatLon, CprError> {
        let (even, odd) = self.pair(kind)?;
        let range = match kind {
            CprKind::Airborne => AIRBORNE_RANGE,
            CprKind::Surface => SURFACE_RANGE,
        };

        let lat_e = even.raw_lat as f64;
        let lat_o = odd.raw_lat as f64;
        let lon_e = even.raw_lon as f64;
        let lon_o = odd.raw_lon as f64;

        // Latitude index
        let j = ((59.0 * lat_e - 60.0 * lat_o) / CPR_MAX + 0.5).floor();

        let mut rlat0 = range / 60.0 * (modulo(j, 60.0) + lat_e / CPR_MAX);
        let mut rlat1 = range / 59.0 * (modulo(j, 59.0) + lat_o / CPR_MAX);

        match reference {
            None => {
                // Southern hemisphere comes out as 270..360
                if rlat0 >= 270.0 {
                    rlat0 -= 360.0;
                }
                if rlat1 >= 270.0 {
                    rlat1 -= 360.0;
                }
            }
            Some((ref_lat, _)) => {
                rlat0 = surface_quadrant(rlat0, ref_lat);
                rlat1 = surface_quadrant(rlat1, ref_lat);
            }
        }
        for rlat in [rlat0, rlat1] {
            if !(-90.0..=90.0).contains(&rlat) {
                return Err(CprError::LatitudeOutOfRange(rlat));
            }
        }

        let (nl0, nl1) = (nl(rlat0), nl(rlat1));
        if nl0 != nl1 {
            return Err(CprError::InconsistentZone {
                even: nl0,
                odd: nl1,
            });
        }

        let skew = (even.received_at - odd.received_at).num_milliseconds() as f64 / 1000.0;
        if skew.abs() > MAX_PAIR_AGE {
            return Err(CprError::TimingSkew { seconds: skew.abs() });
        }

        // The more recent half is the basis; ties go to even.
        let (parity, lat, lon_basis) = if odd.received_at > even.received_at {
            (CprParity::Odd, rlat1, lon_o)
        } else {
            (CprParity::Even, rlat0, lon_e)
        };

        let zones = nl0 as f64;
        let m = ((lon_e * (zones - 1.0) - lon_o * zones) / CPR_MAX + 0.5).floor();
        let ni = nl0.saturating_sub(parity.index()).max(1) as f64;
        let mut lon = range / ni * (modulo(m, ni) + lon_basis / CPR_MAX);

        if let Some((_, ref_lon)) = reference {
            // Closest of the four quadrants, then back into [-180, 180)
            lon += ((ref_lon - lon + 45.0) / 90.0).floor() * 90.0;
            lon -= ((lon + 180.0) / 360.0).floor() * 360.0;
        }
        if lon > 180.0 {
            lon -= 360.0;
        }

        if !(-90.0..=90.0).contains(&lat) {
            return Err(CprError::LatitudeOutOfRange(lat));
        }
        Ok(LatLon { lat, lon })
    }
}

/// Pick the surface latitude solution closest to the reference.
///
/// Only -90..0 and 0..90 are valid; 0 also encodes both poles.
fn surface_quadrant(rlat: f64, ref_lat: f64) -> f64 {
    if rlat == 0.0 {
        if ref_lat < -45.0 {
            return -90.0;
        }
        if ref_lat > 45.0 {
            return 90.0;
        }
        return rlat;
    }
    if rlat - ref_lat > 45.0 {
        return rlat - 90.0;
    }
    rlat
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::haversine;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    /// Resolver holding `even` at t0 and `odd` offset by `odd_ms`.
    fn pair(even: (u32, u32), odd: (u32, u32), odd_ms: i64) -> CprResolver {
        let mut r = CprResolver::new();
        r.update(CprParity::Even, even.0, even.1, t0()).unwrap();
        r.update(CprParity::Odd, odd.0, odd.1, t0() + Duration::milliseconds(odd_ms))
            .unwrap();
        r
    }

    /// Like [`pair`] for surface halves.
    fn surface_pair(even: (u32, u32), odd: (u32, u32), odd_ms: i64) -> CprResolver {
        let mut r = CprResolver::new();
        r.update_surface(CprParity::Even, even.0, even.1, t0()).unwrap();
        r.update_surface(CprParity::Odd, odd.0, odd.1, t0() + Duration::milliseconds(odd_ms))
            .unwrap();
        r
    }

    fn assert_close(got: LatLon, lat: f64, lon: f64) {
        assert!(
            (got.lat - lat).abs() < 1e-9 && (got.lon - lon).abs() < 1e-9,
            "expected {lat},{lon} got {},{}",
            got.lat,
            got.lon
        );
    }

    /// Encode a position into one CPR half.
    fn encode(lat: f64, lon: f64, parity: CprParity, surface: bool) -> (u32, u32) {
        let range = if surface { SURFACE_RANGE } else { AIRBORNE_RANGE };
        let i = parity.index() as f64;
        let dlat = range / (60.0 - i);
        let yz = (CPR_MAX * modulo(lat, dlat) / dlat + 0.5).floor();
        let rlat = dlat * (yz / CPR_MAX + (lat / dlat).floor());
        let ni = (nl(rlat) as f64 - i).max(1.0);
        let dlon = range / ni;
        let xz = (CPR_MAX * modulo(lon, dlon) / dlon + 0.5).floor();
        ((yz as u32) & 0x1FFFF, (xz as u32) & 0x1FFFF)
    }

    #[test]
    fn test_nl_table() {
        assert_eq!(nl(0.0), 59);
        assert_eq!(nl(10.4), 59);
        assert_eq!(nl(10.48), 58);
        assert_eq!(nl(52.0), 36);
        assert_eq!(nl(-52.0), 36, "NL is symmetric");
        assert_eq!(nl(86.9), 2);
        assert_eq!(nl(87.0), 1);
        assert_eq!(nl(90.0), 1);
    }

    #[test]
    fn test_modulo_negative() {
        assert!((modulo(-1.0, 60.0) - 59.0).abs() < 1e-10);
        assert!((modulo(7.0, 3.0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_airborne_known_pair() {
        // even newer
        let r = pair((93000, 51372), (74158, 50194), -1000);
        assert_close(r.resolve_airborne().unwrap(), 52.2572021484375, 3.91937255859375);
    }

    #[test]
    fn test_airborne_basis_is_most_recent_half() {
        let odd_newer = pair((92095, 39846), (88385, 125818), 1000);
        assert_close(
            odd_newer.resolve_airborne().unwrap(),
            10.21621445478019,
            123.8891285863416,
        );
        let even_newer = pair((92095, 39846), (88385, 125818), -1000);
        assert_close(
            even_newer.resolve_airborne().unwrap(),
            10.215774536132812,
            123.88881877317266,
        );
    }

    #[test]
    fn test_airborne_southern_hemisphere() {
        // Perth, even newer by 1 ms
        let r = pair((83068, 15070), (94790, 103912), -1);
        assert_close(r.resolve_airborne().unwrap(), -32.19744873046875, 116.02781982421875);
        let r = pair((86196, 13323), (97846, 102181), -1);
        assert_close(r.resolve_airborne().unwrap(), -32.05426025390625, 115.93185424804688);
    }

    #[test]
    fn test_surface_known_pair() {
        let even_newer = surface_pair((115609, 116941), (39199, 110269), -1000);
        assert_close(
            even_newer.resolve_surface(51.990, 4.375).unwrap(),
            52.32304000854492,
            4.730472564697266,
        );
        let odd_newer = surface_pair((115609, 116941), (39199, 110269), 1000);
        assert_close(
            odd_newer.resolve_surface(51.990, 4.375).unwrap(),
            52.320607072215964,
            4.734734671456474,
        );
    }

    #[test]
    fn test_surface_quadrants() {
        let cases = [
            (
                (52.0, 0.0),
                (52.209983825683594, 0.17660140991210938),
                (52.209975679041975, 0.17650713239397323),
            ),
            (
                (52.0, 50.0),
                (52.209983825683594, 90.17660140991211),
                (52.209975679041975, 90.17650713239398),
            ),
            (
                (52.0, -50.0),
                (52.209983825683594, -89.82339859008789),
                (52.209975679041975, -89.82349286760602),
            ),
            (
                (52.0, 140.0),
                (52.209983825683594, -179.8233985900879),
                (52.209975679041975, -179.82349286760603),
            ),
            (
                (52.0, -140.0),
                (52.209983825683594, -179.8233985900879),
                (52.209975679041975, -179.82349286760603),
            ),
            (
                (52.0, 180.0),
                (52.209983825683594, -179.8233985900879),
                (52.209975679041975, -179.82349286760603),
            ),
            (
                (7.0, 0.0),
                (-37.790016174316406, 0.1352691650390625),
                (-37.790024320958025, 0.13429890508237094),
            ),
            (
                (-52.0, 0.0),
                (-37.790016174316406, 0.1352691650390625),
                (-37.790024320958025, 0.13429890508237094),
            ),
        ];
        for ((ref_lat, ref_lon), even_newer, odd_newer) in cases {
            let r = surface_pair((105730, 9259), (29693, 8997), -1000);
            let got = r.resolve_surface(ref_lat, ref_lon).unwrap();
            assert_close(got, even_newer.0, even_newer.1);
            let r = surface_pair((105730, 9259), (29693, 8997), 1000);
            let got = r.resolve_surface(ref_lat, ref_lon).unwrap();
            assert_close(got, odd_newer.0, odd_newer.1);
        }
    }

    #[test]
    fn test_surface_zero_latitude_snaps_to_pole() {
        let cases = [
            (-46.0, -90.0),
            (-44.0, 0.0),
            (44.0, 0.0),
            (46.0, 90.0),
        ];
        for (ref_lat, lat) in cases {
            let r = surface_pair((0, 0), (0, 0), -1000);
            assert_close(r.resolve_surface(ref_lat, -180.0).unwrap(), lat, -180.0);
        }
    }

    #[test]
    fn test_surface_needs_reference() {
        let r = surface_pair((105730, 9259), (29693, 8997), -1000);
        assert_eq!(r.resolve_surface(0.0, 0.0), Err(CprError::NoReference));
    }

    #[test]
    fn test_timing_skew() {
        let r = pair((93000, 51372), (74158, 50194), 12_000);
        assert!(
            matches!(r.resolve_airborne(), Err(CprError::TimingSkew { .. })),
            "12s apart must fail"
        );
        let r = pair((93000, 51372), (74158, 50194), -12_000);
        assert!(matches!(r.resolve_airborne(), Err(CprError::TimingSkew { .. })));
        let r = pair((93000, 51372), (74158, 50194), 10_000);
        assert!(r.resolve_airborne().is_ok(), "exactly 10s is accepted");
    }

    #[test]
    fn test_missing_pair() {
        let mut r = CprResolver::new();
        assert_eq!(r.resolve_airborne(), Err(CprError::MissingPair { have: None }));
        r.update(CprParity::Odd, 74158, 50194, t0()).unwrap();
        assert_eq!(
            r.resolve_airborne(),
            Err(CprError::MissingPair {
                have: Some(CprParity::Odd)
            })
        );
        assert!(!r.has_pair());
    }

    #[test]
    fn test_raw_out_of_range() {
        let mut r = CprResolver::new();
        let err = r.update(CprParity::Even, 888888, 5, t0()).unwrap_err();
        assert_eq!(err, CprError::RawOutOfRange { lat: 888888, lon: 5 });
        assert!(r.half(CprParity::Even).is_none(), "rejected half must not be stored");
    }

    #[test]
    fn test_new_half_replaces_same_parity() {
        let mut r = pair((93000, 51372), (74158, 50194), -1000);
        r.update(CprParity::Even, 1, 2, t0()).unwrap();
        let even = r.half(CprParity::Even).unwrap();
        assert_eq!((even.raw_lat, even.raw_lon), (1, 2));
        assert_eq!(r.half(CprParity::Odd).unwrap().raw_lat, 74158);
    }

    #[test]
    fn test_failed_resolution_keeps_halves() {
        let r = pair((93000, 51372), (74158, 50194), 12_000);
        let before = r.clone();
        assert!(r.resolve_airborne().is_err());
        assert_eq!(r, before);
        assert!(r.has_pair());
    }

    #[test]
    fn test_clear() {
        let mut r = pair((93000, 51372), (74158, 50194), 0);
        r.clear();
        assert!(!r.has_pair());
        assert!(r.half(CprParity::Even).is_none());
    }

    #[test]
    fn test_surface_and_airborne_halves_never_pair() {
        let (lat, lon) = (39.3, -174.3);
        let mut r = CprResolver::new();
        let even = encode(lat, lon, CprParity::Even, true);
        let odd = encode(lat, lon, CprParity::Odd, false);
        r.update_surface(CprParity::Even, even.0, even.1, t0()).unwrap();
        r.update(CprParity::Odd, odd.0, odd.1, t0() + Duration::seconds(1)).unwrap();

        assert!(r.half(CprParity::Even).is_none(), "surface half dropped by airborne half");
        assert_eq!(
            r.resolve_airborne(),
            Err(CprError::MissingPair {
                have: Some(CprParity::Odd)
            })
        );
        assert!(matches!(
            r.resolve_surface(40.0, -170.0),
            Err(CprError::MissingPair { have: None })
        ));

        // a matching airborne half completes the pair again
        let even = encode(lat, lon, CprParity::Even, false);
        r.update(CprParity::Even, even.0, even.1, t0() + Duration::seconds(2)).unwrap();
        let got = r.resolve_airborne().unwrap();
        assert!(haversine(lat, lon, got.lat, got.lon) < 5.0);
    }

    #[test]
    fn test_mixed_kinds_over_grid_never_resolve() {
        for lat_step in 0..=16 {
            let lat = -80.0 + lat_step as f64 * 10.0 + 0.3;
            for lon_step in 0..=17 {
                let lon = -174.3 + lon_step as f64 * 20.0;
                let mut r = CprResolver::new();
                let even = encode(lat, lon, CprParity::Even, true);
                let odd = encode(lat, lon, CprParity::Odd, false);
                r.update_surface(CprParity::Even, even.0, even.1, t0()).unwrap();
                r.update(CprParity::Odd, odd.0, odd.1, t0()).unwrap();
                assert!(r.resolve_airborne().is_err(), "{lat},{lon} resolved from mixed halves");
                assert!(r.resolve_surface(lat, lon).is_err());
            }
        }
    }

    #[test]
    fn test_airborne_roundtrip_grid() {
        let mut worst: f64 = 0.0;
        for lat_step in 0..=34 {
            let lat = -85.0 + lat_step as f64 * 5.0 + 0.123;
            for lon_step in 0..=35 {
                let lon = -175.0 + lon_step as f64 * 10.0 + 0.456;
                let even = encode(lat, lon, CprParity::Even, false);
                let odd = encode(lat, lon, CprParity::Odd, false);
                for odd_ms in [-1000, 1000] {
                    let got = pair(even, odd, odd_ms)
                        .resolve_airborne()
                        .unwrap_or_else(|e| panic!("{lat},{lon} failed: {e}"));
                    let dist = haversine(lat, lon, got.lat, got.lon);
                    worst = worst.max(dist);
                    assert!(dist < 5.0, "{lat},{lon} resolved {dist:.1}m away");
                }
            }
        }
        assert!(worst > 0.0);
    }

    #[test]
    fn test_longitude_never_below_minus_180() {
        for lat_e in (0..=CPR_RAW_MAX).step_by(4099) {
            for lat_o in (0..=CPR_RAW_MAX).step_by(4099) {
                for lon_e in (0..=CPR_RAW_MAX).step_by(16411) {
                    for lon_o in (0..=CPR_RAW_MAX).step_by(16411) {
                        for odd_ms in [-1000, 1000] {
                            let r = pair((lat_e, lon_e), (lat_o, lon_o), odd_ms);
                            if let Ok(pos) = r.resolve_airborne() {
                                assert!(
                                    (-180.0..=180.0).contains(&pos.lon),
                                    "lon {} from {lat_e},{lon_e}/{lat_o},{lon_o}",
                                    pos.lon
                                );
                                assert!((-90.0..=90.0).contains(&pos.lat));
                            }
                        }
                    }
                }
            }
        }
    }
}
