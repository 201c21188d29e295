//! modes-core: Mode S / ADS-B decoding and aircraft tracking.
//!
//! No async runtime, no network I/O. Text lines in, decoded frames and
//! per-aircraft tracks out. The `modes` CLI in `modes-track` is a thin
//! shell around this crate.

pub mod adsb;
pub mod aircraft;
pub mod bits;
pub mod config;
pub mod cpr;
pub mod crc;
pub mod decode;
pub mod frame;
pub mod pipeline;
pub mod sbs;
pub mod tracker;
pub mod types;

// Re-export commonly used types at crate root
pub use aircraft::{Aircraft, AircraftLocation, SpecialStatus};
pub use config::Config;
pub use cpr::{CprKind, CprParity, CprResolver, LatLon};
pub use crc::ChecksumPolicy;
pub use decode::{decode, decode_with_policy};
pub use frame::{Frame, FrameMode, Payload};
pub use pipeline::{DecodeFailure, DecodePipeline, PipelineOutput, RawLine};
pub use sbs::SbsRecord;
pub use tracker::{TrackStore, TrackerConfig};
pub use types::*;
