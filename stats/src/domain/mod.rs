//! Domain logic
//!
//! Pure statistics semantics plus the service that orchestrates them:
//! - `normalize` - raw lookup input to canonical search event
//! - `dedup` - history append gate for rapid repeats
//! - `process` - stored documents to UI-facing statistics
//! - `statistics` - cached, coalesced service surface

pub mod dedup;
pub mod normalize;
pub mod process;
pub mod statistics;

pub use normalize::WeatherSnapshot;
pub use process::ProcessedStats;
pub use statistics::StatisticsService;
