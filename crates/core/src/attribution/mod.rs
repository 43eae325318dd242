//! Wind-driven attribution: regimes, back-trajectories, severe episodes and hotspots

pub mod cluster;
pub mod episode;
pub mod hotspot;
pub mod regime;
pub mod seasonal;
pub mod sources;
pub mod trajectory;

// Re-export main types
pub use cluster::{dbscan, NOISE};
pub use episode::{EpisodeDetector, SevereEpisode};
pub use hotspot::{find_hotspots, HotspotCell, HotspotClusterer};
pub use regime::{classify, classify_series, Regime, RegimeSummary};
pub use seasonal::{default_seasons, seasonal_means, Season, SeasonalMean};
pub use sources::{match_source, KnownSource, MatchPolicy, SourceCategory, SourceMatch};
pub use trajectory::{integrate, Trajectory, TrajectoryConfig, Waypoint};
