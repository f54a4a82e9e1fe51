pub mod record;
pub mod statistics;
pub mod table;
pub mod trajectory;

pub use record::{DerivedRecord, PositionRecord, VesselId};
pub use statistics::{Feature, FeatureStat, FeatureStatistics};
pub use table::{read_features, read_positions, write_features, RawTable};
pub use trajectory::{concat, partition_by_vessel, Trajectory};
