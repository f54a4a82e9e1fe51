pub mod interp;
pub mod projection;
pub mod stats;

pub use interp::LinearInterpolator;
pub use projection::TransverseMercator;
pub use stats::{RunningStats, StatsHelper};
