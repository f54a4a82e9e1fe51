pub mod log;
pub mod metrics;
pub mod report;

pub use log::LogManager;
pub use metrics::MetricsRecorder;
pub use report::PipelineReport;
