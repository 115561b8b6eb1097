pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod refresh;
pub mod renderer;
pub mod video;

pub use cache::{ScheduleCache, Snapshot};
pub use config::Config;
pub use error::ScheduleError;
pub use model::{LiveStatus, RawEntry, StartTime, StreamRecord};
pub use normalizer::Normalizer;
pub use refresh::{Pipeline, RefreshHandle, RefreshOutcome, Refresher, RetryPolicy};
pub use renderer::PageRenderer;
