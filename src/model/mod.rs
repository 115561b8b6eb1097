pub mod stream;

pub use stream::{LiveStatus, RawEntry, StartTime, StreamRecord, UNKNOWN};
