//! Day bookkeeping shared by the runner and the orchestrator

pub mod timeline;

pub use timeline::{Segment, TestSchedule, Timeline};
