pub mod raw_file;
pub mod save_state;
pub mod sink;
pub mod worker;

pub use raw_file::RawFileSink;
pub use save_state::{Appended, SaveController, Transition};
pub use sink::PersistenceSink;
pub use worker::{
    FrameFeed, Handoff, PersistenceWorker, WorkerExit, WorkerHandle, WorkerReport, WorkerState,
};
