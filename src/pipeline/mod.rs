pub mod coordinator;
pub mod exchange;
pub mod startup;
pub mod state;
pub mod stats;

pub use coordinator::{Pipeline, RunReport};
pub use exchange::{BufferSlot, DualBuffer, SlotId};
pub use startup::{acquire, Collaborators};
pub use state::RunState;
pub use stats::{PipelineStats, StatsSnapshot};
