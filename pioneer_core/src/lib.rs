pub mod actions;
pub mod config;
pub mod explorer;
pub mod graph;
pub mod progress;
pub mod scheduler;
pub mod stop;
pub mod store;
pub mod transactor;

pub use actions::ActionResponse;
pub use config::{ExplorerSettings, PioneerConfig, StoreSettings, TransactorSettings};
pub use explorer::{
    ExplorationContext, ExplorationReport, ExploreError, FailedTransition, Transition,
    TransitionExplorer,
};
pub use graph::RemainingTransitions;
pub use progress::{
    DeadlineExtender, NoDeadline, ProgressReporter, RecordingDeadline, RecordingProgress,
    WriterProgress,
};
pub use scheduler::{RandomScheduler, Scheduler};
pub use stop::{ExplorationLimits, StopCondition};
pub use store::{DirStateStore, StateStore, StoreError};
pub use transactor::{CommandTransactor, ConfigTransactor, TransitionOutcome};
