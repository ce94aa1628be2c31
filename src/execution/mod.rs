//! Task graph execution

pub mod engine;
pub mod executor;
pub mod scheduler;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent, RunReport};
pub use executor::TaskExecutor;
pub use scheduler::ExecutionScheduler;
