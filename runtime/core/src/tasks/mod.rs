//! Background Tasks
//!
//! The [`TaskBridge`] runs application work off the frame loop and delivers
//! results back onto it; [`executor`] holds the places that work can run.

mod bridge;
pub mod executor;

pub use bridge::{Delivery, SubmitError, TaskBridge, TaskError, TaskId, TaskResult, TaskStats};
pub use executor::{DeferredExecutor, Executor, InlineExecutor, ThreadExecutor, TokioExecutor};
