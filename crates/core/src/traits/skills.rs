//! Executor traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Capability, Context, Task};

/// Backend that runs tasks of one capability.
///
/// On success an executor calls [`Task::succeed`] with its result. Returning
/// `Ok(())` without a result is treated as a failure by the dispatcher.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Capability this executor serves.
    fn capability(&self) -> Capability;

    /// Run a task that is already in the `Running` state.
    async fn invoke(&self, query: &str, task: &mut Task, context: &Context) -> Result<()>;
}
