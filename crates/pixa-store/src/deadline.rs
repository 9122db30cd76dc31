use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{StoreError, StoreResult};

/// Absolute deadline shared by every step of one operation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    pub(crate) fn after(timeout: Option<Duration>) -> Self {
        Self(timeout.map(|t| Instant::now() + t))
    }

    /// Await `step`, giving up with `DeadlineExceeded` once the deadline passes.
    pub(crate) async fn run<F: Future>(&self, op: &'static str, step: F) -> StoreResult<F::Output> {
        match self.0 {
            Some(at) => tokio::time::timeout_at(at, step)
                .await
                .map_err(|_| StoreError::DeadlineExceeded { op }),
            None => Ok(step.await),
        }
    }
}
