//! Progress of long-running requests on a remote provisioning service
use std::future::Future;
use std::time::Duration;

use indicatif::ProgressBar;
use serde::Deserialize;
use tracing::debug;

use crate::error::{InstallError, Result};

const SUCCESS: &str = "success";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestStatus {
    pub percent: u64,
    pub status: String,
}

impl RequestStatus {
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }
}

/// Polls a request until it completes or stops reporting success
#[derive(Debug)]
pub struct RequestTracker {
    interval: Duration,
    max_iterations: Option<u64>,
    bar: ProgressBar,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), None)
    }
}

impl RequestTracker {
    pub fn new(interval: Duration, max_iterations: Option<u64>) -> Self {
        Self {
            interval,
            max_iterations,
            bar: ProgressBar::hidden(),
        }
    }

    /// Surface progress on `bar`, which is sized to 100
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        bar.set_length(100);
        self.bar = bar;
        self
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Returns the last status seen; callers decide what a non-success
    /// status means.
    pub async fn track<F, Fut>(&self, request_id: &str, mut get_status: F) -> Result<RequestStatus>
    where
        F: FnMut(&str) -> Fut,
        Fut: Future<Output = Result<RequestStatus>>,
    {
        let mut iterations = 0;
        loop {
            let status = get_status(request_id).await?;
            debug!(request_id, percent = status.percent, status = %status.status, "request status");
            if status.percent.min(100) > self.bar.position() {
                self.bar.set_position(status.percent.min(100));
            }
            if status.is_complete() || !status.is_success() {
                self.bar.finish_and_clear();
                return Ok(status);
            }

            iterations += 1;
            if self.max_iterations.is_some_and(|max| iterations >= max) {
                self.bar.abandon();
                return Err(InstallError::Timeout(format!("request {request_id}")));
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
