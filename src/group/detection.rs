//! Background detection with bounded retries.
//!
//! Some drivers only become usable a while after the process starts (an SMBus
//! that enumerates once the kernel module finished loading, for instance). A
//! [`Detection`] drives the group's attempt function from a `tokio` task, up to
//! [`RetryPolicy::attempts`] times with a fixed backoff in between, and records
//! every failure instead of propagating it.
//!
//! ```text
//! Idle ──spawn──▶ Detecting ──Found / NoDevices──▶ Ready
//!                    │
//!                    └──all attempts failed──▶ Exhausted
//!
//! any state ──cancel_and_wait──▶ Closed
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// How often and how patiently detection retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    /// Wait between two attempts, in milliseconds
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 5, backoff_ms: 2500 }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff_ms: backoff.as_millis() as u64 }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(Error::invalid_argument("detection needs at least one attempt"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    /// Nothing to detect, or not started
    Idle,
    Detecting,
    Ready,
    Exhausted,
    Closed,
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetectionState::Idle => "idle",
            DetectionState::Detecting => "detecting",
            DetectionState::Ready => "ready",
            DetectionState::Exhausted => "exhausted",
            DetectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// What a single attempt observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Hardware was found; the count of newly adopted entries
    Found(usize),
    /// The bus definitely carries nothing of interest
    NoDevices,
    /// The driver is not ready yet; worth another attempt
    NotReady(String),
    /// The attempt noticed shutdown and gave up
    Cancelled,
}

#[derive(Debug)]
struct Status {
    state: DetectionState,
    attempts: u32,
    last_error: Option<Arc<Error>>,
}

/// Owner of one group's detection lifecycle
pub struct Detection {
    policy: RetryPolicy,
    status: Arc<Mutex<Status>>,
    cancel: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Detection {
    fn with_state(policy: RetryPolicy, state: DetectionState) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            policy,
            status: Arc::new(Mutex::new(Status { state, attempts: 0, last_error: None })),
            cancel,
            task: Mutex::new(None),
        }
    }

    /// A detection that never runs. Groups without a driver stay here.
    pub fn idle(policy: RetryPolicy) -> Self {
        Self::with_state(policy, DetectionState::Idle)
    }

    /// Records the result of a detection performed synchronously by the caller.
    pub fn settled(result: Result<AttemptOutcome>) -> Self {
        let detection = Self::with_state(RetryPolicy { attempts: 1, ..RetryPolicy::default() }, DetectionState::Detecting);
        {
            let mut status = detection.status.lock();
            status.attempts = 1;
            status.state = match result {
                Ok(AttemptOutcome::Found(_)) | Ok(AttemptOutcome::NoDevices) => DetectionState::Ready,
                Ok(AttemptOutcome::Cancelled) => DetectionState::Closed,
                Ok(AttemptOutcome::NotReady(reason)) => {
                    status.last_error = Some(Arc::new(Error::detection_failed(1, reason)));
                    DetectionState::Exhausted
                },
                Err(e) => {
                    status.last_error = Some(Arc::new(Error::detection_failed(1, e.to_string())));
                    DetectionState::Exhausted
                },
            };
        }
        detection
    }

    /// Starts the retry loop on the current `tokio` runtime.
    ///
    /// `attempt` receives the 1-based attempt number. It runs on the blocking
    /// thread pool, so it may wait on a driver; cancellation takes effect once the
    /// running attempt returns.
    pub fn spawn<F>(policy: RetryPolicy, attempt: F) -> Result<Self>
    where
        F: FnMut(u32) -> Result<AttemptOutcome> + Send + 'static,
    {
        policy.validate()?;
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::not_available("background detection requires a tokio runtime"))?;

        let detection = Self::with_state(policy, DetectionState::Detecting);
        let task = handle.spawn(run(policy, attempt, Arc::clone(&detection.status), detection.cancel.subscribe()));
        *detection.task.lock() = Some(task);
        Ok(detection)
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn state(&self) -> DetectionState {
        self.status.lock().state
    }

    /// Number of attempts started so far
    pub fn attempts(&self) -> u32 {
        self.status.lock().attempts
    }

    /// Most recent failure, detection or close
    pub fn last_error(&self) -> Option<Arc<Error>> {
        self.status.lock().last_error.clone()
    }

    /// `DetectionExhausted` once every attempt failed
    pub fn exhaustion(&self) -> Option<Error> {
        let status = self.status.lock();
        if status.state != DetectionState::Exhausted {
            return None;
        }
        let reason = status.last_error.as_ref().map(|e| e.to_string()).unwrap_or_default();
        Some(Error::detection_exhausted(status.attempts, reason))
    }

    pub(crate) fn record_error(&self, error: Error) {
        self.status.lock().last_error = Some(Arc::new(error));
    }

    /// Waits until the retry loop stopped on its own. Returns immediately when no
    /// loop is running.
    pub async fn wait(&self) {
        let Some(task) = self.task.lock().take() else {
            return;
        };
        self.join(task).await;
    }

    /// Signals cancellation and waits for the retry loop to observe it. Safe to
    /// call repeatedly, and when detection never started or already finished.
    pub async fn cancel_and_wait(&self) {
        let _ = self.cancel.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            self.join(task).await;
        }
        self.status.lock().state = DetectionState::Closed;
    }

    async fn join(&self, task: JoinHandle<()>) {
        if let Err(e) = task.await {
            warn!(error = %e, "detection task ended abnormally");
            self.record_error(Error::system(format!("detection task failed: {}", e)));
        }
    }
}

impl fmt::Debug for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status.lock();
        f.debug_struct("Detection")
            .field("policy", &self.policy)
            .field("state", &status.state)
            .field("attempts", &status.attempts)
            .field("last_error", &status.last_error)
            .finish()
    }
}

fn run<F>(
    policy: RetryPolicy,
    mut attempt: F,
    status: Arc<Mutex<Status>>,
    mut cancel: watch::Receiver<bool>,
) -> impl Future<Output = ()> + Send + 'static
where
    F: FnMut(u32) -> Result<AttemptOutcome> + Send + 'static,
{
    async move {
        // A loop that unwinds without settling must not look like it is still running.
        let status = scopeguard::guard(status, |status| {
            let mut status = status.lock();
            if status.state == DetectionState::Detecting {
                status.state = DetectionState::Exhausted;
            }
        });

        for n in 1..=policy.attempts {
            if *cancel.borrow() {
                debug!(attempt = n, "detection cancelled before attempt");
                return;
            }
            status.lock().attempts = n;
            debug!(attempt = n, "detection attempt");

            // Driver calls block, so the attempt runs on the blocking pool and
            // hands the closure back for the next round.
            let outcome = match tokio::task::spawn_blocking(move || {
                let outcome = attempt(n);
                (attempt, outcome)
            })
            .await
            {
                Ok((returned, outcome)) => {
                    attempt = returned;
                    outcome
                },
                Err(e) => {
                    warn!(attempt = n, error = %e, "detection attempt panicked");
                    let mut status = status.lock();
                    status.last_error = Some(Arc::new(Error::system(format!("detection attempt {} panicked: {}", n, e))));
                    status.state = DetectionState::Exhausted;
                    return;
                },
            };

            let reason = match outcome {
                Ok(AttemptOutcome::Found(count)) => {
                    info!(attempt = n, hardware = count, "detection finished");
                    status.lock().state = DetectionState::Ready;
                    return;
                },
                Ok(AttemptOutcome::NoDevices) => {
                    info!(attempt = n, "detection finished, no devices present");
                    status.lock().state = DetectionState::Ready;
                    return;
                },
                Ok(AttemptOutcome::Cancelled) => return,
                Ok(AttemptOutcome::NotReady(reason)) => reason,
                Err(e) => e.to_string(),
            };

            let failure = Error::detection_failed(n, reason);
            warn!(attempt = n, error = %failure, "detection attempt failed");
            {
                let mut status = status.lock();
                status.last_error = Some(Arc::new(failure));
                if n == policy.attempts {
                    status.state = DetectionState::Exhausted;
                    warn!(attempts = n, "detection exhausted");
                    return;
                }
            }

            if *cancel.borrow() {
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep(policy.backoff()) => {},
                // A dropped sender means the owner is gone, which is a cancellation too
                _ = cancel.changed() => {
                    debug!(attempt = n, "detection cancelled during backoff");
                    return;
                },
            }
        }
    }
}
