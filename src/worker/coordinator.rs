//! Scan coordination
//!
//! Triggers arriving while a scan runs collapse into a single pending scan,
//! started as soon as the running one completes. Only the coordinator task
//! touches the state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// One unit of work started by the coordinator
#[async_trait::async_trait]
pub trait ScanJob: Send + Sync + 'static {
    async fn run(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinatorState {
    #[default]
    Idle,
    Running,
    /// A scan is running and another was requested meanwhile
    RunningWithPending,
}

impl CoordinatorState {
    /// Next state after a trigger, and whether a scan must be started
    pub fn on_trigger(self) -> (Self, bool) {
        match self {
            Self::Idle => (Self::Running, true),
            Self::Running | Self::RunningWithPending => (Self::RunningWithPending, false),
        }
    }

    /// Next state after the running scan completed, and whether a scan must be started
    pub fn on_scan_complete(self) -> (Self, bool) {
        match self {
            Self::Idle | Self::Running => (Self::Idle, false),
            Self::RunningWithPending => (Self::Running, true),
        }
    }
}

/// Handle for requesting scans from a running coordinator
#[derive(Debug, Clone)]
pub struct ScanTrigger {
    sender: mpsc::UnboundedSender<()>,
}

impl ScanTrigger {
    /// Request a scan without waiting for it
    pub fn trigger(&self) {
        if self.sender.send(()).is_err() {
            warn!("scan coordinator has stopped, ignoring trigger");
        }
    }
}

/// Start the coordinator task.
///
/// The task ends once every [`ScanTrigger`] has been dropped and no scan is
/// running or pending.
pub fn spawn(job: Arc<dyn ScanJob>) -> (ScanTrigger, JoinHandle<()>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handle = tokio::spawn(Coordinator::new(job, receiver).run());
    (ScanTrigger { sender }, handle)
}

struct Coordinator {
    job: Arc<dyn ScanJob>,
    triggers: mpsc::UnboundedReceiver<()>,
    state: CoordinatorState,
}

impl Coordinator {
    fn new(job: Arc<dyn ScanJob>, triggers: mpsc::UnboundedReceiver<()>) -> Self {
        Self {
            job,
            triggers,
            state: CoordinatorState::Idle,
        }
    }

    async fn run(mut self) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut triggers_open = true;

        loop {
            tokio::select! {
                trigger = self.triggers.recv(), if triggers_open => match trigger {
                    Some(()) => {
                        let (next, start) = self.state.on_trigger();
                        self.state = next;
                        if start {
                            self.start_scan(&done_tx);
                        } else {
                            debug!("scan already running, marking another as pending");
                        }
                    }
                    None => triggers_open = false,
                },
                Some(()) = done_rx.recv() => {
                    let (next, start) = self.state.on_scan_complete();
                    self.state = next;
                    if start {
                        debug!("starting pending scan");
                        self.start_scan(&done_tx);
                    }
                }
            }

            if !triggers_open && self.state == CoordinatorState::Idle {
                break;
            }
        }

        debug!("scan coordinator stopped");
    }

    /// Run the job on its own task and report completion, even if it panics
    fn start_scan(&self, done: &mpsc::UnboundedSender<()>) {
        let job = self.job.clone();
        let done = done.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::spawn(async move { job.run().await }).await {
                error!("scan task failed: {}", e);
            }
            // The coordinator owns the receiver for as long as a scan can be running
            let _ = done.send(());
        });
    }
}
