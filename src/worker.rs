//! Background timetable worker.
//!
//! Runs the engine on its own OS thread and talks to the caller only
//! through messages: requests go in by value, progress and one terminal
//! event per run come out over a bounded channel. Nothing is shared
//! except each run's [`CancellationToken`].
//!
//! # Protocol
//!
//! For every [`RunId`] returned by [`TimetableWorker::start`]:
//! zero or more [`WorkerEvent::Progress`], then exactly one of
//! [`WorkerEvent::Finished`], [`WorkerEvent::Cancelled`] or
//! [`WorkerEvent::Failed`]. A run cancelled before its result is sent never
//! produces `Finished`.
//!
//! Progress events are dropped when the channel is full; terminal events
//! wait for room.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};

use tracing::{info, info_span, trace, warn};

use crate::config::EngineConfig;
use crate::engine::{CancellationToken, Progress, ProgressSink, TimetableEngine, TimetableRequest};
use crate::error::{Result, TimetableError};
use crate::models::TimetableResult;

/// Stack for the worker thread. The search recurses once per lesson.
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Identifies one run of a worker.
pub type RunId = u64;

/// Outbound message from the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Progress { run: RunId, progress: Progress },
    Finished { run: RunId, result: Box<TimetableResult> },
    Cancelled { run: RunId },
    Failed { run: RunId, message: String },
}

impl WorkerEvent {
    pub fn run(&self) -> RunId {
        match self {
            WorkerEvent::Progress { run, .. }
            | WorkerEvent::Finished { run, .. }
            | WorkerEvent::Cancelled { run }
            | WorkerEvent::Failed { run, .. } => *run,
        }
    }

    /// Whether this is the last event of its run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerEvent::Progress { .. })
    }
}

/// Inbound start message.
struct Job {
    run: RunId,
    request: TimetableRequest,
    cancel: CancellationToken,
}

/// Forwards progress to the event channel without ever blocking.
struct ChannelSink<'a> {
    run: RunId,
    events: &'a SyncSender<WorkerEvent>,
}

impl ProgressSink for ChannelSink<'_> {
    fn report(&self, progress: Progress) {
        let event = WorkerEvent::Progress {
            run: self.run,
            progress,
        };
        if let Err(TrySendError::Full(_)) = self.events.try_send(event) {
            trace!(run = self.run, "progress event dropped");
        }
    }
}

/// Handle to a background timetable worker.
///
/// # Examples
///
/// ```
/// use u_timetable::worker::{TimetableWorker, WorkerEvent};
/// use u_timetable::{EngineConfig, TimetableRequest};
///
/// let mut worker = TimetableWorker::spawn(EngineConfig::default()).unwrap();
/// let run = worker.start(TimetableRequest::new()).unwrap();
/// let event = worker.wait(run).unwrap();
/// assert!(matches!(event, WorkerEvent::Finished { .. }));
/// worker.shutdown().unwrap();
/// ```
pub struct TimetableWorker {
    commands: Option<Sender<Job>>,
    events: Receiver<WorkerEvent>,
    current: Option<(RunId, CancellationToken)>,
    next_run: RunId,
    handle: Option<JoinHandle<()>>,
}

impl TimetableWorker {
    /// Starts the worker thread.
    pub fn spawn(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (command_tx, command_rx) = mpsc::channel::<Job>();
        let (event_tx, event_rx) = mpsc::sync_channel(config.progress_capacity);
        let engine = TimetableEngine::new(config);

        let handle = thread::Builder::new()
            .name("timetable-worker".into())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || serve(engine, command_rx, event_tx))?;

        Ok(Self {
            commands: Some(command_tx),
            events: event_rx,
            current: None,
            next_run: 1,
            handle: Some(handle),
        })
    }

    /// Sends a start message. A run still in flight is cancelled first.
    pub fn start(&mut self, request: TimetableRequest) -> Result<RunId> {
        self.cancel();
        let run = self.next_run;
        self.next_run += 1;
        let cancel = CancellationToken::new();
        let job = Job {
            run,
            request,
            cancel: cancel.clone(),
        };

        self.commands
            .as_ref()
            .ok_or(TimetableError::WorkerDisconnected)?
            .send(job)
            .map_err(|_| TimetableError::WorkerDisconnected)?;
        self.current = Some((run, cancel));
        Ok(run)
    }

    /// Cancels the latest run. No-op if there is none.
    pub fn cancel(&self) {
        if let Some((run, token)) = &self.current {
            if !token.is_cancelled() {
                info!(run, "cancelling timetable run");
            }
            token.cancel();
        }
    }

    /// Id of the latest run started.
    pub fn current_run(&self) -> Option<RunId> {
        self.current.as_ref().map(|(run, _)| *run)
    }

    /// The outbound event channel.
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Blocks for the next event.
    pub fn recv(&self) -> Result<WorkerEvent> {
        self.events
            .recv()
            .map_err(|_| TimetableError::WorkerDisconnected)
    }

    /// Next event if one is ready.
    pub fn try_recv(&self) -> Result<Option<WorkerEvent>> {
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TimetableError::WorkerDisconnected),
        }
    }

    /// Blocks until the terminal event of `run`, discarding everything
    /// before it.
    pub fn wait(&self, run: RunId) -> Result<WorkerEvent> {
        loop {
            let event = self.recv()?;
            if event.run() == run && event.is_terminal() {
                return Ok(event);
            }
        }
    }

    /// Cancels the current run, closes the command channel and joins the
    /// thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.cancel();
        self.commands.take();
        // drain so a pending terminal send cannot block the thread
        for _ in self.events.iter() {}
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| TimetableError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for TimetableWorker {
    fn drop(&mut self) {
        // the thread exits on its own once the command channel closes
        self.cancel();
        self.commands.take();
    }
}

fn serve(engine: TimetableEngine, commands: Receiver<Job>, events: SyncSender<WorkerEvent>) {
    for job in commands.iter() {
        let span = info_span!("timetable_run", run = job.run);
        let _enter = span.enter();

        let sink = ChannelSink {
            run: job.run,
            events: &events,
        };
        let outcome = engine.solve(&job.request, &sink, &job.cancel);
        let event = match outcome {
            Ok(_) | Err(TimetableError::Cancelled) if job.cancel.is_cancelled() => {
                WorkerEvent::Cancelled { run: job.run }
            }
            Ok(result) => WorkerEvent::Finished {
                run: job.run,
                result: Box::new(result),
            },
            Err(TimetableError::Cancelled) => WorkerEvent::Cancelled { run: job.run },
            Err(err) => {
                warn!(error = %err, "timetable run failed");
                WorkerEvent::Failed {
                    run: job.run,
                    message: err.to_string(),
                }
            }
        };

        if events.send(event).is_err() {
            // receiver gone, nobody to serve
            break;
        }
    }
}
