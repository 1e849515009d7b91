// src/tracker.rs
//! Tracker controller: owns the reader task and the state it shares with callers

use crate::{
    config::TrackerConfig,
    error::{GpsError, Result},
    export,
    geofence::Geofence,
    gps::{FrameAssembler, GeoPoint, Position, SentenceParser},
    history::PositionStore,
    stats::{StatsSnapshot, TrackerStats},
    transport::{Connector, SerialConnector},
};
use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    runtime::Handle,
    sync::Mutex as AsyncMutex,
    task::JoinHandle,
};
use tracing::{debug, error, info, trace, warn};

/// Bytes requested from the transport per read
const READ_CHUNK: usize = 256;

/// User code notified of every accepted fix
pub type PositionCallback = Arc<dyn Fn(Position) -> anyhow::Result<()> + Send + Sync>;

/// Lifecycle of a [`Tracker`]. A stopped tracker may be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Running,
    Stopped,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the reader task touches
struct Shared {
    /// Id of the latest run; only that run's reader may change `state`
    run: AtomicU64,
    state: Mutex<TrackerState>,
    history: PositionStore,
    callback: RwLock<Option<PositionCallback>>,
    failure: Mutex<Option<GpsError>>,
    stats: TrackerStats,
}

impl Shared {
    fn new(history_size: usize) -> Self {
        Self {
            run: AtomicU64::new(0),
            state: Mutex::new(TrackerState::Idle),
            history: PositionStore::new(history_size),
            callback: RwLock::new(None),
            failure: Mutex::new(None),
            stats: TrackerStats::new(),
        }
    }

    fn handle_line(&self, parser: &mut SentenceParser, line: &str) {
        self.stats.record_line();
        trace!(line, "sentence received");

        match parser.parse(line) {
            Ok(position) => self.deliver(position),
            Err(reason) if reason.is_silent() => {
                self.stats.record_skipped();
                trace!(%reason, "skipping sentence");
            }
            Err(reason) => {
                self.stats.record_rejected();
                debug!(%reason, line, "rejected sentence");
            }
        }
    }

    /// Store first, then notify, so the callback already sees the fix in history.
    fn deliver(&self, position: Position) {
        self.history.append(position);
        self.stats.record_fix();

        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(callback) = callback else {
            return;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| callback(position))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.stats.record_callback_failure();
                warn!(error = %e, %position, "position callback failed");
            }
            Err(payload) => {
                self.stats.record_callback_failure();
                warn!(panic = panic_message(&*payload), %position, "position callback panicked");
            }
        }
    }

    fn fail(&self, run: u64, err: GpsError) {
        let mut state = lock(&self.state);
        if self.run.load(Ordering::Acquire) != run {
            debug!(run, error = %err, "ignoring failure from a superseded reader");
            return;
        }
        error!(run, error = %err, "transport failure, reader stopping");
        *lock(&self.failure) = Some(err);
        *state = TrackerState::Stopped;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// One reader run: its cancel flag and task
struct Worker {
    run: u64,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// The read-assemble-parse-store-notify loop.
///
/// `cancel` is checked once per read and before every line, so stop latency
/// is bounded by `read_timeout` and nothing is delivered once it is set.
async fn read_loop<S>(
    mut stream: S,
    shared: Arc<Shared>,
    run: u64,
    cancel: Arc<AtomicBool>,
    read_timeout: Duration,
) where
    S: AsyncRead + Unpin,
{
    let mut assembler = FrameAssembler::new();
    let mut parser = SentenceParser::new();
    let mut buf = [0u8; READ_CHUNK];

    while !cancel.load(Ordering::Acquire) {
        let n = match tokio::time::timeout(read_timeout, stream.read(&mut buf)).await {
            Err(_) => continue, // nothing within the timeout
            Ok(Ok(0)) => {
                shared.fail(
                    run,
                    GpsError::Transport("end of stream, device disconnected".to_string()),
                );
                break;
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => continue,
            Ok(Err(e)) => {
                shared.fail(run, GpsError::Transport(e.to_string()));
                break;
            }
        };

        let discarded = assembler.discarded();
        assembler.push(&buf[..n]);
        for line in assembler.lines() {
            if cancel.load(Ordering::Acquire) {
                break;
            }
            shared.handle_line(&mut parser, &line);
        }
        if assembler.discarded() > discarded {
            shared.stats.record_oversized(assembler.discarded() - discarded);
        }
    }

    debug!(run, "reader loop exited");
}

/// Reads NMEA from a transport on a background task and publishes fixes.
///
/// Each tracker owns its own history, callback and reader; several can run
/// side by side against different ports. All methods take `&self`, so a
/// tracker can be shared behind an `Arc`.
pub struct Tracker<C: Connector = SerialConnector> {
    config: TrackerConfig,
    connector: C,
    shared: Arc<Shared>,
    /// Held across the join in `stop()`, so `start()` can tell a stop is in flight
    worker: AsyncMutex<Option<Worker>>,
}

impl Tracker<SerialConnector> {
    /// Tracker reading from the serial port named in `config`
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_connector(config, SerialConnector)
    }
}

impl<C: Connector> Tracker<C> {
    pub fn with_connector(config: TrackerConfig, connector: C) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(Shared::new(config.history_size));
        Ok(Self {
            config,
            connector,
            shared,
            worker: AsyncMutex::new(None),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Replace the callback. Takes effect from the next fix on.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(Position) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        *self
            .shared
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self) {
        *self
            .shared
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Open the transport and spawn the reader on the current tokio runtime.
    ///
    /// Returns as soon as the reader is spawned. Fails without changing state
    /// if the tracker is already running, a `stop()` is still waiting for the
    /// previous reader, there is no runtime, or the transport cannot be opened.
    pub fn start(&self) -> Result<()> {
        let Ok(mut worker) = self.worker.try_lock() else {
            return Err(if self.is_running() {
                GpsError::AlreadyRunning
            } else {
                GpsError::Stopping
            });
        };
        let mut state = lock(&self.shared.state);
        if *state == TrackerState::Running {
            return Err(GpsError::AlreadyRunning);
        }

        let runtime = Handle::try_current().map_err(|_| GpsError::NoRuntime)?;
        let stream = {
            let _guard = runtime.enter();
            self.connector.connect(&self.config)?
        };
        info!(
            port = %self.config.port,
            baudrate = self.config.baudrate,
            "transport open, starting reader"
        );

        // Left over from a run that failed and was never stopped
        if let Some(old) = worker.take() {
            old.cancel.store(true, Ordering::Release);
            old.handle.abort();
        }
        if let Some(err) = lock(&self.shared.failure).take() {
            warn!(error = %err, "discarding unreported failure of the previous run");
        }

        let run = self.shared.run.fetch_add(1, Ordering::AcqRel) + 1;
        *state = TrackerState::Running;
        drop(state);

        let cancel = Arc::new(AtomicBool::new(false));
        let handle = runtime.spawn(read_loop(
            stream,
            Arc::clone(&self.shared),
            run,
            Arc::clone(&cancel),
            self.config.read_timeout,
        ));
        *worker = Some(Worker { run, cancel, handle });
        Ok(())
    }

    /// Stop the reader and wait (up to `stop_timeout`) for it to exit.
    ///
    /// If the last run ended in a transport failure, that failure is returned
    /// once. Stopping an already stopped tracker is a no-op; stopping one that
    /// was never started is `NotStarted`.
    ///
    /// A reader blocked inside the callback past `stop_timeout` is aborted but
    /// not waited for. It delivers nothing after the callback returns.
    pub async fn stop(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        {
            let mut state = lock(&self.shared.state);
            match *state {
                TrackerState::Idle => return Err(GpsError::NotStarted),
                TrackerState::Running => info!(port = %self.config.port, "stopping reader"),
                TrackerState::Stopped => {}
            }
            *state = TrackerState::Stopped;
        }

        if let Some(Worker { run, cancel, mut handle }) = worker.take() {
            cancel.store(true, Ordering::Release);
            match tokio::time::timeout(self.config.stop_timeout, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(run, error = %e, "reader task ended abnormally"),
                Err(_) => {
                    warn!(
                        run,
                        timeout = ?self.config.stop_timeout,
                        "reader did not exit in time, aborting it"
                    );
                    handle.abort();
                }
            }
        }
        drop(worker);

        match lock(&self.shared.failure).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> TrackerState {
        *lock(&self.shared.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == TrackerState::Running
    }

    /// Most recent accepted fix, across restarts
    pub fn last_position(&self) -> Option<Position> {
        self.shared.history.last()
    }

    /// Oldest-first copy of the history buffer
    pub fn history(&self) -> Vec<Position> {
        self.shared.history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.shared.history.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Write the current history as CSV (`lat,lon,alt,timestamp`).
    pub fn save_history_csv(&self, path: &Path) -> Result<()> {
        export::save_csv(path, &self.history())
    }

    /// Check the last fix against a circle.
    ///
    /// `Ok(None)` when no fix has arrived yet. The region is validated even
    /// then.
    pub fn geofence_check_circle(&self, center: GeoPoint, radius_m: f64) -> Result<Option<bool>> {
        let fence = Geofence::new(center, radius_m)?;
        Ok(self.last_position().map(|pos| fence.contains(pos.point())))
    }
}

impl<C: Connector> Drop for Tracker<C> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.cancel.store(true, Ordering::Release);
            worker.handle.abort();
        }
    }
}
