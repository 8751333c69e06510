//! The cycle loop and the evaluator's external contracts.
//!
//! A Beacon process is a single loop over four strictly sequential steps:
//! batch-read every catalog sensor, record buffered sensors, run the
//! generated coordinator, batch-write the produced outputs. The only
//! suspension points are the two batched store calls and the inter-cycle
//! sleep; rule evaluation itself runs to completion synchronously, and two
//! cycles never execute concurrently.
//!
//! The traits here are the seams to the outside world:
//!
//! - [`Store`]: the key/value client (connecting, pooling and retrying are
//!   its implementation's business, not Beacon's).
//! - [`Host`]: the fire-and-forget message channel generated `send_message`
//!   actions call into. Every store is a host.
//! - [`Evaluate`]: implemented by the generated coordinator.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::buffers::SensorBuffers;
use super::values::SensorValues;

// --- Errors ------------------------------------------------------------------

/// Failure inside a group's evaluation. Groups re-raise; there is no partial
/// rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        EvalError { message: message.into() }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evaluation error: {}", self.message)
    }
}

impl std::error::Error for EvalError {}

/// Failure reported by the store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        StoreError { message: message.into() }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.message)
    }
}

impl std::error::Error for StoreError {}

/// What stops a run: the store failing or a group failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    Store(StoreError),
    Eval(EvalError),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::Store(err) => err.fmt(f),
            CycleError::Eval(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for CycleError {}

impl From<StoreError> for CycleError {
    fn from(err: StoreError) -> Self {
        CycleError::Store(err)
    }
}

impl From<EvalError> for CycleError {
    fn from(err: EvalError) -> Self {
        CycleError::Eval(err)
    }
}

// --- Contracts ---------------------------------------------------------------

/// The message seam generated `send_message` actions call into.
///
/// Messages are fire-and-forget: delivery failures are the implementation's
/// concern and never abort a cycle.
pub trait Host {
    fn send_message(&mut self, channel: &str, message: &str);
}

/// The external key/value store, owned by the runner and never exposed to
/// groups directly.
pub trait Store: Host {
    /// Fetch the current value of every requested sensor in one batch.
    ///
    /// Implementations must supply a value for every requested sensor; how a
    /// key the store has never seen is defaulted (zero, last known, …) is the
    /// client's business. The runner rejects a partial batch with a
    /// [`StoreError`] before any rule sees it, because generated group code
    /// indexes inputs directly.
    fn read_batch(&mut self, sensors: &[String]) -> Result<SensorValues, StoreError>;

    /// Write every produced output in one batch. Called once per cycle, after
    /// evaluation; an empty batch is allowed.
    fn write_batch(&mut self, outputs: &SensorValues) -> Result<(), StoreError>;
}

/// Implemented by the generated coordinator: run every group in layer order
/// against one cycle's inputs.
pub trait Evaluate {
    fn evaluate(
        &self,
        inputs: &SensorValues,
        outputs: &mut SensorValues,
        buffers: &SensorBuffers,
        host: &mut dyn Host,
    ) -> Result<(), EvalError>;
}

// --- The loop ----------------------------------------------------------------

/// Drives the fetch → record → evaluate → write → sleep loop.
pub struct CycleRunner<S: Store, E: Evaluate> {
    store: S,
    evaluator: E,
    buffers: SensorBuffers,
    /// Catalog sensors fetched at the top of every cycle.
    sensors: Vec<String>,
    cycle_time: Duration,
    stop: Arc<AtomicBool>,
}

impl<S: Store, E: Evaluate> CycleRunner<S, E> {
    pub fn new(
        store: S,
        evaluator: E,
        buffers: SensorBuffers,
        sensors: Vec<String>,
        cycle_time: Duration,
    ) -> Self {
        CycleRunner { store, evaluator, buffers, sensors, cycle_time, stop: Arc::new(AtomicBool::new(false)) }
    }

    /// Cooperative stop flag. Asserting it lets the in-flight cycle finish
    /// (including its writes) before the loop exits; mid-cycle cancellation
    /// is not supported.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run cycles until the stop flag is asserted or a cycle fails.
    pub fn run(&mut self) -> Result<(), CycleError> {
        while !self.stop.load(Ordering::Relaxed) {
            let started = Instant::now();
            self.run_cycle(now_ms())?;
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            if let Some(remaining) = self.cycle_time.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    /// One full cycle at the given timestamp.
    pub fn run_cycle(&mut self, timestamp_ms: u64) -> Result<(), CycleError> {
        let inputs = self.store.read_batch(&self.sensors)?;
        for sensor in &self.sensors {
            if !inputs.contains(sensor) {
                return Err(StoreError::new(format!("batch read returned no value for sensor `{sensor}`")).into());
            }
        }

        let buffered: Vec<String> = self.buffers.sensors().map(str::to_owned).collect();
        for sensor in buffered {
            if let Some(value) = inputs.get(&sensor) {
                self.buffers.record(&sensor, value, timestamp_ms);
            }
        }

        let mut outputs = SensorValues::new();
        self.evaluator.evaluate(&inputs, &mut outputs, &self.buffers, &mut self.store)?;

        self.store.write_batch(&outputs)?;
        Ok(())
    }

    pub fn buffers(&self) -> &SensorBuffers {
        &self.buffers
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
