//! Resource accounting for a long-lived interpreter store.
//!
//! One interpreter instance serves every run of a session, so limits are
//! enforced per request: the [`RunClock`] carries the deadline of the request
//! in flight and the epoch callback installed by [`install_limits`] checks it
//! on every tick, refilling fuel while the interpreter sits idle.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use wasmtime::{ResourceLimiter, Store, UpdateDeadline};
use wasmtime_wasi::preview1::WasiP1Ctx;

/// Largest table the interpreter may grow to.
const MAX_TABLE_ELEMENTS: u64 = 10_000;

const MIB: u64 = 1024 * 1024;

/// A growth request the limiter refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Linear memory would have grown past the session limit.
    Memory {
        /// Requested size in bytes.
        requested: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// A table would have grown past the element limit.
    Table {
        /// Requested element count.
        requested: u64,
    },
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Memory { requested, limit } => write!(
                f,
                "the program asked for {} MiB but the playground allows {} MiB",
                requested.div_ceil(MIB),
                limit / MIB
            ),
            Denial::Table { requested } => write!(
                f,
                "the program asked for {} table entries but the playground allows {}",
                requested, MAX_TABLE_ELEMENTS
            ),
        }
    }
}

/// Memory and table limiter for one interpreter instance.
#[derive(Debug)]
pub struct SessionLimiter {
    max_memory: u64,
    peak_memory: u64,
    denial: Option<Denial>,
}

impl SessionLimiter {
    /// Limit linear memory to `max_memory` bytes.
    pub fn new(max_memory: u64) -> Self {
        Self {
            max_memory,
            peak_memory: 0,
            denial: None,
        }
    }

    /// The most recent refused growth, if any.
    pub fn denial(&self) -> Option<Denial> {
        self.denial
    }

    /// Largest linear memory size granted so far.
    pub fn peak_memory(&self) -> u64 {
        self.peak_memory
    }
}

impl ResourceLimiter for SessionLimiter {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        let requested = desired as u64;
        if requested > self.max_memory {
            self.denial = Some(Denial::Memory {
                requested,
                limit: self.max_memory,
            });
            return Ok(false);
        }

        self.peak_memory = self.peak_memory.max(requested);
        Ok(true)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        let requested = desired as u64;
        if requested > MAX_TABLE_ELEMENTS {
            self.denial = Some(Denial::Table { requested });
            return Ok(false);
        }
        Ok(true)
    }
}

/// What the epoch callback should do on the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No request in flight.
    Idle,
    /// A request is running within its deadline.
    Busy,
    /// The request overran its deadline or the session was closed.
    Stop,
}

#[derive(Debug, Default)]
struct ClockState {
    deadline: Option<Instant>,
    interrupted: bool,
    closed: bool,
}

/// Deadline of the request in flight, shared with the epoch callback.
#[derive(Debug, Default)]
pub struct RunClock {
    state: Mutex<ClockState>,
}

impl RunClock {
    fn state(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start timing a request that may run for `timeout`.
    pub fn begin(&self, timeout: Duration) {
        let mut state = self.state();
        state.deadline = Some(Instant::now() + timeout);
        state.interrupted = false;
    }

    /// The request in flight has answered.
    pub fn finish(&self) {
        self.state().deadline = None;
    }

    /// Stop the interpreter at its next tick, whatever it is doing.
    pub fn close(&self) {
        self.state().closed = true;
    }

    /// Whether the last request was stopped for overrunning its deadline.
    pub fn interrupted(&self) -> bool {
        self.state().interrupted
    }

    /// Classify the current tick, recording an overrun.
    pub fn tick(&self) -> Tick {
        let mut state = self.state();
        if state.closed {
            return Tick::Stop;
        }
        match state.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                state.interrupted = true;
                Tick::Stop
            }
            Some(_) => Tick::Busy,
            None => Tick::Idle,
        }
    }
}

/// Error raised inside the guest when the clock says stop.
#[derive(Debug, thiserror::Error)]
#[error("interpreter stopped by the run clock")]
pub struct Stopped;

/// Store data of one interpreter instance.
pub struct SessionState {
    /// Memory and table limiter.
    pub limiter: SessionLimiter,
    /// WASI Preview 1 context.
    pub wasi: WasiP1Ctx,
}

impl SessionState {
    /// Store data with a `max_memory` byte limit around `wasi`.
    pub fn new(max_memory: u64, wasi: WasiP1Ctx) -> Self {
        Self {
            limiter: SessionLimiter::new(max_memory),
            wasi,
        }
    }
}

/// Attach the limiter, the per-request deadline and the fuel budget to `store`.
///
/// Each request gets the full `fuel` budget: the tank is topped up on every
/// tick where no request is in flight.
pub fn install_limits(
    store: &mut Store<SessionState>,
    clock: Arc<RunClock>,
    fuel: Option<u64>,
) -> anyhow::Result<()> {
    store.limiter(|state| &mut state.limiter);
    if let Some(fuel) = fuel {
        store.set_fuel(fuel)?;
    }

    store.set_epoch_deadline(1);
    store.epoch_deadline_callback(move |mut ctx| match clock.tick() {
        Tick::Stop => Err(anyhow::Error::new(Stopped)),
        Tick::Busy => Ok(UpdateDeadline::Continue(1)),
        Tick::Idle => {
            if let Some(fuel) = fuel {
                ctx.set_fuel(fuel)?;
            }
            Ok(UpdateDeadline::Continue(1))
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_tracks_peak() {
        let mut limiter = SessionLimiter::new(MIB);

        assert!(limiter.memory_growing(0, 512 * 1024, None).unwrap());
        assert!(limiter.memory_growing(512 * 1024, 256 * 1024, None).unwrap());
        assert_eq!(limiter.peak_memory(), 512 * 1024);
        assert!(limiter.denial().is_none());
    }

    #[test]
    fn test_memory_denial_is_explained() {
        let mut limiter = SessionLimiter::new(64 * MIB);

        assert!(!limiter.memory_growing(0, (80 * MIB) as usize, None).unwrap());
        let denial = limiter.denial().unwrap();
        assert_eq!(
            denial,
            Denial::Memory {
                requested: 80 * MIB,
                limit: 64 * MIB
            }
        );
        assert_eq!(
            denial.to_string(),
            "the program asked for 80 MiB but the playground allows 64 MiB"
        );
        assert_eq!(limiter.peak_memory(), 0);
    }

    #[test]
    fn test_limiter_denies_large_tables() {
        let mut limiter = SessionLimiter::new(MIB);
        assert!(!limiter.table_growing(0, 20_000, None).unwrap());
        assert_eq!(limiter.denial(), Some(Denial::Table { requested: 20_000 }));
    }

    #[test]
    fn test_clock_is_idle_between_requests() {
        let clock = RunClock::default();
        assert_eq!(clock.tick(), Tick::Idle);

        clock.begin(Duration::from_secs(60));
        assert_eq!(clock.tick(), Tick::Busy);

        clock.finish();
        assert_eq!(clock.tick(), Tick::Idle);
        assert!(!clock.interrupted());
    }

    #[test]
    fn test_clock_stops_overrunning_request() {
        let clock = RunClock::default();
        clock.begin(Duration::ZERO);

        assert_eq!(clock.tick(), Tick::Stop);
        assert!(clock.interrupted());

        clock.begin(Duration::from_secs(60));
        assert!(!clock.interrupted());
    }

    #[test]
    fn test_closed_clock_always_stops() {
        let clock = RunClock::default();
        clock.close();
        assert_eq!(clock.tick(), Tick::Stop);
        assert!(!clock.interrupted());
    }
}
