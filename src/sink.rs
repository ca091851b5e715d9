//! # Navigation Sinks
//!
//! Interfaces the receive worker publishes through, and an in-process
//! implementation backing the rest of the flight stack.
//!
//! The worker owns handles to these collaborators; there is no process-wide
//! lookup. Publishes are bounded-wait (a short mutex hold plus a lock-free
//! watch send) so downstream congestion can never stall frame reception.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::oem4::protocol::{GpsTime, NavigationSample, SolutionStatus, SolutionType};

/// Receives the GPS time carried by every accepted frame header
pub trait TimeAuthority: Send + Sync {
    fn set_gps_time(&self, time: GpsTime);
}

/// Receives decoded navigation data, one field group per setter
///
/// `publish` applies every setter for a sample and then signals downstream;
/// implementors only need the individual setters.
pub trait NavigationSink: Send + Sync {
    fn set_position_status(&self, status: SolutionStatus);
    fn set_position_type(&self, solution: SolutionType);
    fn set_llh_position(&self, llh: [f64; 3]);
    fn set_pos_sigma(&self, sigma: [f32; 3]);
    fn set_velocity_status(&self, status: SolutionStatus);
    fn set_velocity_type(&self, solution: SolutionType);
    fn set_ned_velocity(&self, velocity: [f64; 3]);
    fn set_vel_sigma(&self, sigma: [f32; 3]);
    fn set_num_sats(&self, count: u8);

    /// Signal downstream consumers that a fresh sample landed
    fn notify_updated(&self);

    /// Apply one decoded sample and notify
    fn publish(&self, sample: &NavigationSample) {
        self.set_position_status(sample.position_status);
        self.set_position_type(sample.position_type);
        self.set_llh_position(sample.llh_position);
        self.set_pos_sigma(sample.ned_position_sigma);
        self.set_velocity_status(sample.velocity_status);
        self.set_velocity_type(sample.velocity_type);
        self.set_ned_velocity(sample.ned_velocity);
        self.set_vel_sigma(sample.ned_velocity_sigma);
        self.set_num_sats(sample.satellites);
        self.notify_updated();
    }
}

/// Snapshot of the most recent navigation state
///
/// Every field is `None` until the first frame carrying it arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavState {
    pub gps_time: Option<GpsTime>,
    pub position_status: Option<SolutionStatus>,
    pub position_type: Option<SolutionType>,
    pub llh_position: Option<[f64; 3]>,
    pub pos_sigma: Option<[f32; 3]>,
    pub velocity_status: Option<SolutionStatus>,
    pub velocity_type: Option<SolutionType>,
    pub ned_velocity: Option<[f64; 3]>,
    pub vel_sigma: Option<[f32; 3]>,
    pub num_sats: Option<u8>,
}

/// In-process navigation state shared between the receive worker and its
/// consumers
///
/// Implements both [`NavigationSink`] and [`TimeAuthority`]. Consumers take
/// point-in-time snapshots or subscribe to the update counter.
pub struct SharedNavState {
    state: Mutex<NavState>,
    updates_tx: watch::Sender<u64>,
}

impl SharedNavState {
    pub fn new() -> Arc<Self> {
        let (updates_tx, _) = watch::channel(0);
        Arc::new(Self {
            state: Mutex::new(NavState::default()),
            updates_tx,
        })
    }

    /// Point-in-time copy of the navigation state
    pub fn snapshot(&self) -> NavState {
        self.state.lock().unwrap().clone()
    }

    /// Subscribe to the update counter; changes after every published sample
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates_tx.subscribe()
    }

    fn with_state<F: FnOnce(&mut NavState)>(&self, apply: F) {
        apply(&mut self.state.lock().unwrap());
    }
}

impl TimeAuthority for SharedNavState {
    fn set_gps_time(&self, time: GpsTime) {
        self.with_state(|s| s.gps_time = Some(time));
    }
}

impl NavigationSink for SharedNavState {
    fn set_position_status(&self, status: SolutionStatus) {
        self.with_state(|s| s.position_status = Some(status));
    }

    fn set_position_type(&self, solution: SolutionType) {
        self.with_state(|s| s.position_type = Some(solution));
    }

    fn set_llh_position(&self, llh: [f64; 3]) {
        self.with_state(|s| s.llh_position = Some(llh));
    }

    fn set_pos_sigma(&self, sigma: [f32; 3]) {
        self.with_state(|s| s.pos_sigma = Some(sigma));
    }

    fn set_velocity_status(&self, status: SolutionStatus) {
        self.with_state(|s| s.velocity_status = Some(status));
    }

    fn set_velocity_type(&self, solution: SolutionType) {
        self.with_state(|s| s.velocity_type = Some(solution));
    }

    fn set_ned_velocity(&self, velocity: [f64; 3]) {
        self.with_state(|s| s.ned_velocity = Some(velocity));
    }

    fn set_vel_sigma(&self, sigma: [f32; 3]) {
        self.with_state(|s| s.vel_sigma = Some(sigma));
    }

    fn set_num_sats(&self, count: u8) {
        self.with_state(|s| s.num_sats = Some(count));
    }

    fn notify_updated(&self) {
        self.updates_tx.send_modify(|count| *count += 1);
    }
}

/// Shared termination flag polled by the receive loop
///
/// Cancellation latency is bounded by the loop's per-read timeout, not by
/// frame length.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to exit at its next poll
    pub fn request_shutdown(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Polled once per loop iteration by the worker
    pub fn check_terminate(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
