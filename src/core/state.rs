//! Per-step rolling state windows and the simulation context.
//!
//! Every inspectable element keeps its recent history in a [`RollingWindow`]:
//! a fixed-length ring of per-step values, oldest first. One rotation per time
//! step ages every value by one slot; writes always land in the newest slot.
//! Frontends scrub backward through these windows to replay recent activity.

use crate::error::{Result, ScopeError};
use std::collections::VecDeque;

/// Steps of history retained when no encoding performs inference.
pub const MAX_STEPS: usize = 10;

/// Steps of history retained when at least one encoding performs inference,
/// so predictions can be compared against what actually happened.
pub const MAX_STEPS_WITH_INFERENCE: usize = 30;

/// Fixed-capacity history of one value, one slot per time step.
///
/// The window always holds exactly `capacity` slots. [`RollingWindow::rotate`]
/// drops the oldest slot and appends a default; [`RollingWindow::set_for_curr_step`]
/// overwrites the newest. Reads are addressed relative to the newest slot.
#[derive(Clone, Debug)]
pub struct RollingWindow<T> {
    slots: VecDeque<T>,
}

impl<T: Clone + Default> RollingWindow<T> {
    /// Creates a window of `capacity` default values. Capacities below two
    /// cannot represent a previous step and are rejected by the model, so
    /// callers pass the context's window length.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity >= 2, "rolling windows need at least two slots");
        let mut slots = VecDeque::with_capacity(capacity);
        slots.resize(capacity.max(2), T::default());
        RollingWindow { slots }
    }

    /// Ages the window by one step: the oldest value is dropped and a default
    /// value becomes the current step's slot.
    #[inline]
    pub fn rotate(&mut self) {
        self.slots.pop_front();
        self.slots.push_back(T::default());
    }

    /// Overwrites the current step's slot.
    #[inline]
    pub fn set_for_curr_step(&mut self, value: T) {
        if let Some(slot) = self.slots.back_mut() {
            *slot = value;
        }
    }

    /// Value at the current step.
    #[inline]
    pub fn at_curr_step(&self) -> &T {
        &self.slots[self.slots.len() - 1]
    }

    /// Value one step ago.
    #[inline]
    pub fn at_previous_step(&self) -> &T {
        &self.slots[self.slots.len() - 2]
    }

    /// Value `steps_ago` steps back; zero is the current step. Reads past the
    /// retained history fail instead of wrapping.
    #[inline]
    pub fn at_given_step_ago(&self, steps_ago: usize) -> Result<&T> {
        if steps_ago >= self.slots.len() {
            return Err(ScopeError::StepOutOfRange {
                step: steps_ago,
                window: self.slots.len(),
            });
        }
        Ok(&self.slots[self.slots.len() - 1 - steps_ago])
    }

    /// Value at the oldest retained step.
    #[inline]
    pub fn at_first_step(&self) -> &T {
        &self.slots[0]
    }

    /// Number of retained steps; fixed at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterates the retained values, oldest first.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

/// Run-wide state threaded through initialize, step, and statistics calls.
///
/// Created fresh by `Network::initialize`; dropping it tears the run down.
#[derive(Clone, Copy, Debug)]
pub struct SimulationContext {
    /// Completed time steps since initialization.
    pub time_step: u64,
    /// Window length every element in the run uses.
    pub window: usize,
}

impl SimulationContext {
    /// Starts a run at step zero with the given window length.
    pub fn new(window: usize) -> Self {
        SimulationContext {
            time_step: 0,
            window,
        }
    }
}
