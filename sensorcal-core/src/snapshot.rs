//! Bounded-Wait Snapshot Slots
#![allow(unsafe_code)] // Guarded slot built on an atomic flag + UnsafeCell
//!
//! ## Overview
//!
//! Every published quantity (each analog channel, the pulse rate) has one
//! [`SnapshotSlot`] holding its latest value. The scheduler side writes it,
//! any number of consumer tasks read it, and neither side may block for an
//! unbounded time:
//!
//! ```text
//! Scheduler / pulse task               Consumer tasks
//!        │                                │      │
//!   publish(v, 10 ms) ──► [guard|value] ◄── get(budget)
//!        │                                │      │
//!   contended? drop + count          expired? Unavailable
//! ```
//!
//! ## Guard
//!
//! The guard is a single `AtomicBool` taken with compare-exchange. A holder
//! copies the value in or out and releases; there is no queueing and no
//! priority inheritance, which keeps the critical section a handful of
//! instructions. Waiters spin (yielding the thread on hosted targets) and
//! check a [`TimeSource`] against their budget.
//!
//! ## Guarantees
//!
//! - A reader observes either the previous or the current fully-written
//!   value, never a torn one.
//! - A zero budget means exactly one acquisition attempt.
//! - A waiter gives up when the budget has elapsed on the clock or after a
//!   fixed number of attempts per millisecond of budget, whichever comes
//!   first.
//! - The write side never waits longer than the publisher's write budget;
//!   on expiry the update is dropped and the slot's contention counter
//!   increments. The next tick retries naturally.
//!
//! ## Memory Ordering
//!
//! - **Acquire** on taking the guard: see the previous holder's write.
//! - **Release** on dropping the guard: publish our write before the next
//!   holder can take it.
//! - **Relaxed** for counters.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::time::Duration;

use crate::constants::time::GUARD_SPINS_PER_MS;
use crate::errors::{PublishError, SnapshotError};
use crate::hal::ChannelId;
use crate::time::{budget_ms, TimeSource};

/// Guarded single-value slot
pub struct SnapshotSlot<T> {
    locked: AtomicBool,
    value: UnsafeCell<Option<T>>,
    contention: AtomicU32,
}

// The guard serialises every access to `value`
unsafe impl<T: Send> Sync for SnapshotSlot<T> {}

/// Exclusive access to a slot; released on drop
pub struct SlotGuard<'a, T> {
    slot: &'a SnapshotSlot<T>,
}

impl<T: Copy> SnapshotSlot<T> {
    /// Empty slot
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(None),
            contention: AtomicU32::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Try once to take the guard
    pub fn try_lock(&self) -> Option<SlotGuard<'_, T>> {
        if self.try_acquire() {
            Some(SlotGuard { slot: self })
        } else {
            None
        }
    }

    /// Take the guard, waiting at most `budget` as measured by `clock`
    ///
    /// The wait also ends after [`GUARD_SPINS_PER_MS`] attempts per
    /// millisecond of budget, so a stalled clock cannot hold it forever.
    pub fn lock_within<C: TimeSource>(&self, budget: Duration, clock: &C) -> Option<SlotGuard<'_, T>> {
        if let Some(guard) = self.try_lock() {
            return Some(guard);
        }

        let budget = budget_ms(budget);
        if budget == 0 {
            return None;
        }

        let start = clock.now();
        for _ in 0..budget.saturating_mul(GUARD_SPINS_PER_MS) {
            relax();
            if let Some(guard) = self.try_lock() {
                return Some(guard);
            }
            if clock.now().saturating_sub(start) >= budget {
                return None;
            }
        }
        None
    }

    /// Overwrite the slot, waiting at most `budget`
    ///
    /// On timeout the value is dropped and the contention counter increments.
    pub fn publish<C: TimeSource>(&self, value: T, budget: Duration, clock: &C) -> Result<(), PublishError> {
        match self.lock_within(budget, clock) {
            Some(mut guard) => {
                guard.set(value);
                Ok(())
            }
            None => {
                self.contention.fetch_add(1, Ordering::Relaxed);
                Err(PublishError::Contention)
            }
        }
    }

    /// Copy the latest value out, waiting at most `budget`
    pub fn get<C: TimeSource>(&self, budget: Duration, clock: &C) -> Result<T, SnapshotError> {
        let guard = self.lock_within(budget, clock).ok_or(SnapshotError::Unavailable)?;
        guard.get().ok_or(SnapshotError::Empty)
    }

    /// Writes dropped because the guard was busy
    pub fn contention_count(&self) -> u32 {
        self.contention.load(Ordering::Relaxed)
    }
}

impl<T: Copy> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> SlotGuard<'_, T> {
    /// Current value
    pub fn get(&self) -> Option<T> {
        // SAFETY: holding the guard gives exclusive access to `value`
        unsafe { *self.slot.value.get() }
    }

    /// Replace the value
    pub fn set(&mut self, value: T) {
        // SAFETY: holding the guard gives exclusive access to `value`
        unsafe {
            *self.slot.value.get() = Some(value);
        }
    }
}

impl<T> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        self.slot.locked.store(false, Ordering::Release);
    }
}

#[inline]
fn relax() {
    #[cfg(feature = "std")]
    std::thread::yield_now();
    #[cfg(not(feature = "std"))]
    core::hint::spin_loop();
}

/// Published quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QuantityId {
    /// Calibrated value of an analog channel
    Channel(ChannelId),
    /// Rate derived from the pulse counter
    PulseRate,
}

/// All snapshot slots of one device
///
/// `N` analog channel slots plus one pulse-rate slot. Writes use the fixed
/// write budget given at construction; reads take a per-call budget.
pub struct SnapshotPublisher<C: TimeSource, const N: usize> {
    channels: [SnapshotSlot<f32>; N],
    pulse_rate: SnapshotSlot<f32>,
    clock: C,
    write_budget: Duration,
}

impl<C: TimeSource, const N: usize> SnapshotPublisher<C, N> {
    /// Publisher with empty slots
    pub fn new(clock: C, write_budget: Duration) -> Self {
        Self {
            channels: core::array::from_fn(|_| SnapshotSlot::new()),
            pulse_rate: SnapshotSlot::new(),
            clock,
            write_budget,
        }
    }

    fn slot(&self, id: QuantityId) -> Option<&SnapshotSlot<f32>> {
        match id {
            QuantityId::Channel(ch) => self.channels.get(usize::from(ch)),
            QuantityId::PulseRate => Some(&self.pulse_rate),
        }
    }

    /// Publish `value` for `id` within the write budget
    pub fn publish(&self, id: QuantityId, value: f32) -> Result<(), PublishError> {
        let slot = self.slot(id).ok_or(PublishError::UnknownQuantity)?;
        slot.publish(value, self.write_budget, &self.clock)
    }

    /// Latest value of `id`, waiting at most `budget`
    pub fn get_value(&self, id: QuantityId, budget: Duration) -> Result<f32, SnapshotError> {
        let slot = self.slot(id).ok_or(SnapshotError::UnknownQuantity)?;
        slot.get(budget, &self.clock)
    }

    /// Direct slot access (e.g. to hold a guard across several reads)
    pub fn slot_for(&self, id: QuantityId) -> Option<&SnapshotSlot<f32>> {
        self.slot(id)
    }

    /// Dropped writes for `id`
    pub fn contention_count(&self, id: QuantityId) -> u32 {
        self.slot(id).map_or(0, SnapshotSlot::contention_count)
    }

    /// Clock used for all wait budgets
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Write-side budget
    pub fn write_budget(&self) -> Duration {
        self.write_budget
    }
}
