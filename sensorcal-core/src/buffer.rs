//! Fixed-Size Sample Ring for Raw Converter Codes
//!
//! ## Overview
//!
//! The moving-average filter needs the last `K` raw codes of a channel. This
//! ring stores exactly that, with the capacity fixed at compile time through
//! const generics so a channel's filter state is a plain array that lives
//! inside the channel and never touches the heap.
//!
//! ## Zero-Filled Start
//!
//! Unlike a history buffer, the ring is *not* empty at start-up: all `K`
//! slots hold code 0 and always take part in the sum. The first `K` averages
//! after boot are therefore biased low:
//!
//! ```text
//! K = 5, input 2048 every tick
//!
//! tick  slots                          sum    mean
//!   1   [2048,    0,    0,    0,    0]  2048   409
//!   2   [2048, 2048,    0,    0,    0]  4096   819
//!   5   [2048, 2048, 2048, 2048, 2048] 10240  2048
//! ```
//!
//! That transient is accepted; it settles after one window.
//!
//! ## Memory Layout
//!
//! ```text
//! SampleRing<5>:
//! ┌──────┬──────┬──────┬──────┬──────┐
//! │ u16  │ u16  │ u16  │ u16  │ u16  │  slots
//! └──────┴──────┴──────┴──────┴──────┘
//!    ↑
//!    └── write_pos (next slot overwritten)
//!
//! sum: u32 running total, kept in step with the slots
//! ```
//!
//! `K × 65535` must fit in `u32`, which holds for any `K` below 65537.
//!
//! ## Usage Example
//!
//! ```rust
//! use sensorcal_core::buffer::SampleRing;
//!
//! let mut ring: SampleRing<3> = SampleRing::new();
//! ring.push(30);
//! ring.push(60);
//! assert_eq!(ring.sum(), 90);
//! assert_eq!(ring.slots(), &[30, 60, 0]);
//! ```

/// Zero-filled ring of the last `K` raw codes
///
/// ## Internal Invariants
///
/// - `write_pos < K`
/// - `sum == slots.iter().sum()`
///
/// ## Thread Safety
///
/// Owned by exactly one channel and mutated only by the scheduler that owns
/// that channel; no interior synchronisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRing<const K: usize> {
    slots: [u16; K],
    write_pos: usize,
    sum: u32,
}

impl<const K: usize> SampleRing<K> {
    const NON_EMPTY: () = assert!(K > 0, "SampleRing needs at least one slot");
    const SUM_FITS: () = assert!(K <= 65_537, "sum of K codes must fit in u32");

    /// Creates a zero-filled ring
    ///
    /// Usable in static contexts:
    /// ```rust
    /// use sensorcal_core::buffer::SampleRing;
    /// static RING: SampleRing<8> = SampleRing::new();
    /// ```
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = (Self::NON_EMPTY, Self::SUM_FITS);
        Self {
            slots: [0; K],
            write_pos: 0,
            sum: 0,
        }
    }

    /// Overwrites the oldest slot with `code`
    ///
    /// Keeps the running sum in step so reading it stays O(1).
    pub fn push(&mut self, code: u16) {
        let evicted = self.slots[self.write_pos];
        self.slots[self.write_pos] = code;
        self.sum = self.sum - u32::from(evicted) + u32::from(code);
        self.write_pos = (self.write_pos + 1) % K;
    }

    /// Sum of all `K` slots
    pub fn sum(&self) -> u32 {
        self.sum
    }

    /// Raw slot contents in storage order
    pub fn slots(&self) -> &[u16; K] {
        &self.slots
    }

    /// Index of the slot the next push overwrites
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Ring capacity
    pub const fn capacity(&self) -> usize {
        K
    }

    /// Reset every slot to zero
    pub fn clear(&mut self) {
        self.slots = [0; K];
        self.write_pos = 0;
        self.sum = 0;
    }
}

impl<const K: usize> Default for SampleRing<K> {
    fn default() -> Self {
        Self::new()
    }
}
