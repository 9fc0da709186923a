//! Hardware Primitives
//!
//! The engine touches hardware through two narrow seams:
//!
//! - [`AdcReader`]: "read channel N → integer code", synchronous and
//!   bounded-time. Implementations return `nb::Error::WouldBlock` when a
//!   conversion is still pending; the engine never spins on it and counts it
//!   as a transient acquisition failure instead.
//! - [`EdgeInterrupts`]: "call this listener on every edge of pin P". The
//!   listener runs in interrupt context with interrupts masked, so it must
//!   not allocate, block or take a lock.
//!
//! [`EdgeTable`] is a ready-made [`EdgeInterrupts`] for platforms whose GPIO
//! driver hands out a single shared interrupt vector: register listeners
//! once at start-up, then call [`EdgeTable::dispatch`] from the vector.

use heapless::Vec;
use thiserror_no_std::Error;

/// Analog channel index, `0..channel_count`
pub type ChannelId = u8;

/// GPIO pin number
pub type GpioPin = u8;

/// Platform error from the converter driver
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("hardware error {code}")]
pub struct HardwareError {
    /// Platform-specific error code
    pub code: i32,
}

impl HardwareError {
    /// Wrap a platform error code
    pub const fn new(code: i32) -> Self {
        Self { code }
    }
}

/// One-shot analog read primitive
pub trait AdcReader {
    /// Convert `channel` once and return the raw code
    fn read_channel(&mut self, channel: ChannelId) -> nb::Result<u16, HardwareError>;
}

impl<A: AdcReader + ?Sized> AdcReader for &mut A {
    fn read_channel(&mut self, channel: ChannelId) -> nb::Result<u16, HardwareError> {
        (**self).read_channel(channel)
    }
}

/// Receives edges from an interrupt handler
///
/// `on_edge` runs in interrupt context: no allocation, no blocking, bounded
/// time.
pub trait EdgeListener: Sync {
    /// One edge was seen
    fn on_edge(&self);
}

/// Interrupt registration primitive
pub trait EdgeInterrupts {
    /// Registration failure
    type Error;

    /// Call `listener` on every edge of `pin`
    fn on_edge(&mut self, pin: GpioPin, listener: &'static dyn EdgeListener) -> Result<(), Self::Error>;
}

/// Registration failures for [`EdgeTable`]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeTableError {
    /// No free slot left
    #[error("edge table full")]
    Full,
    /// Pin already has a listener
    #[error("pin {0} already registered")]
    AlreadyRegistered(GpioPin),
}

/// Static pin → listener table
///
/// `N` is the number of pins that can be registered. Registration happens
/// during initialization through `&mut self`; dispatch only needs `&self`, so
/// a table can be placed behind a shared reference for the interrupt vector.
pub struct EdgeTable<const N: usize> {
    entries: Vec<(GpioPin, &'static dyn EdgeListener), N>,
}

impl<const N: usize> EdgeTable<N> {
    /// Empty table
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Forward one edge on `pin` to its listener
    ///
    /// Returns `false` for pins nobody registered. Linear scan over at most
    /// `N` entries, no allocation.
    pub fn dispatch(&self, pin: GpioPin) -> bool {
        match self.entries.iter().find(|(p, _)| *p == pin) {
            Some((_, listener)) => {
                listener.on_edge();
                true
            }
            None => false,
        }
    }

    /// Number of registered pins
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No pins registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> Default for EdgeTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EdgeInterrupts for EdgeTable<N> {
    type Error = EdgeTableError;

    fn on_edge(&mut self, pin: GpioPin, listener: &'static dyn EdgeListener) -> Result<(), Self::Error> {
        if self.entries.iter().any(|(p, _)| *p == pin) {
            return Err(EdgeTableError::AlreadyRegistered(pin));
        }
        self.entries
            .push((pin, listener))
            .map_err(|_| EdgeTableError::Full)
    }
}
