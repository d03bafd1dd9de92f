//! # Synchronization
//!
//! The sheet is driven in alternating phases:
//!
//! ```text
//! | mutate (one writer) | fan-out (many readers) | join | mutate | ...
//! ```
//!
//! Growth reallocates column buffers, so no slice may outlive the phase it
//! was taken in. Here that rule is carried by lock guards and borrows.

mod phase;

pub use phase::PhasedSheet;
