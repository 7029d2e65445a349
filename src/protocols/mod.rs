//! Sub-protocol operation engines.
//!
//! Each engine is a capability handle borrowing the shared [`BusPirate`]
//! connection: the intake queue, the write path and the mode field are all
//! reached through that one `&mut` borrow, so an engine call and any other
//! operation can never overlap on the wire.
//!
//! [`BusPirate`]: crate::device::BusPirate

pub mod i2c;
pub mod uart;
