//! Host-side driver core for CEVA-family motion sensor hubs.
//!
//! The hard part of this crate is [`shtp`]: a multiplexed,
//! sequence-checked, fragmenting transport that runs over a byte-oriented
//! [`hal::Hal`] whose transfer size is smaller than the logical messages it
//! carries. [`sh2`] is a thin session facade built on top of it, and
//! [`euler`] is a stateless quaternion-to-Euler helper used by callers that
//! consume the fused rotation vector reports `sh2` delivers.
//!
//! Physical bus timing, bootloader/DFU, concrete sensor report decoding,
//! power management, multi-threaded access, dynamic memory allocation, and
//! retransmission are all out of scope — see each module's docs for the
//! specifics it does and does not take on.

#![warn(rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

pub mod error;
pub mod euler;
pub mod hal;
pub mod sh2;
pub mod shtp;

pub use crate::error::{Error, Result};
pub use crate::hal::{Hal, HalLimits};
