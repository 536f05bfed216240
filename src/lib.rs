//! Automated coop door controller core.
//!
//! Drives a DC-motor door gated by wall-clock or sunrise/sunset
//! conditions, reads DHT-family humidity/temperature sensors over their
//! single-wire pulse protocol, and switches a cooling fan on a
//! temperature threshold.  All hardware access goes through the
//! [`ports::GpioPort`] trait behind a single mutual-exclusion domain,
//! so the whole crate runs against mock adapters in tests.
//!
//! Web routing, configuration loading, and notification delivery live
//! outside this crate; [`service::CoopService`] is the boundary they
//! talk to.

#![deny(unused_must_use)]

pub mod config;
pub mod coop;
pub mod drivers;
pub mod error;
pub mod ports;
pub mod sensors;
pub mod service;

pub use error::{Error, Result};
