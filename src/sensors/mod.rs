//! Environmental sensors.

pub mod dht;
