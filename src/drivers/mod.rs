//! Hardware drivers: the door motor and the cooling fan.
//!
//! Drivers are dumb actuators.  Policy (when to move, when to cool)
//! lives in the coop aggregate and the service layer.

pub mod fan;
pub mod motor;
