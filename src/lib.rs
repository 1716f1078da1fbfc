//! # ELRS Rover Library
//!
//! Drive a two-motor differential robot from an ExpressLRS receiver.
//!
//! The receiver's CRSF stream is decoded into 16 RC channels, throttle and
//! steering are mapped and mixed into per-wheel commands, and a link
//! failsafe stops the motors whenever valid frames stop arriving.

pub mod config;
pub mod control;
pub mod crsf;
pub mod drive;
pub mod error;
pub mod logging;
pub mod serial;
