//! # Drive Module
//!
//! Turns RC channel values into motor commands.
//!
//! This module handles:
//! - Mapping raw CRSF channel values to the -100..100 range
//! - Deadzone and per-axis inversion
//! - Proportional differential mixing for a two-motor robot
//! - The actuator interface the commands are sent through
//! - An H-bridge driver for Raspberry Pi GPIO

pub mod hbridge;
pub mod mapper;
pub mod mixer;
pub mod motor;
