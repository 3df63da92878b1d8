#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub mod config;
pub mod error;
pub mod state;

pub use crate::config::*;
pub use crate::error::ConfigError;
pub use crate::state::MotorState;
