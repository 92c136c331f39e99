//! Satrate Common Types
//!
//! Shared types used across satrate: currency symbols, pivot-denominated
//! price samples, derived cross-rate samples and millisecond time helpers.

pub mod symbol;
pub mod sample;
pub mod error;
pub mod time;

pub use symbol::*;
pub use sample::*;
pub use error::*;
pub use time::*;
