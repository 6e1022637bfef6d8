//! Persona Spark
//!
//! Marketing persona generation service. Survey data, customer reviews and
//! a positioning statement go in; validated persona cards and campaign
//! ideas come out of a hosted text-generation model, are kept in an
//! in-memory store, and can be refined live over a WebSocket channel.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod persona;

pub use error::{Error, ErrorCode, Result};
