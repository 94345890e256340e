//! Core types and traits for docent
//!
//! This crate provides the foundational types, traits, and utilities
//! used by all other docent components.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
