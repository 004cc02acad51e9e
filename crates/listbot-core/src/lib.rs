//! Core domain + application logic for listbot.
//!
//! This crate is framework-agnostic. Telegram (or any other chat transport) and
//! the on-disk state live behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod compat;
pub mod config;
pub mod domain;
pub mod errors;
pub mod expand;
pub mod formatting;
pub mod invites;
pub mod logging;
pub mod persistence;
pub mod policy;
pub mod ports;
pub mod service;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
