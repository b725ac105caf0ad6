//! # sockrpc CLI
//!
//! Command-line front end for calling sockrpc service modules.
//!
//! ## Key Commands
//!
//! - `sockrpc call`: call a method on a configured module and print the raw
//!   JSON result (for scripting)
//! - `sockrpc check-config`: validate every module in a config file
//!
//! The binary in `main.rs` only parses arguments and sets up logging; the
//! command bodies live in [`commands`] so they can be tested in-process.

pub mod commands;
