//! Cross-module integration tests for promptshare_core
//!
//! Each module drives the public command surface against a fully wired
//! [`promptshare_core::App`].

#[cfg(test)]
mod commands;
#[cfg(test)]
mod persistence;
