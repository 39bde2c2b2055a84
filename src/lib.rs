//! Repolens is a terminal client for the Repolens repository-analysis
//! service: submit a repository URL, then chat with an AI about the
//! analysed result.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the authenticated HTTP client with its single-flight
//!   token-refresh coordination, the chat session reducer, and
//!   configuration.
//! - [`api`] defines the wire payloads and the tagged classification of
//!   untagged repository-info responses.
//! - [`auth`] holds the credential store (keyring-backed) and the
//!   login/register/logout flows.
//! - [`cli`] parses arguments and runs the interactive chat shell.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and
//! route through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod utils;
