//! Chathub is a command-line client for a chat backend that fronts multiple
//! AI model providers.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session store, the authenticated request gateway with
//!   its single-flight token refresh, streaming chat, and configuration.
//! - [`api`] defines the wire payloads and the use-case operations (auth,
//!   conversations, models, chat, images) that call through the gateway.
//! - [`cli`] parses arguments and dispatches commands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
