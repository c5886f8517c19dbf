//! finchat front ends
//!
//! The binary wires config, logging and a model gateway into either a one-shot
//! CLI command or the HTTP service in [`http`].

pub mod http;
