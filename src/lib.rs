//! controlpipe: the library
//!
//! This is the library behind the `controlpipe` CLI tool. It runs a server
//! process, creates (or reuses) a named pipe next to it, and relays every
//! line written into that pipe to the server's stdin. On SIGINT, SIGTERM or
//! SIGHUP it sends the server a `stop` line, closes its stdin and waits for
//! it to exit.
//!
//! The pieces are usable on their own: [`pipe::acquire`] for the control
//! pipe, [`listener`] for turning it into command events, [`process::spawn`]
//! for the server, and [`run::EventLoop`] for the state machine tying them
//! together. [`run()`] wires all of them up from a [`config::Config`].

#![deny(
    clippy::pedantic,
    clippy::nursery,
    deprecated,
    rustdoc::broken_intra_doc_links,
    clippy::unwrap_used,
    clippy::expect_used,
)]
#![deny(unsafe_code, clippy::missing_const_for_fn)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

#[cfg(not(unix))]
compile_error!("controlpipe relies on Unix named pipes and signals");

#[macro_use]
extern crate clap;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate log;

pub mod cli;
pub mod config;
pub mod error;
pub mod listener;
pub mod pipe;
pub mod process;
pub mod run;
pub mod signal;

pub use run::run;
