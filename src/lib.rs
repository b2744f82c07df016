//! tradedeck: operator client core for the trading engine
//!
//! Keeps per-domain snapshots fresh without duplicate requests, gates
//! irreversible commands behind an asynchronous confirmation and routes
//! global keyboard chords to contextual actions.

pub mod actions;
pub mod api;
pub mod app;
pub mod config;
pub mod confirm;
pub mod errors;
pub mod keyboard;
pub mod logger;
pub mod notifications;
pub mod polling;
pub mod session;
pub mod storage;
pub mod store;
pub mod terminal;
pub mod visibility;
