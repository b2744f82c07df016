//! Engine API collaborator: transport, paths and wire types

mod client;
pub mod endpoints;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{extract_server_message, get_as, login, EngineApi, HttpClient, HttpEngineApi};
