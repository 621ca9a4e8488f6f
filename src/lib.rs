//! Scripts for deploying, wiring, and upgrading the token contract suite.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod chain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod errors;
pub mod orchestrator;
pub mod plan;
pub mod proxy;
mod solidity;
#[cfg(test)]
pub(crate) mod testing;
pub mod verify;
