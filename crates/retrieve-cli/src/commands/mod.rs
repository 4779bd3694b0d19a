//! Command handlers

pub mod block;
pub mod config;
pub mod migrate;
pub mod serve;
