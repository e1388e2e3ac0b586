// src/lib.rs

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod notify;
pub mod policy;
pub mod proposal;
pub mod server;
pub mod state;
pub mod turn;
pub mod workspace;
