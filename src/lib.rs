// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod cli;
pub mod config;
pub mod core;

pub mod acquire;
pub mod cache;
pub mod errors;
pub mod helper;
pub mod portal;
pub mod session;
pub mod store;
pub mod token;
pub mod types;
