#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod catalog;
pub mod chat_ws;
pub mod config;
pub mod error;
pub mod models;
pub mod ndjson;
pub mod probe;
pub mod server;
pub mod session;
pub mod upstream;

pub use server::{AppState, router, serve};
