// src/lib.rs

//! Gallery Pulse Library
//!
//! Harvests forum gallery posts and turns them into a daily word-frequency
//! table that can be queried by date range or single day.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
