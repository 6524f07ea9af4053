//! Parkwatch - telemetry ingestion, alerting and occupancy dashboard API for
//! parking-lot IoT devices
//!
//! This library exposes the core modules for testing and reuse.

pub mod common;
pub mod config;
pub mod entity;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod services;
pub mod store;
