//! Core library for the pawflow service: adoption application review,
//! interview scheduling, and notification dispatch, composed explicitly by
//! the api binary in `services/api`.

pub mod api;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
