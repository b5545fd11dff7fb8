//! HVAC energy advisor
//!
//! Predicts next-hour building energy use with a set of pre-fitted regressors
//! and recommends an HVAC action from the lowest prediction.

pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod ml;
pub mod telemetry;
