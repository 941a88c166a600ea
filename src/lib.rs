//! Plan Mentor - Retirement Planning Dialogue Engine
//!
//! This crate orchestrates a guided Spanish-language intake conversation
//! that helps users choose and confirm a retirement plan goal.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
