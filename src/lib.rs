//! Library exports for the referral-link dashboard
//!
//! This module exposes internal components for testing and potential library usage.

pub mod backend;
pub mod database;
pub mod error;
pub mod identity;
pub mod local;
pub mod model;
pub mod remote;
pub mod service;
pub mod session;
pub mod ui;
