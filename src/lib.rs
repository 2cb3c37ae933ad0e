//! License Hub - license key provisioning and activation for multiple brands.
//!
//! Brands provision license keys for their customers; end-user software activates
//! those keys against instance identifiers; brands manage each license through
//! suspend/resume/cancel/renew.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod keys;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod service;
