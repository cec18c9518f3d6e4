//! # Domain Models
//!
//! Pure domain types shared by every crate of the service: configuration sections,
//! the classification/condition/audit models and the permission flags.
//! Keep it lean: no I/O, networking, or heavy logic, just data and simple helpers.

pub mod config;
pub mod constants;
pub mod models;
pub mod permissions;
pub mod registry;
