//! Vigie client - real-time delivery pipeline for the business dashboard
//!
//! Three independent consumers keep an operator's dashboard current:
//! - a bidirectional session exposing the latest dashboard snapshot
//! - a read-only announcement stream feeding a bounded ticker
//! - a background push gateway rendering OS notifications
//!
//! Each consumer owns its transport and its exposed state; the presentation
//! layer only reads. The three paths are independent: events may arrive on
//! any subset of them, in any order, and no cross-transport causality is
//! guaranteed or reconstructed.

pub mod config;
pub mod feed;
pub mod gateway;
pub mod models;
pub mod session;
pub mod surface;
pub mod ticker;

pub use config::ClientConfig;
pub use models::{ConnectionState, DashboardSnapshot, SessionCredentials, UpdateAnnouncement};
