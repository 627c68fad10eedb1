//! # Controller
//!
//! Core controller modules.
//!
//! - `fetcher`: retrieval of index documents over HTTP
//! - `indexes`: repository index discovery from labeled config maps
//! - `model`: deterministic resource names and rendered configuration
//! - `reconciler`: desired-state assembly and compare-and-update apply
//! - `routes`: best-effort external hostname resolution
//! - `selectors`: monitor/rule/probe selector construction

pub mod fetcher;
pub mod indexes;
pub mod model;
pub mod reconciler;
pub mod routes;
pub mod selectors;
