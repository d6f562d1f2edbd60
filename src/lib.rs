//! # pair-finder
//!
//! Two-character key lookup over a remote tab-delimited sheet, usable offline.
//!
//! ## Architecture
//!
//! - **index**: Category, entry and index types
//! - **parse**: Tab-delimited text to index, with per-reason discard counts
//! - **cache**: Single-slot LMDB snapshot of both category indices
//! - **fetch**: Remote retrieval of both sheets, joined all-or-nothing
//! - **session**: Startup/refresh protocol with cache fallback, plus lookup state
//! - **lookup**: First-entry-wins key resolution
//! - **status**: Status labels shown after each action

pub mod cache;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod index;
pub mod lookup;
pub mod parse;
pub mod session;
pub mod status;
