//! Core types and the report workflow engine for Civica.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::WorkflowStore`]; transport layers drive
//! [`workflow::ReportWorkflowService`].

// We intentionally use native `async fn` in trait impls; the trait itself
// spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod assignment;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod machine;
pub mod memory;
pub mod message;
pub mod messaging;
pub mod notification;
pub mod policy;
pub mod report;
pub mod store;
pub mod workflow;

pub use error::{Error, ErrorKind, Result};
