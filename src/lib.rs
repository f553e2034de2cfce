//! S3 inventory reports and the Athena queries run over them.
//!
//! [`inventory`] registers a daily inventory report on a bucket, [`query`]
//! runs a SQL statement on Athena to completion and pages through its rows,
//! and [`pricing`] with [`sql`] turn the AWS price list into a storage cost
//! report over an inventory table.

pub mod common;
pub mod config;
pub mod inventory;
pub mod pricing;
pub mod query;
pub mod sql;

pub use common::errors::{Error, ExecutionError, Result};
