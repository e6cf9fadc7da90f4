//! ZapCast Storage - Database abstraction
//!
//! This crate provides the persistence layer for ZapCast: campaigns,
//! contact lists, and the outbound message ledger, backed by PostgreSQL.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use models::*;
pub use repository::*;
