//! Persistence layer for the Zone Watch backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - The Postgres-backed zone repository

pub mod db;
pub mod entities;
pub mod repositories;
