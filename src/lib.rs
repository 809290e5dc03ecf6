//! pgql-engine - An in-memory property graph pattern query engine
//!
//! This crate loads a read-only property graph and answers
//! `SELECT / MATCH / GROUP BY / ORDER BY` queries over vertex-edge patterns,
//! with interchangeable single-threaded, parallel and streamed strategies for
//! matching, grouping and sorting.

pub mod config;
pub mod core;
pub mod expression;
pub mod query;
pub mod storage;
pub mod utils;
