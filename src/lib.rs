//! Indexing status aggregation for subgraph-backed data sources.
//!
//! For every enabled source the pipeline reports how far the subgraph has
//! indexed relative to chain heads, which indexers serve its deployment and
//! which contracts its manifest tracks. Results stream as events so a
//! dashboard can show progress while slow upstreams answer.

pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
