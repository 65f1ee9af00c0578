//! salecaster: announce a collection's marketplace sales on a blog
//!
//! Polls the marketplace sale feed, skips transactions that were already
//! announced, and publishes one post per cycle.

pub mod blog;
pub mod config;
pub mod marketplace;
pub mod pipeline;
pub mod sqlite_pragma;
pub mod startup;
