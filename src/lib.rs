//! epidaily: mirrors the upstream daily epidemiological reports, normalizes
//! each day's CSV into a canonical country tree, maintains a rolling world
//! summary, and serves the latest results over HTTP while the next cycle
//! runs in the background.

pub mod config;
pub mod data;
pub mod git;
pub mod pipeline;
pub mod scheduler;
pub mod server;
