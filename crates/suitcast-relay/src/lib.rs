//! File-based relay around the prediction engine: reads feed events,
//! writes announcements to an outbox and checkpoints engine state.

pub mod config;
pub mod feed;
pub mod logging;
pub mod outbox;
pub mod runner;
pub mod store;
