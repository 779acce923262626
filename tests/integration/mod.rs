//! Integration tests for the connectivity pipeline.

mod client_collect;
mod common;
mod snapshot_replay;
mod tag_scenarios;
mod template_scenarios;
