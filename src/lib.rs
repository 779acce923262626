//! Zabbix Connectivity Monitoring
//!
//! Finds the telemetry items that tell whether a monitored host is
//! reachable, pulls their recent history from Zabbix and scores each host
//! as healthy, warning or critical.
//!
//! # Features
//!
//! - Two detection strategies: template rules from a YAML catalog, or
//!   item tags discovered at runtime
//! - Weighted freshness scoring with master item checks
//! - Success-rate scoring over recent samples
//! - Zabbix JSON-RPC client with retries and batching
//! - Snapshot collection and offline replay
//!
//! # Quick Start
//!
//! ```bash
//! ZABBIX_URL=https://zabbix.example.com ZABBIX_API_TOKEN=xxx \
//!     ./zabbix-monitoring tag-connectivity
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  JSON-RPC  ┌───────────┐   ┌────────────┐   ┌─────────┐
//! │ Zabbix API   │───────────▶│ Pipeline  │──▶│ Classifier │──▶│ Scorers │
//! │ or snapshot  │            │           │   └────────────┘   └────┬────┘
//! └──────────────┘            └───────────┘                       │
//!                                                                 ▼
//!                                                          reports/*.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod snapshot;
pub mod traits;
pub mod zabbix;
