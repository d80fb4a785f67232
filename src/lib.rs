//! Alpha Hunter - Token Discovery & Scoring Pipeline Library
//!
//! Continuously discovers tokens mentioned across heterogeneous sources,
//! enriches them with provider market data, scores risk and momentum, and
//! fans alerts out to subscribers.
//!
//! # Modules
//!
//! - `domain`: Core business logic (snapshots, risk, trend, scoring, alerts)
//! - `ports`: Trait abstractions (providers, persistence, discovery)
//! - `adapters`: External implementations (fetch client, provider and
//!   source adapters, JSONL store, CLI)
//! - `application`: Cooperating services (aggregator, risk engine, alert
//!   engine, broadcast hub, scanner, orchestrator)
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
