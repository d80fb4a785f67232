//! Application Layer - Cooperating pipeline services
//!
//! Wires the domain logic to the ports: aggregation of provider data,
//! concurrent risk checks, alert rules with cooldown, topic fan-out, source
//! scan loops, and the orchestrator that owns the tracked-token set.

pub mod aggregator;
pub mod alert_engine;
pub mod broadcast;
pub mod orchestrator;
pub mod risk_engine;
pub mod scanner;

pub use aggregator::MarketAggregator;
pub use alert_engine::{AlertEngine, AlertThresholds};
pub use broadcast::{BroadcastHub, Event, MovementDelta, SubscriberHandle, TokenUpdate, Topic};
pub use orchestrator::{
    GateConfig, GateOverrides, MonitorConfig, MonitorError, MonitorOrchestrator, MonitorStatus,
    TokenState,
};
pub use risk_engine::{RiskEngine, RiskEngineConfig};
pub use scanner::{extract_addresses, MentionEvent, ScannerService};
