//! Risk Governor
//!
//! Daily-loss circuit breaker for automated trading. The governor tracks
//! cumulative profit/loss per UTC day and halts trading once losses breach
//! the configured threshold, resuming after a cooldown or at the midnight
//! UTC rollover — whichever comes first.
//!
//! A trading loop checks [`RiskGovernor::is_trading_allowed`] before every
//! trade and reports each completed trade through
//! [`RiskGovernor::record_trade`]. Trip notifications go out through the
//! [`TripNotifier`] seam on a detached task; delivery integrations live with
//! whoever implements the trait.

pub mod config;
pub mod error;
pub mod governor;
pub mod notify;

pub use config::GovernorConfig;
pub use error::{Error, Result};
pub use governor::{GovernorStatus, RiskGovernor};
pub use notify::{LogNotifier, TripNotifier};
