//! Integration tests exercising the governor through its public surface.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use risk_governor::{GovernorConfig, LogNotifier, RiskGovernor, TripNotifier};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "risk_governor=debug".into()),
        )
        .try_init();
}

struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl TripNotifier for ChannelNotifier {
    async fn notify_trip(&self, reason: &str) -> Result<()> {
        self.tx.send(reason.to_string()).ok();
        Ok(())
    }
}

/// Full trading-loop scenario: accumulate losses, trip at the threshold,
/// notify once, then recover automatically once the cooldown elapses.
#[tokio::test]
async fn trip_and_automatic_recovery() {
    init_tracing();

    let config = GovernorConfig {
        daily_loss_limit: Decimal::new(-2, 2), // -2%
        cooldown_seconds: 0,                   // immediate recovery for the test
        reference_balance: Decimal::new(1000, 0),
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let governor =
        RiskGovernor::with_notifier(config, Arc::new(ChannelNotifier { tx })).unwrap();

    assert!(governor.is_trading_allowed().await);
    assert!(governor.record_trade(Decimal::new(-15, 0), true).await);
    assert!(!governor.record_trade(Decimal::new(-10, 0), true).await);
    assert!(governor.is_tripped());

    let reason = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
        .await
        .expect("notification not dispatched")
        .unwrap();
    assert!(reason.contains("-2.50%"));

    // Zero cooldown: the next gate check clears the trip.
    assert!(governor.is_trading_allowed().await);
    assert!(!governor.is_tripped());

    // Counters survived the cooldown reset; only the trip was cleared.
    let status = governor.status().await;
    assert_eq!(status.daily_pnl, Decimal::new(-25, 0));
    assert_eq!(status.daily_trades, 2);
}

/// The status snapshot serializes with the documented field names and an
/// ISO-8601 UTC timestamp, for observability consumers.
#[tokio::test]
async fn status_snapshot_serializes() {
    let governor = RiskGovernor::new(GovernorConfig::default()).unwrap();
    governor.record_trade(Decimal::new(7, 0), false).await;

    let status = governor.status().await;
    let json = serde_json::to_value(&status).unwrap();

    assert_eq!(json["is_tripped"], serde_json::json!(false));
    assert_eq!(json["daily_trades"], serde_json::json!(1));
    assert_eq!(json["daily_wins"], serde_json::json!(1));
    assert_eq!(json["win_rate"], serde_json::json!(1.0));
    assert_eq!(json["remaining_cooldown_seconds"], serde_json::json!(0));

    let last_reset = json["last_reset"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(last_reset).is_ok());
}

/// Concurrent reporting paths must not corrupt the counters: the governor
/// serializes every mutation through one lock.
#[tokio::test]
async fn concurrent_recording_keeps_counters_consistent() {
    let config = GovernorConfig {
        daily_loss_limit: Decimal::new(-50, 2), // -50%, far from tripping
        ..Default::default()
    };
    let governor = Arc::new(RiskGovernor::new(config).unwrap());

    let mut handles = Vec::new();
    for worker in 0..8 {
        let governor = Arc::clone(&governor);
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                // Alternate wins and losses, interleaved with status reads.
                let pnl = if (worker + i) % 2 == 0 {
                    Decimal::new(1, 0)
                } else {
                    Decimal::new(-1, 0)
                };
                governor.record_trade(pnl, true).await;
                governor.status().await;
                governor.is_trading_allowed().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let status = governor.status().await;
    assert_eq!(status.daily_trades, 200);
    assert_eq!(status.daily_wins + status.daily_losses, 200);
    assert_eq!(status.daily_wins, 100);
    assert_eq!(status.daily_pnl, Decimal::ZERO);
    assert!(!status.is_tripped);
}

/// Manual override sequence: operator trips, diagnostics reflect it,
/// operator resets without waiting out the cooldown.
#[tokio::test]
async fn manual_override_cycle() {
    init_tracing();

    let governor =
        RiskGovernor::with_notifier(GovernorConfig::default(), Arc::new(LogNotifier)).unwrap();

    governor.manual_trip("exchange maintenance").await;
    assert!(!governor.is_trading_allowed().await);

    let status = governor.status().await;
    assert!(status.is_tripped);
    assert_eq!(status.trip_reason, Some("exchange maintenance".to_string()));
    assert!(status.remaining_cooldown_seconds > 0);

    governor.manual_reset().await;
    assert!(governor.is_trading_allowed().await);
    assert_eq!(governor.status().await.remaining_cooldown_seconds, 0);
}
