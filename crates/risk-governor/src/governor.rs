//! Circuit breaker for daily-loss trading halts.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::GovernorConfig;
use crate::notify::TripNotifier;
use crate::Result;

/// Internal mutable state. Never handed out; callers get a [`GovernorStatus`]
/// snapshot by value.
#[derive(Debug, Clone)]
struct GovernorState {
    tripped: bool,
    trip_time: Option<DateTime<Utc>>,
    trip_reason: Option<String>,
    daily_pnl: Decimal,
    daily_trades: u32,
    daily_wins: u32,
    daily_losses: u32,
    last_reset: DateTime<Utc>,
}

impl GovernorState {
    fn new() -> Self {
        Self {
            tripped: false,
            trip_time: None,
            trip_reason: None,
            daily_pnl: Decimal::ZERO,
            daily_trades: 0,
            daily_wins: 0,
            daily_losses: 0,
            last_reset: Utc::now(),
        }
    }

    fn clear_trip(&mut self) {
        self.tripped = false;
        self.trip_time = None;
        self.trip_reason = None;
    }
}

/// Read-only projection of the governor for callers and observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorStatus {
    pub is_tripped: bool,
    pub trip_reason: Option<String>,
    pub daily_pnl: Decimal,
    /// Daily PnL as a fraction of the reference balance.
    pub daily_pnl_pct: Decimal,
    pub daily_trades: u32,
    pub daily_wins: u32,
    pub daily_losses: u32,
    pub win_rate: f64,
    pub loss_limit: Decimal,
    /// Seconds until the cooldown expires; 0 when not tripped or elapsed.
    pub remaining_cooldown_seconds: i64,
    pub last_reset: DateTime<Utc>,
}

/// Circuit breaker that halts trading once daily losses breach the
/// configured fraction of the reference balance.
///
/// The whole state sits behind a single lock so the rollover-then-trip
/// sequence is atomic with respect to concurrent callers. Construct one
/// instance at startup and hand an `Arc<RiskGovernor>` to every consumer.
pub struct RiskGovernor {
    config: GovernorConfig,
    state: RwLock<GovernorState>,
    /// Fast path flag for checking if tripped.
    is_tripped: AtomicBool,
    notifier: Option<Arc<dyn TripNotifier>>,
}

impl RiskGovernor {
    /// Create a governor with no trip notifier.
    pub fn new(config: GovernorConfig) -> Result<Self> {
        config.validate()?;

        info!(
            daily_loss_limit = %config.daily_loss_limit,
            cooldown_seconds = config.cooldown_seconds,
            reference_balance = %config.reference_balance,
            "Risk governor initialized"
        );

        Ok(Self {
            config,
            state: RwLock::new(GovernorState::new()),
            is_tripped: AtomicBool::new(false),
            notifier: None,
        })
    }

    /// Create a governor that dispatches trip notifications to `notifier`.
    pub fn with_notifier(config: GovernorConfig, notifier: Arc<dyn TripNotifier>) -> Result<Self> {
        let mut governor = Self::new(config)?;
        governor.notifier = Some(notifier);
        Ok(governor)
    }

    /// Check if trading is currently halted (lock-free fast path; may lag the
    /// locked state by one call).
    pub fn is_tripped(&self) -> bool {
        self.is_tripped.load(Ordering::SeqCst)
    }

    /// Check if trading is currently allowed.
    ///
    /// Performs the lazy daily rollover, then the cooldown check: a trip
    /// whose cooldown has elapsed is cleared here and trading resumes.
    pub async fn is_trading_allowed(&self) -> bool {
        let mut state = self.state.write().await;
        self.rollover_if_due(&mut state);

        if state.tripped {
            if let Some(trip_time) = state.trip_time {
                let elapsed = Utc::now() - trip_time;
                if elapsed >= Duration::seconds(self.config.cooldown_seconds) {
                    info!("Circuit breaker cooldown complete, trading resumed");
                    state.clear_trip();
                    self.is_tripped.store(false, Ordering::SeqCst);
                    return true;
                }
            }
            return false;
        }

        true
    }

    /// Record the outcome of a completed trade.
    ///
    /// Returns `false` only when this trade newly trips the breaker. An
    /// already-tripped governor keeps returning `true` so the notification
    /// hook fires once per trip, not once per trade.
    pub async fn record_trade(&self, pnl: Decimal, is_virtual: bool) -> bool {
        let mut state = self.state.write().await;
        self.rollover_if_due(&mut state);

        state.daily_pnl += pnl;
        state.daily_trades += 1;
        if pnl > Decimal::ZERO {
            state.daily_wins += 1;
        } else {
            // Break-even trades count toward the loss column.
            state.daily_losses += 1;
        }

        let loss_pct = loss_fraction(state.daily_pnl, self.config.reference_balance);

        debug!(
            pnl = %pnl,
            daily_pnl = %state.daily_pnl,
            loss_pct = %loss_pct,
            is_virtual = is_virtual,
            "Trade recorded"
        );

        if loss_pct < self.config.daily_loss_limit && !state.tripped {
            let reason = format!(
                "Daily loss limit exceeded: {:.2}%",
                loss_pct * Decimal::ONE_HUNDRED
            );
            self.trip_locked(&mut state, reason);
            return false;
        }

        true
    }

    /// Force a trip regardless of the loss threshold.
    ///
    /// Re-tripping refreshes the timestamp and reason, and the hook fires on
    /// every call — this is an operator override, not a threshold crossing.
    pub async fn manual_trip(&self, reason: impl Into<String>) {
        let mut state = self.state.write().await;
        let reason = reason.into();
        warn!(reason = %reason, "Manual circuit breaker trip");
        self.trip_locked(&mut state, reason);
    }

    /// Clear tripped state regardless of elapsed cooldown.
    ///
    /// Daily counters are untouched and no notification is sent.
    pub async fn manual_reset(&self) {
        let mut state = self.state.write().await;
        state.clear_trip();
        self.is_tripped.store(false, Ordering::SeqCst);
        info!("Circuit breaker manually reset");
    }

    /// Current status snapshot.
    ///
    /// Observation only: no rollover and no cooldown-expiry transition
    /// happens here, so diagnostics never mutate trading state.
    pub async fn status(&self) -> GovernorStatus {
        let state = self.state.read().await;

        let remaining_cooldown_seconds = match (state.tripped, state.trip_time) {
            (true, Some(trip_time)) => {
                let elapsed = (Utc::now() - trip_time).num_seconds();
                (self.config.cooldown_seconds - elapsed).max(0)
            }
            _ => 0,
        };

        GovernorStatus {
            is_tripped: state.tripped,
            trip_reason: state.trip_reason.clone(),
            daily_pnl: state.daily_pnl,
            daily_pnl_pct: loss_fraction(state.daily_pnl, self.config.reference_balance),
            daily_trades: state.daily_trades,
            daily_wins: state.daily_wins,
            daily_losses: state.daily_losses,
            win_rate: f64::from(state.daily_wins) / f64::from(state.daily_trades.max(1)),
            loss_limit: self.config.daily_loss_limit,
            remaining_cooldown_seconds,
            last_reset: state.last_reset,
        }
    }

    // Private methods

    /// Shared rollover check, invoked at the top of both mutating entry
    /// points so the trip-clearing policy cannot drift between call sites.
    fn rollover_if_due(&self, state: &mut GovernorState) {
        let now = Utc::now();
        if now.date_naive() <= state.last_reset.date_naive() {
            return;
        }

        let previous_pnl = state.daily_pnl;
        state.daily_pnl = Decimal::ZERO;
        state.daily_trades = 0;
        state.daily_wins = 0;
        state.daily_losses = 0;
        state.last_reset = now;

        // A new trading day always starts ungated, even mid-cooldown.
        if state.tripped {
            state.clear_trip();
            self.is_tripped.store(false, Ordering::SeqCst);
            info!("Circuit breaker cleared by daily rollover");
        }

        info!(previous_pnl = %previous_pnl, "Daily counters reset");
    }

    fn trip_locked(&self, state: &mut GovernorState, reason: String) {
        let now = Utc::now();
        state.tripped = true;
        state.trip_time = Some(now);
        state.trip_reason = Some(reason.clone());
        self.is_tripped.store(true, Ordering::SeqCst);

        error!(
            reason = %reason,
            daily_pnl = %state.daily_pnl,
            daily_trades = state.daily_trades,
            cooldown_seconds = self.config.cooldown_seconds,
            "Circuit breaker TRIPPED - trading halted"
        );

        if let Some(notifier) = &self.notifier {
            let notifier = Arc::clone(notifier);
            tokio::spawn(async move {
                if let Err(e) = notifier.notify_trip(&reason).await {
                    warn!(error = %e, "Trip notification failed");
                }
            });
        }
    }
}

/// Daily PnL normalized against the reference balance. A non-positive
/// balance yields zero instead of a division fault so a config glitch can
/// never block trade recording.
fn loss_fraction(daily_pnl: Decimal, reference_balance: Decimal) -> Decimal {
    if reference_balance > Decimal::ZERO {
        daily_pnl / reference_balance
    } else {
        Decimal::ZERO
    }
}
