use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// After a freeze, before delegating the new stake.
    pub settle: Duration,
    /// Between wallets in a rotation.
    pub wallet_gap: Duration,
    /// Between transfers in a distribution or batch.
    pub transfer_gap: Duration,
    /// Between strategy steps.
    pub strategy_step: Duration,
    /// Minimum spacing between two submissions to the node.
    pub min_submit_interval: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(3),
            wallet_gap: Duration::from_secs(5),
            transfer_gap: Duration::from_secs(3),
            strategy_step: Duration::from_secs(5),
            min_submit_interval: Duration::from_millis(250),
        }
    }
}

impl PacingConfig {
    pub fn zero() -> Self {
        Self {
            settle: Duration::ZERO,
            wallet_gap: Duration::ZERO,
            transfer_gap: Duration::ZERO,
            strategy_step: Duration::ZERO,
            min_submit_interval: Duration::ZERO,
        }
    }
}

/// Owns every pause the manager takes and rate-limits submissions to the node.
#[derive(Debug)]
pub struct Pacer {
    cfg: PacingConfig,
    last_submit: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(cfg: PacingConfig) -> Self {
        Self {
            cfg,
            last_submit: Mutex::new(None),
        }
    }

    pub fn config(&self) -> PacingConfig {
        self.cfg
    }

    pub async fn settle(&self) {
        pause("settle", self.cfg.settle).await;
    }

    pub async fn wallet_gap(&self) {
        pause("wallet_gap", self.cfg.wallet_gap).await;
    }

    pub async fn transfer_gap(&self) {
        pause("transfer_gap", self.cfg.transfer_gap).await;
    }

    pub async fn strategy_step(&self) {
        pause("strategy_step", self.cfg.strategy_step).await;
    }

    /// Waits only for what remains of `min_submit_interval` since the previous submission.
    pub async fn before_submit(&self) {
        let wait = {
            let mut last = match self.last_submit.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = Instant::now();
            let wait = last
                .map(|t| self.cfg.min_submit_interval.saturating_sub(now.duration_since(t)))
                .unwrap_or(Duration::ZERO);
            *last = Some(now + wait);
            wait
        };
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit");
            tokio::time::sleep(wait).await;
        }
    }
}

async fn pause(name: &'static str, d: Duration) {
    if d.is_zero() {
        return;
    }
    tracing::info!(pause = name, secs = d.as_secs_f64(), "waiting");
    tokio::time::sleep(d).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn submit_interval_waits_only_for_the_remainder() {
        let pacer = Pacer::new(PacingConfig {
            min_submit_interval: Duration::from_millis(1000),
            ..PacingConfig::zero()
        });

        let t0 = Instant::now();
        pacer.before_submit().await;
        assert_eq!(t0.elapsed(), Duration::ZERO);

        tokio::time::advance(Duration::from_millis(300)).await;
        let t1 = Instant::now();
        pacer.before_submit().await;
        let waited = t1.elapsed();
        assert!(waited >= Duration::from_millis(700), "waited {waited:?}");
        assert!(waited < Duration::from_millis(800), "waited {waited:?}");

        tokio::time::advance(Duration::from_millis(2000)).await;
        let t2 = Instant::now();
        pacer.before_submit().await;
        assert_eq!(t2.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn named_pauses_use_configured_durations() {
        let pacer = Pacer::new(PacingConfig {
            settle: Duration::from_secs(3),
            wallet_gap: Duration::from_secs(5),
            ..PacingConfig::zero()
        });
        let t = Instant::now();
        pacer.settle().await;
        pacer.wallet_gap().await;
        pacer.transfer_gap().await;
        let waited = t.elapsed();
        assert!(waited >= Duration::from_secs(8), "waited {waited:?}");
        assert!(waited < Duration::from_millis(8100), "waited {waited:?}");
    }
}
