use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use contracts::domain::a001_marketplace_connection::ConnectionState;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use contracts::usecases::u601_sync_marketplace::SyncMode;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::a001_marketplace_connection;
use crate::shared::config::get_config;
use crate::shared::error::OrchestratorError;
use crate::usecases::u601_sync_marketplace::SYNC_EXECUTOR;

/// Счётчик подряд неудачных фоновых запусков одной пары
#[derive(Debug, Clone, Copy)]
struct RetryState {
    failures: u32,
    next_attempt_at: DateTime<Utc>,
}

/// Периодический воркер фоновой синхронизации.
///
/// Каждый тик перезапускает синхронизацию активных подключений.
/// Неудачи отодвигаются экспоненциальной выдержкой; после max_attempts
/// подряд пара замораживается, пока успешный запуск (в том числе
/// ручной) не вернёт подключение в Connected.
pub struct SyncScheduler {
    retries: Mutex<HashMap<(Uuid, MarketplaceKind), RetryState>>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self {
            retries: Mutex::new(HashMap::new()),
        }
    }

    /// Запускает цикл фоновой синхронизации.
    pub async fn run_loop(&self) {
        let interval_seconds = get_config().sync.interval_seconds;
        info!(
            "Sync scheduler started with interval {} seconds",
            interval_seconds
        );
        let mut interval = time::interval(time::Duration::from_secs(interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if let Err(e) = self.process_due_pairs().await {
                error!("Error processing scheduled syncs: {:?}", e);
            }
        }
    }

    /// Обходит активные подключения и запускает просроченные синхронизации.
    async fn process_due_pairs(&self) -> anyhow::Result<()> {
        let config = &get_config().sync;
        let connections = a001_marketplace_connection::repository::list_all_active().await?;
        let now = Utc::now();

        for connection in connections {
            if !matches!(
                connection.state,
                ConnectionState::Connected | ConnectionState::SyncError
            ) {
                continue;
            }

            let tenant = connection.tenant_id;
            let kind = connection.marketplace_kind;
            let key = (tenant.value(), kind);

            let due = {
                let mut retries = self.lock_retries();
                // Успешный запуск возвращает пару в Connected и снимает счётчик
                if connection.state == ConnectionState::Connected {
                    retries.remove(&key);
                }
                match retries.get(&key) {
                    Some(state) if state.failures >= config.max_attempts => false,
                    Some(state) => state.next_attempt_at <= now,
                    None => true,
                }
            };
            if !due {
                continue;
            }

            match SYNC_EXECUTOR.sync(&tenant, kind, SyncMode::Background).await {
                Ok(result) => {
                    self.lock_retries().remove(&key);
                    if result.has_errors() {
                        warn!(
                            "Scheduled sync finished with partial errors: tenant={} marketplace={} errors={}",
                            tenant.value(),
                            kind.code(),
                            result.errors.len()
                        );
                    }
                }
                // Пара уже синхронизируется; не считается неудачей
                Err(OrchestratorError::SyncInProgress(_)) => {}
                Err(e) => {
                    let failures = self.record_failure(key, config.backoff_base_seconds, config.backoff_cap_seconds);
                    if failures >= config.max_attempts {
                        warn!(
                            "Scheduled sync suspended after {} failed attempts: tenant={} marketplace={} error={}",
                            failures,
                            tenant.value(),
                            kind.code(),
                            e
                        );
                    } else {
                        warn!(
                            "Scheduled sync failed (attempt {}): tenant={} marketplace={} error={}",
                            failures,
                            tenant.value(),
                            kind.code(),
                            e
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn record_failure(&self, key: (Uuid, MarketplaceKind), base: u64, cap: u64) -> u32 {
        let mut retries = self.lock_retries();
        let entry = retries.entry(key).or_insert(RetryState {
            failures: 0,
            next_attempt_at: Utc::now(),
        });
        entry.failures += 1;
        let delay = backoff_delay_seconds(entry.failures, base, cap);
        entry.next_attempt_at = Utc::now() + Duration::seconds(delay as i64);
        entry.failures
    }

    fn lock_retries(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<(Uuid, MarketplaceKind), RetryState>> {
        self.retries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Выдержка перед повтором: base * 2^(n-1), не выше cap
pub fn backoff_delay_seconds(failures: u32, base: u64, cap: u64) -> u64 {
    let exponent = failures.saturating_sub(1).min(31);
    base.saturating_mul(1u64 << exponent).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        assert_eq!(backoff_delay_seconds(1, 60, 3600), 60);
        assert_eq!(backoff_delay_seconds(2, 60, 3600), 120);
        assert_eq!(backoff_delay_seconds(3, 60, 3600), 240);
        assert_eq!(backoff_delay_seconds(4, 60, 3600), 480);
        assert_eq!(backoff_delay_seconds(5, 60, 3600), 960);
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_delay_seconds(7, 60, 3600), 3600);
        assert_eq!(backoff_delay_seconds(40, 60, 3600), 3600);
    }

    #[test]
    fn huge_failure_counts_do_not_overflow() {
        assert_eq!(backoff_delay_seconds(u32::MAX, 60, 3600), 3600);
    }
}
