//! Cooldown gate for long-running background jobs.
//!
//! # Design
//! - Each key holds at most one [`CooldownLock`]; while it is unexpired a new
//!   trigger is refused with a notice, whether or not the job finished.
//! - An accepted job is spawned and not awaited; the caller may await the
//!   returned [`JobTicket`] when it wants to.
//! - Every lock owns the timer task that releases it. Dropping the lock,
//!   disposing the gate or dropping the gate aborts that timer.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use mcpdeck_models::EntityId;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;

type LockTable = Mutex<HashMap<EntityId, CooldownLock>>;

/// Time-bounded flag preventing a job from being re-triggered.
#[derive(Debug)]
struct CooldownLock {
    expires_at: Instant,
    generation: u64,
    timer: JoinHandle<()>,
}

impl Drop for CooldownLock {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Result of a trigger attempt.
#[derive(Debug)]
pub struct JobTicket {
    accepted: bool,
    notice: String,
    remaining: Option<Duration>,
    job: Option<JoinHandle<()>>,
}

impl JobTicket {
    /// Whether the job was started.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        self.accepted
    }

    /// Displayable message describing what happened.
    #[must_use]
    pub fn notice(&self) -> &str {
        &self.notice
    }

    /// Cooldown left when the trigger was refused.
    #[must_use]
    pub const fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    /// Wait for the started job to finish; returns `false` if nothing ran to completion.
    pub async fn finished(self) -> bool {
        let Some(job) = self.job else {
            return false;
        };
        match job.await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "background job did not complete");
                false
            }
        }
    }
}

/// Per-key cooldown locks over fire-and-forget jobs.
#[derive(Debug)]
pub struct JobGate {
    cooldown: Duration,
    locks: Arc<LockTable>,
    generation: AtomicU64,
}

impl JobGate {
    /// Gate applying `cooldown` after every accepted trigger.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            locks: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Gate using the configured refresh cooldown.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.refresh_cooldown)
    }

    /// Start `job` for `key` unless an unexpired lock exists.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger<F>(&self, key: EntityId, job: F) -> JobTicket
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let now = Instant::now();
        let mut locks = lock_table(&self.locks);
        if let Some(lock) = locks.get(&key)
            && lock.expires_at > now
        {
            let remaining = lock.expires_at - now;
            debug!(
                id = %key,
                remaining_secs = remaining.as_secs(),
                "job trigger refused during cooldown"
            );
            return JobTicket {
                accepted: false,
                notice: format!(
                    "refresh already pending; try again in {}",
                    format_remaining(remaining)
                ),
                remaining: Some(remaining),
                job: None,
            };
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let expires_at = now + self.cooldown;
        let timer = tokio::spawn(release(
            Arc::downgrade(&self.locks),
            key.clone(),
            generation,
            expires_at,
        ));
        let replaced = locks.insert(
            key.clone(),
            CooldownLock {
                expires_at,
                generation,
                timer,
            },
        );
        drop(locks);
        drop(replaced);

        info!(id = %key, cooldown_secs = self.cooldown.as_secs(), "background job started");
        JobTicket {
            accepted: true,
            notice: "refresh started; results appear once the job completes".to_string(),
            remaining: None,
            job: Some(tokio::spawn(job)),
        }
    }

    /// Cooldown left for `key`, if locked.
    #[must_use]
    pub fn remaining(&self, key: &EntityId) -> Option<Duration> {
        let now = Instant::now();
        lock_table(&self.locks)
            .get(key)
            .filter(|lock| lock.expires_at > now)
            .map(|lock| lock.expires_at - now)
    }

    /// Whether a trigger for `key` would be refused.
    #[must_use]
    pub fn is_locked(&self, key: &EntityId) -> bool {
        self.remaining(key).is_some()
    }

    /// Release every lock and cancel its timer.
    pub fn dispose(&self) {
        let drained: Vec<CooldownLock> = lock_table(&self.locks)
            .drain()
            .map(|(_, lock)| lock)
            .collect();
        if !drained.is_empty() {
            debug!(locks = drained.len(), "cooldown locks released on dispose");
        }
    }
}

impl Drop for JobGate {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn release(locks: Weak<LockTable>, key: EntityId, generation: u64, expires_at: Instant) {
    tokio::time::sleep_until(expires_at).await;
    let Some(locks) = locks.upgrade() else {
        return;
    };
    let mut table = lock_table(&locks);
    let current = table
        .get(&key)
        .is_some_and(|lock| lock.generation == generation);
    if current {
        let expired = table.remove(&key);
        drop(table);
        debug!(id = %key, "cooldown expired");
        drop(expired);
    }
}

fn lock_table(locks: &LockTable) -> MutexGuard<'_, HashMap<EntityId, CooldownLock>> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    format!("{}m {:02}s", secs / 60, secs % 60)
}
