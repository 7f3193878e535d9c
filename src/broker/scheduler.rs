//! Refresh scheduler
//!
//! Each topic with subscribers owns exactly one `RefreshJob`: a spawned task
//! that ticks on a fixed interval, asks the snapshot source for fresh data,
//! stores it and broadcasts it. After every successful fetch the job compares
//! the interval the new phase calls for with its own and, if they differ,
//! swaps itself for a job on the new cadence.
//!
//! Invariants:
//! - `Topic::job` is only written in this module (`start`, `stop`,
//!   `replace_schedule`).
//! - A `RefreshJob` cancels its task when dropped, so overwriting or clearing
//!   the field can never leave a second timer running for the same topic.
//! - An in-flight fetch is never aborted. Its result is discarded if the topic
//!   is gone by the time it completes, and only the job that is still current
//!   may change the schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::broker::engine::Shared;
use crate::broker::fanout;
use crate::broker::topic::{Topic, TopicKey};
use crate::config::RefreshSettings;
use crate::source::{Phase, SnapshotSource};

/// Refresh interval per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub live: Duration,
    pub imminent: Duration,
    pub idle: Duration,
}

impl RefreshPolicy {
    pub fn interval_for(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Live => self.live,
            Phase::Imminent => self.imminent,
            Phase::Idle => self.idle,
        }
    }

    /// Cadence a new job starts on, before any phase has been observed.
    pub fn default_interval(&self) -> Duration {
        self.idle
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            live: Duration::from_secs(5),
            imminent: Duration::from_secs(60),
            idle: Duration::from_secs(300),
        }
    }
}

impl From<&RefreshSettings> for RefreshPolicy {
    fn from(settings: &RefreshSettings) -> Self {
        // zero-length periods would make the ticker spin
        let secs = |s: u64| Duration::from_secs(s.max(1));
        Self {
            live: secs(settings.live_secs),
            imminent: secs(settings.imminent_secs),
            idle: secs(settings.idle_secs),
        }
    }
}

/// Handle to a topic's running refresh task. Dropping it cancels the task's
/// next tick.
#[derive(Debug)]
pub(crate) struct RefreshJob {
    pub(crate) generation: u64,
    pub(crate) interval: Duration,
    _cancel: DropGuard,
}

pub struct RefreshScheduler {
    source: Arc<dyn SnapshotSource>,
    policy: RefreshPolicy,
    generations: AtomicU64,
}

impl RefreshScheduler {
    pub fn new(source: Arc<dyn SnapshotSource>, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            generations: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Starts refreshing `topic`: one fetch right away, then every
    /// `default_interval`. Returns `false` if a job is already running.
    pub(crate) fn start(&self, shared: &Arc<Shared>, topic: &mut Topic) -> bool {
        if topic.job.is_some() {
            debug!(topic = %topic.key, "already refreshing");
            return false;
        }

        let interval = self.policy.default_interval();
        topic.job = Some(self.spawn_job(shared, &topic.key, Instant::now(), interval));
        info!(topic = %topic.key, interval_secs = interval.as_secs(), "starting refresh");
        true
    }

    /// Cancels the topic's job. Idempotent.
    pub(crate) fn stop(&self, topic: &mut Topic) -> bool {
        match topic.job.take() {
            Some(job) => {
                info!(topic = %topic.key, generation = job.generation, "stopping refresh");
                true
            }
            None => false,
        }
    }

    /// Swaps the topic's job for one ticking every `interval`, first tick one
    /// full interval from now. The cached snapshot is left alone.
    fn replace_schedule(&self, shared: &Arc<Shared>, topic: &mut Topic, interval: Duration) {
        let job = self.spawn_job(shared, &topic.key, Instant::now() + interval, interval);
        info!(
            topic = %topic.key,
            interval_secs = interval.as_secs(),
            "adjusting refresh interval"
        );
        // dropping the old job here cancels it
        topic.job = Some(job);
    }

    fn spawn_job(
        &self,
        shared: &Arc<Shared>,
        key: &TopicKey,
        first_tick: Instant,
        interval: Duration,
    ) -> RefreshJob {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        tokio::spawn(run_job(
            Arc::downgrade(shared),
            key.clone(),
            generation,
            first_tick,
            interval,
            token.clone(),
        ));

        RefreshJob {
            generation,
            interval,
            _cancel: token.drop_guard(),
        }
    }
}

async fn run_job(
    shared: Weak<Shared>,
    key: TopicKey,
    generation: u64,
    first_tick: Instant,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        refresh(&shared, &key, generation).await;
    }

    debug!(topic = %key, generation, "refresh job exited");
}

/// One fetch-store-broadcast cycle for `key`, run on behalf of job
/// `generation`.
pub(crate) async fn refresh(shared: &Arc<Shared>, key: &TopicKey, generation: u64) {
    let aux_id = {
        let state = shared.state.lock();
        match state.registry.get(key.as_str()) {
            Some(topic) => topic.aux_id.clone(),
            None => return,
        }
    };

    let scheduler = &shared.scheduler;
    let snapshot = match scheduler.source.fetch_snapshot(key, aux_id.as_deref()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(topic = %key, error = %e, "snapshot fetch failed; keeping previous snapshot");
            return;
        }
    };
    let phase = scheduler.source.classify(&snapshot);

    let mut state = shared.state.lock();
    let Some(topic) = state.registry.get_mut(key.as_str()) else {
        debug!(topic = %key, "topic removed during fetch; discarding snapshot");
        return;
    };

    topic.snapshot = Some(snapshot);
    fanout::broadcast_snapshot(topic);

    // a job that was stopped or replaced mid-fetch still delivers its data,
    // but the schedule belongs to whichever job is current
    let current = topic
        .job
        .as_ref()
        .filter(|job| job.generation == generation)
        .map(|job| job.interval);

    if let Some(current) = current {
        let desired = scheduler.policy.interval_for(phase);
        if desired != current {
            debug!(topic = %key, ?phase, "phase changed cadence");
            scheduler.replace_schedule(shared, topic, desired);
        }
    }
}
