use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::ScheduleCache;
use crate::config::Config;
use crate::error::ScheduleError;
use crate::model::RawEntry;
use crate::normalizer::Normalizer;
use crate::parser;
use crate::renderer::PageRenderer;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Render, parse and normalize one schedule page.
pub struct Pipeline {
    renderer: Arc<dyn PageRenderer>,
    url: String,
    normalizer: Normalizer,
    fetch_timeout: Duration,
}

impl Pipeline {
    pub fn new(renderer: Arc<dyn PageRenderer>, url: impl Into<String>, normalizer: Normalizer, fetch_timeout: Duration) -> Self {
        Self {
            renderer,
            url: url.into(),
            normalizer,
            fetch_timeout,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Render the page and extract its entries. The renderer bounds its own
    /// selector wait; the outer limit also covers browser start and teardown.
    #[instrument(level = "info", skip(self), fields(url = %self.url, renderer = self.renderer.name()))]
    pub async fn fetch(&self) -> Result<Vec<RawEntry>, ScheduleError> {
        let bound = self.fetch_timeout.saturating_mul(2);
        let html = match tokio::time::timeout(bound, self.renderer.render(&self.url)).await {
            Ok(rendered) => rendered?,
            Err(_) => {
                return Err(ScheduleError::FetchTimeout {
                    url: self.url.clone(),
                    selector: String::new(),
                    timeout: bound,
                });
            }
        };
        Ok(parser::parse(&html))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { attempts: 0, backoff: Duration::ZERO }
    }

    /// Delay before retry number `attempt` (0-based), doubling each time.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Updated(usize),
    /// Another cycle was already running.
    Skipped,
    Failed(ScheduleError),
}

// Clears the single-flight flag even if the cycle future is dropped mid-way.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps a [`ScheduleCache`] current by re-running the [`Pipeline`].
pub struct Refresher {
    pipeline: Pipeline,
    cache: Arc<ScheduleCache>,
    interval: Duration,
    retry: RetryPolicy,
    clock: Clock,
    in_flight: AtomicBool,
}

impl Refresher {
    pub fn new(pipeline: Pipeline, cache: Arc<ScheduleCache>, interval: Duration) -> Self {
        Self {
            pipeline,
            cache,
            interval,
            retry: RetryPolicy::none(),
            clock: Arc::new(Utc::now),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config, renderer: Arc<dyn PageRenderer>) -> Result<Self, ScheduleError> {
        config.validate()?;
        let normalizer = Normalizer::new(config.home_tz()?, config.stale_grace()?);
        let pipeline = Pipeline::new(renderer, &config.schedule_url, normalizer, config.fetch_timeout());
        Ok(Self::new(pipeline, Arc::new(ScheduleCache::new()), config.refresh_interval()).with_retry(RetryPolicy {
            attempts: config.retry_attempts,
            backoff: config.retry_backoff(),
        }))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<ScheduleCache> {
        &self.cache
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one fetch cycle unless one is already running. On failure the
    /// cached schedule is left as it was.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            info!("Refresh already in flight; skipping");
            return RefreshOutcome::Skipped;
        };

        let mut attempt = 0;
        loop {
            match self.pipeline.fetch().await {
                Ok(entries) => {
                    let now = (self.clock)();
                    let records = self.pipeline.normalizer().normalize(entries, now);
                    let count = records.len();
                    self.cache.replace(records, now);
                    info!(count, "Schedule cache updated");
                    return RefreshOutcome::Updated(count);
                }
                Err(e) if attempt < self.retry.attempts => {
                    let delay = self.retry.delay(attempt);
                    attempt += 1;
                    warn!(error = %e, attempt, delay_secs = delay.as_secs(), "Fetch failed; retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(error = %e, "Error fetching streams; keeping cached schedule");
                    return RefreshOutcome::Failed(e);
                }
            }
        }
    }

    /// Start the background loop: one cycle now, then one per interval.
    pub fn spawn(self: Arc<Self>) -> RefreshHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // A cycle that outruns the interval must not trigger a burst of catch-up ticks
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = self.interval.as_secs(), "Refresh loop started");

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    outcome = self.refresh_once() => debug!(?outcome, "Refresh cycle finished"),
                }
            }

            info!("Refresh loop stopped");
        });

        RefreshHandle { shutdown_tx, task }
    }
}

/// Owner of a running refresh loop. Dropping it also ends the loop.
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signal the loop and wait for it to exit. Pending waits are cancelled.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!(error = %e, "Refresh loop ended abnormally");
        }
    }
}
