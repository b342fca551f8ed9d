// src/health/scheduler.rs
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, MissedTickBehavior};
use tracing::{error, info};

use super::HealthProbe;
use crate::metrics::MetricsCollector;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("health check interval must be greater than zero")]
    ZeroInterval,
}

/// Runs a [`HealthProbe`] on a fixed interval.
///
/// The first check fires one full interval after [`Scheduler::start`]. Checks
/// are serialized on a single task: ticks that come due while a check is
/// still running are collapsed into one, which fires as soon as that check
/// returns. The cadence stays aligned to the original start time.
pub struct Scheduler<P> {
    probe: Arc<P>,
    interval: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

/// Handle to a running scheduler. Dropping it stops the loop at its next
/// await point; [`SchedulerHandle::stop`] also waits for the loop to exit.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<P> Scheduler<P>
where
    P: HealthProbe + 'static,
{
    pub fn new(probe: P, interval: Duration) -> Result<Self, ScheduleError> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }

        Ok(Self {
            probe: Arc::new(probe),
            interval,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn the recurring job and return immediately.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            "Starting health check scheduler for {} every {:?}",
            self.probe.target(),
            self.interval
        );

        let task = tokio::spawn(self.run(shutdown_rx));

        SchedulerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => break,
            }

            // A stop request abandons the in-flight check.
            tokio::select! {
                _ = self.run_once() => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        info!("Health check scheduler stopped");
    }

    async fn run_once(&self) {
        let started = Instant::now();
        let outcome = self.probe.check().await;

        outcome.log();

        if let Some(metrics) = &self.metrics {
            metrics.record_health_check(&outcome, started.elapsed());
        }
    }
}

impl SchedulerHandle {
    /// Signal the loop to stop and wait until it has exited.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);

        if let Err(e) = self.task.await {
            error!("Health check scheduler task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthCheckError, HealthCheckOutcome};
    use crate::test_utils::{capture_logs, success_stamp};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Default)]
    struct Counters {
        started: AtomicUsize,
        finished: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    struct FakeProbe {
        delay: Duration,
        failing_status: Option<StatusCode>,
        counters: Arc<Counters>,
    }

    impl FakeProbe {
        fn new(delay: Duration) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            (
                Self {
                    delay,
                    failing_status: None,
                    counters: counters.clone(),
                },
                counters,
            )
        }
    }

    #[async_trait]
    impl HealthProbe for FakeProbe {
        async fn check(&self) -> HealthCheckOutcome {
            let c = &self.counters;
            c.started.fetch_add(1, Ordering::SeqCst);
            let now = c.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            c.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }

            c.in_flight.fetch_sub(1, Ordering::SeqCst);
            c.finished.fetch_add(1, Ordering::SeqCst);
            match self.failing_status {
                Some(status) => {
                    HealthCheckOutcome::Unhealthy(HealthCheckError::UnexpectedStatus(status))
                }
                None => HealthCheckOutcome::Healthy {
                    checked_at: Utc::now(),
                },
            }
        }

        fn target(&self) -> &str {
            "http://fake/health"
        }
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let (probe, _) = FakeProbe::new(Duration::ZERO);
        let result = Scheduler::new(probe, Duration::ZERO);
        assert_eq!(result.err(), Some(ScheduleError::ZeroInterval));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fire_after_one_interval() {
        let (probe, counters) = FakeProbe::new(Duration::ZERO);
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();

        sleep(Duration::from_millis(1_900)).await;
        assert_eq!(counters.started.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(counters.started.load(Ordering::SeqCst), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_interval() {
        let (probe, counters) = FakeProbe::new(Duration::ZERO);
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(counters.finished.load(Ordering::SeqCst), 2);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(counters.finished.load(Ordering::SeqCst), 3);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_checks_never_overlap() {
        let (probe, counters) = FakeProbe::new(Duration::from_secs(5));
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();

        // t=2 first check starts, t=7 it returns and the collapsed tick fires.
        sleep(Duration::from_millis(6_500)).await;
        assert_eq!(counters.started.load(Ordering::SeqCst), 1);

        sleep(Duration::from_millis(4_500)).await;
        assert_eq!(counters.started.load(Ordering::SeqCst), 2);
        assert_eq!(counters.max_in_flight.load(Ordering::SeqCst), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_the_loop() {
        let (probe, counters) = FakeProbe::new(Duration::ZERO);
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();

        sleep(Duration::from_millis(2_500)).await;
        handle.stop().await;

        sleep(Duration::from_secs(10)).await;
        assert_eq!(counters.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_in_flight_check() {
        let (probe, counters) = FakeProbe::new(Duration::from_secs(60));
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();

        sleep(Duration::from_secs(3)).await;
        assert_eq!(counters.in_flight.load(Ordering::SeqCst), 1);

        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop should not wait for the in-flight check");
        assert_eq!(counters.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_scheduler() {
        let (probe, counters) = FakeProbe::new(Duration::ZERO);
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();
        drop(handle);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(counters.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_success_line_per_tick() {
        let logs = capture_logs();
        let (probe, counters) = FakeProbe::new(Duration::ZERO);
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();

        sleep(Duration::from_secs(5)).await;
        handle.stop().await;

        let lines = logs.matching("Health check successful at ");
        assert_eq!(lines.len(), 2, "log lines: {:?}", logs.lines());
        assert_eq!(lines.len(), counters.finished.load(Ordering::SeqCst));
        for line in &lines {
            let stamp = success_stamp(line).unwrap();
            assert!(DateTime::parse_from_rfc3339(stamp).is_ok(), "not RFC 3339: {:?}", stamp);
        }
        assert!(logs.matching("Error in health check").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_error_line_per_failing_tick() {
        let logs = capture_logs();
        let (mut probe, counters) = FakeProbe::new(Duration::ZERO);
        probe.failing_status = Some(StatusCode::INTERNAL_SERVER_ERROR);
        let handle = Scheduler::new(probe, Duration::from_secs(2)).unwrap().start();

        sleep(Duration::from_secs(5)).await;
        handle.stop().await;

        // Two ticks, one attempt each: no retry inside a tick.
        assert_eq!(counters.started.load(Ordering::SeqCst), 2);
        let lines = logs.matching("Error in health check");
        assert_eq!(lines.len(), 2, "log lines: {:?}", logs.lines());
        for line in &lines {
            assert!(line.ends_with(
                "Error in health check: health check returned non-OK status: 500 Internal Server Error"
            ));
        }
        assert!(logs.matching("Health check successful").is_empty());
    }
}
