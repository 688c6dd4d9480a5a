//! The polling loop that turns input activity into heartbeats.
//!
//! Every `poll_time` seconds the watcher drains the aggregators through the
//! tracker and, when there was any input, sends one heartbeat. It stops when
//! interrupted or when its parent process goes away.

use crate::client::{Event, Reporter, EVENT_TYPE};
use crate::config::{ConfigError, Settings};
use crate::core::SinceLastInputTracker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Time given to the input source to attach before the first poll.
pub const STARTUP_DELAY: Duration = Duration::from_secs(1);

/// Longest uninterrupted sleep, bounding how late a stop request is noticed.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown flag was cleared (Ctrl+C or SIGTERM)
    Interrupted,
    /// The parent process died and the watcher was re-parented to init
    ParentDied,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::ParentDied => write!(f, "parent process died"),
        }
    }
}

/// Lifecycle of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    Stopping(StopReason),
    Stopped(StopReason),
}

type ParentCheck = Box<dyn Fn() -> bool + Send>;

/// Drives the poll/report cycle.
pub struct Watcher<R: Reporter> {
    settings: Settings,
    bucket_id: String,
    tracker: SinceLastInputTracker,
    reporter: R,
    running: Arc<AtomicBool>,
    parent_alive: ParentCheck,
    startup_delay: Duration,
    state: LoopState,
}

impl<R: Reporter> Watcher<R> {
    /// Create a watcher reporting into `bucket_id`.
    ///
    /// Fails when `timeout` is shorter than `poll_time` or either is not a
    /// usable number of seconds.
    pub fn new(
        timeout: f64,
        poll_time: f64,
        bucket_id: impl Into<String>,
        tracker: SinceLastInputTracker,
        reporter: R,
    ) -> Result<Self, ConfigError> {
        let settings = Settings::new(timeout, poll_time)?;
        Ok(Self {
            settings,
            bucket_id: bucket_id.into(),
            tracker,
            reporter,
            running: Arc::new(AtomicBool::new(true)),
            parent_alive: Box::new(parent_alive),
            startup_delay: STARTUP_DELAY,
            state: LoopState::Starting,
        })
    }

    /// Override the delay before the first poll.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Override how parent liveness is determined.
    pub fn with_parent_check<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.parent_alive = Box::new(check);
        self
    }

    /// Share an existing stop flag, e.g. one a signal handler already owns.
    pub fn with_shutdown_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Flag that keeps the loop running; clear it to request a stop.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until interrupted or orphaned.
    pub fn run(&mut self) -> StopReason {
        info!("aw-watcher-input started");

        self.sleep(self.startup_delay);

        // Interrupted before the first poll: leave the server alone
        let reason = if self.running.load(Ordering::SeqCst) {
            if let Err(e) = self
                .reporter
                .create_bucket(&self.bucket_id, EVENT_TYPE, true)
            {
                warn!("Could not create bucket {}: {e}", self.bucket_id);
            }

            self.state = LoopState::Running;
            loop {
                if let Some(reason) = self.poll() {
                    break reason;
                }
                self.sleep(self.settings.poll_interval());
            }
        } else {
            StopReason::Interrupted
        };

        info!("aw-watcher-input stopped: {reason}");
        self.state = LoopState::Stopped(reason);
        reason
    }

    /// One iteration of the loop body, without the trailing sleep.
    ///
    /// Moves the loop to `Stopping` when a stop condition is detected.
    fn poll(&mut self) -> Option<StopReason> {
        let reason = if !self.running.load(Ordering::SeqCst) {
            Some(StopReason::Interrupted)
        } else if !(self.parent_alive)() {
            Some(StopReason::ParentDied)
        } else {
            None
        };
        if let Some(reason) = reason {
            self.state = LoopState::Stopping(reason);
            return Some(reason);
        }

        // No new input is a normal outcome; try again next tick
        let sample = self.tracker.sample()?;
        debug!(
            "Seconds since last input: {:.3}",
            sample.seconds_since_last_activity
        );

        if let Err(e) = self.reporter.heartbeat(
            &self.bucket_id,
            Event::from(sample),
            self.settings.pulsetime(),
            true,
        ) {
            warn!("Failed to report activity: {e}");
        }
        None
    }

    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Whether the process that started us is still around.
///
/// On Unix an orphan is adopted by init, so a parent PID of 1 means the
/// parent died.
#[cfg(unix)]
pub fn parent_alive() -> bool {
    std::os::unix::process::parent_id() != 1
}

/// Whether the process that started us is still around.
#[cfg(not(unix))]
pub fn parent_alive() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::core::{EventAggregator, KeyboardAggregator, MouseAggregator};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateBucket(String),
        Heartbeat { event: Event, pulsetime: f64 },
    }

    #[derive(Clone, Default)]
    struct RecordingReporter {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_heartbeats: bool,
    }

    impl RecordingReporter {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn heartbeats(&self) -> Vec<(Event, f64)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Heartbeat { event, pulsetime } => Some((event, pulsetime)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Reporter for RecordingReporter {
        fn create_bucket(
            &self,
            bucket_id: &str,
            _event_type: &str,
            _queued: bool,
        ) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::CreateBucket(bucket_id.to_string()));
            Ok(())
        }

        fn heartbeat(
            &self,
            _bucket_id: &str,
            event: Event,
            pulsetime: f64,
            _queued: bool,
        ) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Heartbeat { event, pulsetime });
            if self.fail_heartbeats {
                Err(ClientError::Network("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        keyboard: Arc<KeyboardAggregator>,
        mouse: Arc<MouseAggregator>,
        reporter: RecordingReporter,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                keyboard: Arc::new(KeyboardAggregator::new()),
                mouse: Arc::new(MouseAggregator::new()),
                reporter: RecordingReporter::default(),
            }
        }

        fn watcher(
            &self,
            timeout: f64,
            poll_time: f64,
        ) -> Result<Watcher<RecordingReporter>, ConfigError> {
            let tracker = SinceLastInputTracker::new(self.keyboard.clone(), self.mouse.clone());
            Watcher::new(timeout, poll_time, "bucket", tracker, self.reporter.clone())
                .map(|w| w.with_startup_delay(Duration::ZERO))
        }
    }

    /// A parent check that reports alive for the first `polls` calls.
    fn alive_for(polls: usize) -> impl Fn() -> bool + Send + 'static {
        let count = AtomicUsize::new(0);
        move || count.fetch_add(1, Ordering::SeqCst) < polls
    }

    #[test]
    fn test_timeout_shorter_than_poll_time_fails_fast() {
        let fixture = Fixture::new();
        let result = fixture.watcher(1.0, 5.0);
        assert!(matches!(result, Err(ConfigError::InvalidSettings(_))));
        assert!(fixture.reporter.calls().is_empty());
    }

    #[test]
    fn test_parent_death_stops_without_reporting() {
        let fixture = Fixture::new();
        fixture.keyboard.record_press();
        let mut watcher = fixture
            .watcher(10.0, 5.0)
            .unwrap()
            .with_parent_check(|| false);

        let started = Instant::now();
        assert_eq!(watcher.run(), StopReason::ParentDied);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(watcher.state(), LoopState::Stopped(StopReason::ParentDied));
        assert!(fixture.reporter.heartbeats().is_empty());
        // The pending press was never drained
        assert!(fixture.keyboard.has_pending());
    }

    #[test]
    fn test_interrupt_stops_within_one_interval() {
        let fixture = Fixture::new();
        let mut watcher = fixture
            .watcher(10.0, 5.0)
            .unwrap()
            .with_parent_check(|| true);
        let running = watcher.shutdown_flag();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            running.store(false, Ordering::SeqCst);
        });

        let started = Instant::now();
        assert_eq!(watcher.run(), StopReason::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_interrupt_during_startup_touches_no_server() {
        let fixture = Fixture::new();
        fixture.keyboard.record_press();
        let running = Arc::new(AtomicBool::new(false));
        let mut watcher = fixture
            .watcher(10.0, 5.0)
            .unwrap()
            .with_startup_delay(Duration::from_millis(50))
            .with_shutdown_flag(running)
            .with_parent_check(|| true);

        assert_eq!(watcher.run(), StopReason::Interrupted);
        assert_eq!(watcher.state(), LoopState::Stopped(StopReason::Interrupted));
        assert!(fixture.reporter.calls().is_empty());
    }

    #[test]
    fn test_shared_flag_cleared_later_stops_the_loop() {
        let fixture = Fixture::new();
        let running = Arc::new(AtomicBool::new(true));
        let mut watcher = fixture
            .watcher(10.0, 5.0)
            .unwrap()
            .with_shutdown_flag(running.clone())
            .with_parent_check(|| true);
        assert!(Arc::ptr_eq(&watcher.shutdown_flag(), &running));

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            running.store(false, Ordering::SeqCst);
        });

        assert_eq!(watcher.run(), StopReason::Interrupted);
        handle.join().unwrap();
    }

    #[test]
    fn test_detected_stop_moves_to_stopping_before_stopped() {
        let fixture = Fixture::new();
        fixture.keyboard.record_press();
        let mut watcher = fixture
            .watcher(10.0, 5.0)
            .unwrap()
            .with_parent_check(|| false);
        assert_eq!(watcher.state(), LoopState::Starting);

        assert_eq!(watcher.poll(), Some(StopReason::ParentDied));
        assert_eq!(watcher.state(), LoopState::Stopping(StopReason::ParentDied));
        // The iteration that saw the stop does not report
        assert!(fixture.reporter.calls().is_empty());

        watcher.run();
        assert_eq!(watcher.state(), LoopState::Stopped(StopReason::ParentDied));
    }

    #[test]
    fn test_active_tick_sends_heartbeat_with_pulsetime() {
        let fixture = Fixture::new();
        for _ in 0..3 {
            fixture.keyboard.record_press();
        }
        fixture.mouse.record_click(10.0, 10.0, true);
        fixture.mouse.record_click(20.0, 20.0, true);

        let mut watcher = fixture
            .watcher(2.0, 0.05)
            .unwrap()
            .with_parent_check(alive_for(1));
        watcher.run();

        let calls = fixture.reporter.calls();
        assert_eq!(calls[0], Call::CreateBucket("bucket".to_string()));

        let heartbeats = fixture.reporter.heartbeats();
        assert_eq!(heartbeats.len(), 1);
        let (event, pulsetime) = &heartbeats[0];
        assert!((pulsetime - 2.05).abs() < 1e-9);
        assert_eq!(event.data["keyboard"]["presses"], 3);
        assert_eq!(event.data["mouse"]["clicks"], 2);
    }

    #[test]
    fn test_idle_ticks_send_nothing() {
        let fixture = Fixture::new();
        let mut watcher = fixture
            .watcher(1.0, 0.01)
            .unwrap()
            .with_parent_check(alive_for(5));

        assert_eq!(watcher.run(), StopReason::ParentDied);
        assert!(fixture.reporter.heartbeats().is_empty());
    }

    #[test]
    fn test_failed_report_does_not_stop_the_loop() {
        let mut fixture = Fixture::new();
        fixture.reporter.fail_heartbeats = true;
        let mut watcher = fixture
            .watcher(1.0, 0.01)
            .unwrap()
            .with_parent_check(alive_for(3));

        fixture.keyboard.record_press();

        // Reaching the fourth liveness check means the loop kept going
        assert_eq!(watcher.run(), StopReason::ParentDied);
        assert_eq!(fixture.reporter.heartbeats().len(), 1);
    }
}
