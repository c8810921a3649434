//! Serialized narration queue
//!
//! Narration requests from routing, search and navigation all funnel into
//! one strictly FIFO queue played by a single worker task. `say_now`
//! flushes pending items and interrupts current playback. A watchdog
//! advances the queue when the audio backend neither completes nor errors
//! within a multiple of the utterance's estimated duration, so a hung
//! backend cannot deadlock the narration channel.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::NarrationConfig;

use super::Speaker;

/// Serialized, interruptible narration queue
pub struct Narrator {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    speaker: Arc<dyn Speaker>,
    queue: Mutex<VecDeque<String>>,
    /// Wakes the worker when an item arrives or shutdown is requested
    notify: Notify,
    /// Interrupts in-progress playback
    interrupt: Notify,
    recent: Mutex<HashMap<String, Instant>>,
    dedupe_window: Duration,
    watchdog_factor: f64,
    shutdown: AtomicBool,
}

impl Narrator {
    /// Create a narrator and spawn its worker task
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(speaker: Arc<dyn Speaker>, config: &NarrationConfig) -> Self {
        let inner = Arc::new(Inner {
            speaker,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            interrupt: Notify::new(),
            recent: Mutex::new(HashMap::new()),
            dedupe_window: config.dedupe_window,
            watchdog_factor: config.watchdog_factor,
            shutdown: AtomicBool::new(false),
        });

        let worker = tokio::spawn(run_worker(Arc::clone(&inner)));

        Self {
            inner,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue an utterance
    ///
    /// Identical text spoken within the dedupe window is dropped so rapid
    /// position updates don't stutter the same guidance.
    pub fn say(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.inner.is_duplicate(text) {
            tracing::debug!(text, "dropping duplicate narration");
            return;
        }

        self.inner.queue.lock().unwrap().push_back(text.to_string());
        self.inner.notify.notify_one();
    }

    /// Flush the queue and speak this text next, interrupting current
    /// playback
    pub fn say_now(&self, text: &str) {
        {
            let mut queue = self.inner.queue.lock().unwrap();
            queue.clear();
            queue.push_back(text.to_string());
        }

        self.inner.interrupt.notify_waiters();
        self.inner.notify.notify_one();
    }

    /// Number of utterances waiting (not counting one in playback)
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    /// Stop the worker and drop any queued narration
    pub async fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.queue.lock().unwrap().clear();
        self.inner.interrupt.notify_waiters();
        // notify_one stores a permit, so a worker that is about to park on
        // notified() still observes the shutdown
        self.inner.notify.notify_one();

        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "narration worker did not shut down cleanly");
            }
        }
    }
}

impl Inner {
    /// Record the utterance; returns true when it repeats within the window
    fn is_duplicate(&self, text: &str) -> bool {
        let now = Instant::now();
        let mut recent = self.recent.lock().unwrap();

        recent.retain(|_, spoken_at| now.duration_since(*spoken_at) < self.dedupe_window);

        if recent.contains_key(text) {
            return true;
        }

        recent.insert(text.to_string(), now);
        false
    }
}

/// Worker loop: pop, speak, watchdog
async fn run_worker(inner: Arc<Inner>) {
    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            break;
        }

        let next = inner.queue.lock().unwrap().pop_front();
        let Some(text) = next else {
            inner.notify.notified().await;
            continue;
        };

        let budget = inner
            .speaker
            .estimate(&text)
            .mul_f64(inner.watchdog_factor.max(1.0));

        tokio::select! {
            result = inner.speaker.speak(&text) => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "narration failed");
                }
            }
            () = tokio::time::sleep(budget) => {
                tracing::warn!(%text, budget_ms = budget.as_millis(), "narration watchdog fired, advancing");
            }
            () = inner.interrupt.notified() => {
                tracing::debug!(%text, "narration interrupted");
            }
        }
    }

    tracing::debug!("narration worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Records spoken texts; optional per-utterance delay
    struct RecordingSpeaker {
        spoken: Mutex<Vec<String>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl RecordingSpeaker {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                spoken: Mutex::new(Vec::new()),
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Speaker for RecordingSpeaker {
        async fn speak(&self, text: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn estimate(&self, _text: &str) -> Duration {
            Duration::from_millis(50)
        }
    }

    /// Never completes; exercises the watchdog
    struct HangingSpeaker {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Speaker for HangingSpeaker {
        async fn speak(&self, _text: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(())
        }

        fn estimate(&self, _text: &str) -> Duration {
            Duration::from_millis(20)
        }
    }

    fn test_config() -> NarrationConfig {
        NarrationConfig {
            dedupe_window: Duration::from_millis(500),
            ..NarrationConfig::default()
        }
    }

    #[tokio::test]
    async fn speaks_in_fifo_order() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(1));
        let narrator = Narrator::new(Arc::clone(&speaker) as Arc<dyn Speaker>, &test_config());

        narrator.say("first");
        narrator.say("second");
        narrator.say("third");

        tokio::time::sleep(Duration::from_millis(100)).await;
        narrator.shutdown().await;

        let spoken = speaker.spoken.lock().unwrap().clone();
        assert_eq!(spoken, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn duplicates_within_window_are_dropped() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(1));
        let narrator = Narrator::new(Arc::clone(&speaker) as Arc<dyn Speaker>, &test_config());

        narrator.say("turn left");
        narrator.say("turn left");
        narrator.say("turn left");

        tokio::time::sleep(Duration::from_millis(100)).await;
        narrator.shutdown().await;

        let spoken = speaker.spoken.lock().unwrap().clone();
        assert_eq!(spoken, vec!["turn left"]);
    }

    #[tokio::test]
    async fn say_now_flushes_pending_items() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(30));
        let narrator = Narrator::new(Arc::clone(&speaker) as Arc<dyn Speaker>, &test_config());

        narrator.say("one");
        narrator.say("two");
        narrator.say("three");
        narrator.say_now("urgent");

        tokio::time::sleep(Duration::from_millis(200)).await;
        narrator.shutdown().await;

        let spoken = speaker.spoken.lock().unwrap().clone();
        assert!(spoken.contains(&"urgent".to_string()));
        assert!(!spoken.contains(&"three".to_string()));
    }

    #[tokio::test]
    async fn watchdog_advances_past_hung_backend() {
        let speaker = Arc::new(HangingSpeaker {
            calls: AtomicUsize::new(0),
        });
        let narrator = Narrator::new(Arc::clone(&speaker) as Arc<dyn Speaker>, &test_config());

        narrator.say("will hang");
        narrator.say("also tried");

        // Watchdog budget is 20ms * 1.6 = 32ms per utterance
        tokio::time::sleep(Duration::from_millis(200)).await;
        narrator.shutdown().await;

        // Both utterances were attempted: the hung first one did not block
        // the second
        assert_eq!(speaker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_drains() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(1));
        let narrator = Narrator::new(Arc::clone(&speaker) as Arc<dyn Speaker>, &test_config());

        narrator.say("hello");
        narrator.shutdown().await;
        narrator.shutdown().await;

        assert_eq!(narrator.pending(), 0);
    }
}
