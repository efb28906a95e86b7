//! Periodic poll monitor.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dbot_core::{Color, PollChoice, PollHandle, PollRequest, PollTransport};
use futures::FutureExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use super::entry::PollEntry;
use super::{hours, PollAnswerSpec, PollAnswerState, PollEvent, PollOptions};
use crate::action::panic_message;
use crate::broadcast::{BroadcastOptions, Broadcaster};
use crate::clock::{Clock, SystemClock};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(7);

#[derive(Debug, Clone)]
pub struct PollMonitorConfig {
    pub interval: Duration,
}

impl Default for PollMonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

enum PollStep {
    Keep(PollEntry),
    Retire,
}

/// Owns the poll tracking store, keyed by the poll message key.
pub struct PollMonitor {
    transport: Arc<dyn PollTransport>,
    broadcaster: Arc<Broadcaster>,
    config: PollMonitorConfig,
    clock: Arc<dyn Clock>,
    polls: Mutex<HashMap<String, PollEntry>>,
}

impl PollMonitor {
    pub fn new(
        transport: Arc<dyn PollTransport>,
        broadcaster: Arc<Broadcaster>,
        config: PollMonitorConfig,
    ) -> Self {
        Self {
            transport,
            broadcaster,
            config,
            clock: Arc::new(SystemClock),
            polls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PollMonitorConfig {
        &self.config
    }

    /// Sends the poll to every audience chat and tracks each sent message.
    #[instrument(skip(self, answers, options), fields(answers = answers.len()))]
    pub async fn send_poll(
        &self,
        question: &str,
        answers: Vec<PollAnswerSpec>,
        options: PollOptions,
    ) -> Vec<PollHandle> {
        let request = PollRequest {
            question: question.to_string(),
            answers: answers
                .iter()
                .map(|a| PollChoice {
                    text: a.text.clone(),
                    emoji: a.emoji.clone(),
                })
                .collect(),
            allow_multiselect: options.allow_multiselect,
            duration: hours(options.duration_hours),
        };

        let mut handles = Vec::new();
        for chat in self.broadcaster.audience() {
            match self.transport.send_poll(chat, &request).await {
                Ok(handle) => {
                    self.track_poll(handle.clone(), answers.clone(), options.clone())
                        .await;
                    handles.push(handle);
                }
                Err(e) => {
                    error!(chat_id = chat.id, error = %e, "Error creating poll");
                    self.broadcaster
                        .broadcast(
                            &format!("Error creating poll:\n{}", e),
                            BroadcastOptions::color(Color::ERROR),
                        )
                        .await;
                }
            }
        }
        handles
    }

    /// Starts tracking an already-sent poll. Re-tracking the same message replaces its entry.
    pub async fn track_poll(&self, handle: PollHandle, answers: Vec<PollAnswerSpec>, options: PollOptions) {
        let entry = PollEntry::new(handle, answers, options, self.clock.now());
        info!(poll = %entry.key(), "Tracking poll");
        self.polls.lock().await.insert(entry.key(), entry);
    }

    pub async fn tracked(&self) -> Vec<PollHandle> {
        self.polls
            .lock()
            .await
            .values()
            .map(|entry| entry.handle.clone())
            .collect()
    }

    pub async fn is_tracked(&self, key: &str) -> bool {
        self.polls.lock().await.contains_key(key)
    }

    /// One scan over every tracked poll. A failure on one poll never affects the others.
    pub async fn tick(&self) {
        let keys: Vec<String> = self.polls.lock().await.keys().cloned().collect();
        debug!(polls = keys.len(), "Poll monitor tick");

        for key in keys {
            let Some(entry) = self.polls.lock().await.get(&key).cloned() else {
                continue;
            };
            let handle = entry.handle.clone();
            match self.monitor_poll(entry).await {
                PollStep::Keep(entry) => {
                    let mut polls = self.polls.lock().await;
                    if let Some(slot) = polls.get_mut(&key) {
                        *slot = entry;
                    }
                }
                PollStep::Retire => {
                    self.polls.lock().await.remove(&key);
                    self.transport.release_poll(&handle).await;
                    info!(poll = %key, "Poll retired");
                }
            }
        }
    }

    async fn monitor_poll(&self, mut entry: PollEntry) -> PollStep {
        let key = entry.key();
        let snapshot = match self.transport.poll_snapshot(&entry.handle).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!(poll = %key, "Poll message gone or not modifiable");
                return PollStep::Retire;
            }
            Err(e) => {
                warn!(poll = %key, error = %e, "Could not fetch poll state, retrying next tick");
                return PollStep::Keep(entry);
            }
        };

        let now = self.clock.now();
        if snapshot.is_expired(now) {
            let answers = entry.answer_states(&snapshot);
            self.notify(&entry, PollEvent::Complete, &answers).await;
            if !snapshot.closed {
                if let Err(e) = self.transport.close_poll(&entry.handle).await {
                    warn!(poll = %key, error = %e, "Could not close expired poll");
                }
            }
            return PollStep::Retire;
        }

        let threshold = entry.options.reminder_unique_voters_expected;
        if threshold > 0 && !entry.reminder_done {
            let mut voters = HashSet::new();
            for tally in &snapshot.answers {
                match self.transport.fetch_voters(&entry.handle, tally.index).await {
                    Ok(ids) => voters.extend(ids),
                    Err(e) => {
                        error!(poll = %key, answer = tally.index, error = %e, "Error fetching voters");
                        return PollStep::Retire;
                    }
                }
                if voters.len() >= threshold {
                    info!(poll = %key, voters = voters.len(), "Enough unique voters, reminder not needed");
                    entry.reminder_done = true;
                    break;
                }
            }
        }

        if entry.record_tallies(&snapshot) {
            let answers = entry.answer_states(&snapshot);
            self.notify(&entry, PollEvent::Update, &answers).await;
        }

        let remind_after = hours(entry.options.remind_after_hours);
        if entry.options.callback.is_some()
            && !entry.reminder_done
            && remind_after > chrono::Duration::zero()
            && now - entry.created_at > remind_after
        {
            entry.reminder_done = true;
            let answers = entry.answer_states(&snapshot);
            self.notify(&entry, PollEvent::Reminder, &answers).await;
        }

        PollStep::Keep(entry)
    }

    /// Invokes the poll callback; errors and panics are logged and broadcast.
    async fn notify(&self, entry: &PollEntry, event: PollEvent, answers: &[PollAnswerState]) {
        let Some(callback) = &entry.options.callback else {
            return;
        };
        debug!(poll = %entry.key(), event = %event, "Poll callback");
        let outcome = AssertUnwindSafe(callback.on_event(event, &entry.handle, answers))
            .catch_unwind()
            .await;
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => panic_message(panic.as_ref()),
        };
        error!(poll = %entry.key(), event = %event, error = %message, "Error in poll callback");
        self.broadcaster
            .broadcast(
                &format!("Error in poll {} callback:\n{}", event, message),
                BroadcastOptions::color(Color::ERROR),
            )
            .await;
    }

    /// Runs [`tick`](Self::tick) every interval while `connected` is true. Stops when the
    /// sender is dropped.
    pub fn spawn(self: Arc<Self>, mut connected: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = self.config.interval.as_secs(), "Poll monitor started");
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let is_connected = *connected.borrow();
                        if is_connected {
                            self.tick().await;
                        }
                    }
                    changed = connected.changed() => {
                        if changed.is_err() {
                            info!("Connection watch closed, stopping poll monitor");
                            break;
                        }
                    }
                }
            }
        })
    }
}
