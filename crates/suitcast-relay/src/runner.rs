use std::path::PathBuf;

use chrono::Utc;
use suitcast_core::engine::{Action, Engine};
use suitcast_core::snapshot::EngineSnapshot;
use thiserror::Error;
use tracing::{Level, event};

use crate::feed::{FeedError, FeedEvent};
use crate::outbox::Outbox;
use crate::store::{StateStore, StoreError};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("feed failed: {0}")]
    Feed(#[from] FeedError),
    #[error("checkpoint failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub source: i64,
    pub prediction: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub announced: usize,
    pub edited: usize,
    pub egress_failures: usize,
    pub checkpoints: usize,
    pub state_path: PathBuf,
}

/// Drives the engine over a feed, one event at a time.
pub struct FeedRunner<O> {
    engine: Engine,
    outbox: O,
    store: StateStore,
    channels: Channels,
    save_every: usize,
    unsaved: usize,
}

impl<O: Outbox> FeedRunner<O> {
    pub fn new(
        engine: Engine,
        outbox: O,
        store: StateStore,
        channels: Channels,
        save_every: usize,
    ) -> Self {
        Self {
            engine,
            outbox,
            store,
            channels,
            save_every: save_every.max(1),
            unsaved: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    pub fn into_parts(self) -> (Engine, O) {
        (self.engine, self.outbox)
    }

    /// Consumes the feed, checkpointing every `save_every` events and once at
    /// the end. Malformed lines are skipped; I/O failures stop the run.
    pub fn run<I>(&mut self, feed: I) -> Result<RunSummary, RunnerError>
    where
        I: IntoIterator<Item = Result<FeedEvent, FeedError>>,
    {
        let mut summary = RunSummary {
            state_path: self.store.path().to_path_buf(),
            ..RunSummary::default()
        };

        for item in feed {
            let feed_event = match item {
                Ok(feed_event) => feed_event,
                Err(err) if err.is_recoverable() => {
                    event!(
                        target: "suitcast_relay::runner",
                        Level::WARN,
                        error = %err,
                        "skipping malformed feed line"
                    );
                    summary.malformed += 1;
                    continue;
                }
                Err(err) => {
                    self.checkpoint(&mut summary)?;
                    return Err(err.into());
                }
            };

            if feed_event.chat_id != self.channels.source {
                summary.ignored += 1;
                continue;
            }

            summary.events += 1;
            self.process(&feed_event, &mut summary);

            self.unsaved += 1;
            if self.unsaved >= self.save_every {
                self.checkpoint(&mut summary)?;
            }
        }

        if self.unsaved > 0 || summary.checkpoints == 0 {
            self.checkpoint(&mut summary)?;
        }
        event!(
            target: "suitcast_relay::runner",
            Level::INFO,
            events = summary.events,
            ignored = summary.ignored,
            malformed = summary.malformed,
            announced = summary.announced,
            edited = summary.edited,
            egress_failures = summary.egress_failures,
            "feed drained"
        );
        Ok(summary)
    }

    fn process(&mut self, feed_event: &FeedEvent, summary: &mut RunSummary) {
        let now = feed_event.date.unwrap_or_else(Utc::now);
        let actions = self.engine.handle(&feed_event.text, feed_event.edited, now);
        for action in actions {
            self.deliver(action, summary);
        }
    }

    /// Egress failures are logged only; the engine keeps its state.
    fn deliver(&mut self, action: Action, summary: &mut RunSummary) {
        let chat_id = self.channels.prediction;
        match action {
            Action::Announce { target, text } => match self.outbox.send(chat_id, &text) {
                Ok(handle) => {
                    self.engine.attach_handle(target, handle);
                    summary.announced += 1;
                }
                Err(err) => {
                    summary.egress_failures += 1;
                    event!(
                        target: "suitcast_relay::runner",
                        Level::ERROR,
                        target_game = target,
                        error = %err,
                        "announcement not delivered; prediction stays pending"
                    );
                }
            },
            Action::Edit {
                target,
                handle,
                text,
            } => match self.outbox.edit(chat_id, handle, &text) {
                Ok(()) => summary.edited += 1,
                Err(err) => {
                    summary.egress_failures += 1;
                    event!(
                        target: "suitcast_relay::runner",
                        Level::ERROR,
                        target_game = target,
                        handle,
                        error = %err,
                        "status edit not delivered"
                    );
                }
            },
        }
    }

    fn checkpoint(&mut self, summary: &mut RunSummary) -> Result<(), StoreError> {
        self.store.save(&EngineSnapshot::capture(&self.engine))?;
        self.unsaved = 0;
        summary.checkpoints += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::OutboxError;
    use chrono::{DateTime, TimeZone};
    use suitcast_core::engine::{EngineConfig, SessionWindows};
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recording {
        sent: Vec<(i64, String)>,
        edits: Vec<(u64, String)>,
        fail_sends: bool,
    }

    impl Outbox for Recording {
        fn send(&mut self, chat_id: i64, text: &str) -> Result<u64, OutboxError> {
            if self.fail_sends {
                return Err(OutboxError::Io {
                    context: "sending",
                    source: std::io::Error::other("offline"),
                });
            }
            self.sent.push((chat_id, text.to_string()));
            Ok(self.sent.len() as u64 + 100)
        }

        fn edit(&mut self, _chat_id: i64, message_id: u64, text: &str) -> Result<(), OutboxError> {
            self.edits.push((message_id, text.to_string()));
            Ok(())
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).unwrap()
    }

    fn feed_line(chat_id: i64, text: &str, minute: u32) -> Result<FeedEvent, FeedError> {
        Ok(FeedEvent {
            chat_id,
            text: text.to_string(),
            edited: false,
            date: Some(at(minute)),
        })
    }

    fn runner(outbox: Recording, dir: &std::path::Path) -> FeedRunner<Recording> {
        let engine = Engine::new(EngineConfig {
            sessions: SessionWindows::always(),
            ..EngineConfig::default()
        });
        FeedRunner::new(
            engine,
            outbox,
            StateStore::new(dir.join("state.json")),
            Channels {
                source: 1,
                prediction: 2,
            },
            10,
        )
    }

    #[test]
    fn announces_then_edits_on_resolution() {
        let dir = tempdir().expect("temp dir");
        let mut runner = runner(Recording::default(), dir.path());
        let summary = runner
            .run(vec![
                feed_line(1, "#N100. ✅ (9♣)", 0),
                feed_line(99, "#N101. ✅ (A♥)", 1),
                feed_line(1, "#N102. ✅ (A♥)", 2),
            ])
            .expect("run");

        assert_eq!(summary.events, 2);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.announced, 1);
        assert_eq!(summary.edited, 1);
        assert_eq!(summary.checkpoints, 1);
        assert!(summary.state_path.exists());

        let (_, outbox) = runner.into_parts();
        assert_eq!(outbox.sent[0].0, 2);
        assert_eq!(outbox.edits[0].0, 101);
        assert!(outbox.edits[0].1.starts_with("🔵102🔵"));
    }

    #[test]
    fn failed_announcement_keeps_prediction_pending() {
        let dir = tempdir().expect("temp dir");
        let outbox = Recording {
            fail_sends: true,
            ..Recording::default()
        };
        let mut runner = runner(outbox, dir.path());
        let summary = runner.run(vec![feed_line(1, "#N100. ✅ (9♣)", 0)]).expect("run");
        assert_eq!(summary.egress_failures, 1);
        let pending = runner.engine().pending().expect("still pending");
        assert_eq!(pending.handle, None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().expect("temp dir");
        let mut runner = runner(Recording::default(), dir.path());
        let bad = serde_json::from_str::<FeedEvent>("nope").unwrap_err();
        let summary = runner
            .run(vec![
                Err(FeedError::Malformed {
                    line: 1,
                    source: bad,
                }),
                feed_line(1, "#N5. (2♦)", 0),
            ])
            .expect("run");
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.events, 1);
    }
}
