//! # Player Runtime
//!
//! Runs a [`PlaybackEngine`] on its own tokio task. Listener commands,
//! remote commands, session callbacks and ticks are all funneled into one
//! `select!` loop, so engine transitions never interleave.
//!
//! ```ignore
//! let (player, task) = PlayerRuntime::spawn(PlaybackConfig::default(), deps)?;
//! player.select_episode("42").await?;
//! player.set_rate(PlaybackRate::OneAndHalf).await?;
//! player.shutdown().await;
//! task.await?;
//! ```

use crate::config::PlaybackConfig;
use crate::engine::{PlaybackDeps, PlaybackEngine, SelectOutcome};
use crate::error::{PlaybackError, Result};
use crate::notifier::{PlaybackSnapshot, PlayerDelegate};
use crate::rate::PlaybackRate;
use crate::remote::{RemoteCommand, RemoteCommandStatus};
use bridge_traits::{ListeningDuration, NowPlayingInfo, SessionEvent};
use std::collections::HashMap;
use std::sync::Weak;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

type Reply<T> = oneshot::Sender<T>;

enum PlayerMessage {
    SelectEpisode {
        episode_id: String,
        reply: Reply<Result<SelectOutcome>>,
    },
    TogglePlay {
        reply: Reply<Result<bool>>,
    },
    Play {
        reply: Reply<Result<()>>,
    },
    Pause {
        reply: Reply<Result<()>>,
    },
    Skip {
        seconds: f64,
        reply: Reply<Result<()>>,
    },
    SeekTo {
        position: f64,
        reply: Reply<Result<()>>,
    },
    SeekToFraction {
        fraction: f64,
        reply: Reply<Result<()>>,
    },
    BeginScrubbing {
        reply: Reply<()>,
    },
    SetRate {
        rate: PlaybackRate,
        reply: Reply<()>,
    },
    Remote {
        command: RemoteCommand,
        reply: Reply<RemoteCommandStatus>,
    },
    SetDelegate {
        delegate: Weak<dyn PlayerDelegate>,
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<PlaybackSnapshot>,
    },
    NowPlaying {
        reply: Reply<Option<NowPlayingInfo>>,
    },
    FlushAndExport {
        reply: Reply<HashMap<String, ListeningDuration>>,
    },
    ListeningDurations {
        reply: Reply<HashMap<String, ListeningDuration>>,
    },
    Shutdown,
}

/// Owner task of the playback engine.
pub struct PlayerRuntime {
    engine: PlaybackEngine,
    commands: mpsc::Receiver<PlayerMessage>,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl PlayerRuntime {
    /// Build the engine and spawn its task on the current tokio runtime.
    pub fn spawn(config: PlaybackConfig, deps: PlaybackDeps) -> Result<(PlayerHandle, JoinHandle<()>)> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| PlaybackError::RuntimeUnavailable)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::channel(config.command_buffer.max(1));
        let engine = PlaybackEngine::new(config, deps, events_tx)?;

        let runtime = PlayerRuntime {
            engine,
            commands: commands_rx,
            session_events: events_rx,
        };
        let task = handle.spawn(runtime.run());
        info!("Player runtime started");

        Ok((PlayerHandle { commands: commands_tx }, task))
    }

    async fn run(mut self) {
        let mut ticker = interval(self.engine.config().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                Some(event) = self.session_events.recv() => {
                    let disposition = self.engine.handle_session_event(event);
                    debug!(?disposition, "Session event handled");
                }
                message = self.commands.recv() => match message {
                    Some(PlayerMessage::Shutdown) | None => break,
                    Some(message) => self.dispatch(message),
                },
                _ = ticker.tick(), if self.engine.is_ticking() => {
                    self.engine.on_tick();
                }
            }
        }

        info!("Player runtime stopped");
    }

    fn dispatch(&mut self, message: PlayerMessage) {
        let engine = &mut self.engine;
        // A dropped reply receiver only means the caller stopped waiting.
        match message {
            PlayerMessage::SelectEpisode { episode_id, reply } => {
                let _ = reply.send(engine.select_episode(&episode_id));
            }
            PlayerMessage::TogglePlay { reply } => {
                let _ = reply.send(engine.toggle_play());
            }
            PlayerMessage::Play { reply } => {
                let _ = reply.send(engine.play());
            }
            PlayerMessage::Pause { reply } => {
                let _ = reply.send(engine.pause());
            }
            PlayerMessage::Skip { seconds, reply } => {
                let _ = reply.send(engine.skip(seconds));
            }
            PlayerMessage::SeekTo { position, reply } => {
                let _ = reply.send(engine.seek_to(position));
            }
            PlayerMessage::SeekToFraction { fraction, reply } => {
                let _ = reply.send(engine.seek_to_fraction(fraction));
            }
            PlayerMessage::BeginScrubbing { reply } => {
                engine.begin_scrubbing();
                let _ = reply.send(());
            }
            PlayerMessage::SetRate { rate, reply } => {
                engine.set_rate(rate);
                let _ = reply.send(());
            }
            PlayerMessage::Remote { command, reply } => {
                let _ = reply.send(engine.handle_remote_command(command));
            }
            PlayerMessage::SetDelegate { delegate, reply } => {
                engine.set_delegate(delegate);
                let _ = reply.send(());
            }
            PlayerMessage::Snapshot { reply } => {
                let _ = reply.send(engine.snapshot());
            }
            PlayerMessage::NowPlaying { reply } => {
                let _ = reply.send(engine.now_playing().cloned());
            }
            PlayerMessage::FlushAndExport { reply } => {
                let _ = reply.send(engine.flush_and_export());
            }
            PlayerMessage::ListeningDurations { reply } => {
                let _ = reply.send(engine.listening_durations());
            }
            PlayerMessage::Shutdown => {}
        }
    }
}

/// Cloneable handle to the player task.
///
/// Every method fails with [`PlaybackError::RuntimeClosed`] once the task
/// has stopped.
#[derive(Clone, Debug)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerMessage>,
}

impl PlayerHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> PlayerMessage) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| PlaybackError::RuntimeClosed)?;
        response.await.map_err(|_| PlaybackError::RuntimeClosed)
    }

    pub async fn select_episode(&self, episode_id: impl Into<String>) -> Result<SelectOutcome> {
        let episode_id = episode_id.into();
        self.request(|reply| PlayerMessage::SelectEpisode { episode_id, reply })
            .await?
    }

    pub async fn toggle_play(&self) -> Result<bool> {
        self.request(|reply| PlayerMessage::TogglePlay { reply }).await?
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|reply| PlayerMessage::Play { reply }).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| PlayerMessage::Pause { reply }).await?
    }

    pub async fn skip(&self, seconds: f64) -> Result<()> {
        self.request(|reply| PlayerMessage::Skip { seconds, reply }).await?
    }

    pub async fn seek_to(&self, position: f64) -> Result<()> {
        self.request(|reply| PlayerMessage::SeekTo { position, reply })
            .await?
    }

    pub async fn seek_to_fraction(&self, fraction: f64) -> Result<()> {
        self.request(|reply| PlayerMessage::SeekToFraction { fraction, reply })
            .await?
    }

    pub async fn begin_scrubbing(&self) -> Result<()> {
        self.request(|reply| PlayerMessage::BeginScrubbing { reply })
            .await
    }

    pub async fn set_rate(&self, rate: PlaybackRate) -> Result<()> {
        self.request(|reply| PlayerMessage::SetRate { rate, reply }).await
    }

    /// Validate a raw rate before sending it to the player.
    pub async fn set_rate_value(&self, rate: f32) -> Result<()> {
        let rate = PlaybackRate::try_from(rate)?;
        self.set_rate(rate).await
    }

    pub async fn rate(&self) -> Result<PlaybackRate> {
        Ok(self.snapshot().await?.rate)
    }

    pub async fn handle_remote_command(&self, command: RemoteCommand) -> Result<RemoteCommandStatus> {
        self.request(|reply| PlayerMessage::Remote { command, reply })
            .await
    }

    pub async fn set_delegate(&self, delegate: Weak<dyn PlayerDelegate>) -> Result<()> {
        self.request(|reply| PlayerMessage::SetDelegate { delegate, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        self.request(|reply| PlayerMessage::Snapshot { reply }).await
    }

    pub async fn now_playing(&self) -> Result<Option<NowPlayingInfo>> {
        self.request(|reply| PlayerMessage::NowPlaying { reply }).await
    }

    pub async fn flush_and_export(&self) -> Result<HashMap<String, ListeningDuration>> {
        self.request(|reply| PlayerMessage::FlushAndExport { reply })
            .await
    }

    pub async fn listening_durations(&self) -> Result<HashMap<String, ListeningDuration>> {
        self.request(|reply| PlayerMessage::ListeningDurations { reply })
            .await
    }

    /// Ask the task to stop. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(PlayerMessage::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
