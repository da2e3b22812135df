//! Player runtime tests: command serialization, callbacks and ticks on the
//! owner task.

mod common;

use common::{seed_episode, FakeFactory, EPISODE_LENGTH};
use core_library::IdentityCache;
use core_playback::{
    PlaybackConfig, PlaybackDeps, PlaybackError, PlaybackRate, PlayerHandle, PlayerRuntime,
    PlayerState, RemoteCommand, RemoteCommandStatus, SelectOutcome,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

struct Fixture {
    player: PlayerHandle,
    task: tokio::task::JoinHandle<()>,
    factory: Arc<FakeFactory>,
    cache: Arc<IdentityCache>,
    bus: EventBus,
}

fn spawn_player(config: PlaybackConfig) -> Fixture {
    let cache = Arc::new(IdentityCache::new());
    let factory = Arc::new(FakeFactory::default());
    let bus = EventBus::new(256);
    let deps = PlaybackDeps::new(cache.clone(), factory.clone()).with_events(bus.clone());
    let (player, task) = PlayerRuntime::spawn(config, deps).unwrap();

    Fixture {
        player,
        task,
        factory,
        cache,
        bus,
    }
}

/// Poll the player until `state` is reached.
async fn wait_for_state(player: &PlayerHandle, state: PlayerState) {
    timeout(Duration::from_secs(2), async {
        loop {
            if player.snapshot().await.unwrap().state == state {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("player never reached {:?}", state));
}

#[tokio::test]
async fn test_select_and_autoplay_through_handle() {
    let fx = spawn_player(PlaybackConfig::default());
    seed_episode(&fx.cache, "a");

    let outcome = fx.player.select_episode("a").await.unwrap();
    assert!(matches!(outcome, SelectOutcome::Loading { .. }));
    assert_eq!(fx.player.snapshot().await.unwrap().state, PlayerState::Loading);

    fx.factory.latest().ready(EPISODE_LENGTH);
    wait_for_state(&fx.player, PlayerState::Playing).await;

    let info = fx.player.now_playing().await.unwrap().unwrap();
    assert_eq!(info.title, "Episode a");

    fx.player.shutdown().await;
    fx.task.await.unwrap();
}

#[tokio::test]
async fn test_rate_and_remote_commands_through_handle() {
    let fx = spawn_player(PlaybackConfig::default());
    seed_episode(&fx.cache, "a");
    fx.player.select_episode("a").await.unwrap();
    fx.factory.latest().ready(EPISODE_LENGTH);
    wait_for_state(&fx.player, PlayerState::Playing).await;

    fx.player.pause().await.unwrap();
    fx.player.set_rate(PlaybackRate::OneAndThreeQuarters).await.unwrap();
    assert_eq!(fx.factory.latest().rate(), 0.0);
    assert_eq!(
        fx.player.rate().await.unwrap(),
        PlaybackRate::OneAndThreeQuarters
    );

    assert!(matches!(
        fx.player.set_rate_value(0.75).await,
        Err(PlaybackError::InvalidRate(_))
    ));

    let status = fx
        .player
        .handle_remote_command(RemoteCommand::Play)
        .await
        .unwrap();
    assert_eq!(status, RemoteCommandStatus::Success);
    assert_eq!(fx.factory.latest().rate(), 1.75);

    fx.player.shutdown().await;
}

#[tokio::test]
async fn test_ticks_flow_only_while_playing() {
    let config = PlaybackConfig {
        tick_interval: Duration::from_millis(10),
        ..PlaybackConfig::default()
    };
    let fx = spawn_player(config);
    let mut rx = fx.bus.subscribe();
    seed_episode(&fx.cache, "a");
    fx.player.select_episode("a").await.unwrap();
    fx.factory.latest().ready(EPISODE_LENGTH);
    wait_for_state(&fx.player, PlayerState::Playing).await;

    sleep(Duration::from_millis(80)).await;
    let mut ticks = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, CoreEvent::Playback(PlaybackEvent::StateChanged { .. })) {
            ticks += 1;
        }
    }
    assert!(ticks >= 3, "expected periodic updates, got {}", ticks);

    fx.player.pause().await.unwrap();
    while rx.try_recv().is_ok() {}
    sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "no ticks after pause");

    fx.player.shutdown().await;
}

#[tokio::test]
async fn test_flush_and_export_through_handle() {
    let fx = spawn_player(PlaybackConfig::default());
    seed_episode(&fx.cache, "a");
    fx.player.select_episode("a").await.unwrap();
    fx.factory.latest().ready(EPISODE_LENGTH);
    wait_for_state(&fx.player, PlayerState::Playing).await;

    fx.factory.latest().advance(25);
    let durations = fx.player.flush_and_export().await.unwrap();
    assert!((durations["a"].percentage_listened - 0.25).abs() < 1e-9);
    assert_eq!(fx.player.listening_durations().await.unwrap(), durations);

    fx.player.shutdown().await;
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() {
    let fx = spawn_player(PlaybackConfig::default());
    fx.player.shutdown().await;
    fx.task.await.unwrap();

    assert!(fx.player.is_closed());
    assert!(matches!(
        fx.player.toggle_play().await,
        Err(PlaybackError::RuntimeClosed)
    ));
}

#[test]
fn test_spawn_requires_tokio_runtime() {
    let cache = Arc::new(IdentityCache::new());
    let deps = PlaybackDeps::new(cache, Arc::new(FakeFactory::default()));
    assert!(matches!(
        PlayerRuntime::spawn(PlaybackConfig::default(), deps),
        Err(PlaybackError::RuntimeUnavailable)
    ));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = PlaybackConfig {
        tick_interval: Duration::ZERO,
        ..PlaybackConfig::default()
    };
    let deps = PlaybackDeps::new(
        Arc::new(IdentityCache::new()),
        Arc::new(FakeFactory::default()),
    );
    assert!(matches!(
        PlayerRuntime::spawn(config, deps),
        Err(PlaybackError::InvalidConfig(_))
    ));
}
