//! Host-level command flow through `CoreService` and `PlayerRegistry`.

mod common;

use bridge_traits::{MediaSource, PlayerId};
use common::*;
use core_runtime::events::{PlaybackEvent, PlaybackState};
use core_service::{CommandResponse, CoreService, PlayerCommand};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn service() -> (CoreService, Arc<ScriptedFactory>) {
    let factory = Arc::new(ScriptedFactory::default());
    let service = CoreService::bootstrap(config(Arc::clone(&factory))).unwrap();
    (service, factory)
}

#[tokio::test]
async fn test_full_session_scenario() {
    let (service, _factory) = service();
    let registry = service.registry();

    for _ in 0..6 {
        let id = registry
            .create(&MediaSource::network("https://example.com/warmup.mp4"))
            .unwrap();
        registry.dispose(id).unwrap();
    }

    let id = registry
        .create(&MediaSource::network("https://example.com/big_buck_bunny.mp4"))
        .unwrap();
    assert_eq!(id, PlayerId::new(7));
    let mut events = service.events(id).unwrap();

    assert_eq!(
        next_event(&mut events).await,
        PlaybackEvent::Initialized {
            duration: 12_000,
            width: 1920,
            height: 1080,
            id: PlayerId::new(7),
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        PlaybackEvent::state(PlaybackState::Ready)
    );

    registry.play(id).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        PlaybackEvent::state(PlaybackState::Playing)
    );

    registry.seek_to(id, 5000).unwrap();
    let position = wait_for_position(&mut events, 5000).await;
    assert!((5000..5500).contains(&position));

    registry.dispose(id).unwrap();
    let err = registry.play(id).unwrap_err();
    assert_eq!(err.code(), "NO_PLAYER");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_per_player_subscriber_still_sees_preroll() {
    let (service, _factory) = service();
    let registry = service.registry();

    let id = registry.create(&MediaSource::file("/videos/a.mp4")).unwrap();
    // Worker threads finish preroll while the host is busy elsewhere.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut events = service.events(id).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        PlaybackEvent::Initialized {
            duration: DURATION_MS,
            width: WIDTH,
            height: HEIGHT,
            id,
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        PlaybackEvent::state(PlaybackState::Ready)
    );

    // Later subscribers start from the present.
    let mut later = service.events(id).unwrap();
    registry.play(id).unwrap();
    for stream in [&mut events, &mut later] {
        assert_eq!(
            next_event(stream).await,
            PlaybackEvent::state(PlaybackState::Playing)
        );
    }
}

#[tokio::test]
async fn test_ids_are_unique_and_never_reused() {
    let (service, _factory) = service();
    let registry = service.registry();

    let a = registry.create(&MediaSource::file("/videos/a.mp4")).unwrap();
    let b = registry.create(&MediaSource::file("/videos/b.mp4")).unwrap();
    registry.dispose(a).unwrap();
    let c = registry.create(&MediaSource::file("/videos/c.mp4")).unwrap();

    assert_ne!(a, b);
    assert_ne!(c, a);
    assert_ne!(c, b);
    assert_eq!(registry.ids(), vec![b, c]);
}

#[tokio::test]
async fn test_sources_are_resolved() {
    let (service, factory) = service();
    let registry = service.registry();

    registry.create(&MediaSource::file("/videos/a.mp4")).unwrap();
    registry.create(&MediaSource::asset("videos/intro.mp4")).unwrap();

    assert_eq!(
        *factory.opened.lock(),
        vec![
            "file:///videos/a.mp4".to_string(),
            "file:///app/data/flutter_assets/videos/intro.mp4".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_create_rejects_bad_sources() {
    let (service, factory) = service();
    let registry = service.registry();

    let empty = registry.create(&MediaSource::network("")).unwrap_err();
    assert_eq!(empty.code(), "INVALID_SOURCE");

    let unresolvable = registry
        .create(&MediaSource::asset("/etc/passwd"))
        .unwrap_err();
    assert_eq!(unresolvable.code(), "INVALID_SOURCE");

    let broken = registry
        .create(&MediaSource::network("https://example.com/broken.mp4"))
        .unwrap_err();
    assert_eq!(broken.code(), "OPEN_FAILED");

    assert!(registry.is_empty());
    assert!(factory.opened.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_ids_report_no_player() {
    let (service, _factory) = service();
    let registry = service.registry();
    let ghost = PlayerId::new(42);

    assert_eq!(registry.play(ghost).unwrap_err().code(), "NO_PLAYER");
    assert_eq!(registry.set_volume(ghost, 0.5).unwrap_err().code(), "NO_PLAYER");
    assert_eq!(registry.enter_pip(ghost).unwrap_err().code(), "NO_PLAYER");
    assert_eq!(registry.subtitle_tracks(ghost).unwrap_err().code(), "NO_PLAYER");
    assert_eq!(service.events(ghost).err().unwrap().code(), "NO_PLAYER");

    // Disposing an unknown id is a no-op.
    assert!(registry.dispose(ghost).is_ok());
}

#[tokio::test]
async fn test_dispose_is_idempotent() {
    let (service, factory) = service();
    let registry = service.registry();
    let id = registry.create(&MediaSource::file("/videos/a.mp4")).unwrap();
    let mut all = service.subscribe();

    registry.dispose(id).unwrap();
    registry.dispose(id).unwrap();

    assert_eq!(factory.disposed.load(Ordering::SeqCst), 1);
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert!(all.try_recv().is_none());
}

#[tokio::test]
async fn test_validation_errors_leave_state_untouched() {
    let (service, _factory) = service();
    let registry = service.registry();
    let id = registry.create(&MediaSource::file("/videos/a.mp4")).unwrap();

    assert_eq!(registry.seek_to(id, -5).unwrap_err().code(), "INVALID_ARGS");
    assert_eq!(
        registry.set_playback_speed(id, -1.0).unwrap_err().code(),
        "INVALID_ARGS"
    );
    assert_eq!(registry.set_volume(id, 1.5).unwrap(), 1.0);
    assert_eq!(registry.volume(id).unwrap(), 1.0);
    assert_eq!(registry.set_volume(id, -1.0).unwrap(), 0.0);
}

#[tokio::test]
async fn test_execute_typed_commands() {
    let (service, _factory) = service();

    let created = service
        .execute(
            serde_json::from_str(
                r#"{"method": "create", "source": {"network": {"url": "https://example.com/a.mp4"}}}"#,
            )
            .unwrap(),
        )
        .unwrap();
    let id = match created {
        CommandResponse::Created { id } => id,
        other => panic!("unexpected response {:?}", other),
    };

    assert_eq!(
        service
            .execute(PlayerCommand::SetVolume { id, volume: 2.0 })
            .unwrap(),
        CommandResponse::Volume(1.0)
    );
    assert_eq!(
        service.execute(PlayerCommand::IsPipAvailable).unwrap(),
        CommandResponse::Bool(false)
    );
    assert_eq!(
        service
            .execute(PlayerCommand::GetSubtitleTracks { id })
            .unwrap(),
        CommandResponse::SubtitleTracks(Vec::new())
    );
    assert_eq!(
        service
            .execute(PlayerCommand::SetMediaMetadata {
                id,
                title: Some("Intro".into()),
                artist: None,
                album: None,
                artwork_url: None,
            })
            .unwrap(),
        CommandResponse::Ack
    );
    assert_eq!(
        service.registry().metadata(id).unwrap().title.as_deref(),
        Some("Intro")
    );

    match service.execute(PlayerCommand::GetDecoderInfo { id }).unwrap() {
        CommandResponse::DecoderInfo(info) => assert!(!info.is_hardware_accelerated),
        other => panic!("unexpected response {:?}", other),
    }

    service.execute(PlayerCommand::Dispose { id }).unwrap();
    let err = service.execute(PlayerCommand::Play { id }).unwrap_err();
    assert_eq!(err.code(), "NO_PLAYER");
}

#[tokio::test]
async fn test_shutdown_disposes_everything() {
    let (service, factory) = service();
    let registry = service.registry();
    registry.create(&MediaSource::file("/videos/a.mp4")).unwrap();
    registry.create(&MediaSource::file("/videos/b.mp4")).unwrap();

    service.shutdown();

    assert!(registry.is_empty());
    assert_eq!(factory.disposed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_memory_pressure_reaches_every_player() {
    let (service, _factory) = service();
    let registry = service.registry();
    let a = registry.create(&MediaSource::file("/videos/a.mp4")).unwrap();
    let b = registry.create(&MediaSource::file("/videos/b.mp4")).unwrap();
    let mut events_a = service.events(a).unwrap();
    let mut events_b = service.events(b).unwrap();

    for events in [&mut events_a, &mut events_b] {
        assert!(matches!(
            next_event(events).await,
            PlaybackEvent::Initialized { .. }
        ));
        assert_eq!(
            next_event(events).await,
            PlaybackEvent::state(PlaybackState::Ready)
        );
    }

    let notified =
        registry.notify_memory_pressure(bridge_traits::MemoryPressureLevel::Warning);
    assert_eq!(notified, 2);

    for events in [&mut events_a, &mut events_b] {
        assert_eq!(
            next_event(events).await,
            PlaybackEvent::MemoryPressure {
                level: bridge_traits::MemoryPressureLevel::Warning
            }
        );
    }
}
