use flow_player_core::{
    AutoPlayConfig, PlayState, PlaybackEvent, Player, PlayerConfig, PlayerError, PlayerState,
    RevealConfig, RevealPlan, VirtualTimer,
};
use flow_test_fixtures::{
    approx, counting_callback, timelines, FakeTimeline, FlakyTimer, HostLog, RecordingHost,
    TimelineView, TimerDirectory,
};

fn quiet_cfg() -> PlayerConfig {
    PlayerConfig {
        auto_play: None,
        ..PlayerConfig::default()
    }
}

fn setup(cfg: PlayerConfig) -> (Player, TimelineView, HostLog) {
    let (timeline, view) = FakeTimeline::synthetic(10_000.0, 3, 4);
    let (host, log) = RecordingHost::new();
    let mut player = Player::new(cfg, Box::new(VirtualTimer))
        .unwrap()
        .with_host(Box::new(host));
    player.set_timeline(Some(timeline.boxed())).unwrap();
    (player, view, log)
}

/// it should size the timing clock as (timeline + delay) / rate
#[test]
fn clock_duration_follows_delay_and_rate() {
    for (delay, rate) in [(0.0, 1.0), (500.0, 1.0), (500.0, 1.25), (2_000.0, 0.5)] {
        let (player, _, _) = setup(PlayerConfig {
            delay_ms: delay,
            playback_rate: rate,
            ..quiet_cfg()
        });
        approx(player.duration_ms(), (10_000.0 + delay) / rate, 1e-9);
    }
}

/// it should load resources, build animations and settle paused at zero on install
#[test]
fn install_builds_paused_rig() {
    let (player, view, log) = setup(quiet_cfg());
    assert_eq!(view.fill_image_loads(), 1);
    assert_eq!(view.svg_loads(), 1);
    assert_eq!(view.batches(), 1);
    assert_eq!(player.animation_count(), 4);
    assert!(view.animations().iter().all(|a| !a.playing && a.rate == 1.0));
    assert_eq!(player.state(), PlayerState::Paused);
    assert_eq!(player.current_time(), 0.0);
    assert!(player.should_play());
    assert_eq!(log.events(), vec![PlaybackEvent::Paused]);
}

/// it should report playing right after play() and ignore a second play()
#[test]
fn play_is_idempotent() {
    let (mut player, view, log) = setup(quiet_cfg());
    player.play().unwrap();
    assert!(player.is_playing());
    player.play().unwrap();
    assert!(player.is_playing());

    assert_eq!(view.batches(), 1);
    assert!(view.animations().iter().all(|a| a.playing && a.play_calls == 1));
    assert_eq!(log.count(PlaybackEvent::Started), 1);
}

/// it should wrap each shape's own clock into the timeline span before unpausing
#[test]
fn play_resyncs_shapes() {
    let (mut player, view, _) = setup(quiet_cfg());
    view.set_shape_time(0, 12.5);
    view.set_shape_time(1, 3.0);
    player.play().unwrap();

    let shapes = view.shapes();
    approx(shapes[0].time_s, 2.5, 1e-9);
    approx(shapes[1].time_s, 3.0, 1e-9);
    assert!(shapes.iter().all(|s| !s.paused && s.unpause_calls == 1));
}

#[test]
fn play_propagates_rate_to_animations() {
    let (mut player, view, _) = setup(PlayerConfig {
        playback_rate: 1.25,
        ..quiet_cfg()
    });
    player.play().unwrap();
    assert!(view.animations().iter().all(|a| a.rate == 1.25));
}

/// it should keep elapsed time unchanged across pause()
#[test]
fn pause_keeps_elapsed_time() {
    let (mut player, view, log) = setup(quiet_cfg());
    player.play().unwrap();
    player.tick(2_500.0);
    assert_eq!(player.current_time(), 2_500.0);

    player.pause().unwrap();
    assert_eq!(player.current_time(), 2_500.0);
    assert!(!player.is_playing());
    assert_eq!(player.clock_state(), Some(PlayState::Paused));
    assert!(view.animations().iter().all(|a| !a.playing));
    assert!(view.shapes().iter().all(|s| s.paused));
    assert_eq!(log.events().last(), Some(&PlaybackEvent::Paused));
}

/// it should round-trip current time and push seconds into every shape
#[test]
fn seek_round_trip() {
    let (mut player, view, _) = setup(quiet_cfg());
    player.set_current_time(4_321.0).unwrap();
    assert_eq!(player.current_time(), 4_321.0);
    assert!(view.animations().iter().all(|a| a.current_time == 4_321.0));
    for s in view.shapes() {
        approx(s.time_s, 4.321, 1e-12);
    }
}

/// 10 s timeline, no loop: playback ends at 10 000 ms and the callback fires once
#[test]
fn finish_without_loop_stops_and_calls_back_once() {
    let (cb, count) = counting_callback();
    let (mut player, _, log) = setup(quiet_cfg());
    player.set_callback(Some(Box::new(cb)));
    player.play().unwrap();

    let r = player.tick(9_999.0);
    assert!(!r.finished);
    assert!(player.is_playing());

    let r = player.tick(1.0);
    assert!(r.finished);
    assert!(!r.looped);
    assert!(!player.is_playing());
    assert_eq!(player.state(), PlayerState::Paused);
    assert_eq!(player.current_time(), 10_000.0);
    assert_eq!(count.get(), 1);
    assert_eq!(log.events().last(), Some(&PlaybackEvent::Stopped));

    player.tick(500.0);
    assert_eq!(count.get(), 1);
}

/// it should rewind and keep playing when looping
#[test]
fn finish_with_loop_replays() {
    let (cb, count) = counting_callback();
    let (mut player, view, log) = setup(PlayerConfig {
        loop_playback: true,
        ..quiet_cfg()
    });
    player.set_callback(Some(Box::new(cb)));
    player.play().unwrap();

    let r = player.tick(10_000.0);
    assert!(r.finished && r.looped);
    assert!(player.is_playing());
    assert_eq!(player.current_time(), 0.0);
    assert!(view.animations().iter().all(|a| a.current_time == 0.0 && a.playing));
    assert_eq!(count.get(), 1);
    assert_eq!(log.count(PlaybackEvent::Started), 2);

    player.tick(4_000.0);
    assert_eq!(player.current_time(), 4_000.0);
    let r = player.tick(6_000.0);
    assert!(r.looped);
    assert_eq!(count.get(), 2);
}

#[test]
fn callback_via_builder() {
    let (cb, count) = counting_callback();
    let (timeline, _) = FakeTimeline::synthetic(1_000.0, 1, 1);
    let mut player = Player::new(quiet_cfg(), Box::new(VirtualTimer))
        .unwrap()
        .with_callback(cb);
    player.set_timeline(Some(timeline.boxed())).unwrap();
    player.play().unwrap();
    player.tick(1_000.0);
    assert_eq!(count.get(), 1);
}

/// it should rewind, pause and notify on stop()
#[test]
fn stop_rewinds_and_notifies() {
    let (mut player, _, log) = setup(quiet_cfg());
    player.play().unwrap();
    player.tick(3_000.0);
    player.stop().unwrap();

    assert!(!player.is_playing());
    assert_eq!(player.current_time(), 0.0);
    assert!(!player.should_play());
    let events = log.events();
    assert_eq!(&events[events.len() - 2..], &[PlaybackEvent::Paused, PlaybackEvent::Stopped]);
}

#[test]
fn playback_rate_reapplies_duration() {
    let (mut player, view, _) = setup(PlayerConfig {
        delay_ms: 1_000.0,
        ..quiet_cfg()
    });
    player.set_playback_rate(2.0).unwrap();
    approx(player.duration_ms(), 5_500.0, 1e-9);
    assert!(view.animations().iter().all(|a| a.rate == 2.0));

    let err = player.set_playback_rate(f64::NAN).unwrap_err();
    assert!(matches!(err, PlayerError::InvalidRate { .. }));
    assert_eq!(player.playback_rate(), 2.0);
}

/// it should cancel and detach the old animations when the timeline is swapped
#[test]
fn timeline_swap_rebuilds() {
    let (mut player, old_view, _) = setup(quiet_cfg());
    player.play().unwrap();
    player.tick(1_000.0);

    let (next, next_view) = FakeTimeline::synthetic(4_000.0, 2, 2);
    player.set_timeline(Some(next.boxed())).unwrap();

    assert!(old_view
        .animations()
        .iter()
        .all(|a| a.cancelled && a.detached && !a.playing));
    assert_eq!(next_view.batches(), 1);
    assert_eq!(player.animation_count(), 2);
    assert_eq!(player.duration_ms(), 4_000.0);
    assert_eq!(player.current_time(), 0.0);
    assert_eq!(player.state(), PlayerState::Paused);
}

#[test]
fn clearing_timeline_drops_clock() {
    let (mut player, view, _) = setup(quiet_cfg());
    player.play().unwrap();
    player.set_timeline(None).unwrap();

    assert!(view.animations().iter().all(|a| a.cancelled && a.detached));
    assert_eq!(player.state(), PlayerState::NoTimeline);
    assert_eq!(player.current_time(), 0.0);
    assert!(!player.should_play());
    assert!(player.timeline().is_none());
}

/// it should install the timeline even if the timer refuses, and build lazily on play()
#[test]
fn lazy_rig_build_on_play() {
    let (timer, calls) = FlakyTimer::new(1);
    let (timeline, view) = FakeTimeline::synthetic(2_000.0, 2, 3);
    let mut player = Player::new(quiet_cfg(), Box::new(timer)).unwrap();

    let err = player.set_timeline(Some(timeline.boxed())).unwrap_err();
    assert!(matches!(err, PlayerError::MissingElement { .. }));
    assert_eq!(player.state(), PlayerState::Idle);
    assert_eq!(view.batches(), 0);
    assert!(matches!(
        player.set_current_time(10.0),
        Err(PlayerError::UninitializedState { .. })
    ));

    player.play().unwrap();
    assert!(player.is_playing());
    assert_eq!(calls.get(), 2);
    assert_eq!(view.batches(), 1);
    assert_eq!(player.animation_count(), 3);
}

#[test]
fn broken_shape_does_not_abort_play() {
    let (mut player, view, _) = setup(quiet_cfg());
    view.break_shape(1);
    player.play().unwrap();
    assert!(player.is_playing());
    let shapes = view.shapes();
    assert_eq!(shapes[0].unpause_calls, 1);
    assert_eq!(shapes[1].unpause_calls, 0);
    assert_eq!(shapes[2].unpause_calls, 1);
}

#[test]
fn refusing_host_is_tolerated() {
    let (timeline, _) = FakeTimeline::synthetic(1_000.0, 1, 1);
    let mut player = Player::new(quiet_cfg(), Box::new(VirtualTimer))
        .unwrap()
        .with_host(Box::new(RecordingHost::failing()));
    player.set_timeline(Some(timeline.boxed())).unwrap();
    player.play().unwrap();
    assert!(player.is_playing());
}

#[test]
fn reveal_runs_on_play_and_finish() {
    let (mut player, _, log) = setup(PlayerConfig {
        reveal: Some(RevealConfig { step_ms: 250.0 }),
        ..quiet_cfg()
    });
    player.play().unwrap();
    assert_eq!(log.reveals(), vec![RevealPlan::new(250.0)]);
    assert_eq!(log.reveals()[0].delay_for(3), 750.0);
    player.tick(10_000.0);
    assert_eq!(log.reveals().len(), 2);
}

/// a failed pause or stop must not tell the host anything happened
#[test]
fn aborted_transport_sends_no_events() {
    let (timer, _) = FlakyTimer::new(5);
    let (timeline, view) = FakeTimeline::synthetic(2_000.0, 2, 2);
    let (host, log) = RecordingHost::new();
    let mut player = Player::new(quiet_cfg(), Box::new(timer))
        .unwrap()
        .with_host(Box::new(host));
    assert!(player.set_timeline(Some(timeline.boxed())).is_err());
    log.clear();

    assert!(matches!(
        player.pause(),
        Err(PlayerError::UninitializedState { .. })
    ));
    assert!(matches!(
        player.stop(),
        Err(PlayerError::UninitializedState { .. })
    ));
    assert!(log.events().is_empty());
    assert!(view.shapes().iter().all(|s| !s.paused));
    assert!(!player.should_play());
}

/// every bundled timeline should install, run to its end once and settle
#[test]
fn every_fixture_plays_through() {
    let keys = timelines::keys();
    assert!(keys.len() >= 2);
    for key in keys {
        let spec = timelines::spec(&key).unwrap();
        let (timeline, view) = timelines::load(&key).unwrap();
        let (callback, count) = counting_callback();
        let mut player = Player::new(quiet_cfg(), Box::new(VirtualTimer))
            .unwrap()
            .with_callback(callback);
        player.set_timeline(Some(timeline.boxed())).unwrap();
        assert_eq!(player.animation_count(), spec.tracks.len(), "{key}");
        assert_eq!(view.shapes().len(), spec.shapes.len(), "{key}");

        player.play().unwrap();
        let mut elapsed = 0.0;
        while elapsed < spec.duration_ms {
            player.tick(100.0);
            elapsed += 100.0;
        }
        player.tick(100.0);
        assert!(!player.is_playing(), "{key}");
        assert_eq!(player.current_time(), spec.duration_ms, "{key}");
        assert_eq!(count.get(), 1, "{key}");
    }
}

#[test]
fn timer_lookup_by_id() {
    let mut dir = TimerDirectory(vec!["clock".into()]);
    assert!(Player::from_timer_id(quiet_cfg(), "clock", &mut dir).is_ok());
    let err = Player::from_timer_id(quiet_cfg(), "missing", &mut dir).unwrap_err();
    assert!(matches!(err, PlayerError::MissingElement { .. }));
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = PlayerConfig {
        auto_play: Some(AutoPlayConfig {
            threshold: 0.2,
            extra_delay_ms: 0.0,
        }),
        ..PlayerConfig::default()
    };
    assert!(matches!(
        Player::new(cfg, Box::new(VirtualTimer)),
        Err(PlayerError::InvalidConfig { .. })
    ));
}

/// it should drive the multi-variant chart fixture end to end
#[test]
fn chart_fixture_plays_through() {
    let (timeline, view) = timelines::load("multi-variant-chart").unwrap();
    let mut player = Player::new(quiet_cfg(), Box::new(VirtualTimer)).unwrap();
    player.set_timeline(Some(timeline.boxed())).unwrap();

    assert_eq!(player.timeline_duration_ms(), Some(10_000.0));
    assert_eq!(view.shapes().len(), 26);
    assert_eq!(player.animation_count(), 13);
    assert!(view
        .animations()
        .iter()
        .any(|a| a.name == "mask_1_widthTrack"));
    assert!(view
        .animations()
        .iter()
        .any(|a| a.name == "inner_circle_1_topTrack"));

    player.play().unwrap();
    for _ in 0..301 {
        player.tick(100.0 / 3.0);
    }
    assert!(!player.is_playing());
    assert_eq!(player.current_time(), 10_000.0);
}
