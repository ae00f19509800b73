//! Integration tests for the timeline player
//!
//! These tests drive a real player, with its decode thread, against a mock
//! timeline:
//! - Cache filling, budgets and read failures
//! - Playback timing and loop modes
//! - Time linking between players
//! - Error handling

use anyhow::{bail, Result};
use timeline_player_integration_tests::{init_logging, wait_for, MockReadSystem, MockTimeline};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use timeline_player::audio::AudioDeviceId;
use timeline_player::cache::GIGABYTE;
use timeline_player::{
    Loop, Playback, Player, PlayerCacheOptions, PlayerError, PlayerOptions, RationalTime,
    TimeAction, TimeRange, Timeline, TimerMode,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn options() -> PlayerOptions {
    PlayerOptions {
        audio_device: AudioDeviceId::Disabled,
        ..Default::default()
    }
}

fn frame(value: f64) -> RationalTime {
    RationalTime::new(value, 24.0)
}

/// Tick until the cache holds `bytes` of video
fn wait_for_video_bytes(player: &mut Player, bytes: usize) -> Result<()> {
    wait_for(TIMEOUT, || {
        player.tick();
        player.cache_info().video_bytes == bytes
    })
}

#[test]
fn test_new_rejects_empty_timeline() -> Result<()> {
    init_logging();
    match Player::new(MockTimeline::empty(24.0), options()) {
        Err(PlayerError::InvalidTimeline(_)) => Ok(()),
        Err(err) => bail!("unexpected error: {}", err),
        Ok(_) => bail!("empty timeline accepted"),
    }
}

#[test]
fn test_open_through_read_system() -> Result<()> {
    init_logging();
    let read_system = MockReadSystem {
        timeline: MockTimeline::video(24.0, 10.0),
    };
    let mut io_options = timeline_player::IoOptions::new();
    io_options.insert("Threads".to_string(), "2".to_string());

    let player = Player::open(&read_system, Path::new("shot.otio"), &io_options, options())?;
    assert_eq!(player.io_options(), &io_options);
    assert_eq!(player.time_range().duration(), frame(240.0));
    assert_eq!(player.current_time(), frame(0.0));
    assert_eq!(player.playback(), Playback::Stop);
    assert!(!player.has_audio_output());

    assert!(matches!(
        Player::open(&read_system, Path::new("shot.mov"), &io_options, options()),
        Err(PlayerError::UnsupportedFormat(_))
    ));
    Ok(())
}

#[test]
fn test_cache_fills_window_around_current_time() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let mut player = Player::new(timeline.clone(), options())?;

    // Two seconds ahead, half a second behind wrapping to the end.
    wait_for_video_bytes(&mut player, 61 * timeline.frame_bytes())?;
    let info = player.cache_info();
    assert!(info.video_percentage > 0.0);
    assert_eq!(info.video.len(), 2);
    assert_eq!(timeline.reads_of(48), 1);
    assert_eq!(timeline.reads_of(100), 0);

    player.tick();
    let video = player.current_video();
    assert_eq!(video.len(), 1);
    assert_eq!(video[0].time, frame(0.0));
    Ok(())
}

#[test]
fn test_compare_sources_share_cache_window() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let other = MockTimeline::video(24.0, 10.0);
    let mut player = Player::new(timeline.clone(), options())?;
    player.set_compare(vec![other.clone() as Arc<dyn Timeline>]);

    // One second ahead and a quarter second behind for each source.
    wait_for_video_bytes(&mut player, 31 * 2 * timeline.frame_bytes())?;
    assert_eq!(other.reads_of(24), 1);
    assert_eq!(other.reads_of(25), 0);
    assert_eq!(other.reads_of(234), 1);
    assert_eq!(other.reads_of(233), 0);
    Ok(())
}

#[test]
fn test_oversized_frames_stop_reading_when_full() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::with_returned_size(24.0, 10.0, 64, 64);
    let budget = 40 * timeline.frame_bytes();
    let mut player = Player::new(
        timeline.clone(),
        PlayerOptions {
            cache: PlayerCacheOptions {
                video_gb: budget as f64 / GIGABYTE,
                ..Default::default()
            },
            ..options()
        },
    )?;

    wait_for_video_bytes(&mut player, 2 * timeline.returned_frame_bytes())?;
    let reads = timeline.video_read_count();
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(300) {
        player.tick();
        assert!(player.cache_info().video_bytes <= budget);
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(timeline.video_read_count(), reads);
    Ok(())
}

#[test]
fn test_cache_stays_within_budget() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let budget = 10 * timeline.frame_bytes();
    let mut player = Player::new(
        timeline.clone(),
        PlayerOptions {
            cache: PlayerCacheOptions {
                video_gb: budget as f64 / GIGABYTE,
                ..Default::default()
            },
            ..options()
        },
    )?;

    wait_for(TIMEOUT, || {
        player.tick();
        assert!(player.cache_info().video_bytes <= budget);
        player.cache_info().video_bytes == budget
    })?;

    player.seek(frame(120.0));
    wait_for(TIMEOUT, || {
        player.tick();
        assert!(player.cache_info().video_bytes <= budget);
        timeline.reads_of(129) > 0 && player.cache_info().video_bytes == budget
    })?;
    Ok(())
}

#[test]
fn test_zero_budget_reads_nothing() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let mut player = Player::new(
        timeline.clone(),
        PlayerOptions {
            cache: PlayerCacheOptions {
                video_gb: 0.0,
                ..Default::default()
            },
            ..options()
        },
    )?;

    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(100) {
        player.tick();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(timeline.video_read_count(), 0);
    assert_eq!(player.cache_info().video_bytes, 0);
    Ok(())
}

#[test]
fn test_cache_options_clear_cache() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let mut player = Player::new(timeline.clone(), options())?;
    wait_for_video_bytes(&mut player, 61 * timeline.frame_bytes())?;

    player.set_cache_options(PlayerCacheOptions {
        video_gb: 0.0,
        ..Default::default()
    });
    wait_for_video_bytes(&mut player, 0)?;
    Ok(())
}

#[test]
fn test_failed_reads_are_retried_and_not_cached() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    timeline.fail_frames(5..=7);
    let mut player = Player::new(timeline.clone(), options())?;

    wait_for(TIMEOUT, || {
        player.tick();
        timeline.reads_of(5) >= 2 && player.cache_info().video_bytes == 58 * timeline.frame_bytes()
    })?;
    assert_eq!(player.cache_info().video.len(), 3);
    Ok(())
}

#[test]
fn test_playback_at_frame_rate() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let mut player = Player::new(timeline.clone(), options())?;
    player.seek(frame(0.0));
    wait_for_video_bytes(&mut player, 61 * timeline.frame_bytes())?;

    let start = Instant::now();
    player.forward();
    while start.elapsed() < Duration::from_secs(1) {
        player.tick();
        std::thread::sleep(Duration::from_millis(10));
    }
    player.tick();

    let current = player.current_time().frame();
    assert!((23..=25).contains(&current), "frame {}", current);
    assert_eq!(player.dropped_frames(), 0);
    assert_eq!(player.current_video()[0].time, player.current_time());
    Ok(())
}

#[test]
fn test_speed() -> Result<()> {
    init_logging();
    let mut player = Player::new(MockTimeline::video(24.0, 10.0), options())?;
    assert_eq!(player.default_speed(), 24.0);
    assert!(matches!(player.set_speed(0.0), Err(PlayerError::InvalidInput(_))));
    assert!(matches!(player.set_speed(f64::NAN), Err(PlayerError::InvalidInput(_))));
    assert_eq!(player.speed(), 24.0);

    player.set_speed(48.0)?;
    let start = Instant::now();
    player.forward();
    std::thread::sleep(Duration::from_millis(500).saturating_sub(start.elapsed()));
    player.tick();
    let current = player.current_time().frame();
    assert!((23..=27).contains(&current), "frame {}", current);
    Ok(())
}

#[test]
fn test_frame_timer_advances_one_frame_per_tick() -> Result<()> {
    init_logging();
    let mut player = Player::new(
        MockTimeline::video(24.0, 10.0),
        PlayerOptions {
            timer_mode: TimerMode::Frame,
            ..options()
        },
    )?;
    player.forward();
    std::thread::sleep(Duration::from_millis(500));
    player.tick();
    assert_eq!(player.current_time(), frame(1.0));
    player.tick();
    assert_eq!(player.current_time(), frame(2.0));
    Ok(())
}

#[test]
fn test_once_clamps_and_stops() -> Result<()> {
    init_logging();
    let mut player = Player::new(MockTimeline::video(24.0, 0.5), options())?;
    player.set_loop(Loop::Once);

    player.seek(frame(100.0));
    assert_eq!(player.current_time(), frame(11.0));
    assert!(!player.looped());

    // Playing from the end rewinds first.
    player.forward();
    assert_eq!(player.current_time(), frame(0.0));

    wait_for(TIMEOUT, || {
        player.tick();
        player.playback() == Playback::Stop
    })?;
    assert_eq!(player.current_time(), frame(11.0));

    player.forward();
    player.seek(frame(-5.0));
    assert_eq!(player.current_time(), frame(0.0));
    assert_eq!(player.playback(), Playback::Stop);
    Ok(())
}

#[test]
fn test_loop_wraps_seeks() -> Result<()> {
    init_logging();
    let mut player = Player::new(MockTimeline::video(24.0, 10.0), options())?;
    let looped = Arc::new(AtomicUsize::new(0));
    let counter = looped.clone();
    let _subscription = player.observe_looped().subscribe(move |_| {
        counter.fetch_add(1, Ordering::AcqRel);
    });

    player.seek(frame(250.0));
    assert_eq!(player.current_time(), frame(10.0));
    assert!(player.looped());
    assert_eq!(looped.load(Ordering::Acquire), 1);

    player.seek(frame(-1.0));
    assert_eq!(player.current_time(), frame(239.0));
    assert_eq!(looped.load(Ordering::Acquire), 2);
    Ok(())
}

#[test]
fn test_ping_pong_reverses_at_out_point() -> Result<()> {
    init_logging();
    let mut player = Player::new(MockTimeline::video(24.0, 10.0), options())?;
    player.set_loop(Loop::PingPong);
    player.set_in_out_range(TimeRange::from_start_end_inclusive(frame(0.0), frame(5.0)));
    player.forward();

    wait_for(TIMEOUT, || {
        player.tick();
        player.playback() == Playback::Reverse
    })?;
    assert_eq!(player.current_time(), frame(5.0));
    Ok(())
}

#[test]
fn test_in_out_range() -> Result<()> {
    init_logging();
    let mut player = Player::new(MockTimeline::video(24.0, 10.0), options())?;

    player.set_in_out_range(TimeRange::from_start_end_inclusive(frame(10.0), frame(20.0)));
    assert_eq!(player.current_time(), frame(10.0));

    player.time_action(TimeAction::End);
    assert_eq!(player.current_time(), frame(20.0));
    player.time_action(TimeAction::FrameNext);
    assert_eq!(player.current_time(), frame(10.0));
    player.time_action(TimeAction::FramePrev);
    assert_eq!(player.current_time(), frame(20.0));

    player.set_out_point(frame(500.0));
    assert_eq!(player.in_out_range().end_time_inclusive(), frame(239.0));
    player.reset_in_point();
    assert_eq!(player.in_out_range(), player.time_range());
    Ok(())
}

#[test]
fn test_observers_notify_playback_changes() -> Result<()> {
    init_logging();
    let mut player = Player::new(MockTimeline::video(24.0, 10.0), options())?;
    let changes = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = changes.clone();
    let subscription = player.observe_playback().subscribe(move |playback| {
        seen.lock().push(*playback);
    });

    player.toggle_playback();
    player.toggle_playback();
    player.reverse();
    player.reverse();
    assert_eq!(*changes.lock(), vec![Playback::Forward, Playback::Stop, Playback::Reverse]);

    drop(subscription);
    player.stop();
    assert_eq!(changes.lock().len(), 3);
    Ok(())
}

#[test]
fn test_linked_player_follows_primary() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let mut a = Player::new(timeline.clone(), options())?;
    let mut b = Player::new(timeline.clone(), options())?;

    b.link_time(&a)?;
    assert!(b.is_linked());
    assert_eq!(a.follower_count(), 1);

    a.seek(frame(50.0));
    b.tick();
    assert_eq!(b.current_time(), frame(50.0));

    b.unlink_time();
    assert_eq!(a.follower_count(), 0);
    a.seek(frame(60.0));
    b.tick();
    assert_eq!(b.current_time(), frame(50.0));
    Ok(())
}

#[test]
fn test_link_chains_are_rejected() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let mut a = Player::new(timeline.clone(), options())?;
    let mut b = Player::new(timeline.clone(), options())?;
    let mut c = Player::new(timeline.clone(), options())?;

    b.link_time(&a)?;
    assert!(matches!(c.link_time(&b), Err(PlayerError::Sync(_))));
    assert!(matches!(a.link_time(&c), Err(PlayerError::Sync(_))));
    assert!(!c.is_linked());
    assert!(!a.is_linked());
    Ok(())
}

#[test]
fn test_follower_keeps_time_after_primary_drops() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::video(24.0, 10.0);
    let mut a = Player::new(timeline.clone(), options())?;
    let mut b = Player::new(timeline.clone(), options())?;
    b.link_time(&a)?;

    a.seek(frame(30.0));
    b.tick();
    drop(a);
    b.tick();
    assert_eq!(b.current_time(), frame(30.0));
    Ok(())
}

#[test]
fn test_audio_is_cached_without_device() -> Result<()> {
    init_logging();
    let timeline = MockTimeline::with_audio(24.0, 10.0, 48000);
    let mut player = Player::new(timeline.clone(), options())?;

    wait_for(TIMEOUT, || {
        player.tick();
        !player.current_audio().is_empty() && !player.cache_info().audio.is_empty()
    })?;
    assert_eq!(player.current_audio()[0].seconds, 0);
    assert!(timeline.audio_read_count() >= 3);

    player.forward();
    assert!(!player.has_audio_output());
    Ok(())
}
