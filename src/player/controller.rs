//! Player controller
//!
//! [`Player`] is owned by the control thread. Setters update the observable
//! properties, mirror what the other threads need into the shared state and
//! wake the decode thread. `tick` advances the current time from the linked
//! player, the audio callback, or the wall clock, applies the loop mode, and
//! picks up whatever the decode thread has published.

use super::audio::AudioEngine;
use super::state::{AudioState, PlaybackState, Shared};
use super::sync::{CompareLink, TimeSource};
use super::thread::DecodeThread;
use super::{Loop, Playback, PlayerCacheInfo, PlayerCacheOptions, PlayerOptions, TimeAction, TimerMode};
use crate::audio::{AudioDeviceId, AudioOutput};
use crate::time::{loop_time, CacheDir, RationalTime, TimeRange};
use crate::timeline::{
    AudioFrame, CompareOptions, CompareTime, IoInfo, IoOptions, ReadSystem, RenderData, Timeline, VideoFrame,
};
use crate::utils::error::{PlayerError, Result};
use crate::utils::observer::Observable;
use crossbeam_channel::Sender;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Anchor for playback without audio
struct PlaybackClock {
    start: Instant,
    start_time: RationalTime,

    /// Frames advanced since the anchor
    frames: i64,
}

impl PlaybackClock {
    fn new(start_time: RationalTime) -> Self {
        Self {
            start: Instant::now(),
            start_time,
            frames: 0,
        }
    }
}

/// Timeline player
pub struct Player {
    timeline: Arc<dyn Timeline>,
    io_info: IoInfo,
    time_range: TimeRange,
    options: PlayerOptions,

    shared: Arc<Shared>,
    wake: Sender<()>,
    thread: Option<JoinHandle<()>>,
    audio_output: Option<AudioOutput>,
    clock: PlaybackClock,
    time_source: Option<Box<dyn TimeSource>>,
    followers: Arc<AtomicUsize>,
    compare: Vec<Arc<dyn Timeline>>,
    io_options: IoOptions,
    last_frame: Option<i64>,

    playback: Arc<Observable<Playback>>,
    loop_mode: Arc<Observable<Loop>>,
    speed: Arc<Observable<f64>>,
    current_time: Arc<Observable<RationalTime>>,
    seek_time: Arc<Observable<RationalTime>>,
    looped: Arc<Observable<bool>>,
    in_out_range: Arc<Observable<TimeRange>>,
    video_layer: Arc<Observable<usize>>,
    compare_video_layers: Arc<Observable<Vec<usize>>>,
    compare_time: Arc<Observable<CompareTime>>,
    compare_options: Arc<Observable<CompareOptions>>,
    volume: Arc<Observable<f32>>,
    mute: Arc<Observable<bool>>,
    channel_mute: Arc<Observable<Vec<bool>>>,
    audio_offset: Arc<Observable<f64>>,
    cache_options: Arc<Observable<PlayerCacheOptions>>,
    cache_info: Arc<Observable<PlayerCacheInfo>>,
    current_video: Arc<Observable<Vec<VideoFrame>>>,
    current_audio: Arc<Observable<Vec<AudioFrame>>>,
    dropped_frames: Arc<Observable<u64>>,
}

impl Player {
    /// Create a player for a timeline
    ///
    /// Fails with [`PlayerError::InvalidTimeline`] if the timeline has no
    /// valid, non-empty time range. Playback starts stopped, at the start of
    /// the timeline unless `options.current_time` says otherwise.
    pub fn new(timeline: Arc<dyn Timeline>, options: PlayerOptions) -> Result<Self> {
        let time_range = timeline.time_range();
        if !time_range.is_valid() || time_range.is_empty() {
            return Err(PlayerError::InvalidTimeline(format!("no playable time range: {}", time_range)));
        }
        let io_info = timeline.io_info();
        let rate = time_range.duration().rate();
        let current_time = options
            .current_time
            .map_or(time_range.start_time(), |t| time_range.clamp(t.rescaled_to(rate).floor()));

        let state = PlaybackState {
            playback: Playback::Stop,
            current_time,
            in_out_range: time_range,
            loop_mode: Loop::Loop,
            speed: rate,
            video_layer: 0,
            compare_video_layers: Vec::new(),
            audio_offset: 0.0,
            cache_options: options.cache,
            io_options: IoOptions::new(),
            compare: Vec::new(),
            compare_time: CompareTime::Relative,
        };
        let audio_state = AudioState {
            speed: rate,
            volume: 1.0,
            ..Default::default()
        };
        let shared = Shared::new(state, audio_state);
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
        let thread = DecodeThread::spawn(shared.clone(), timeline.clone(), &options, wake_rx)?;

        log::info!(
            "Player created: {} at {} fps, {} video layers, audio {}",
            time_range,
            rate,
            io_info.video.len(),
            if io_info.has_audio() {
                format!("{} Hz", io_info.audio.sample_rate)
            } else {
                "none".to_string()
            }
        );

        Ok(Self {
            io_info,
            time_range,
            shared,
            wake: wake_tx,
            thread: Some(thread),
            audio_output: None,
            clock: PlaybackClock::new(current_time),
            time_source: None,
            followers: Arc::new(AtomicUsize::new(0)),
            compare: Vec::new(),
            io_options: IoOptions::new(),
            last_frame: None,
            playback: Observable::new(Playback::Stop),
            loop_mode: Observable::new(Loop::Loop),
            speed: Observable::new(rate),
            current_time: Observable::new(current_time),
            seek_time: Observable::new(current_time),
            looped: Observable::new(false),
            in_out_range: Observable::new(time_range),
            video_layer: Observable::new(0),
            compare_video_layers: Observable::new(Vec::new()),
            compare_time: Observable::new(CompareTime::Relative),
            compare_options: Observable::new(CompareOptions::default()),
            volume: Observable::new(1.0),
            mute: Observable::new(false),
            channel_mute: Observable::new(Vec::new()),
            audio_offset: Observable::new(0.0),
            cache_options: Observable::new(options.cache),
            cache_info: Observable::new(PlayerCacheInfo::default()),
            current_video: Observable::new(Vec::new()),
            current_audio: Observable::new(Vec::new()),
            dropped_frames: Observable::new(0),
            timeline,
            options,
        })
    }

    /// Open a timeline through a read system and create a player for it
    pub fn open(
        read_system: &dyn ReadSystem,
        path: &Path,
        io_options: &IoOptions,
        options: PlayerOptions,
    ) -> Result<Self> {
        let timeline = read_system.open(path, io_options)?;
        let mut player = Self::new(timeline, options)?;
        player.set_io_options(io_options.clone());
        Ok(player)
    }

    pub fn timeline(&self) -> &Arc<dyn Timeline> {
        &self.timeline
    }

    pub fn io_info(&self) -> &IoInfo {
        &self.io_info
    }

    /// The whole playable range of the timeline
    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    /// Whether time currently comes from an audio device
    pub fn has_audio_output(&self) -> bool {
        self.audio_output.is_some()
    }

    fn rate(&self) -> f64 {
        self.time_range.duration().rate()
    }

    fn wake(&self) {
        let _ = self.wake.try_send(());
    }

    // Playback

    pub fn set_playback(&mut self, value: Playback) {
        if self.loop_mode.get() == Loop::Once {
            let range = self.in_out_range.get();
            let current = self.current_time.get();
            match value {
                Playback::Forward if current == range.end_time_inclusive() => self.seek(range.start_time()),
                Playback::Reverse if current == range.start_time() => self.seek(range.end_time_inclusive()),
                _ => {}
            }
        }
        if !self.playback.set_if_changed(value) {
            return;
        }
        log::debug!("Playback: {:?}", value);

        if value != Playback::Stop {
            self.audio_init();
        }
        self.playback_reset(self.current_time.get());
        {
            let mut mutex = self.shared.mutex.lock();
            mutex.state.playback = value;
            let dir = match value {
                Playback::Forward => Some(CacheDir::Forward),
                Playback::Reverse => Some(CacheDir::Reverse),
                Playback::Stop => None,
            };
            if let Some(dir) = dir.filter(|dir| *dir != mutex.cache_dir) {
                mutex.cache_dir = dir;
                mutex.clear_requests = true;
            }
        }
        {
            let mut audio = self.shared.audio.lock();
            audio.state.playback = value;
            audio.state.mute_timeout = Some(Instant::now() + self.options.mute_timeout);
        }
        self.wake();
    }

    /// Stop if playing, otherwise play forward
    pub fn toggle_playback(&mut self) {
        let value = match self.playback.get() {
            Playback::Stop => Playback::Forward,
            Playback::Forward | Playback::Reverse => Playback::Stop,
        };
        self.set_playback(value);
    }

    pub fn stop(&mut self) {
        self.set_playback(Playback::Stop);
    }

    pub fn forward(&mut self) {
        self.set_playback(Playback::Forward);
    }

    pub fn reverse(&mut self) {
        self.set_playback(Playback::Reverse);
    }

    pub fn set_loop(&mut self, value: Loop) {
        if self.loop_mode.set_if_changed(value) {
            let mut mutex = self.shared.mutex.lock();
            mutex.state.loop_mode = value;
            mutex.clear_requests = true;
            drop(mutex);
            self.wake();
        }
    }

    /// Set the playback speed in frames per second
    pub fn set_speed(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PlayerError::InvalidInput(format!("speed must be positive, got {}", value)));
        }
        let previous = self.speed.get();
        if !self.speed.set_if_changed(value) {
            return Ok(());
        }
        let ratio = value / previous;
        {
            let mut mutex = self.shared.mutex.lock();
            mutex.state.speed = value;
            if !(0.5..=2.0).contains(&ratio) {
                mutex.clear_requests = true;
            }
        }
        self.shared.audio.lock().state.speed = value;
        self.playback_reset(self.current_time.get());
        self.wake();
        Ok(())
    }

    /// The timeline's own frame rate
    pub fn default_speed(&self) -> f64 {
        self.rate()
    }

    // Time

    /// Go to a time
    ///
    /// The time is floored to a whole frame. In `Once` mode it is clamped to
    /// the in/out range and playback stops if it was outside; otherwise it
    /// wraps and the looped flag is raised.
    pub fn seek(&mut self, time: RationalTime) {
        let range = self.in_out_range.get();
        let time = time.rescaled_to(self.rate()).floor();
        let (time, looped, clamped) = match self.loop_mode.get() {
            Loop::Once => {
                let clamped = range.clamp(time);
                (clamped, false, clamped != time)
            }
            Loop::Loop | Loop::PingPong => {
                let (time, looped) = loop_time(time, &range);
                (time, looped, false)
            }
        };
        log::trace!("Seek: {}", time);

        if looped {
            self.looped.set_always(true);
        }
        self.seek_time.set_always(time);
        self.set_current_time(time);
        self.shared.mutex.lock().clear_requests = true;
        self.playback_reset(time);
        self.shared.audio.lock().state.mute_timeout = Some(Instant::now() + self.options.mute_timeout);
        self.wake();

        if clamped && self.playback.get() != Playback::Stop {
            self.set_playback(Playback::Stop);
        }
    }

    pub fn time_action(&mut self, action: TimeAction) {
        let range = self.in_out_range.get();
        let current = self.current_time.get();
        let rate = self.rate();
        match action {
            TimeAction::Start => self.seek(range.start_time()),
            TimeAction::End => self.seek(range.end_time_inclusive()),
            TimeAction::FramePrev => self.step(-1.0),
            TimeAction::FramePrevX10 => self.step(-10.0),
            TimeAction::FramePrevX100 => self.step(-100.0),
            TimeAction::FrameNext => self.step(1.0),
            TimeAction::FrameNextX10 => self.step(10.0),
            TimeAction::FrameNextX100 => self.step(100.0),
            TimeAction::JumpBack1s => self.seek(current - RationalTime::new(rate, rate)),
            TimeAction::JumpBack10s => self.seek(current - RationalTime::new(10.0 * rate, rate)),
            TimeAction::JumpForward1s => self.seek(current + RationalTime::new(rate, rate)),
            TimeAction::JumpForward10s => self.seek(current + RationalTime::new(10.0 * rate, rate)),
        }
    }

    /// Stop and move by a number of frames
    fn step(&mut self, frames: f64) {
        self.set_playback(Playback::Stop);
        let current = self.current_time.get();
        self.seek(current + RationalTime::new(frames, self.rate()));
    }

    pub fn goto_start(&mut self) {
        self.time_action(TimeAction::Start);
    }

    pub fn goto_end(&mut self) {
        self.time_action(TimeAction::End);
    }

    pub fn frame_prev(&mut self) {
        self.time_action(TimeAction::FramePrev);
    }

    pub fn frame_next(&mut self) {
        self.time_action(TimeAction::FrameNext);
    }

    /// Restrict playback to a range inside the timeline
    pub fn set_in_out_range(&mut self, value: TimeRange) {
        let rate = self.rate();
        let start = self.time_range.clamp(value.start_time().rescaled_to(rate).floor());
        let end = self.time_range.clamp(value.end_time_inclusive().rescaled_to(rate).floor());
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let range = TimeRange::from_start_end_inclusive(start, end);
        if !self.in_out_range.set_if_changed(range) {
            return;
        }
        {
            let mut mutex = self.shared.mutex.lock();
            mutex.state.in_out_range = range;
            mutex.clear_requests = true;
        }
        let current = self.current_time.get();
        if !range.contains(current) {
            self.seek(range.clamp(current));
        }
        self.wake();
    }

    pub fn set_in_point(&mut self, time: RationalTime) {
        let end = self.in_out_range.get().end_time_inclusive();
        self.set_in_out_range(TimeRange::from_start_end_inclusive(time.rescaled_to(self.rate()), end));
    }

    pub fn reset_in_point(&mut self) {
        self.set_in_point(self.time_range.start_time());
    }

    pub fn set_out_point(&mut self, time: RationalTime) {
        let start = self.in_out_range.get().start_time();
        self.set_in_out_range(TimeRange::from_start_end_inclusive(start, time));
    }

    pub fn reset_out_point(&mut self) {
        self.set_out_point(self.time_range.end_time_inclusive());
    }

    pub fn reset_in_out_range(&mut self) {
        self.set_in_out_range(self.time_range);
    }

    // Video

    pub fn set_video_layer(&mut self, value: usize) {
        if self.video_layer.set_if_changed(value) {
            self.update_sources(|state| state.video_layer = value);
        }
    }

    pub fn set_compare_video_layers(&mut self, value: Vec<usize>) {
        if self.compare_video_layers.set_if_changed(value.clone()) {
            self.update_sources(|state| state.compare_video_layers = value);
        }
    }

    /// Timelines shown next to this one
    pub fn set_compare(&mut self, value: Vec<Arc<dyn Timeline>>) {
        let same = value.len() == self.compare.len()
            && value.iter().zip(self.compare.iter()).all(|(a, b)| Arc::ptr_eq(a, b));
        if same {
            return;
        }
        self.compare = value.clone();
        self.update_sources(|state| state.compare = value);
    }

    pub fn compare(&self) -> &[Arc<dyn Timeline>] {
        &self.compare
    }

    pub fn set_compare_time(&mut self, value: CompareTime) {
        if self.compare_time.set_if_changed(value) {
            self.update_sources(|state| state.compare_time = value);
        }
    }

    pub fn set_compare_options(&mut self, value: CompareOptions) {
        self.compare_options.set_if_changed(value);
    }

    pub fn set_io_options(&mut self, value: IoOptions) {
        if value != self.io_options {
            self.io_options = value.clone();
            self.update_sources(|state| state.io_options = value);
        }
    }

    pub fn io_options(&self) -> &IoOptions {
        &self.io_options
    }

    /// The current frames and compare layout for the render collaborator
    pub fn render_data(&self) -> RenderData {
        RenderData::new(self.current_video.get(), self.compare_options.get())
    }

    /// Change what is read; the decode thread rebuilds its sources and
    /// starts over with an empty cache.
    fn update_sources<F: FnOnce(&mut PlaybackState)>(&mut self, update: F) {
        {
            let mut mutex = self.shared.mutex.lock();
            update(&mut mutex.state);
            mutex.sources_generation += 1;
            mutex.video_frames.clear();
        }
        self.wake();
    }

    // Audio

    pub fn set_volume(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if self.volume.set_if_changed(value) {
            self.shared.audio.lock().state.volume = value;
        }
    }

    pub fn set_mute(&mut self, value: bool) {
        if self.mute.set_if_changed(value) {
            self.shared.audio.lock().state.mute = value;
        }
    }

    /// Mute individual output channels
    pub fn set_channel_mute(&mut self, value: Vec<bool>) {
        if self.channel_mute.set_if_changed(value.clone()) {
            self.shared.audio.lock().state.channel_mute = value;
        }
    }

    /// Shift the audio against the video, in seconds
    pub fn set_audio_offset(&mut self, value: f64) {
        if self.audio_offset.set_if_changed(value) {
            self.shared.mutex.lock().state.audio_offset = value;
            self.shared.audio.lock().state.audio_offset = value;
            self.playback_reset(self.current_time.get());
            self.wake();
        }
    }

    /// Switch output devices; takes effect immediately when playing
    pub fn set_audio_device(&mut self, value: AudioDeviceId) {
        if self.options.audio_device == value {
            return;
        }
        self.options.audio_device = value;
        self.audio_output = None;
        if self.playback.get() != Playback::Stop {
            self.audio_init();
            self.playback_reset(self.current_time.get());
        }
    }

    /// Open the output device if there is audio to play and none is open
    ///
    /// Failure is not an error: playback falls back to the wall clock.
    fn audio_init(&mut self) {
        if self.audio_output.is_some()
            || self.options.audio_device == AudioDeviceId::Disabled
            || !self.io_info.has_audio()
        {
            return;
        }
        let shared = self.shared.clone();
        let input = self.io_info.audio;
        let rate = self.rate();
        let buffer_frames = self.options.audio_buffer_frame_count;
        let result = AudioOutput::open(&self.options.audio_device, buffer_frames, move |output| {
            let mut engine = AudioEngine::new(shared, input, output, rate, buffer_frames);
            move |data: &mut [f32]| engine.process(data)
        });
        match result {
            Ok(output) => self.audio_output = Some(output),
            Err(err) => log::warn!("No audio output, using the system clock: {}", err),
        }
    }

    // Cache

    pub fn set_cache_options(&mut self, value: PlayerCacheOptions) {
        if self.cache_options.set_if_changed(value) {
            let mut mutex = self.shared.mutex.lock();
            mutex.state.cache_options = value;
            mutex.clear_cache = true;
            drop(mutex);
            self.wake();
        }
    }

    /// Drop everything cached and start filling again
    pub fn clear_cache(&mut self) {
        self.shared.mutex.lock().clear_cache = true;
        self.wake();
    }

    // Linking

    /// Follow another player's current time
    ///
    /// Only one level is supported: the primary must not follow anyone,
    /// and a player that others follow cannot follow another.
    pub fn link_time(&mut self, primary: &Player) -> Result<()> {
        if primary.is_linked() {
            return Err(PlayerError::Sync(
                "cannot follow a player that follows another player".to_string(),
            ));
        }
        self.check_can_follow()?;
        self.time_source = Some(Box::new(CompareLink::new(&primary.current_time, &primary.followers)));
        log::debug!("Player time linked");
        Ok(())
    }

    /// Follow an external clock
    pub fn set_time_source(&mut self, source: Box<dyn TimeSource>) -> Result<()> {
        self.check_can_follow()?;
        self.time_source = Some(source);
        Ok(())
    }

    /// Go back to the player's own clock, continuing from the current time
    pub fn unlink_time(&mut self) {
        if self.time_source.take().is_some() {
            self.playback_reset(self.current_time.get());
            log::debug!("Player time unlinked");
        }
    }

    pub fn is_linked(&self) -> bool {
        self.time_source.is_some()
    }

    /// Players currently following this one
    pub fn follower_count(&self) -> usize {
        self.followers.load(Ordering::Acquire)
    }

    fn check_can_follow(&self) -> Result<()> {
        if self.follower_count() > 0 {
            return Err(PlayerError::Sync(
                "a player that others follow cannot follow another player".to_string(),
            ));
        }
        Ok(())
    }

    // Tick

    /// Advance the current time and pick up published frames
    ///
    /// Call once per UI cycle.
    pub fn tick(&mut self) {
        match self.time_source.as_ref().map(|source| source.current_time()) {
            Some(Some(time)) => {
                let time = self.in_out_range.get().clamp(time.rescaled_to(self.rate()).floor());
                self.set_current_time(time);
            }
            Some(None) => {}
            None => {
                let playback = self.playback.get();
                if playback != Playback::Stop {
                    let time = self.playback_time(playback);
                    self.loop_playback(time, playback);
                }
            }
        }
        self.update_frames();
        self.wake();
    }

    /// Where playback is now according to the audio device or the clock
    fn playback_time(&mut self, playback: Playback) -> RationalTime {
        let rate = self.rate();
        let frames = if let Some(output) = &self.audio_output {
            let frame = self.shared.audio.lock().frame;
            let sample_rate = output.info().sample_rate.max(1) as f64;
            (frame as f64 / sample_rate * rate).floor() as i64
        } else {
            let elapsed = (self.clock.start.elapsed().as_secs_f64() * self.speed.get()).floor() as i64;
            match self.options.timer_mode {
                TimerMode::System => self.clock.frames = elapsed,
                TimerMode::Frame => {
                    if elapsed > self.clock.frames {
                        self.clock.frames += 1;
                    }
                }
            }
            self.clock.frames
        };
        let sign = if playback == Playback::Reverse { -1.0 } else { 1.0 };
        self.clock.start_time + RationalTime::new(sign * frames as f64, rate)
    }

    fn loop_playback(&mut self, time: RationalTime, playback: Playback) {
        let range = self.in_out_range.get();
        let (start, end) = (range.start_time(), range.end_time_inclusive());
        match self.loop_mode.get() {
            Loop::Loop => {
                let (time, looped) = loop_time(time, &range);
                if looped {
                    self.looped.set_always(true);
                    self.playback_reset(time);
                }
                self.set_current_time(time);
            }
            Loop::Once => {
                if time < start || time > end {
                    self.set_current_time(range.clamp(time));
                    self.set_playback(Playback::Stop);
                } else {
                    self.set_current_time(time);
                }
            }
            Loop::PingPong => {
                if playback == Playback::Forward && time > end {
                    self.set_current_time(end);
                    self.set_playback(Playback::Reverse);
                } else if playback == Playback::Reverse && time < start {
                    self.set_current_time(start);
                    self.set_playback(Playback::Forward);
                } else {
                    self.set_current_time(time);
                }
            }
        }
    }

    fn set_current_time(&self, time: RationalTime) {
        self.current_time.set_if_changed(time);
        self.shared.mutex.lock().state.current_time = time;
    }

    /// Re-anchor the clock and make the audio callback start over at `time`
    fn playback_reset(&mut self, time: RationalTime) {
        self.clock = PlaybackClock::new(time);
        let mut audio = self.shared.audio.lock();
        audio.reset = true;
        audio.start = time;
        audio.frame = 0;
    }

    fn update_frames(&mut self) {
        let key = self.current_time.get().frame();
        let (frames, audio, cache_info) = {
            let mutex = self.shared.mutex.lock();
            (
                mutex.video_frames.get(&key).cloned(),
                mutex.current_audio.clone(),
                mutex.cache_info.clone(),
            )
        };

        match frames {
            Some(frames) => {
                self.current_video.set_if_changed(frames);
            }
            None => {
                let playing = self.playback.get() != Playback::Stop;
                if playing && self.io_info.has_video() && self.last_frame != Some(key) {
                    self.dropped_frames.set_always(self.dropped_frames.get() + 1);
                    log::trace!("Frame {} not ready", key);
                }
            }
        }
        self.last_frame = Some(key);

        let seconds_changed = !self
            .current_audio
            .get()
            .iter()
            .map(|f| f.seconds)
            .eq(audio.iter().map(|f| f.seconds));
        if seconds_changed {
            self.current_audio.set_always(audio);
        }
        self.cache_info.set_if_changed(cache_info);
    }
}

macro_rules! observers {
    ($($(#[$doc:meta])* $name:ident, $observe:ident: $t:ty;)*) => {
        impl Player {
            $(
                $(#[$doc])*
                pub fn $name(&self) -> $t {
                    self.$name.get()
                }

                pub fn $observe(&self) -> Arc<Observable<$t>> {
                    self.$name.clone()
                }
            )*
        }
    };
}

observers! {
    playback, observe_playback: Playback;
    loop_mode, observe_loop: Loop;
    /// Speed in frames per second
    speed, observe_speed: f64;
    current_time, observe_current_time: RationalTime;
    /// Last time sought to; notifies on every seek
    seek_time, observe_seek: RationalTime;
    /// Raised whenever playback or a seek wraps around the in/out range
    looped, observe_looped: bool;
    in_out_range, observe_in_out_range: TimeRange;
    video_layer, observe_video_layer: usize;
    compare_video_layers, observe_compare_video_layers: Vec<usize>;
    compare_time, observe_compare_time: CompareTime;
    compare_options, observe_compare_options: CompareOptions;
    volume, observe_volume: f32;
    mute, observe_mute: bool;
    channel_mute, observe_channel_mute: Vec<bool>;
    audio_offset, observe_audio_offset: f64;
    cache_options, observe_cache_options: PlayerCacheOptions;
    cache_info, observe_cache_info: PlayerCacheInfo;
    /// Frames for the current time, primary first
    current_video, observe_current_video: Vec<VideoFrame>;
    current_audio, observe_current_audio: Vec<AudioFrame>;
    /// Frames that were not ready when playback reached them
    dropped_frames, observe_dropped_frames: u64;
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.wake();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Decode thread panicked");
            }
        }
        self.time_source = None;
        self.audio_output = None;
        log::debug!("Player closed");
    }
}
