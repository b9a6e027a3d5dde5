//! Scrubbable playback clock driving the `uTime` shader uniform.
//!
//! The clock is a pure state reducer: the event loop hands it the ordered
//! batch of this frame's key commands, the clock applies them in sequence,
//! advances virtual time by a fixed per-frame delta scaled by the current
//! time scale, and clamps the result at zero. It never errors and is never
//! shared across threads.

use winit::keyboard::KeyCode;

/// Virtual time jumped to by [`ClockCommand::JumpAhead`].
const JUMP_AHEAD_SECONDS: f64 = 10_000.0;

/// A single playback-control action, decoded from a key-down event.
///
/// Later commands in a frame override earlier ones: the batch is applied in
/// order before the frame delta is added, so a `Restart` arriving after a
/// `JumpAhead` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// Reset time to zero and resume at normal speed.
    Restart,
    /// Resume at normal speed, keeping the current time.
    Resume,
    /// Increase the time scale by one, skipping over zero.
    SpeedUp,
    /// Decrease the time scale by one, skipping over zero.
    SlowDown,
    /// Freeze time exactly (the only path allowed to hold scale at zero).
    Pause,
    /// Step one frame backward, then pause.
    StepBack,
    /// Step one frame forward, then pause.
    StepForward,
    /// Reset time to zero without touching the scale.
    Rewind,
    /// Jump to a fixed late time to inspect long-running behaviour.
    JumpAhead,
}

impl ClockCommand {
    /// Maps a physical key to its playback command, or `None` for keys the
    /// clock does not care about (those may still mean something to the event
    /// loop, e.g. hot reload or quit).
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyH => Some(Self::Restart),
            KeyCode::Space => Some(Self::Resume),
            KeyCode::KeyL => Some(Self::SpeedUp),
            KeyCode::KeyJ => Some(Self::SlowDown),
            KeyCode::KeyK => Some(Self::Pause),
            KeyCode::KeyU => Some(Self::StepBack),
            KeyCode::KeyO => Some(Self::StepForward),
            KeyCode::KeyI => Some(Self::Rewind),
            KeyCode::KeyP => Some(Self::JumpAhead),
            _ => None,
        }
    }
}

/// Owns the virtual clock consumed by the render loop.
///
/// `total_time` is the value shaders see; it never goes negative. The signed
/// `time_scale` multiplies a fixed per-frame delta, so playback speed is
/// independent of wall-clock jitter. `SpeedUp`/`SlowDown` nudge the scale
/// past zero so repeatedly tapping them reverses playback instead of silently
/// pausing; only an explicit `Pause` (or a step) parks the scale at exactly
/// zero.
pub struct PlaybackClock {
    /// Fixed seconds-per-frame, derived from the target frame rate.
    frame_delta: f64,
    total_time: f64,
    time_scale: f32,
    hit_zero: bool,
}

impl PlaybackClock {
    /// Creates a clock at time zero running at normal speed.
    pub fn new(frame_delta: f64) -> Self {
        Self {
            frame_delta,
            total_time: 0.0,
            time_scale: 1.0,
            hit_zero: false,
        }
    }

    /// Applies one frame's worth of commands, then advances and clamps time.
    ///
    /// Returns `true` exactly once per "landing": the frame where rewinding
    /// playback first clamps `total_time` at zero. The flag re-arms only when
    /// the user slows down again ([`ClockCommand::SlowDown`]); restarts and
    /// rewinds leave it latched.
    pub fn update(&mut self, commands: &[ClockCommand]) -> bool {
        for command in commands {
            self.apply(*command);
        }

        if self.time_scale != 0.0 {
            self.total_time += f64::from(self.time_scale) * self.frame_delta;
        }

        if self.total_time < 0.0 {
            self.total_time = 0.0;
            if !self.hit_zero {
                self.hit_zero = true;
                return true;
            }
        }
        false
    }

    fn apply(&mut self, command: ClockCommand) {
        match command {
            ClockCommand::Restart => {
                self.time_scale = 1.0;
                self.total_time = 0.0;
                tracing::info!("restarting playback");
            }
            ClockCommand::Resume => {
                self.time_scale = 1.0;
                self.log_time_scale();
            }
            ClockCommand::SpeedUp => {
                self.time_scale += 1.0;
                if self.time_scale == 0.0 {
                    self.time_scale += 1.0;
                }
                self.log_time_scale();
            }
            ClockCommand::SlowDown => {
                self.hit_zero = false;
                self.time_scale -= 1.0;
                if self.time_scale == 0.0 {
                    self.time_scale -= 1.0;
                }
                self.log_time_scale();
            }
            ClockCommand::Pause => {
                self.time_scale = 0.0;
                self.log_time_scale();
            }
            ClockCommand::StepBack => {
                self.time_scale = 0.0;
                self.total_time = (self.total_time - self.frame_delta).max(0.0);
                self.log_step();
            }
            ClockCommand::StepForward => {
                self.time_scale = 0.0;
                self.total_time += self.frame_delta;
                self.log_step();
            }
            ClockCommand::Rewind => {
                self.total_time = 0.0;
                tracing::info!("reset to time 0");
            }
            ClockCommand::JumpAhead => {
                self.total_time = JUMP_AHEAD_SECONDS;
                tracing::info!("jump to time {JUMP_AHEAD_SECONDS}s");
            }
        }
    }

    /// Current virtual time in seconds, as fed to the `uTime` uniform.
    pub fn time(&self) -> f32 {
        self.total_time as f32
    }

    /// Current signed playback speed multiplier.
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Overrides the current time; used by the hot-reload path so the shader
    /// restarts from zero without reconstructing the clock.
    pub fn set_time(&mut self, time: f32) {
        self.total_time = f64::from(time);
    }

    /// Overrides the playback speed multiplier.
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    fn log_time_scale(&self) {
        tracing::info!("timescale: {}x", self.time_scale);
    }

    fn log_step(&self) {
        tracing::info!("step: {:.4}s", self.total_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELTA: f64 = 1.0 / 60.0;

    fn clock() -> PlaybackClock {
        PlaybackClock::new(DELTA)
    }

    #[test]
    fn starts_at_zero_running_forward() {
        let clock = clock();
        assert_eq!(clock.time(), 0.0);
        assert_eq!(clock.time_scale(), 1.0);
    }

    #[test]
    fn sixty_empty_frames_advance_one_second() {
        let mut clock = clock();
        for _ in 0..60 {
            clock.update(&[]);
        }
        assert!((clock.time() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn speed_up_skips_over_zero() {
        let mut clock = clock();
        clock.set_time_scale(-1.0);
        clock.update(&[ClockCommand::SpeedUp]);
        assert_eq!(clock.time_scale(), 1.0);
    }

    #[test]
    fn slow_down_skips_over_zero() {
        let mut clock = clock();
        clock.update(&[ClockCommand::SlowDown]);
        assert_eq!(clock.time_scale(), -1.0);
    }

    #[test]
    fn pause_holds_scale_at_exactly_zero() {
        let mut clock = clock();
        clock.update(&[ClockCommand::Pause]);
        assert_eq!(clock.time_scale(), 0.0);
        let before = clock.time();
        clock.update(&[]);
        assert_eq!(clock.time(), before);
    }

    #[test]
    fn step_back_rewinds_one_frame_and_pauses() {
        let mut clock = clock();
        clock.set_time(5.0);
        clock.update(&[ClockCommand::StepBack]);
        assert_eq!(clock.time_scale(), 0.0);
        assert!((f64::from(clock.time()) - (5.0 - DELTA)).abs() < 1e-6);
    }

    #[test]
    fn step_back_clamps_at_zero() {
        let mut clock = PlaybackClock::new(0.5);
        clock.set_time(0.1);
        clock.update(&[ClockCommand::StepBack]);
        assert_eq!(clock.time(), 0.0);
        assert_eq!(clock.time_scale(), 0.0);
    }

    #[test]
    fn step_forward_from_zero_and_pauses() {
        let mut clock = clock();
        clock.update(&[ClockCommand::StepForward]);
        assert_eq!(clock.time_scale(), 0.0);
        assert!((f64::from(clock.time()) - DELTA).abs() < 1e-6);
    }

    #[test]
    fn jump_ahead_lands_on_fixed_time() {
        let mut clock = clock();
        clock.set_time(123.0);
        clock.set_time_scale(-3.0);
        // JumpAhead then Pause in the same frame: no delta is applied, so the
        // landing time is exact.
        clock.update(&[ClockCommand::JumpAhead, ClockCommand::Pause]);
        assert_eq!(f64::from(clock.time()), 10_000.0);
    }

    #[test]
    fn jump_ahead_alone_still_advances_by_scaled_delta() {
        let mut clock = clock();
        clock.update(&[ClockCommand::JumpAhead]);
        assert!((f64::from(clock.time()) - (10_000.0 + DELTA)).abs() < 1e-2);
    }

    #[test]
    fn restart_wins_over_earlier_commands_in_the_same_frame() {
        let mut clock = clock();
        clock.update(&[
            ClockCommand::JumpAhead,
            ClockCommand::Pause,
            ClockCommand::Restart,
        ]);
        assert_eq!(clock.time_scale(), 1.0);
        // Restart zeroed the time; the frame then advanced by one delta.
        assert!((f64::from(clock.time()) - DELTA).abs() < 1e-6);
    }

    #[test]
    fn rewind_keeps_the_current_scale() {
        let mut clock = clock();
        clock.set_time(42.0);
        clock.set_time_scale(3.0);
        clock.update(&[ClockCommand::Rewind]);
        assert_eq!(clock.time_scale(), 3.0);
        assert!((f64::from(clock.time()) - 3.0 * DELTA).abs() < 1e-6);
    }

    #[test]
    fn time_never_goes_negative() {
        let mut clock = clock();
        clock.update(&[ClockCommand::SlowDown, ClockCommand::SlowDown]);
        for _ in 0..100 {
            clock.update(&[]);
            assert!(clock.time() >= 0.0);
        }
    }

    #[test]
    fn hitting_zero_fires_the_edge_exactly_once() {
        let mut clock = clock();
        // Scale is now -1 and time is clamped at zero on the same update.
        let edge = clock.update(&[ClockCommand::SlowDown]);
        assert!(edge);
        // Still rewinding into the clamp, but the edge stays latched.
        assert!(!clock.update(&[]));
        assert!(!clock.update(&[]));
    }

    #[test]
    fn slow_down_rearms_the_zero_edge() {
        let mut clock = clock();
        assert!(clock.update(&[ClockCommand::SlowDown]));
        assert!(!clock.update(&[]));
        // SlowDown clears the latch; the clamp fires again on the same frame.
        assert!(clock.update(&[ClockCommand::SlowDown]));
    }

    #[test]
    fn restart_does_not_rearm_the_zero_edge() {
        let mut clock = clock();
        assert!(clock.update(&[ClockCommand::SlowDown]));
        // Restart moves time away from zero but leaves the latch set.
        clock.update(&[ClockCommand::Restart]);
        clock.set_time_scale(-1.0);
        for _ in 0..5 {
            assert!(!clock.update(&[]));
        }
    }

    #[test]
    fn maps_playback_keys_and_ignores_the_rest() {
        assert_eq!(
            ClockCommand::from_key(KeyCode::KeyH),
            Some(ClockCommand::Restart)
        );
        assert_eq!(
            ClockCommand::from_key(KeyCode::Space),
            Some(ClockCommand::Resume)
        );
        assert_eq!(
            ClockCommand::from_key(KeyCode::KeyU),
            Some(ClockCommand::StepBack)
        );
        assert_eq!(ClockCommand::from_key(KeyCode::KeyR), None);
        assert_eq!(ClockCommand::from_key(KeyCode::F4), None);
    }
}
