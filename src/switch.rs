use log::{debug, info};
use std::fmt::Display;
use std::time::{Duration, Instant};

/// What the display is currently showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Output {
    #[default]
    Animation,
    Camera,
}

impl Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Animation => write!(f, "animation"),
            Output::Camera => write!(f, "camera"),
        }
    }
}

/// Two-state hysteresis between the animation and the camera feed.
///
/// The camera is shown once motion has been seen continuously for
/// `motion_delay`, and the animation returns once no motion has been seen
/// for `idle_delay`.
#[derive(Debug, Clone)]
pub struct Switch {
    output: Output,
    motion_delay: Duration,
    idle_delay: Duration,
    motion_start: Option<Instant>,
    idle_start: Option<Instant>,
}

impl Switch {
    pub fn new(motion_delay: Duration, idle_delay: Duration) -> Self {
        debug!(
            "Switch armed: motion delay {:?}, idle delay {:?}",
            motion_delay, idle_delay
        );
        Self {
            output: Output::Animation,
            motion_delay,
            idle_delay,
            motion_start: None,
            idle_start: None,
        }
    }

    pub fn output(&self) -> Output {
        self.output
    }

    /// Feeds one tick. Returns the new output when it changed.
    pub fn update(&mut self, motion_detected: bool, now: Instant) -> Option<Output> {
        if motion_detected {
            self.motion_start.get_or_insert(now);
            self.idle_start = None;
        } else {
            self.idle_start.get_or_insert(now);
            self.motion_start = None;
        }

        let previous = self.output;

        if let Some(start) = self.motion_start {
            if now.saturating_duration_since(start) >= self.motion_delay {
                self.output = Output::Camera;
            }
        }

        if let Some(start) = self.idle_start {
            if now.saturating_duration_since(start) >= self.idle_delay {
                self.output = Output::Animation;
                self.motion_start = None;
            }
        }

        if self.output == previous {
            return None;
        }

        info!("Switching output from {} to {}", previous, self.output);
        Some(self.output)
    }
}
