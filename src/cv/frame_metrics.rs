use log::{debug, info};
use std::time::{Duration, Instant};

use crate::switch::Output;

/// Frame rate plus per-output counters for the display loop.
pub struct FrameMetrics {
    last_frame_time: Instant,
    start_time: Instant,
    fps: f32,
    min_fps: f32,
    max_fps: f32,
    frame_count: usize,
    camera_frames: usize,
    animation_frames: usize,
    switches: usize,
}

impl FrameMetrics {
    pub fn new() -> Self {
        debug!("Initializing frame metrics tracker");
        let now = Instant::now();
        FrameMetrics {
            last_frame_time: now,
            start_time: now,
            fps: 0.0,
            min_fps: f32::MAX,
            max_fps: 0.0,
            frame_count: 0,
            camera_frames: 0,
            animation_frames: 0,
            switches: 0,
        }
    }

    /// Records one displayed frame from `output`.
    pub fn update(&mut self, output: Output) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;

        self.frame_count += 1;
        match output {
            Output::Camera => self.camera_frames += 1,
            Output::Animation => self.animation_frames += 1,
        }

        if elapsed.is_zero() {
            return;
        }

        self.fps = 1.0 / elapsed.as_secs_f32();
        self.min_fps = self.min_fps.min(self.fps);
        self.max_fps = self.max_fps.max(self.fps);

        if self.frame_count % 100 == 0 {
            info!(
                "After {} frames: {:.1} FPS (avg {:.1}, min {:.1}, max {:.1}), {} switches",
                self.frame_count,
                self.fps,
                self.avg_fps(),
                self.min_fps,
                self.max_fps,
                self.switches()
            );
        } else {
            debug!(
                "Frame #{} from {}: {:.1} FPS ({}ms)",
                self.frame_count,
                output,
                self.fps,
                elapsed.as_millis()
            );
        }
    }

    pub fn record_switch(&mut self) {
        self.switches += 1;
    }

    pub fn avg_fps(&self) -> f32 {
        let runtime = self.start_time.elapsed().as_secs_f32();
        if runtime > 0.0 {
            self.frame_count as f32 / runtime
        } else {
            0.0
        }
    }

    pub fn get_frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn frames_of(&self, output: Output) -> usize {
        match output {
            Output::Camera => self.camera_frames,
            Output::Animation => self.animation_frames,
        }
    }

    pub fn switches(&self) -> usize {
        self.switches
    }

    pub fn get_total_runtime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn summary(&self) {
        info!(
            "Shown {} frames in {:.1?} ({} camera, {} animation), {} switches, avg {:.1} FPS",
            self.get_frame_count(),
            self.get_total_runtime(),
            self.frames_of(Output::Camera),
            self.frames_of(Output::Animation),
            self.switches(),
            self.avg_fps()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_frames_per_output() {
        let mut metrics = FrameMetrics::new();
        metrics.update(Output::Animation);
        metrics.update(Output::Animation);
        metrics.record_switch();
        metrics.update(Output::Camera);

        assert_eq!(metrics.get_frame_count(), 3);
        assert_eq!(metrics.frames_of(Output::Animation), 2);
        assert_eq!(metrics.frames_of(Output::Camera), 1);
        assert_eq!(metrics.switches(), 1);
    }

    #[test]
    fn fps_bounds_stay_ordered() {
        let mut metrics = FrameMetrics::new();
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(2));
            metrics.update(Output::Camera);
        }
        assert!(metrics.min_fps <= metrics.max_fps);
        assert!(metrics.avg_fps() > 0.0);
    }
}
