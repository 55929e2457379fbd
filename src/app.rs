use anyhow::{Context, Result, anyhow};
use log::{debug, error, info};
use opencv::core::Mat;
use std::{path::PathBuf, time::Instant};

use crate::{
    conf::{CAM_EXAMPLE, Settings},
    cv::{
        MAX_CAMERAS,
        display::{Placement, Screen},
        frame_metrics::FrameMetrics,
        motion::MotionDetector,
        probe_camera,
        source::{Capture, Feed, Origin, VideoSource},
    },
    journal::Journal,
    switch::{Output, Switch},
};

/// Picks the camera the switcher watches: the first working device in live
/// mode, the bundled example clip otherwise.
pub fn camera_origin(settings: &Settings) -> Result<Origin> {
    if !settings.live_camera {
        info!("Test mode off, using example clip {}", CAM_EXAMPLE);
        return Ok(Origin::File(PathBuf::from(CAM_EXAMPLE)));
    }

    probe_camera(MAX_CAMERAS)
        .map(Origin::Device)
        .ok_or_else(|| anyhow!("unable to open video source"))
}

/// Single-threaded polling loop showing either the animation or the camera.
pub struct CamSwitch<C: Capture = VideoSource> {
    settings: Settings,
    camera: Feed<C>,
    animation: Feed<C>,
    detector: MotionDetector,
    switch: Switch,
    journal: Option<Journal>,
    metrics: FrameMetrics,
}

impl CamSwitch<VideoSource> {
    pub fn new(settings: Settings, camera: Origin, journal: Option<Journal>) -> Result<Self> {
        info!("Watching {} for motion", camera);
        let animation = VideoSource::new(Origin::File(settings.animation.clone()));

        Self::with_feeds(
            settings,
            Feed::new("camera", VideoSource::new(camera)),
            Feed::new("animation", animation),
            journal,
        )
    }
}

impl<C: Capture> CamSwitch<C> {
    pub fn with_feeds(
        settings: Settings,
        camera: Feed<C>,
        animation: Feed<C>,
        journal: Option<Journal>,
    ) -> Result<Self> {
        let detector = MotionDetector::new(settings.threshold, settings.min_area)
            .context("Failed to set up motion detector")?;
        let switch = Switch::new(settings.motion_window()?, settings.idle_window()?);

        Ok(Self {
            settings,
            camera,
            animation,
            detector,
            switch,
            journal,
            metrics: FrameMetrics::new(),
        })
    }

    /// Runs until exit is requested or a source fails for good. Both video
    /// handles and the window are released either way.
    pub fn run(mut self) -> Result<()> {
        self.camera.open()?;

        let mut screen = Screen::open(Placement {
            x: self.settings.location_x,
            y: self.settings.location_y,
            width: self.settings.width,
            height: self.settings.height,
        })?;

        let result = self.run_loop(&mut screen);

        for feed in [&mut self.camera, &mut self.animation] {
            if let Err(e) = feed.close() {
                error!("{:#}", e);
            }
        }
        if let Err(e) = screen.close() {
            error!("Failed to close windows: {:#}", e);
        }
        self.metrics.summary();

        result
    }

    fn run_loop(&mut self, screen: &mut Screen) -> Result<()> {
        let mut camera_frame = Mat::default();
        let mut animation_frame = Mat::default();
        let mut previous: Option<Mat> = None;

        info!("Starting display loop");
        loop {
            self.camera.read(&mut camera_frame)?;
            let current = self.detector.preprocess(&camera_frame)?;
            let motion = self
                .detector
                .detect(previous.as_ref().unwrap_or(&current), &current)?;
            previous = Some(current);

            if let Some(output) = self.switch.update(motion, Instant::now()) {
                self.on_switch(output)?;
            }

            let output = self.switch.output();
            match output {
                Output::Camera => screen.show(&camera_frame, self.settings.flip)?,
                Output::Animation => {
                    self.animation.read(&mut animation_frame)?;
                    screen.show(&animation_frame, false)?;
                }
            }
            self.metrics.update(output);

            if screen.poll_exit(self.settings.frame_delay)? {
                return Ok(());
            }
        }
    }

    fn on_switch(&mut self, output: Output) -> Result<()> {
        self.metrics.record_switch();

        // the animation restarts from its first frame on every showing
        if output == Output::Camera {
            self.animation.close()?;
        }

        if let Some(journal) = self.journal.as_mut() {
            journal.record(output)?;
            debug!("Journaled switch to {}", output);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::source::testing::FakeCapture;

    fn fake_switcher(animation: &[bool], journal: Option<Journal>) -> CamSwitch<FakeCapture> {
        CamSwitch::with_feeds(
            Settings::default(),
            Feed::new("camera", FakeCapture::scripted(&[true])),
            Feed::new("animation", FakeCapture::scripted(animation)),
            journal,
        )
        .unwrap()
    }

    #[test]
    fn example_clip_stands_in_without_test_mode() {
        let settings = Settings::default();
        assert_eq!(
            camera_origin(&settings).unwrap(),
            Origin::File(PathBuf::from(CAM_EXAMPLE))
        );
    }

    #[test]
    fn switcher_starts_on_animation() {
        let switcher = CamSwitch::new(Settings::default(), Origin::Device(0), None).unwrap();

        assert_eq!(switcher.switch.output(), Output::Animation);
        assert!(!switcher.camera.is_open());
        assert!(!switcher.animation.is_open());
    }

    #[test]
    fn oversized_delay_is_an_error_not_a_panic() {
        let settings = Settings {
            idle_delay: 1e20,
            ..Settings::default()
        };
        let result = CamSwitch::with_feeds(
            settings,
            Feed::new("camera", FakeCapture::default()),
            Feed::new("animation", FakeCapture::default()),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn switch_to_camera_releases_animation_and_journals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switches.csv");
        let journal = Journal::open(&path).unwrap();
        let mut switcher = fake_switcher(&[true], Some(journal));

        let mut frame = Mat::default();
        switcher.animation.read(&mut frame).unwrap();
        assert!(switcher.animation.is_open());

        switcher.on_switch(Output::Camera).unwrap();

        assert!(!switcher.animation.is_open());
        assert_eq!(switcher.metrics.switches(), 1);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "camera");
    }

    #[test]
    fn switch_back_to_animation_keeps_feed_state() {
        let mut switcher = fake_switcher(&[true], None);

        let mut frame = Mat::default();
        switcher.animation.read(&mut frame).unwrap();
        switcher.on_switch(Output::Animation).unwrap();

        assert!(switcher.animation.is_open());
        assert_eq!(switcher.metrics.switches(), 1);
    }
}
