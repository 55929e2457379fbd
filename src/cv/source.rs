use anyhow::{Context, Result, anyhow};
use log::{debug, info, warning};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::VideoCapture;
use std::fmt::Display;
use std::path::PathBuf;

use super::{get_stream_camera, get_stream_file};

/// A video handle that can be (re)opened, read and released.
pub trait Capture {
    fn open(&mut self) -> Result<()>;
    /// Reads the next frame. `false` means no frame was produced.
    fn grab(&mut self, frame: &mut Mat) -> Result<bool>;
    fn release(&mut self) -> Result<()>;
    fn is_open(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    Device(i32),
    File(PathBuf),
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Device(index) => write!(f, "camera number {index}"),
            Origin::File(path) => write!(f, "video file {}", path.display()),
        }
    }
}

/// OpenCV capture opened from a device index or a file.
pub struct VideoSource {
    origin: Origin,
    capture: Option<VideoCapture>,
}

impl VideoSource {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            capture: None,
        }
    }
}

impl Capture for VideoSource {
    fn open(&mut self) -> Result<()> {
        self.release()?;

        let mut capture = match &self.origin {
            Origin::Device(index) => get_stream_camera(*index),
            Origin::File(path) => get_stream_file(path),
        }
        .with_context(|| format!("Could not open {}", self.origin))?;

        if !capture.is_opened()? {
            capture.release()?;
            return Err(anyhow!("Could not open {}", self.origin));
        }

        self.capture = Some(capture);
        Ok(())
    }

    fn grab(&mut self, frame: &mut Mat) -> Result<bool> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(false);
        };
        Ok(capture.read(frame)?)
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut capture) = self.capture.take() {
            capture
                .release()
                .with_context(|| format!("Failed to release {}", self.origin))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.capture.is_some()
    }
}

/// Lazily opened source that re-initialises once when a read fails.
pub struct Feed<C: Capture> {
    name: &'static str,
    capture: C,
    frames: u64,
}

impl<C: Capture> Feed<C> {
    pub fn new(name: &'static str, capture: C) -> Self {
        Self {
            name,
            capture,
            frames: 0,
        }
    }

    pub fn open(&mut self) -> Result<()> {
        debug!("Opening {} feed", self.name);
        self.capture
            .open()
            .with_context(|| format!("Failed to open {} feed", self.name))
    }

    /// Reads the next frame into `frame`, reopening the source once on
    /// failure. Errors when the retry fails as well.
    pub fn read(&mut self, frame: &mut Mat) -> Result<()> {
        if !self.capture.is_open() {
            self.open()?;
        }

        if self.capture.grab(frame)? && !frame.empty() {
            self.frames += 1;
            return Ok(());
        }

        warning!(
            "{} feed returned no frame after {} frames, reopening",
            self.name,
            self.frames
        );
        self.open()?;

        if self.capture.grab(frame)? && !frame.empty() {
            self.frames = 1;
            return Ok(());
        }

        Err(anyhow!("capture malfunction on {} feed", self.name))
    }

    /// Releases the handle. The next read reopens from the start.
    pub fn close(&mut self) -> Result<()> {
        if self.capture.is_open() {
            info!("Releasing {} feed", self.name);
        }
        self.frames = 0;
        self.capture.release()
    }

    pub fn is_open(&self) -> bool {
        self.capture.is_open()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use opencv::core::{CV_8UC3, Scalar};
    use std::collections::VecDeque;

    /// Scripted capture: each grab pops the next outcome.
    #[derive(Default)]
    pub(crate) struct FakeCapture {
        pub(crate) outcomes: VecDeque<bool>,
        pub(crate) open: bool,
        pub(crate) opens: usize,
        pub(crate) fail_open_after: Option<usize>,
    }

    impl FakeCapture {
        pub(crate) fn scripted(outcomes: &[bool]) -> Self {
            Self {
                outcomes: outcomes.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    impl Capture for FakeCapture {
        fn open(&mut self) -> Result<()> {
            if self.fail_open_after.is_some_and(|n| self.opens >= n) {
                return Err(anyhow!("device gone"));
            }
            self.opens += 1;
            self.open = true;
            Ok(())
        }

        fn grab(&mut self, frame: &mut Mat) -> Result<bool> {
            let ok = self.outcomes.pop_front().unwrap_or(false);
            *frame = if ok {
                Mat::new_rows_cols_with_default(4, 4, CV_8UC3, Scalar::all(1.))?
            } else {
                Mat::default()
            };
            Ok(ok)
        }

        fn release(&mut self) -> Result<()> {
            self.open = false;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeCapture;
    use super::*;

    #[test]
    fn opens_lazily_on_first_read() {
        let mut feed = Feed::new("animation", FakeCapture::scripted(&[true]));
        assert!(!feed.is_open());

        let mut frame = Mat::default();
        feed.read(&mut frame).unwrap();
        assert!(feed.is_open());
        assert_eq!(feed.capture.opens, 1);
        assert!(!frame.empty());
    }

    #[test]
    fn reopens_once_after_failed_read() {
        let mut feed = Feed::new("animation", FakeCapture::scripted(&[true, false, true]));
        let mut frame = Mat::default();

        feed.read(&mut frame).unwrap();
        feed.read(&mut frame).unwrap();
        assert_eq!(feed.capture.opens, 2);
    }

    #[test]
    fn second_failure_is_fatal() {
        let mut feed = Feed::new("camera", FakeCapture::scripted(&[false, false, true]));
        let mut frame = Mat::default();

        let err = feed.read(&mut frame).unwrap_err();
        assert!(err.to_string().contains("capture malfunction"));
    }

    #[test]
    fn failed_reopen_is_fatal() {
        let capture = FakeCapture {
            outcomes: [true, false].into_iter().collect(),
            fail_open_after: Some(1),
            ..Default::default()
        };
        let mut feed = Feed::new("camera", capture);
        let mut frame = Mat::default();

        feed.read(&mut frame).unwrap();
        let err = feed.read(&mut frame).unwrap_err();
        assert!(err.to_string().contains("Failed to open camera feed"));
    }

    #[test]
    fn close_forces_reopen() {
        let mut feed = Feed::new("animation", FakeCapture::scripted(&[true, true]));
        let mut frame = Mat::default();

        feed.read(&mut frame).unwrap();
        feed.close().unwrap();
        assert!(!feed.is_open());

        feed.read(&mut frame).unwrap();
        assert_eq!(feed.capture.opens, 2);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let mut source = VideoSource::new(Origin::File("/no/such/clip.mp4".into()));
        assert!(source.open().is_err());
        assert!(!source.is_open());
    }
}
