pub mod display;
pub mod frame_metrics;
pub mod motion;
pub mod source;

use log::{debug, info, warning};
use opencv::prelude::*;
use opencv::videoio::VideoCapture;
use std::path::Path;

/// Upper bound of device indices tried when looking for a camera.
pub const MAX_CAMERAS: i32 = 10;

pub fn get_stream_camera(index: i32) -> Result<VideoCapture, opencv::Error> {
    info!("Opening camera stream {}", index);
    let camera = VideoCapture::new_def(index);
    match &camera {
        Ok(_) => debug!("Camera {} handle created", index),
        Err(e) => info!("Failed to open camera {}: {}", index, e),
    }
    camera
}

pub fn get_stream_file(file: &Path) -> Result<VideoCapture, opencv::Error> {
    info!("Opening video file stream {}", file.display());
    VideoCapture::from_file_def(&file.to_string_lossy())
}

/// First device index in `0..max` that opens, if any.
pub fn probe_camera(max: i32) -> Option<i32> {
    for index in 0..max.min(MAX_CAMERAS) {
        let Ok(mut camera) = VideoCapture::new_def(index) else {
            continue;
        };
        if camera.is_opened().unwrap_or(false) {
            if let Err(e) = camera.release() {
                warning!("Failed to release probed camera {}: {}", index, e);
            }
            info!("Found camera at index {}", index);
            return Some(index);
        }
        debug!("No camera at index {}", index);
    }
    None
}
