use log::{debug, error};
use opencv::core::{self, Mat, Point, Size, Vector};
use opencv::imgproc;
use opencv::prelude::*;

const BLUR_KERNEL: i32 = 21;
const DILATE_ITERATIONS: i32 = 2;

/// Frame-difference motion detector over blurred greyscale frames.
pub struct MotionDetector {
    threshold: f64,
    min_area: f64,
    kernel: Mat,
}

impl MotionDetector {
    pub fn new(threshold: i32, min_area: i32) -> opencv::Result<Self> {
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(3, 3),
            Point::new(-1, -1),
        )?;

        Ok(Self {
            threshold: f64::from(threshold),
            min_area: f64::from(min_area),
            kernel,
        })
    }

    /// BGR frame to blurred greyscale, the form `detect` compares.
    pub fn preprocess(&self, frame: &Mat) -> opencv::Result<Mat> {
        let mut gray = Mat::default();
        if let Err(e) = imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGR2GRAY) {
            error!("Failed to convert frame to greyscale: {}", e);
            return Err(e);
        }

        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(
            &gray,
            &mut blurred,
            Size::new(BLUR_KERNEL, BLUR_KERNEL),
            0.,
        )?;
        Ok(blurred)
    }

    /// Whether any changed region between two preprocessed frames is larger
    /// than the minimum area.
    pub fn detect(&self, previous: &Mat, current: &Mat) -> opencv::Result<bool> {
        let mut diff = Mat::default();
        core::absdiff(previous, current, &mut diff)?;

        let mut thresh = Mat::default();
        imgproc::threshold(
            &diff,
            &mut thresh,
            self.threshold,
            255.,
            imgproc::THRESH_BINARY,
        )?;

        let mut dilated = Mat::default();
        imgproc::dilate(
            &thresh,
            &mut dilated,
            &self.kernel,
            Point::new(-1, -1),
            DILATE_ITERATIONS,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;

        let mut contours: Vector<Vector<Point>> = Vector::new();
        imgproc::find_contours(
            &dilated,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;

        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            if area > self.min_area {
                debug!(
                    "Motion: contour of area {:.0} out of {} regions",
                    area,
                    contours.len()
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}
