use anyhow::{Context, Result};
use log::{debug, info, warning};
use opencv::core::{self, Mat};
use opencv::highgui;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const WINNAME: &str = "camSwitcher";
const QUIT_KEY: i32 = 'q' as i32;

#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Fixed-size kiosk window. A left click or `q` requests exit.
pub struct Screen {
    exit_requested: Arc<AtomicBool>,
    mirrored: Mat,
}

impl Screen {
    pub fn open(placement: Placement) -> Result<Self> {
        debug!("Initializing display window '{}'", WINNAME);
        highgui::named_window(WINNAME, highgui::WINDOW_NORMAL)
            .context("Could not create display window")?;
        highgui::resize_window(WINNAME, placement.width, placement.height)?;
        highgui::move_window(WINNAME, placement.x, placement.y)?;

        if let Err(e) = highgui::set_window_property(
            WINNAME,
            highgui::WND_PROP_AUTOSIZE,
            f64::from(highgui::WINDOW_KEEPRATIO),
        ) {
            warning!("Could not keep window aspect ratio: {}", e);
        }

        let exit_requested = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exit_requested);
        highgui::set_mouse_callback(
            WINNAME,
            Some(Box::new(move |event: i32, _x: i32, _y: i32, _flags: i32| {
                if event == highgui::EVENT_LBUTTONDOWN {
                    flag.store(true, Ordering::SeqCst);
                }
            })),
        )
        .context("Could not register mouse callback")?;

        info!(
            "Window '{}' placed at ({}, {}) sized {}x{}",
            WINNAME, placement.x, placement.y, placement.width, placement.height
        );

        Ok(Self {
            exit_requested,
            mirrored: Mat::default(),
        })
    }

    /// Shows `frame`, mirrored horizontally when `mirror` is set.
    pub fn show(&mut self, frame: &Mat, mirror: bool) -> Result<()> {
        if mirror {
            core::flip(frame, &mut self.mirrored, 1)?;
            highgui::imshow(WINNAME, &self.mirrored)?;
        } else {
            highgui::imshow(WINNAME, frame)?;
        }
        Ok(())
    }

    /// Pumps window events for `delay_ms`. True once exit was requested.
    pub fn poll_exit(&self, delay_ms: i32) -> Result<bool> {
        let key = highgui::wait_key(delay_ms)?;
        if key >= 0 && (key & 0x7F) == QUIT_KEY {
            info!("Exit requested.");
            self.exit_requested.store(true, Ordering::SeqCst);
        } else if self.exit_requested.load(Ordering::SeqCst) {
            info!("Exit requested by mouse click.");
        }
        Ok(self.exit_requested.load(Ordering::SeqCst))
    }

    pub fn close(&self) -> Result<()> {
        debug!("Destroying display windows");
        highgui::destroy_all_windows()?;
        Ok(())
    }
}
