use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
	fmt::Display,
	path::{Path, PathBuf},
	time::Duration,
};

static LINE_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^([^:]+):(.*)$").expect("settings line pattern is valid"));

/// Clip shown in place of a live camera when `test mode` is off.
pub const CAM_EXAMPLE: &str = "cam_example.mp4";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub animation: PathBuf,
	/// Seconds of continuous motion before the camera is shown
	pub motion_delay: f64,
	/// Seconds without motion before the animation comes back
	pub idle_delay: f64,
	/// Per-pixel difference threshold, 1..=255
	pub threshold: i32,
	/// Minimum contour area counted as motion
	pub min_area: i32,
	pub location_x: i32,
	pub location_y: i32,
	pub width: i32,
	pub height: i32,
	/// `wait_key` delay between frames, in ms
	pub frame_delay: i32,
	pub live_camera: bool,
	pub flip: bool,
}

impl ::std::default::Default for Settings {
	fn default() -> Self {
		Self {
			animation: "animation.mp4".into(),
			motion_delay: 0.1,
			idle_delay: 7.0,
			threshold: 15,
			min_area: 500,
			location_x: -10,
			location_y: -10,
			width: 500,
			height: 500,
			frame_delay: 1,
			live_camera: false,
			flip: true,
		}
	}
}

#[derive(Debug)]
pub enum SettingsError {
	/// The settings file could not be read
	Read(PathBuf, std::io::Error),
	/// The YAML settings file could not be deserialized
	Yaml(confy::ConfyError),
	/// A setting is missing its value or out of range
	Invalid(&'static str),
}

impl Display for SettingsError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SettingsError::Read(path, e) => {
				write!(f, "could not read settings file {}: {e}", path.display())
			}
			SettingsError::Yaml(e) => write!(f, "could not load YAML settings: {e}"),
			SettingsError::Invalid(message) => {
				write!(f, "{message}\ninput error, consult example_settings.txt")
			}
		}
	}
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, Copy)]
enum Key {
	Animation,
	MotionDelay,
	IdleDelay,
	Threshold,
	MinArea,
	LocationX,
	LocationY,
	Width,
	Height,
	FrameDelay,
	TestMode,
	Flip,
}

impl Key {
	fn from_name(name: &str) -> Option<Self> {
		use Key::*;
		let key = match name {
			"animation" => Animation,
			"minimal motion time" => MotionDelay,
			"minimal idle time" => IdleDelay,
			"motion sensitivity" => Threshold,
			"motion size sensitivity" => MinArea,
			"location x" => LocationX,
			"location y" => LocationY,
			"width" => Width,
			"height" => Height,
			"frame delay" => FrameDelay,
			"test mode" => TestMode,
			"flip" => Flip,
			_ => return None,
		};
		Some(key)
	}

	fn error(&self) -> SettingsError {
		use Key::*;
		SettingsError::Invalid(match self {
			Animation => "animation file not found",
			MotionDelay => "motion delay input error",
			IdleDelay => "idle delay input error",
			Threshold => "motion sensitivity input error",
			MinArea => "minimum motion size input error",
			LocationX => "window x location input error",
			LocationY => "window y location input error",
			Width => "width input error",
			Height => "height input error",
			FrameDelay => "delay input error",
			TestMode => "test mode input error",
			Flip => "flip mode input error",
		})
	}

	fn number(&self, value: &str) -> Result<f64, SettingsError> {
		value
			.parse::<f64>()
			.ok()
			.filter(|n| n.is_finite())
			.ok_or_else(|| self.error())
	}

	/// Whole-number setting, truncated toward zero. Values outside `i32` are
	/// rejected rather than clamped.
	fn integer(&self, value: &str) -> Result<i32, SettingsError> {
		let n = self.number(value)?.trunc();
		if n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
			return Err(self.error());
		}
		Ok(n as i32)
	}

	fn switch(&self, value: &str) -> Result<bool, SettingsError> {
		match self.number(value)? {
			n if n == 0. => Ok(false),
			n if n == 1. => Ok(true),
			_ => Err(self.error()),
		}
	}
}

impl Settings {
	/// Loads and validates the settings at `path`. Paths ending in `.yaml` or
	/// `.yml` are read through confy, anything else as `key: value` lines.
	pub fn load(path: &Path) -> Result<Self, SettingsError> {
		info!("Loading settings from {}", path.display());

		let is_yaml = path
			.extension()
			.and_then(|ext| ext.to_str())
			.is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

		let settings = if is_yaml {
			// confy writes the defaults out when the file is missing
			if !path.is_file() {
				return Err(SettingsError::Read(
					path.to_path_buf(),
					std::io::Error::from(std::io::ErrorKind::NotFound),
				));
			}
			confy::load_path::<Settings>(path).map_err(SettingsError::Yaml)?
		} else {
			let text = std::fs::read_to_string(path)
				.map_err(|e| SettingsError::Read(path.to_path_buf(), e))?;
			Self::parse(&text)?
		};

		settings.validate()?;
		debug!("Effective settings: {:?}", settings);
		Ok(settings)
	}

	/// Parses the line format. Values are not range-checked here.
	pub fn parse(text: &str) -> Result<Self, SettingsError> {
		let mut settings = Settings::default();

		for raw in text.lines() {
			let line = raw.split('#').next().unwrap_or_default().trim();
			if line.is_empty() {
				continue;
			}

			let Some(caps) = LINE_RE.captures(line) else {
				debug!("Ignoring settings line without a key: '{}'", line);
				continue;
			};
			let name = caps[1].trim().to_lowercase();
			let value = caps[2].trim();

			let Some(key) = Key::from_name(&name) else {
				debug!("Ignoring unknown setting '{}'", name);
				continue;
			};

			match key {
				Key::Animation => settings.animation = PathBuf::from(value),
				Key::MotionDelay => settings.motion_delay = key.number(value)?,
				Key::IdleDelay => settings.idle_delay = key.number(value)?,
				Key::Threshold => settings.threshold = key.integer(value)?,
				Key::MinArea => settings.min_area = key.integer(value)?,
				Key::LocationX => settings.location_x = key.integer(value)?,
				Key::LocationY => settings.location_y = key.integer(value)?,
				Key::Width => settings.width = key.integer(value)?,
				Key::Height => settings.height = key.integer(value)?,
				Key::FrameDelay => settings.frame_delay = key.integer(value)?,
				Key::TestMode => settings.live_camera = key.switch(value)?,
				Key::Flip => settings.flip = key.switch(value)?,
			}
		}

		Ok(settings)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if !self.animation.is_file() {
			return Err(Key::Animation.error());
		}
		if delay(self.motion_delay).is_none() {
			return Err(Key::MotionDelay.error());
		}
		if delay(self.idle_delay).is_none() {
			return Err(Key::IdleDelay.error());
		}
		if !(1..=255).contains(&self.threshold) {
			return Err(Key::Threshold.error());
		}
		if self.min_area < 1 {
			return Err(Key::MinArea.error());
		}
		if self.width < 1 {
			return Err(Key::Width.error());
		}
		if self.height < 1 {
			return Err(Key::Height.error());
		}
		if self.frame_delay < 1 {
			return Err(Key::FrameDelay.error());
		}
		Ok(())
	}

	/// Continuous motion needed before the camera is shown.
	pub fn motion_window(&self) -> Result<Duration, SettingsError> {
		delay(self.motion_delay).ok_or_else(|| Key::MotionDelay.error())
	}

	/// Stillness needed before the animation comes back.
	pub fn idle_window(&self) -> Result<Duration, SettingsError> {
		delay(self.idle_delay).ok_or_else(|| Key::IdleDelay.error())
	}
}

/// Positive number of seconds that fits a `Duration`.
fn delay(seconds: f64) -> Option<Duration> {
	if seconds > 0. {
		Duration::try_from_secs_f64(seconds).ok()
	} else {
		None
	}
}
