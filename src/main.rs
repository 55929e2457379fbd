use cli::parse_args;
use conf::Settings;
use log::{LogLevel, critical, info, logger::SessionLogger};
use std::process::ExitCode;

mod app;
mod cli;
mod conf;
mod cv;
mod journal;
mod switch;

fn main() -> ExitCode {
	let args = parse_args();

	let level = if args.debug { LogLevel::Debug } else { LogLevel::Info };
	if let Err(e) = SessionLogger::init(level, "camswitch", !args.no_log_file) {
		eprintln!("Failed to initialize logger: {e}");
	}

	match run(args) {
		Ok(()) => {
			info!("camswitch stopped");
			ExitCode::SUCCESS
		}
		Err(e) => {
			critical!("{:#}", e);
			eprintln!("{e:#}");
			ExitCode::FAILURE
		}
	}
}

fn run(args: cli::Args) -> anyhow::Result<()> {
	let settings = Settings::load(&args.settings)?;
	let camera = app::camera_origin(&settings)?;
	let journal = args
		.events
		.as_deref()
		.map(journal::Journal::open)
		.transpose()?;

	app::CamSwitch::new(settings, camera, journal)?.run()
}
