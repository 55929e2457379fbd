use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
	/// Settings file (line format, or YAML when ending in .yaml/.yml)
	#[arg(short, long, default_value = "settings.txt")]
	pub settings: PathBuf,

	/// Output debug information
	#[arg(short, long)]
	pub debug: bool,

	/// Only log to the console
	#[arg(long)]
	pub no_log_file: bool,

	/// Append every output switch to this CSV file
	#[arg(short, long)]
	pub events: Option<PathBuf>,
}

pub fn parse_args() -> Args {
	Args::parse()
}
