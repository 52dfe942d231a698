use std::{
	fs::OpenOptions,
	io::Write as IoWrite,
};
use sw_util::*;

pub const LOG_FILE: &str = "screenwatch.log";

struct ScreenwatchLogger {
	level: log::LevelFilter,
	file: Option<Mutex<File>>,
}
impl ScreenwatchLogger {
	fn open(dir: &Path) -> Option<Mutex<File>> {
		std::fs::create_dir_all(dir).ok()?;
		let mut f = OpenOptions::new().append(true).create(true).open(dir.join(LOG_FILE)).ok()?;
		writeln!(f, "============ SCREENWATCH LOG {} ============", chrono::Local::now().to_rfc3339()).ok();
		Some(Mutex::new(f))
	}
}
impl log::Log for ScreenwatchLogger {
	#[inline]
	fn enabled(&self, metadata: &log::Metadata) -> bool {
		metadata.level() <= self.level
	}

	fn log(&self, record: &log::Record) {
		if !self.enabled(record.metadata()) {
			return;
		}

		let text = format!(
			"{} [{}] [{}] {}",
			chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
			record.level(),
			record.module_path().unwrap_or("?"),
			record.args()
		);

		// stdout carries the result
		eprintln!("{text}");

		if let Some(file) = &self.file {
			writeln!(&mut *file.lock(), "{text}").ok();
		}
	}

	fn flush(&self) {
		if let Some(file) = &self.file {
			file.lock().flush().ok();
		}
	}
}

/// Logs to stderr and appends to `screenwatch.log` in `dir`. The level comes from `SCREENWATCH_LOG`, `info` by default.
pub fn init(dir: &Path) {
	let level = std::env::var("SCREENWATCH_LOG")
		.ok()
		.and_then(|level| level.parse::<log::LevelFilter>().ok())
		.unwrap_or(log::LevelFilter::Info);

	let file = ScreenwatchLogger::open(dir);
	let no_file = file.is_none();

	log::set_max_level(level);
	let logger: Box<dyn log::Log> = Box::new(ScreenwatchLogger { level, file });
	if log::set_logger(Box::leak(logger)).is_err() {
		eprintln!("Failed to initialize logger");
		return;
	}

	if no_file {
		log::warn!("Couldn't open {} in {}, logging to stderr only", LOG_FILE, dir.display());
	}
}
