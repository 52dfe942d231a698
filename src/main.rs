mod logs;

use screenwatch::{AnalyzerConfig, Dispatcher, OcrEngine, Rect, ScreenAnalyzer, TesseractCli, Tuning};
use sw_util::{anyhow::Context, *};

const USAGE: &str = "\
usage: screenwatch <operation> <screenshot> [identifier]

operations:
  screen                                        which screen is showing
  screen-text                                   all text on the screen
  gps                                           is the GPS lost banner showing
  colour                                        most frequent colour
  raid-count                                    count (and tap) the raid circles
  raid-counter                                  is the raid counter showing
  raidscreen                                    is the raid tab open
  nearby                                        is the raid tab open, tapping towards it if not
  close | close-raid                            tap a close button
  mainscreen                                    is the main screen showing
  button:<ratio_min>:<ratio_max>                tap a button between its outlines
  button-upper:<ratio_min>:<ratio_max>          tap a button below the topmost outline
  inventory:<left>:<top>:<right>:<bottom>       text inside a rectangle
  trash | trash-full                            trash item positions

environment:
  SCREENWATCH_TEMP      scratch directory (default: <tmp>/screenwatch)
  SCREENWATCH_THREADS   worker threads
  SCREENWATCH_TUNING    TOML file overriding the built-in tuning
  SCREENWATCH_LOG       log level (default: info)";

/// Taps only go to the log; there is no device on the other end.
struct LoggingDispatcher(String);
impl Dispatcher for LoggingDispatcher {
	fn click(&self, x: u32, y: u32) {
		log::info!("[{}] tap {}x{}", self.0, x, y);
	}
}

fn params<T: std::str::FromStr>(op: &str, args: &[&str], n: usize) -> Result<Vec<T>, AnyError>
where
	T::Err: std::error::Error + Send + Sync + 'static,
{
	if args.len() != n {
		anyhow::bail!("{op} takes {n} parameters, got {}", args.len());
	}
	args.iter()
		.map(|arg| arg.parse::<T>().with_context(|| format!("invalid parameter {arg:?} for {op}")))
		.collect()
}

fn run(analyzer: &ScreenAnalyzer, operation: &str, path: &Path, id: &str) -> Result<serde_json::Value, AnyError> {
	let dispatcher = || Arc::new(LoggingDispatcher(id.to_owned())) as Arc<dyn Dispatcher>;

	let mut parts = operation.split(':');
	let op = parts.next().unwrap_or_default();
	let args = parts.collect::<Vec<_>>();

	let value = match op {
		"screen" => serde_json::to_value(analyzer.detect_screen_type(path, id)?)?,
		"screen-text" => serde_json::to_value(analyzer.get_screen_text(path, id)?)?,
		"gps" => serde_json::to_value(analyzer.is_gps_signal_lost(path, id)?)?,
		"colour" | "color" => serde_json::to_value(analyzer.most_frequent_colour(path, id)?)?,
		"raid-count" => serde_json::to_value(analyzer.read_raid_circle_count(path, id, Some(dispatcher()))?)?,
		"raid-counter" => serde_json::to_value(analyzer.check_raid_counter(path, id)?)?,
		"raidscreen" => serde_json::to_value(analyzer.check_raidscreen(path, id)?)?,
		"nearby" => serde_json::to_value(analyzer.check_nearby(path, id, dispatcher())?)?,
		"close" | "close-raid" => serde_json::to_value(analyzer.check_close_except_nearby_button(path, id, dispatcher(), op == "close-raid")?)?,
		"mainscreen" => serde_json::to_value(analyzer.check_mainscreen(path, id)?)?,
		"button" | "button-upper" => {
			let ratios = params::<f64>(op, &args, 2)?;
			serde_json::to_value(analyzer.look_for_button(path, id, ratios[0], ratios[1], dispatcher(), op == "button-upper")?)?
		}
		"inventory" => {
			let rect = params::<u32>(op, &args, 4)?;
			serde_json::to_value(analyzer.get_inventory_text(path, id, Rect::new(rect[0], rect[1], rect[2], rect[3]))?)?
		}
		"trash" | "trash-full" => serde_json::to_value(analyzer.get_trash_click_positions(path, id, op == "trash-full")?)?,
		_ => anyhow::bail!("unknown operation {operation:?}\n\n{USAGE}"),
	};

	Ok(value)
}

fn main() -> Result<(), AnyError> {
	let args = std::env::args().skip(1).collect::<Vec<_>>();
	let (operation, path, id) = match args.as_slice() {
		[operation, path] => (operation.as_str(), PathBuf::from(path), "cli"),
		[operation, path, id] => (operation.as_str(), PathBuf::from(path), id.as_str()),
		_ => {
			eprintln!("{USAGE}");
			std::process::exit(2);
		}
	};

	let temp_dir = std::env::var_os("SCREENWATCH_TEMP").map(PathBuf::from).unwrap_or_else(|| std::env::temp_dir().join("screenwatch"));
	logs::init(&temp_dir);

	let mut config = AnalyzerConfig::new(&temp_dir)?;
	if let Some(tuning) = std::env::var_os("SCREENWATCH_TUNING") {
		config.tuning = Tuning::load_overrides(Path::new(&tuning)).context("failed to load tuning overrides")?;
	}
	if let Ok(threads) = std::env::var("SCREENWATCH_THREADS") {
		config.threads = threads.parse().context("SCREENWATCH_THREADS must be a number")?;
	}

	let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractCli::locate().unwrap_or_else(|err| {
		log::warn!("{err}, text recognition will fail");
		TesseractCli::with_binary("tesseract")
	}));

	let analyzer = ScreenAnalyzer::new(config, ocr)?;
	let result = run(&analyzer, operation, &path, id)?;
	println!("{}", serde_json::to_string_pretty(&result)?);

	Ok(())
}
