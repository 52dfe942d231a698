use screenwatch::{AnalyzerConfig, Dispatcher, Error, OcrEngine, OcrError, OcrOptions, OcrResult, OcrText, Rect, ScreenAnalyzer, ScreenType};
use sw_util::*;

/// Keeps every error record so tests can count them per identifier.
struct CapturingLogger(Mutex<Vec<String>>);
impl log::Log for CapturingLogger {
	fn enabled(&self, _: &log::Metadata) -> bool {
		true
	}

	fn log(&self, record: &log::Record) {
		if record.level() == log::Level::Error {
			self.0.lock().push(record.args().to_string());
		}
	}

	fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger(parking_lot::const_mutex(Vec::new()));

fn install_logger() {
	static INIT: std::sync::Once = std::sync::Once::new();
	INIT.call_once(|| {
		log::set_logger(&LOGGER).ok();
		log::set_max_level(log::LevelFilter::Debug);
	});
}

fn errors_for(id: &str) -> usize {
	let tag = format!("[{id}]");
	LOGGER.0.lock().iter().filter(|line| line.starts_with(&tag)).count()
}

#[derive(Default)]
struct RecordingDispatcher(Mutex<Vec<(u32, u32)>>);
impl Dispatcher for RecordingDispatcher {
	fn click(&self, x: u32, y: u32) {
		self.0.lock().push((x, y));
	}
}

const SCREENS: [(u8, &str, ScreenType); 8] = [
	(10, "Password", ScreenType::PtcLogin),
	(40, "Google", ScreenType::LoginSelect),
	(70, "terminated", ScreenType::Terminated),
	(100, "CLUB", ScreenType::ClubKids),
	(130, "GPS-Signal", ScreenType::GpsLost),
	(160, "Suspension", ScreenType::Suspended),
	(190, "compatible", ScreenType::Incompatible),
	(220, "Spieldaten", ScreenType::GameData),
];

/// "Reads" the word belonging to the grey level of the image it is given.
struct ColourOcr;
impl ColourOcr {
	fn read(image: &Path) -> Result<&'static str, OcrError> {
		let image = image::open(image).map_err(|err| OcrError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
		let level = image.to_rgb8().get_pixel(0, 0).0[0];
		Ok(SCREENS.iter().min_by_key(|(grey, ..)| grey.abs_diff(level)).map(|(_, word, _)| *word).unwrap_or_default())
	}
}
impl OcrEngine for ColourOcr {
	fn recognise(&self, image: &Path, _options: &OcrOptions) -> Result<OcrResult, OcrError> {
		let word = Self::read(image)?;
		Ok(OcrResult {
			texts: vec![OcrText {
				level: 5,
				text: word.to_owned(),
				confidence: 95.0,
				left: 100,
				top: 900,
				width: 200,
				height: 40,
			}],
		})
	}

	fn recognise_text(&self, image: &Path, _options: &OcrOptions) -> Result<String, OcrError> {
		Self::read(image).map(str::to_owned)
	}
}

fn analyzer(dir: &Path, threads: usize) -> ScreenAnalyzer {
	let mut config = AnalyzerConfig::new(dir.join("scratch")).unwrap();
	config.threads = threads;
	config.settle_taps = false;
	ScreenAnalyzer::new(config, Arc::new(ColourOcr)).unwrap()
}

#[test]
fn test_unreadable_screenshots() {
	install_logger();

	let dir = tempfile::tempdir().unwrap();
	let analyzer = analyzer(dir.path(), 2);
	let empty = dir.path().join("empty.png");
	std::fs::write(&empty, b"").unwrap();
	let missing = dir.path().join("missing.png");

	let dispatcher = Arc::new(RecordingDispatcher::default());

	macro_rules! check {
		($name:literal, |$path:ident, $id:ident| $call:expr) => {{
			let id = concat!("corrupt-", $name);
			let $path: &Path = &empty;
			let $id = id;
			match $call {
				Err(Error::CorruptImage { .. }) => {}
				other => panic!("{}: expected CorruptImage, got {:?}", $name, other.map(|_| ())),
			}
			assert_eq!(errors_for(id), 1, "{}", $name);

			let id = concat!("missing-", $name);
			let $path: &Path = &missing;
			let $id = id;
			match $call {
				Err(Error::MissingInput(_)) => {}
				other => panic!("{}: expected MissingInput, got {:?}", $name, other.map(|_| ())),
			}
			assert_eq!(errors_for(id), 1, "{}", $name);
		}};
	}

	check!("gps", |path, id| analyzer.is_gps_signal_lost(path, id));
	check!("colour", |path, id| analyzer.most_frequent_colour(path, id));
	check!("raid-count", |path, id| analyzer.read_raid_circle_count(path, id, Some(dispatcher.clone() as Arc<dyn Dispatcher>)));
	check!("raid-counter", |path, id| analyzer.check_raid_counter(path, id));
	check!("raidscreen", |path, id| analyzer.check_raidscreen(path, id));
	check!("nearby", |path, id| analyzer.check_nearby(path, id, dispatcher.clone()));
	check!("close", |path, id| analyzer.check_close_except_nearby_button(path, id, dispatcher.clone(), false));
	check!("mainscreen", |path, id| analyzer.check_mainscreen(path, id));
	check!("button", |path, id| analyzer.look_for_button(path, id, 3.2, 4.5, dispatcher.clone(), false));
	check!("inventory", |path, id| analyzer.get_inventory_text(path, id, Rect::new(0, 0, 10, 10)));
	check!("screen-text", |path, id| analyzer.get_screen_text(path, id));
	check!("screen", |path, id| analyzer.detect_screen_type(path, id));
	check!("trash", |path, id| analyzer.get_trash_click_positions(path, id, true));

	assert!(dispatcher.0.lock().is_empty());
}

#[test]
fn test_invalid_region_is_logged_once() {
	install_logger();

	let dir = tempfile::tempdir().unwrap();
	let analyzer = analyzer(dir.path(), 1);
	let path = dir.path().join("small.png");
	image::RgbImage::new(100, 100).save(&path).unwrap();

	let result = analyzer.get_inventory_text(&path, "region-device", Rect::new(50, 50, 150, 60));
	assert!(matches!(result, Err(Error::InvalidRegion { width: 100, height: 100, .. })));
	assert_eq!(errors_for("region-device"), 1);
}

#[test]
fn test_concurrent_identifiers() {
	install_logger();

	let dir = tempfile::tempdir().unwrap();
	let analyzer = analyzer(dir.path(), 4);

	let screenshots = SCREENS
		.iter()
		.enumerate()
		.map(|(i, (grey, _, expected))| {
			let path = dir.path().join(format!("screen-{i}.png"));
			image::RgbImage::from_pixel(1080, 1920, image::Rgb([*grey; 3])).save(&path).unwrap();
			(format!("device-{i}"), path, *expected)
		})
		.collect::<Vec<_>>();

	std::thread::scope(|scope| {
		for (id, path, expected) in &screenshots {
			let analyzer = &analyzer;
			scope.spawn(move || {
				for _ in 0..3 {
					let detection = analyzer.detect_screen_type(path, id).unwrap();
					assert_eq!(detection.screen, *expected, "{id}");
					assert_eq!((detection.width, detection.height, detection.scale), (1080, 1920, 1.0));
				}
			});
		}
	});

	// every scratch file was cleaned up
	assert_eq!(std::fs::read_dir(dir.path().join("scratch")).unwrap().count(), 0);
}

#[test]
fn test_taps_reach_the_dispatcher() {
	install_logger();

	let dir = tempfile::tempdir().unwrap();
	let analyzer = analyzer(dir.path(), 2);

	// no panel at all, so the dismiss corner is tapped
	let path = dir.path().join("blank.png");
	image::RgbImage::from_pixel(1080, 1920, image::Rgb([30, 30, 30])).save(&path).unwrap();

	let dispatcher = Arc::new(RecordingDispatcher::default());
	assert!(!analyzer.check_nearby(&path, "tap-device", dispatcher.clone()).unwrap());
	assert_eq!(*dispatcher.0.lock(), [(930, 1762)]);
	assert_eq!(errors_for("tap-device"), 0);
}

#[test]
fn test_crowded_outlines_dismiss() {
	install_logger();

	let dir = tempfile::tempdir().unwrap();
	let analyzer = analyzer(dir.path(), 1);

	// eight outlines below the top third, more than any dialog has
	let mut image = image::RgbImage::from_pixel(1080, 1920, image::Rgb([30, 30, 30]));
	for y in (700..=1400).step_by(100) {
		for yy in y..y + 6 {
			for x in 340..740 {
				image.put_pixel(x, yy, image::Rgb([230, 230, 230]));
			}
		}
	}
	let path = dir.path().join("crowded.png");
	image.save(&path).unwrap();

	let dispatcher = Arc::new(RecordingDispatcher::default());
	assert!(analyzer.look_for_button(&path, "crowded-device", 2.0, 3.0, dispatcher.clone(), false).unwrap());
	assert_eq!(*dispatcher.0.lock(), [(930, 1762)]);
	assert_eq!(errors_for("crowded-device"), 0);
}
