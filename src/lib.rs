//! Recognises which screen a mobile app is showing from a screenshot, and decides where to tap next.
//!
//! Every operation of [`ScreenAnalyzer`] loads the screenshot fresh, runs on the analyzer's worker pool and blocks
//! the caller until it has finished. Failures are logged once, prefixed with the caller's identifier, and
//! returned as an [`Error`].

pub mod classify;
mod pool;
mod procedures;

pub(crate) mod prelude {
	pub(crate) use crate::{procedures::Ctx, Dispatcher};
	pub(crate) use sw_util::origin_log;
	pub(crate) use sw_vision_common::prelude::*;
	pub(crate) use sw_vision_cpu as cpu;
	pub(crate) use sw_vision_ocr as ocr;
}
use prelude::*;

pub use pool::{Pending, WorkerPool};
pub use procedures::screen::ScreenDetection;
pub use sw_util::{Point, Rect};
pub use sw_vision_common::{screen_type::ScreenType, tuning::Tuning, Error};
pub use sw_vision_cpu::FeatureCount;
pub use sw_vision_ocr::{OcrEngine, OcrError, OcrOptions, OcrResult, OcrText, TesseractCli};

/// Delivers taps to the device. Taps are fire and forget.
pub trait Dispatcher: Send + Sync {
	fn click(&self, x: u32, y: u32);
}

/// Finds the inventory items that should be thrown away.
pub trait TrashMatcher: Send + Sync {
	fn trash_click_positions(&self, identifier: &str, screenshot: &Path, full_screen: bool) -> Option<Vec<Point<u32>>>;
}

#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
	/// Scratch images are written here. Created if it does not exist.
	pub temp_dir: PathBuf,
	pub threads: usize,
	pub tuning: Tuning,
	/// Wait for the UI to react after each tap.
	pub settle_taps: bool,
}
impl AnalyzerConfig {
	/// The embedded tuning, one worker per core, settling after taps.
	pub fn new(temp_dir: impl Into<PathBuf>) -> Result<Self, Error> {
		Ok(AnalyzerConfig {
			temp_dir: temp_dir.into(),
			threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
			tuning: Tuning::embedded()?,
			settle_taps: true,
		})
	}
}

struct Shared {
	tuning: Tuning,
	ocr: Arc<dyn OcrEngine>,
	scratch: ScratchDir,
	settle: bool,
}

pub struct ScreenAnalyzer {
	shared: Arc<Shared>,
	pool: WorkerPool,
	trash: Option<Arc<dyn TrashMatcher>>,
}
impl ScreenAnalyzer {
	pub fn new(config: AnalyzerConfig, ocr: Arc<dyn OcrEngine>) -> Result<Self, Error> {
		let scratch = ScratchDir::create(config.temp_dir)?;
		let pool = WorkerPool::new(config.threads)?;
		Ok(ScreenAnalyzer {
			shared: Arc::new(Shared {
				tuning: config.tuning,
				ocr,
				scratch,
				settle: config.settle_taps,
			}),
			pool,
			trash: None,
		})
	}

	pub fn with_trash_matcher(mut self, matcher: Arc<dyn TrashMatcher>) -> Self {
		self.trash = Some(matcher);
		self
	}

	#[inline]
	pub fn tuning(&self) -> &Tuning {
		&self.shared.tuning
	}

	/// Queues `job` for the screenshot at `path`. The screenshot is decoded on the worker.
	fn submit<T, F>(&self, path: &Path, id: &str, dispatcher: Option<Arc<dyn Dispatcher>>, job: F) -> Result<Pending<T>, Error>
	where
		T: Send + 'static,
		F: FnOnce(&Ctx<'_>, Frame) -> Result<T, Error> + Send + 'static,
	{
		if !path.is_file() {
			return Err(Error::MissingInput(path.to_owned()));
		}

		let shared = self.shared.clone();
		let (path, id) = (path.to_owned(), id.to_owned());
		Ok(self.pool.submit(move || {
			let frame = Frame::load(&path)?;
			origin_log!(trace, id, "loaded {} ({}x{})", path.display(), frame.width(), frame.height());

			let ctx = Ctx {
				id: &id,
				tuning: &shared.tuning,
				scratch: &shared.scratch,
				ocr: &*shared.ocr,
				dispatcher: dispatcher.as_deref(),
				settle: shared.settle,
			};
			job(&ctx, frame)
		}))
	}

	/// Runs `job` to completion, logging its failure, if any, against `id`.
	fn run<T, F>(&self, op: &str, path: &Path, id: &str, dispatcher: Option<Arc<dyn Dispatcher>>, job: F) -> Result<T, Error>
	where
		T: Send + 'static,
		F: FnOnce(&Ctx<'_>, Frame) -> Result<T, Error> + Send + 'static,
	{
		let result = self.submit(path, id, dispatcher, job).and_then(Pending::wait);
		if let Err(err) = &result {
			origin_log!(error, id, "{} failed: {}", op, err);
		}
		result
	}

	/// Whether the "GPS signal lost" banner is showing.
	pub fn is_gps_signal_lost(&self, path: &Path, id: &str) -> Result<bool, Error> {
		self.run("is_gps_signal_lost", path, id, None, |ctx, frame| Ok(procedures::gps::is_signal_lost(ctx, &frame)))
	}

	pub fn most_frequent_colour(&self, path: &Path, id: &str) -> Result<Option<[u8; 3]>, Error> {
		self.run("most_frequent_colour", path, id, None, |ctx, frame| Ok(procedures::gps::dominant_colour(ctx, &frame)))
	}

	/// Counts the raid circles while the raid counter is showing, capped, tapping each one if `dispatcher` is given.
	pub fn read_raid_circle_count(&self, path: &Path, id: &str, dispatcher: Option<Arc<dyn Dispatcher>>) -> Result<FeatureCount, Error> {
		self.run("read_raid_circle_count", path, id, dispatcher, |ctx, frame| Ok(procedures::raid::read_circle_count(ctx, &frame)))
	}

	pub fn check_raid_counter(&self, path: &Path, id: &str) -> Result<bool, Error> {
		self.run("check_raid_counter", path, id, None, |ctx, frame| Ok(procedures::raid::check_raid_counter(ctx, &frame)))
	}

	/// Whether the raid tab of the raid panel is open.
	pub fn check_raidscreen(&self, path: &Path, id: &str) -> Result<bool, Error> {
		self.run("check_raidscreen", path, id, None, |ctx, frame| Ok(procedures::raid::check_raidscreen(ctx, &frame)))
	}

	/// Whether the raid tab is open. Otherwise taps towards it: over from the nearby tab, or the dismiss corner.
	pub fn check_nearby(&self, path: &Path, id: &str, dispatcher: Arc<dyn Dispatcher>) -> Result<bool, Error> {
		self.run("check_nearby", path, id, Some(dispatcher), |ctx, frame| Ok(procedures::raid::check_nearby(ctx, &frame)))
	}

	/// Taps the first close button found, leaving the raid panel alone unless `close_raid`.
	pub fn check_close_except_nearby_button(&self, path: &Path, id: &str, dispatcher: Arc<dyn Dispatcher>, close_raid: bool) -> Result<bool, Error> {
		self.run("check_close_except_nearby_button", path, id, Some(dispatcher), move |ctx, frame| {
			Ok(procedures::close::check_close_except_nearby(ctx, &frame, close_raid))
		})
	}

	pub fn check_mainscreen(&self, path: &Path, id: &str) -> Result<bool, Error> {
		self.run("check_mainscreen", path, id, None, |ctx, frame| Ok(procedures::mainscreen::check_mainscreen(ctx, &frame)))
	}

	/// Looks for a button outlined by horizontal lines between `width / ratio_max` and `width / ratio_min` long.
	pub fn look_for_button(&self, path: &Path, id: &str, ratio_min: f64, ratio_max: f64, dispatcher: Arc<dyn Dispatcher>, upper: bool) -> Result<bool, Error> {
		self.run("look_for_button", path, id, Some(dispatcher), move |ctx, frame| {
			Ok(procedures::button::look_for_button(ctx, &frame, ratio_min, ratio_max, upper))
		})
	}

	/// Reads the text inside `rect`, which must lie within the screenshot. `None` if OCR failed.
	pub fn get_inventory_text(&self, path: &Path, id: &str, rect: Rect<u32>) -> Result<Option<String>, Error> {
		self.run("get_inventory_text", path, id, None, move |ctx, frame| procedures::inventory::inventory_text(ctx, &frame, rect))
	}

	/// Recognises the whole screen in one pass. `None` if OCR failed.
	pub fn get_screen_text(&self, path: &Path, id: &str) -> Result<Option<OcrResult>, Error> {
		self.run("get_screen_text", path, id, None, |ctx, frame| procedures::screen::screen_text(ctx, &frame))
	}

	pub fn detect_screen_type(&self, path: &Path, id: &str) -> Result<ScreenDetection, Error> {
		self.run("detect_screen_type", path, id, None, |ctx, frame| procedures::screen::detect_screen_type(ctx, &frame))
	}

	/// Asks the trash matcher where to tap. `None` if there is no matcher or it found nothing.
	pub fn get_trash_click_positions(&self, path: &Path, id: &str, full_screen: bool) -> Result<Option<Vec<Point<u32>>>, Error> {
		let matcher = self.trash.clone();
		let screenshot = path.to_owned();
		self.run("get_trash_click_positions", path, id, None, move |ctx, _frame| {
			let Some(matcher) = matcher else {
				origin_log!(warn, ctx.id, "no trash matcher configured");
				return Ok(None);
			};
			Ok(matcher.trash_click_positions(ctx.id, &screenshot, full_screen))
		})
	}
}

#[cfg(test)]
fn analyzer(dir: &Path) -> ScreenAnalyzer {
	let mut config = AnalyzerConfig::new(dir.join("scratch")).unwrap();
	config.threads = 2;
	config.settle_taps = false;
	ScreenAnalyzer::new(config, Arc::new(procedures::testing::ScriptedOcr::default())).unwrap()
}

#[test]
fn test_missing_input() {
	let dir = tempfile::tempdir().unwrap();
	let analyzer = analyzer(dir.path());
	let result = analyzer.is_gps_signal_lost(&dir.path().join("nope.png"), "device-1");
	assert!(matches!(result, Err(Error::MissingInput(_))));
}

#[test]
fn test_gps_through_the_pool() {
	let dir = tempfile::tempdir().unwrap();
	let analyzer = analyzer(dir.path());

	let path = dir.path().join("gps.png");
	RgbImage::from_pixel(108, 192, image::Rgb([240, 75, 95])).save(&path).unwrap();

	assert!(analyzer.is_gps_signal_lost(&path, "device-1").unwrap());
	assert_eq!(analyzer.most_frequent_colour(&path, "device-1").unwrap(), Some([240, 75, 95]));
	assert!(dir.path().join("scratch").is_dir());

	// screenshots without an extension are still recognised
	let bare = dir.path().join("screenshot");
	std::fs::copy(&path, &bare).unwrap();
	assert!(analyzer.is_gps_signal_lost(&bare, "device-1").unwrap());
}

#[test]
fn test_trash_matcher() {
	struct Fixed;
	impl TrashMatcher for Fixed {
		fn trash_click_positions(&self, identifier: &str, screenshot: &Path, full_screen: bool) -> Option<Vec<Point<u32>>> {
			assert_eq!(identifier, "device-2");
			assert!(screenshot.is_file());
			full_screen.then(|| vec![Point::new(10, 20)])
		}
	}

	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("inventory.png");
	RgbImage::new(10, 10).save(&path).unwrap();

	let without = analyzer(dir.path());
	assert_eq!(without.get_trash_click_positions(&path, "device-2", true).unwrap(), None);

	let with = analyzer(dir.path()).with_trash_matcher(Arc::new(Fixed));
	assert_eq!(with.get_trash_click_positions(&path, "device-2", true).unwrap(), Some(vec![Point::new(10, 20)]));
	assert_eq!(with.get_trash_click_positions(&path, "device-2", false).unwrap(), None);
}
