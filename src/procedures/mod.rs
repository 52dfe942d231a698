use crate::prelude::*;
use ocr::{OcrEngine, OcrOptions};

pub mod button;
pub mod close;
pub mod gps;
pub mod inventory;
pub mod mainscreen;
pub mod raid;
pub mod screen;

/// Everything a procedure needs besides the frame itself. Lives for one request.
pub struct Ctx<'a> {
	pub id: &'a str,
	pub tuning: &'a Tuning,
	pub scratch: &'a ScratchDir,
	pub ocr: &'a dyn OcrEngine,
	pub dispatcher: Option<&'a dyn Dispatcher>,
	/// Whether to wait for the UI to react after a tap.
	pub settle: bool,
}
impl Ctx<'_> {
	/// Sends a tap if a dispatcher was supplied, then waits `settle_ms` for the UI to react.
	pub fn tap(&self, x: u32, y: u32, settle_ms: u64) {
		let Some(dispatcher) = self.dispatcher else {
			origin_log!(debug, self.id, "would tap {}x{} but no dispatcher was given", x, y);
			return;
		};

		origin_log!(debug, self.id, "tapping {}x{}", x, y);
		dispatcher.click(x, y);

		if self.settle && settle_ms > 0 {
			std::thread::sleep(Duration::from_millis(settle_ms));
		}
	}

	/// Taps the corner that closes overlays and panels.
	pub fn tap_dismiss(&self, width: u32, height: u32) {
		let dismiss = &self.tuning.dismiss;
		let x = width as f64 - width as f64 / dismiss.width_divisor;
		let y = height as f64 - height as f64 / dismiss.height_divisor;
		self.tap(x as u32, y as u32, dismiss.settle_ms);
	}

	pub fn ocr_options(&self, dpi: bool) -> OcrOptions {
		OcrOptions {
			dpi: dpi.then_some(self.tuning.ocr.dpi),
			timeout: self.tuning.ocr.timeout(),
		}
	}

	/// Writes `image` to this request's scratch file for `purpose`. The file is removed when the guard drops.
	pub fn write_scratch<P>(&self, purpose: &str, image: &image::ImageBuffer<P, Vec<u8>>) -> Result<ScratchFile, Error>
	where
		P: image::Pixel<Subpixel = u8> + 'static,
	{
		let file = self.scratch.file(self.id, purpose, "png");
		image
			.save(file.path())
			.map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
		Ok(file)
	}
}

#[cfg(test)]
pub(crate) mod testing {
	use super::*;
	use ocr::{OcrError, OcrResult, OcrText};

	/// Records taps instead of sending them anywhere.
	#[derive(Default)]
	pub struct RecordingDispatcher(pub Mutex<Vec<(u32, u32)>>);
	impl RecordingDispatcher {
		pub fn taps(&self) -> Vec<(u32, u32)> {
			self.0.lock().clone()
		}
	}
	impl Dispatcher for RecordingDispatcher {
		fn click(&self, x: u32, y: u32) {
			self.0.lock().push((x, y));
		}
	}

	/// Returns scripted results, one per call, and remembers the size of every image it was given.
	#[derive(Default)]
	pub struct ScriptedOcr {
		pub results: Mutex<std::collections::VecDeque<Result<OcrResult, OcrError>>>,
		pub text: Option<String>,
		pub seen: Mutex<Vec<(u32, u32)>>,
	}
	impl ScriptedOcr {
		pub fn new(results: Vec<Result<OcrResult, OcrError>>) -> Self {
			ScriptedOcr {
				results: Mutex::new(results.into()),
				..Default::default()
			}
		}

		fn record(&self, image: &Path) -> Result<(), OcrError> {
			let dimensions = image::image_dimensions(image).map_err(|err| OcrError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
			self.seen.lock().push(dimensions);
			Ok(())
		}
	}
	impl OcrEngine for ScriptedOcr {
		fn recognise(&self, image: &Path, _options: &OcrOptions) -> Result<OcrResult, OcrError> {
			self.record(image)?;
			self.results.lock().pop_front().unwrap_or_else(|| Ok(OcrResult::default()))
		}

		fn recognise_text(&self, image: &Path, _options: &OcrOptions) -> Result<String, OcrError> {
			self.record(image)?;
			self.text.clone().ok_or(OcrError::NotInstalled)
		}
	}

	pub fn word(text: &str, top: u32) -> OcrText {
		OcrText {
			level: 5,
			text: text.to_owned(),
			confidence: 90.0,
			left: 10,
			top,
			width: 10 * text.len() as u32,
			height: 20,
		}
	}

	pub fn tuning() -> Tuning {
		Tuning::embedded().unwrap()
	}

	pub fn ctx<'a>(tuning: &'a Tuning, scratch: &'a ScratchDir, ocr: &'a dyn OcrEngine, dispatcher: Option<&'a dyn Dispatcher>) -> Ctx<'a> {
		Ctx {
			id: "test-device",
			tuning,
			scratch,
			ocr,
			dispatcher,
			settle: false,
		}
	}

	pub fn blank(w: u32, h: u32) -> RgbImage {
		RgbImage::from_pixel(w, h, image::Rgb([30, 30, 30]))
	}

	pub fn disc(image: &mut RgbImage, x: i32, y: i32, r: i32) {
		imageproc::drawing::draw_filled_circle_mut(image, (x, y), r, image::Rgb([230, 230, 230]));
	}

	/// A horizontal bar a few pixels tall, which edge detection turns into a line.
	pub fn bar(image: &mut RgbImage, x0: u32, x1: u32, y: u32) {
		for yy in y..y + 6 {
			for x in x0..x1 {
				image.put_pixel(x, yy, image::Rgb([230, 230, 230]));
			}
		}
	}
}

#[test]
fn test_tap_without_dispatcher() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = testing::ScriptedOcr::default();
	testing::ctx(&tuning, &scratch, &ocr, None).tap(1, 2, 1000);
}

#[test]
fn test_tap_dismiss_corner() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = testing::ScriptedOcr::default();
	let dispatcher = testing::RecordingDispatcher::default();
	testing::ctx(&tuning, &scratch, &ocr, Some(&dispatcher)).tap_dismiss(1080, 1920);
	// 1080 - 1080 / 7.2 = 930, 1920 - 1920 / 12.19 = 1762.49
	assert_eq!(dispatcher.taps(), [(930, 1762)]);
}
