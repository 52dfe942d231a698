use crate::{classify::classify, prelude::*};
use cpu::preprocess;
use ocr::OcrResult;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScreenDetection {
	pub screen: ScreenType,
	/// Text recognised by the last OCR pass that ran, if it succeeded.
	pub ocr: Option<OcrResult>,
	/// Size of the screenshot as it was loaded.
	pub width: u32,
	pub height: u32,
	/// Factor the screenshot was upscaled by before recognition. OCR coordinates are in the upscaled frame.
	pub scale: f32,
}

/// Works out which screen is showing by reading its text.
///
/// Small screenshots are upscaled first. The frame is read as-is, then binarized at each threshold in turn,
/// until one of the passes classifies as a known screen.
pub fn detect_screen_type(ctx: &Ctx, frame: &Frame) -> Result<ScreenDetection, Error> {
	let tuning = &ctx.tuning.ocr;
	let (width, height) = frame.dimensions();

	let (base, scale) = if width < tuning.min_width {
		origin_log!(debug, ctx.id, "{}x{} is too small to read, upscaling by {}", width, height, tuning.upscale);
		(preprocess::resize(frame.rgb(), tuning.upscale), tuning.upscale)
	} else {
		(frame.rgb().clone(), 1.0)
	};

	let scratch = ctx.scratch.file(ctx.id, "screen", "png");
	let options = ctx.ocr_options(true);

	let mut detection = ScreenDetection {
		screen: ScreenType::Undefined,
		ocr: None,
		width,
		height,
		scale,
	};

	let gray = image::imageops::grayscale(&base);
	let candidates = std::iter::once(None).chain(tuning.thresholds.iter().copied().map(Some));
	for threshold in candidates {
		let saved = match threshold {
			None => base.save(scratch.path()),
			Some(threshold) => preprocess::binarize(&gray, threshold).save(scratch.path()),
		};
		saved.map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;

		detection.ocr = match ctx.ocr.recognise(scratch.path(), &options) {
			Ok(ocr) => Some(ocr),
			Err(err) => {
				origin_log!(warn, ctx.id, "OCR failed (threshold {:?}): {}", threshold, err);
				None
			}
		};

		if let Some(ocr) = &detection.ocr {
			detection.screen = classify(ocr, height, &ctx.tuning.lexicon, tuning.min_token_chars);
			origin_log!(debug, ctx.id, "threshold {:?} reads as {}", threshold, detection.screen);
			if detection.screen.is_defined() {
				break;
			}
		}
	}

	Ok(detection)
}

/// Plain recognition of the whole screen in grayscale.
pub fn screen_text(ctx: &Ctx, frame: &Frame) -> Result<Option<OcrResult>, Error> {
	let scratch = ctx.write_scratch("screentext", &frame.to_gray())?;
	match ctx.ocr.recognise(scratch.path(), &ctx.ocr_options(true)) {
		Ok(ocr) => Ok(Some(ocr)),
		Err(err) => {
			origin_log!(warn, ctx.id, "screen OCR failed: {}", err);
			Ok(None)
		}
	}
}

#[cfg(test)]
use super::testing::{self, ScriptedOcr};

#[cfg(test)]
use ocr::OcrError;

#[cfg(test)]
fn words(words: &[(&str, u32)]) -> Result<OcrResult, OcrError> {
	Ok(OcrResult {
		texts: words.iter().map(|&(text, top)| testing::word(text, top)).collect(),
	})
}

#[cfg(test)]
fn detect(ocr: &ScriptedOcr, w: u32, h: u32) -> (ScreenDetection, tempfile::TempDir) {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let detection = detect_screen_type(&testing::ctx(&tuning, &scratch, ocr, None), &Frame::from_image(testing::blank(w, h))).unwrap();
	(detection, dir)
}

#[test]
fn test_first_pass_classifies() {
	let ocr = ScriptedOcr::new(vec![words(&[("Password", 900)])]);
	let (detection, dir) = detect(&ocr, 1080, 1920);
	assert_eq!(detection.screen, ScreenType::PtcLogin);
	assert_eq!((detection.width, detection.height, detection.scale), (1080, 1920, 1.0));
	assert_eq!(ocr.seen.lock().len(), 1);
	assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_falls_through_thresholds() {
	let ocr = ScriptedOcr::new(vec![words(&[("blurry", 900)]), Err(OcrError::Timeout(Duration::from_secs(40))), words(&[("terminated", 900)])]);
	let (detection, _dir) = detect(&ocr, 1080, 1920);
	assert_eq!(detection.screen, ScreenType::Terminated);
	assert_eq!(ocr.seen.lock().len(), 3);
	assert_eq!(detection.ocr.unwrap().texts[0].text, "terminated");
}

#[test]
fn test_nothing_recognised() {
	let ocr = ScriptedOcr::new(vec![words(&[("nothing", 900)]), words(&[]), words(&[]), Err(OcrError::NotInstalled)]);
	let (detection, _dir) = detect(&ocr, 1080, 1920);
	assert_eq!(detection.screen, ScreenType::Undefined);
	assert!(detection.ocr.is_none());
	// original plus the three thresholds
	assert_eq!(ocr.seen.lock().len(), 4);
}

#[test]
fn test_small_frames_are_upscaled() {
	// the floor comes from the loaded height, 800 / 4 = 200, even though OCR sees 1600 px
	let ocr = ScriptedOcr::new(vec![words(&[("Password", 150)]), words(&[("Password", 300)])]);
	let (detection, _dir) = detect(&ocr, 450, 800);
	assert_eq!(detection.screen, ScreenType::PtcLogin);
	assert_eq!((detection.width, detection.height, detection.scale), (450, 800, 2.0));
	assert_eq!(*ocr.seen.lock(), [(900, 1600), (900, 1600)]);
}

#[test]
fn test_upscaled_floor_keeps_lower_words() {
	// 960 / 4 = 240, so a word at 300 counts on the first pass
	let ocr = ScriptedOcr::new(vec![words(&[("Password", 300)])]);
	let (detection, _dir) = detect(&ocr, 540, 960);
	assert_eq!(detection.screen, ScreenType::PtcLogin);
	assert_eq!(ocr.seen.lock().len(), 1);
}

#[test]
fn test_screen_text() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = ScriptedOcr::new(vec![words(&[("hello", 10)])]);
	let ctx = testing::ctx(&tuning, &scratch, &ocr, None);

	let text = screen_text(&ctx, &Frame::from_image(testing::blank(64, 32))).unwrap().unwrap();
	assert_eq!(text.texts[0].text, "hello");

	let failed = ScriptedOcr::new(vec![Err(OcrError::NotInstalled)]);
	let ctx = testing::ctx(&tuning, &scratch, &failed, None);
	assert!(screen_text(&ctx, &Frame::from_image(testing::blank(64, 32))).unwrap().is_none());
}
