use crate::prelude::*;
use cpu::preprocess;

/// Reads the text inside `rect` of the inventory screen.
///
/// The rectangle must lie inside the frame. OCR failures are not errors: they are logged and give `None`.
pub fn inventory_text(ctx: &Ctx, frame: &Frame, rect: Rect<u32>) -> Result<Option<String>, Error> {
	let crop = frame.crop_rect(rect)?;
	let upscaled = preprocess::resize(&crop.to_gray(), ctx.tuning.inventory.upscale);

	let scratch = ctx.write_scratch("inventory", &upscaled)?;
	match ctx.ocr.recognise_text(scratch.path(), &ctx.ocr_options(false)) {
		Ok(text) => Ok(Some(text)),
		Err(err) => {
			origin_log!(warn, ctx.id, "inventory OCR failed: {}", err);
			Ok(None)
		}
	}
}

#[cfg(test)]
use super::testing::{self, ScriptedOcr};

#[test]
fn test_inventory_text() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = ScriptedOcr {
		text: Some("Potion x12\n".to_owned()),
		..Default::default()
	};
	let ctx = testing::ctx(&tuning, &scratch, &ocr, None);

	let frame = Frame::from_image(testing::blank(1080, 1920));
	let text = inventory_text(&ctx, &frame, Rect::new(100, 200, 300, 250)).unwrap();
	assert_eq!(text.as_deref(), Some("Potion x12\n"));

	// upscaled 2x
	assert_eq!(*ocr.seen.lock(), [(400, 100)]);

	// scratch file is gone
	assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_inventory_ocr_failure() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = ScriptedOcr::default();
	let ctx = testing::ctx(&tuning, &scratch, &ocr, None);

	let frame = Frame::from_image(testing::blank(1080, 1920));
	assert_eq!(inventory_text(&ctx, &frame, Rect::new(0, 0, 10, 10)).unwrap(), None);
}

#[test]
fn test_inventory_rect_outside_frame() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = ScriptedOcr::default();
	let ctx = testing::ctx(&tuning, &scratch, &ocr, None);

	let frame = Frame::from_image(testing::blank(1080, 1920));
	let result = inventory_text(&ctx, &frame, Rect::new(1000, 1800, 1100, 1900));
	assert!(matches!(result, Err(Error::InvalidRegion { width: 1080, height: 1920, .. })));
	assert!(ocr.seen.lock().is_empty());
}
