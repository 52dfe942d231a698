use crate::prelude::*;

/// Whether the red "GPS signal lost" banner covers the top of the screen.
pub fn is_signal_lost(ctx: &Ctx, frame: &Frame) -> bool {
	let gps = &ctx.tuning.gps;
	let Some((banner, _)) = frame.crop(gps.region) else {
		return false;
	};

	let colour = most_frequent_colour(banner.rgb());
	origin_log!(debug, ctx.id, "most frequent colour of the banner region: {:?}", colour);

	colour.map(|colour| colour.0) == Some(gps.alert_colour)
}

/// The single most common colour of the whole screenshot.
#[inline]
pub fn dominant_colour(ctx: &Ctx, frame: &Frame) -> Option<[u8; 3]> {
	let colour = most_frequent_colour(frame.rgb()).map(|colour| colour.0);
	origin_log!(debug, ctx.id, "most frequent colour on screen: {:?}", colour);
	colour
}

#[cfg(test)]
use super::testing;

#[cfg(test)]
fn check(image: RgbImage) -> bool {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = testing::ScriptedOcr::default();
	is_signal_lost(&testing::ctx(&tuning, &scratch, &ocr, None), &Frame::from_image(image))
}

#[test]
fn test_red_banner() {
	let mut image = testing::blank(1080, 1920);
	for y in 0..1920 / 7 {
		for x in 0..1080 {
			image.put_pixel(x, y, image::Rgb([240, 75, 95]));
		}
	}
	assert!(check(image));
}

#[test]
fn test_mostly_red_banner() {
	let mut image = testing::blank(1080, 1920);
	for y in 0..1920 / 7 {
		for x in 0..1080 {
			let colour = if x % 4 == 0 { [255, 255, 255] } else { [240, 75, 95] };
			image.put_pixel(x, y, image::Rgb(colour));
		}
	}
	assert!(check(image));
}

#[test]
fn test_no_banner() {
	assert!(!check(testing::blank(1080, 1920)));

	let mut image = testing::blank(1080, 1920);
	for y in 0..1920 / 7 {
		for x in 0..1080 {
			image.put_pixel(x, y, image::Rgb([240, 75, 96]));
		}
	}
	assert!(!check(image));
}

#[test]
fn test_dominant_colour() {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = testing::ScriptedOcr::default();
	let ctx = testing::ctx(&tuning, &scratch, &ocr, None);
	assert_eq!(dominant_colour(&ctx, &Frame::from_image(testing::blank(10, 10))), Some([30, 30, 30]));
}
