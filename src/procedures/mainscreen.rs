use crate::prelude::*;
use cpu::CircleQuery;

/// The main screen shows the player's round avatar in the bottom left corner.
pub fn check_mainscreen(ctx: &Ctx, frame: &Frame) -> bool {
	let tuning = &ctx.tuning.mainscreen;

	let query = CircleQuery {
		second_ratio: Some(tuning.max_ratio),
		preblur: true,
		..CircleQuery::new(tuning.min_ratio, tuning.region)
	};
	let Some(circles) = query.find(frame, &ctx.tuning.circles) else {
		origin_log!(debug, ctx.id, "no avatar candidates");
		return false;
	};

	let [left, _, width, _] = tuning.region.into_absolute([frame.width(), frame.height()]);
	let limit = width as f64 * tuning.x_fraction;

	let found = circles.iter().any(|circle| (circle.x.saturating_sub(left) as f64) < limit);
	origin_log!(debug, ctx.id, "{} avatar candidates, main screen: {}", circles.len(), found);
	found
}

#[cfg(test)]
use super::testing;

#[cfg(test)]
fn check(image: RgbImage) -> bool {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = testing::ScriptedOcr::default();
	check_mainscreen(&testing::ctx(&tuning, &scratch, &ocr, None), &Frame::from_image(image))
}

#[test]
fn test_avatar() {
	// radius between (1080 / 6.8 - 3) / 2 and (1080 / 6 + 3) / 2
	let mut image = testing::blank(1080, 1920);
	testing::disc(&mut image, 100, 1728, 84);
	assert!(check(image));
}

#[test]
fn test_avatar_too_far_right() {
	// crop is 270 wide, so the centre must be left of 180
	let mut image = testing::blank(1080, 1920);
	testing::disc(&mut image, 190, 1728, 78);
	assert!(!check(image));
}

#[test]
fn test_no_avatar() {
	assert!(!check(testing::blank(1080, 1920)));
}
