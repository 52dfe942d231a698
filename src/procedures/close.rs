use super::raid::{self, RaidLine};
use crate::prelude::*;
use cpu::CircleQuery;

/// Looks for a round close button at the bottom of the screen and taps the first one found.
///
/// While the raid or nearby panel is open the search is skipped, unless `close_raid` asks for that panel to be
/// closed too.
pub fn check_close_except_nearby(ctx: &Ctx, frame: &Frame, close_raid: bool) -> bool {
	if !close_raid {
		let line = raid::find_raid_line(ctx, frame);
		if line != RaidLine::Absent {
			origin_log!(debug, ctx.id, "raid panel is open ({:?}), leaving it be", line);
			return false;
		}
	}

	let tuning = &ctx.tuning.close_button;
	for &ratio in &tuning.ratios {
		let query = CircleQuery {
			preblur: true,
			..CircleQuery::new(ratio, tuning.region)
		};

		if let Some(circle) = query.find(frame, &ctx.tuning.circles).and_then(|circles| circles.first().copied()) {
			origin_log!(debug, ctx.id, "close button at {}x{} (ratio {})", circle.x, circle.y, ratio);
			ctx.tap(circle.x, circle.y, tuning.settle_ms);
			return true;
		}
	}

	origin_log!(debug, ctx.id, "no close button");
	false
}

#[cfg(test)]
use super::testing::{self, RecordingDispatcher, ScriptedOcr};

#[cfg(test)]
fn run(frame: &Frame, close_raid: bool) -> (bool, Vec<(u32, u32)>) {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = ScriptedOcr::default();
	let dispatcher = RecordingDispatcher::default();
	let found = check_close_except_nearby(&testing::ctx(&tuning, &scratch, &ocr, Some(&dispatcher)), frame, close_raid);
	(found, dispatcher.taps())
}

#[test]
fn test_close_button() {
	let mut image = testing::blank(1080, 1920);
	testing::disc(&mut image, 540, 1680, 49);

	let (found, taps) = run(&Frame::from_image(image), false);
	assert!(found);
	assert_eq!(taps.len(), 1);
	assert!(taps[0].0.abs_diff(540) <= 8 && taps[0].1.abs_diff(1680) <= 8, "{taps:?}");
}

#[test]
fn test_no_close_button() {
	let (found, taps) = run(&Frame::from_image(testing::blank(1080, 1920)), true);
	assert!(!found);
	assert!(taps.is_empty());
}

#[test]
fn test_nearby_panel_is_left_open() {
	let mut image = testing::blank(1080, 1920);
	testing::disc(&mut image, 540, 1680, 49);
	testing::bar(&mut image, 100, 350, 800);
	let frame = Frame::from_image(image);

	let (found, taps) = run(&frame, false);
	assert!(!found);
	assert!(taps.is_empty());

	let (found, taps) = run(&frame, true);
	assert!(found);
	assert_eq!(taps.len(), 1);
}
