use crate::prelude::*;
use cpu::{lines, HorizontalFilter};

/// Looks for a dialog button by its horizontal outline in the lower two thirds of the screen.
///
/// `ratio_min` and `ratio_max` bound the outline's length as fractions of the frame width (`width / ratio`). With
/// a plausible number of outlines the button between the last two is tapped, or with `upper` the one just below
/// the topmost outline. Too many outlines means something else is covering the screen, so the dismiss corner is
/// tapped instead.
pub fn look_for_button(ctx: &Ctx, frame: &Frame, ratio_min: f64, ratio_max: f64, upper: bool) -> bool {
	let tuning = &ctx.tuning.button;
	let (w, h) = frame.dimensions();
	let (wf, hf) = (w as f64, h as f64);

	let filter = HorizontalFilter {
		min_length: wf / ratio_max - wf * tuning.min_slack,
		max_length: wf / ratio_min + wf * tuning.max_slack,
		below: Some(hf / tuning.floor_divisor),
		above: None,
		centred: Some((wf / 2.0, ctx.tuning.lines.center_tolerance)),
	};

	let lines = cpu::detect_lines(&frame.to_gray(), tuning.blur, tuning.canny, filter.min_length, &ctx.tuning.lines);
	let lines = lines::dedup_by_top(filter.apply(lines), hf / ctx.tuning.lines.dedup_divisor);
	origin_log!(debug, ctx.id, "{} button outlines between {:.0} and {:.0} px", lines.len(), filter.min_length, filter.max_length);

	let n = lines.len();
	if n > tuning.max_lines {
		origin_log!(info, ctx.id, "too many button outlines ({}), dismissing", n);
		ctx.tap_dismiss(w, h);
		return true;
	}
	if n < tuning.min_lines.max(1) {
		return false;
	}

	let (x, y) = if upper {
		let first = lines[0];
		(first.mid_x(), (first.p0.y.max(0) as u32 + tuning.upper_offset) as f32)
	} else {
		let (above, below) = (lines[n - 2], lines[n - 1]);
		(below.mid_x(), (above.p0.y + below.p0.y) as f32 / 2.0)
	};
	ctx.tap(x.max(0.0) as u32, y.max(0.0) as u32, tuning.settle_ms);

	true
}

#[cfg(test)]
use super::testing::{self, RecordingDispatcher, ScriptedOcr};

#[cfg(test)]
fn run(bars: &[u32], upper: bool) -> (bool, Vec<(u32, u32)>) {
	let mut image = testing::blank(1080, 1920);
	for &y in bars {
		testing::bar(&mut image, 340, 740, y);
	}

	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let tuning = testing::tuning();
	let ocr = ScriptedOcr::default();
	let dispatcher = RecordingDispatcher::default();

	// lengths between 1080 / 3 - 21.6 and 1080 / 2 + 194.4
	let found = look_for_button(&testing::ctx(&tuning, &scratch, &ocr, Some(&dispatcher)), &Frame::from_image(image), 2.0, 3.0, upper);
	(found, dispatcher.taps())
}

#[test]
fn test_button_between_outlines() {
	let (found, taps) = run(&[1000, 1200], false);
	assert!(found);
	assert_eq!(taps.len(), 1);
	let (x, y) = taps[0];
	assert!(x.abs_diff(540) <= 5, "{taps:?}");
	assert!(y.abs_diff(1103) <= 8, "{taps:?}");
}

#[test]
fn test_upper_button() {
	let (found, taps) = run(&[1000, 1200], true);
	assert!(found);
	assert_eq!(taps.len(), 1);
	let (x, y) = taps[0];
	assert!(x.abs_diff(540) <= 5, "{taps:?}");
	assert!(y.abs_diff(1050) <= 8, "{taps:?}");
}

#[test]
fn test_single_outline() {
	let (found, taps) = run(&[1000], false);
	assert!(!found);
	assert!(taps.is_empty());
}

#[test]
fn test_outlines_above_the_floor_are_ignored() {
	// floor is 1920 / 3 = 640
	let (found, taps) = run(&[300, 500], false);
	assert!(!found);
	assert!(taps.is_empty());
}

#[test]
fn test_too_many_outlines_dismiss() {
	let (found, taps) = run(&[700, 800, 900, 1000, 1100, 1200, 1300, 1400], false);
	assert!(found);
	assert_eq!(taps, [(930, 1762)]);
}
