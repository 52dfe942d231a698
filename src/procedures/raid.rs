use crate::prelude::*;
use cpu::{CircleQuery, FeatureCount, HorizontalFilter, SpatialConstraint};

/// Counts the raid circles at the bottom centre of the screen, tapping each one when a dispatcher is given.
///
/// Circles are only looked for while the raid counter is showing. Without it the count is zero; with it but no
/// circle in sight the result is [`FeatureCount::NotFound`].
pub fn read_circle_count(ctx: &Ctx, frame: &Frame) -> FeatureCount {
	if !check_raid_counter(ctx, frame) {
		return FeatureCount::Count(0);
	}

	let tuning = &ctx.tuning.raid_count;
	let (w, h) = frame.dimensions();

	let query = CircleQuery {
		constraint: Some(SpatialConstraint::bottom_center(w, h, ctx.tuning.circles.center_band, ctx.tuning.circles.floor_divisor)),
		..CircleQuery::new(tuning.ratio, tuning.region)
	};

	let Some(circles) = query.find(frame, &ctx.tuning.circles) else {
		origin_log!(debug, ctx.id, "raid counter is showing but no raid circles were found");
		return FeatureCount::NotFound;
	};

	let count = FeatureCount::Count(circles.len() as u32).clamp(tuning.max);
	origin_log!(debug, ctx.id, "found {} raid circles, reporting {:?}", circles.len(), count);

	for circle in circles.iter().take(tuning.max as usize) {
		ctx.tap(circle.x, circle.y, tuning.settle_ms);
	}

	count
}

/// Whether the orange raid counter is showing in the middle of the screen.
pub fn check_raid_counter(ctx: &Ctx, frame: &Frame) -> bool {
	let tuning = &ctx.tuning.raid_counter;
	let found = CircleQuery::new(tuning.ratio, tuning.region)
		.find(frame, &ctx.tuning.circles)
		.map(|circles| !circles.is_empty())
		.unwrap_or(false);
	origin_log!(debug, ctx.id, "raid counter present: {}", found);
	found
}

/// What the tab underline of the raid panel says about which panel is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaidLine {
	/// No panel, or no underline.
	Absent,
	/// The underline sits under the right-hand tab.
	RaidTab,
	/// The underline sits under the left-hand tab; tapping `tap` switches over to the raid tab.
	Nearby { tap: Point<u32> },
}

pub fn find_raid_line(ctx: &Ctx, frame: &Frame) -> RaidLine {
	let tuning = &ctx.tuning.raid_line;

	// The panel always has its close button at the bottom
	let gate = CircleQuery {
		preblur: true,
		..CircleQuery::new(tuning.gate_ratio, tuning.gate_region)
	};
	if gate.find(frame, &ctx.tuning.circles).is_none() {
		origin_log!(debug, ctx.id, "no panel close button, raid panel is not open");
		return RaidLine::Absent;
	}

	let Some((band, [_, band_top, ..])) = frame.crop(tuning.band) else {
		return RaidLine::Absent;
	};

	let (w, h) = frame.dimensions();
	let (wf, hf) = (w as f64, h as f64);
	let filter = HorizontalFilter {
		min_length: wf / tuning.min_ratio - wf * tuning.slack,
		max_length: wf / tuning.max_ratio + wf * tuning.slack,
		above: Some(hf * tuning.max_top),
		..Default::default()
	};

	let lines = filter.apply(cpu::detect_lines(&band.to_gray(), tuning.blur, tuning.canny, filter.min_length, &ctx.tuning.lines));
	origin_log!(debug, ctx.id, "{} candidate tab lines between {:.0} and {:.0} px", lines.len(), filter.min_length, filter.max_length);

	let half = wf / 2.0;
	if lines.iter().any(|line| line.p0.x as f64 > half && line.p1.x as f64 > half) {
		return RaidLine::RaidTab;
	}

	match lines.iter().find(|line| (line.p0.x as f64) < half) {
		Some(line) => {
			let x = w.saturating_sub(line.length_x().max(0) as u32);
			let y = ((band_top as f64 + line.p0.y as f64) * tuning.tap_scale) as u32;
			RaidLine::Nearby { tap: Point::new(x, y) }
		}
		None => RaidLine::Absent,
	}
}

/// Whether the raid tab is open. Never taps.
pub fn check_raidscreen(ctx: &Ctx, frame: &Frame) -> bool {
	find_raid_line(ctx, frame) == RaidLine::RaidTab
}

/// Whether the raid tab is open, steering towards it otherwise: from the nearby tab it taps over to the raid tab,
/// and with no panel at all it taps the dismiss corner.
pub fn check_nearby(ctx: &Ctx, frame: &Frame) -> bool {
	match find_raid_line(ctx, frame) {
		RaidLine::RaidTab => true,
		RaidLine::Nearby { tap } => {
			origin_log!(info, ctx.id, "nearby tab is open, switching to the raid tab");
			ctx.tap(tap.x, tap.y, ctx.tuning.raid_line.settle_ms);
			false
		}
		RaidLine::Absent => {
			let (w, h) = frame.dimensions();
			ctx.tap_dismiss(w, h);
			false
		}
	}
}

#[cfg(test)]
use super::testing::{self, RecordingDispatcher, ScriptedOcr};

#[cfg(test)]
fn raid_radius() -> i32 {
	((1080.0 / 4.7) / 2.0f64).round() as i32
}

/// Raid circles of `radius`, plus the raid counter in the middle of the screen if `counter`.
#[cfg(test)]
fn raid_screen(counter: bool, circles: &[(i32, i32)], radius: i32) -> Frame {
	let mut image = testing::blank(1080, 1920);
	if counter {
		// ratio 18 → radius 30
		testing::disc(&mut image, 300, 900, 30);
	}
	for &(x, y) in circles {
		testing::disc(&mut image, x, y, radius);
	}
	Frame::from_image(image)
}

#[cfg(test)]
fn panel(bars: &[(u32, u32, u32)]) -> Frame {
	let mut image = testing::blank(1080, 1920);
	// close button of the panel, ratio 11
	testing::disc(&mut image, 540, 1680, 49);
	for &(x0, x1, y) in bars {
		testing::bar(&mut image, x0, x1, y);
	}
	Frame::from_image(image)
}

#[cfg(test)]
fn with_tuning<R>(tuning: &Tuning, dispatcher: Option<&RecordingDispatcher>, f: impl FnOnce(&Ctx) -> R) -> R {
	let dir = tempfile::tempdir().unwrap();
	let scratch = ScratchDir::create(dir.path()).unwrap();
	let ocr = ScriptedOcr::default();
	let ctx = testing::ctx(tuning, &scratch, &ocr, dispatcher.map(|d| d as &dyn Dispatcher));
	f(&ctx)
}

#[cfg(test)]
fn with_ctx<R>(dispatcher: Option<&RecordingDispatcher>, f: impl FnOnce(&Ctx) -> R) -> R {
	with_tuning(&testing::tuning(), dispatcher, f)
}

#[test]
fn test_single_raid_circle() {
	let frame = raid_screen(true, &[(540, 1780)], raid_radius());

	let dispatcher = RecordingDispatcher::default();
	let count = with_ctx(Some(&dispatcher), |ctx| read_circle_count(ctx, &frame));
	assert_eq!(count, FeatureCount::Count(1));

	let taps = dispatcher.taps();
	assert_eq!(taps.len(), 1);
	assert!(taps[0].0.abs_diff(540) <= 2 && taps[0].1.abs_diff(1780) <= 2, "{taps:?}");
}

#[test]
fn test_raid_circles_not_found() {
	let frame = raid_screen(true, &[], raid_radius());
	let dispatcher = RecordingDispatcher::default();
	assert_eq!(with_ctx(Some(&dispatcher), |ctx| read_circle_count(ctx, &frame)), FeatureCount::NotFound);
	assert!(dispatcher.taps().is_empty());
}

#[test]
fn test_no_raid_counter_counts_nothing() {
	let frame = raid_screen(false, &[(540, 1780)], raid_radius());
	let dispatcher = RecordingDispatcher::default();
	assert_eq!(with_ctx(Some(&dispatcher), |ctx| read_circle_count(ctx, &frame)), FeatureCount::Count(0));
	assert!(dispatcher.taps().is_empty());
}

#[test]
fn test_raid_count_without_dispatcher() {
	let frame = raid_screen(true, &[(540, 1780)], raid_radius());
	assert_eq!(with_ctx(None, |ctx| read_circle_count(ctx, &frame)), FeatureCount::Count(1));
}

#[test]
fn test_raid_count_is_capped() {
	// small circles so that nine of them fit the bottom centre band: ratio 27 → radius 20
	let mut tuning = testing::tuning();
	tuning.raid_count.ratio = 27.0;

	let circles = [(460, 1320), (620, 1320), (460, 1460), (620, 1460), (460, 1600), (620, 1600), (460, 1740), (620, 1740), (460, 1880)];
	let frame = raid_screen(true, &circles, 20);

	let dispatcher = RecordingDispatcher::default();
	assert_eq!(with_tuning(&tuning, Some(&dispatcher), |ctx| read_circle_count(ctx, &frame)), FeatureCount::Count(6));

	let taps = dispatcher.taps();
	assert_eq!(taps.len(), 6);
	for (x, y) in taps {
		assert!(circles.iter().any(|&(cx, cy)| x.abs_diff(cx as u32) <= 2 && y.abs_diff(cy as u32) <= 2), "{x}x{y}");
	}
}

#[test]
fn test_raid_counter() {
	// ratio 18 → radius 30, somewhere in the middle band
	let mut image = testing::blank(1080, 1920);
	testing::disc(&mut image, 300, 900, 30);
	let frame = Frame::from_image(image);
	assert!(with_ctx(None, |ctx| check_raid_counter(ctx, &frame)));

	let frame = Frame::from_image(testing::blank(1080, 1920));
	assert!(!with_ctx(None, |ctx| check_raid_counter(ctx, &frame)));
}

#[test]
fn test_raid_tab_line() {
	let frame = panel(&[(700, 950, 800)]);
	assert_eq!(with_ctx(None, |ctx| find_raid_line(ctx, &frame)), RaidLine::RaidTab);

	let dispatcher = RecordingDispatcher::default();
	assert!(with_ctx(Some(&dispatcher), |ctx| check_raidscreen(ctx, &frame)));
	assert!(with_ctx(Some(&dispatcher), |ctx| check_nearby(ctx, &frame)));
	assert!(dispatcher.taps().is_empty());
}

#[test]
fn test_raid_tab_wins_over_nearby() {
	let frame = panel(&[(100, 350, 800), (700, 950, 800)]);
	assert_eq!(with_ctx(None, |ctx| find_raid_line(ctx, &frame)), RaidLine::RaidTab);
}

#[test]
fn test_nearby_line() {
	let frame = panel(&[(100, 350, 800)]);

	let tap = match with_ctx(None, |ctx| find_raid_line(ctx, &frame)) {
		RaidLine::Nearby { tap } => tap,
		other => panic!("expected the nearby tab, got {other:?}"),
	};
	// 1080 - ~250, (320 + ~480) * 0.9
	assert!((815..=845).contains(&tap.x), "{tap:?}");
	assert!((705..=735).contains(&tap.y), "{tap:?}");

	let dispatcher = RecordingDispatcher::default();
	assert!(!with_ctx(Some(&dispatcher), |ctx| check_raidscreen(ctx, &frame)));
	assert!(dispatcher.taps().is_empty());

	assert!(!with_ctx(Some(&dispatcher), |ctx| check_nearby(ctx, &frame)));
	assert_eq!(dispatcher.taps(), [(tap.x, tap.y)]);
}

#[test]
fn test_line_too_short() {
	let frame = panel(&[(700, 800, 800)]);
	assert_eq!(with_ctx(None, |ctx| find_raid_line(ctx, &frame)), RaidLine::Absent);
}

#[test]
fn test_line_too_low() {
	// band top 320 + 960 = 1280
	let frame = panel(&[(700, 950, 1400)]);
	assert_eq!(with_ctx(None, |ctx| find_raid_line(ctx, &frame)), RaidLine::Absent);
}

#[test]
fn test_no_panel_dismisses() {
	let mut image = testing::blank(1080, 1920);
	testing::bar(&mut image, 700, 950, 800);
	let frame = Frame::from_image(image);

	assert_eq!(with_ctx(None, |ctx| find_raid_line(ctx, &frame)), RaidLine::Absent);

	let dispatcher = RecordingDispatcher::default();
	assert!(!with_ctx(Some(&dispatcher), |ctx| check_nearby(ctx, &frame)));
	assert_eq!(dispatcher.taps(), [(930, 1762)]);
}
