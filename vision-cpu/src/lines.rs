use sw_vision_common::prelude::*;
use sw_vision_common::prelude::imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};

#[derive(Clone, Copy, Debug)]
pub struct SegmentParams {
	pub vote_threshold: u32,
	pub suppression_radius: u32,
	pub min_length: f64,
	/// Largest run of missing edge pixels a segment may bridge.
	pub max_gap: u32,
}

/// Probabilistic-style Hough segments: peaks of the polar transform at 1° resolution, each walked across the
/// edge map and split wherever the edge breaks for more than `max_gap` pixels.
///
/// Segments are returned left to right (top to bottom for steep lines) in the order their polar lines were found.
pub fn hough_segments(edges: &GrayImage, params: &SegmentParams) -> Vec<Line<i32>> {
	let options = LineDetectionOptions {
		vote_threshold: params.vote_threshold,
		suppression_radius: params.suppression_radius,
	};

	let mut samples = Vec::new();
	let mut segments = Vec::new();
	for line in detect_lines(edges, options) {
		walk_polar_line(edges, &line, &mut samples);
		split_runs(&samples, params.max_gap, params.min_length, &mut segments);
	}
	segments
}

// Collects the edge pixels lying on `line`, indexed by their step along it
fn walk_polar_line(edges: &GrayImage, line: &PolarLine, samples: &mut Vec<(u32, Point<i32>)>) {
	samples.clear();

	let (w, h) = edges.dimensions();
	let theta = (line.angle_in_degrees as f32).to_radians();
	let (sin, cos) = theta.sin_cos();
	let r = line.r;

	let is_edge = |x: i64, y: i64| x >= 0 && y >= 0 && x < w as i64 && y < h as i64 && edges.get_pixel(x as u32, y as u32).0[0] > 0;

	// x cos θ + y sin θ = r, stepping along whichever axis the line is closer to.
	// The polar bins are a pixel wide, so a neighbour either side of the line also counts as on it.
	if sin.abs() >= cos.abs() {
		for x in 0..w {
			let y = ((r - x as f32 * cos) / sin).round() as i64;
			if (-1..=1).any(|dy| is_edge(x as i64, y + dy)) {
				samples.push((x, Point::new(x as i32, y as i32)));
			}
		}
	} else {
		for y in 0..h {
			let x = ((r - y as f32 * sin) / cos).round() as i64;
			if (-1..=1).any(|dx| is_edge(x + dx, y as i64)) {
				samples.push((y, Point::new(x as i32, y as i32)));
			}
		}
	}
}

fn split_runs(samples: &[(u32, Point<i32>)], max_gap: u32, min_length: f64, segments: &mut Vec<Line<i32>>) {
	let Some(&(_, first)) = samples.first() else { return };

	let mut start = first;
	let mut end = first;
	let mut last_step = samples[0].0;

	let mut emit = |start: Point<i32>, end: Point<i32>| {
		let length = (start.distance_sqr(&end) as f64).sqrt();
		if length >= min_length {
			segments.push(Line::new(start, end));
		}
	};

	for &(step, point) in &samples[1..] {
		if step - last_step > max_gap + 1 {
			emit(start, end);
			start = point;
		}
		end = point;
		last_step = step;
	}
	emit(start, end);
}

/// Which horizontal segments count as a candidate line.
#[derive(Clone, Copy, Debug, Default)]
pub struct HorizontalFilter {
	pub min_length: f64,
	pub max_length: f64,
	/// Only lines strictly below this row.
	pub below: Option<f64>,
	/// Only lines strictly above this row.
	pub above: Option<f64>,
	/// Horizontal midpoint strictly within `.1` of `.0`.
	pub centred: Option<(f64, f64)>,
}
impl HorizontalFilter {
	pub fn accepts(&self, line: &Line<i32>) -> bool {
		if !line.is_horizontal() {
			return false;
		}

		let length = line.length_x() as f64;
		if length < self.min_length || length > self.max_length {
			return false;
		}

		let y = line.p0.y as f64;
		if self.below.map(|below| y <= below).unwrap_or(false) || self.above.map(|above| y >= above).unwrap_or(false) {
			return false;
		}

		if let Some((center, tolerance)) = self.centred {
			if (line.mid_x() as f64 - center).abs() >= tolerance {
				return false;
			}
		}

		true
	}

	#[inline]
	pub fn apply(&self, lines: impl IntoIterator<Item = Line<i32>>) -> Vec<Line<i32>> {
		lines.into_iter().filter(|line| self.accepts(line)).collect()
	}
}

/// Collapses lines that are really the same edge.
///
/// Lines are sorted by their top coordinate and walked in order. The first is always kept; every later line is
/// kept only if it lies at least `min_spacing` below the last line that was kept.
pub fn dedup_by_top(mut lines: Vec<Line<i32>>, min_spacing: f64) -> Vec<Line<i32>> {
	lines.sort_by_key(|line| (line.p0.y.min(line.p1.y), line.p0.x.min(line.p1.x)));

	let mut kept: Vec<Line<i32>> = Vec::with_capacity(lines.len());
	for line in lines {
		let top = line.p0.y.min(line.p1.y);
		match kept.last() {
			Some(last) if ((top - last.p0.y.min(last.p1.y)) as f64) < min_spacing => {}
			_ => kept.push(line),
		}
	}
	kept
}

#[cfg(test)]
fn horizontal(x0: i32, x1: i32, y: i32) -> Line<i32> {
	Line::new(Point::new(x0, y), Point::new(x1, y))
}

#[test]
fn test_dedup_spacing() {
	// height 1920 → spacing 48
	let spacing = 1920.0 / 40.0;

	let close = dedup_by_top(vec![horizontal(0, 10, 1020), horizontal(0, 10, 1000)], spacing);
	assert_eq!(close, [horizontal(0, 10, 1000)]);

	let apart = dedup_by_top(vec![horizontal(0, 10, 1048), horizontal(0, 10, 1000)], spacing);
	assert_eq!(apart, [horizontal(0, 10, 1000), horizontal(0, 10, 1048)]);
}

#[test]
fn test_dedup_compares_against_last_kept() {
	let lines = vec![horizontal(0, 1, 0), horizontal(0, 1, 30), horizontal(0, 1, 60), horizontal(0, 1, 90)];
	let kept = dedup_by_top(lines, 48.0);
	assert_eq!(kept, [horizontal(0, 1, 0), horizontal(0, 1, 60)]);
}

#[test]
fn test_horizontal_filter() {
	let filter = HorizontalFilter {
		min_length: 100.0,
		max_length: 300.0,
		below: Some(640.0),
		above: None,
		centred: Some((540.0, 50.0)),
	};
	assert!(filter.accepts(&horizontal(440, 640, 1000)));
	assert!(!filter.accepts(&horizontal(440, 640, 640)));
	assert!(!filter.accepts(&Line::new(Point::new(440, 1000), Point::new(640, 1001))));
	assert!(!filter.accepts(&horizontal(500, 550, 1000)));
	assert!(!filter.accepts(&horizontal(100, 500, 1000)));
	// midpoint 590 is exactly on the tolerance
	assert!(!filter.accepts(&horizontal(490, 690, 1000)));
}

#[test]
fn test_split_runs_bridges_gaps() {
	let samples = (0..40).chain(60..100).chain(200..260).map(|x| (x, Point::new(x as i32, 5))).collect::<Vec<_>>();
	let mut segments = Vec::new();
	split_runs(&samples, 20, 50.0, &mut segments);
	assert_eq!(segments, [horizontal(0, 99, 5), horizontal(200, 259, 5)]);
}

#[test]
fn test_hough_segments_finds_bars() {
	let mut image = GrayImage::new(400, 300);
	for y in [100, 101, 102] {
		for x in 50..350 {
			image.put_pixel(x, y, image::Luma([255]));
		}
	}
	let segments = hough_segments(
		&image,
		&SegmentParams {
			vote_threshold: 70,
			suppression_radius: 8,
			min_length: 100.0,
			max_gap: 50,
		},
	);
	assert!(!segments.is_empty());
	assert!(segments.iter().all(|segment| segment.is_horizontal() && (100..=102).contains(&segment.p0.y)));
	assert!(segments.iter().any(|segment| segment.length_x() == 299));
}
