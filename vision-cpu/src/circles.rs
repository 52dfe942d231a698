use crate::preprocess;
use std::sync::atomic::{AtomicU32, Ordering};
use sw_vision_common::{prelude::*, tuning::CircleTuning};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Circle {
	pub x: u32,
	pub y: u32,
	pub radius: u32,
}
impl Circle {
	#[inline]
	pub fn center(&self) -> Point<u32> {
		Point::new(self.x, self.y)
	}

	#[inline]
	pub fn offset(self, dx: u32, dy: u32) -> Circle {
		Circle { x: self.x + dx, y: self.y + dy, ..self }
	}
}

/// Result of counting circles: the detector can find nothing at all, which is not the same as finding circles
/// that all fall outside the region of interest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCount {
	NotFound,
	Count(u32),
}
impl FeatureCount {
	#[inline]
	pub fn clamp(self, max: u32) -> FeatureCount {
		match self {
			FeatureCount::Count(n) => FeatureCount::Count(n.min(max)),
			FeatureCount::NotFound => FeatureCount::NotFound,
		}
	}

	#[inline]
	pub fn count(self) -> u32 {
		match self {
			FeatureCount::Count(n) => n,
			FeatureCount::NotFound => 0,
		}
	}
}

/// Expected radius range of a feature whose diameter is `width / ratio`, with `slack` pixels of tolerance.
///
/// `second_ratio` widens the upper bound when the feature size varies between screens.
pub fn radius_bounds(width: u32, ratio: f64, second_ratio: Option<f64>, slack: f64) -> (u32, u32) {
	let width = width as f64;
	let min = (width / ratio - slack) / 2.0;
	let max = (width / second_ratio.unwrap_or(ratio) + slack) / 2.0;
	(min.max(0.0) as u32, max.max(0.0) as u32)
}

#[derive(Clone, Copy, Debug)]
pub struct HoughCircleParams {
	pub min_radius: u32,
	pub max_radius: u32,
	/// Minimum distance between the centres of two reported circles.
	pub min_dist: f64,
	/// Upper Canny threshold; the lower one is half of it.
	pub param1: f32,
	/// Accumulator votes a centre needs, and edge pixels a radius needs.
	pub param2: u32,
	/// Gaussian kernel applied before edge detection, if any.
	pub preblur: Option<u32>,
}

/// Gradient Hough transform for circles.
///
/// Every edge pixel votes along its gradient for centres between `min_radius` and `max_radius` away. Peaks in
/// the accumulator are visited strongest first, and each one is given the radius most of its surrounding edge
/// pixels agree on.
///
/// Returns `None` if no circle at all was found.
pub fn hough_circles(gray: &GrayImage, params: &HoughCircleParams) -> Option<Vec<Circle>> {
	let (w, h) = gray.dimensions();
	let min_radius = params.min_radius.max(1);
	let max_radius = params.max_radius;
	if w == 0 || h == 0 || max_radius < min_radius {
		return None;
	}

	let blurred;
	let gray = match params.preblur {
		Some(kernel) => {
			blurred = preprocess::gaussian_blur(gray, kernel);
			&blurred
		}
		None => gray,
	};

	let edges = preprocess::canny_edges(gray, params.param1 / 2.0, params.param1);
	let gx = imageproc::gradients::horizontal_sobel(gray);
	let gy = imageproc::gradients::vertical_sobel(gray);

	let accumulator = (0..(w * h)).map(|_| AtomicU32::new(0)).collect::<Vec<_>>();
	(0..h).into_par_iter().for_each(|y| {
		for x in 0..w {
			if edges.get_pixel(x, y).0[0] == 0 {
				continue;
			}

			let dx = gx.get_pixel(x, y).0[0] as f32;
			let dy = gy.get_pixel(x, y).0[0] as f32;
			let magnitude = (dx * dx + dy * dy).sqrt();
			if magnitude < f32::EPSILON {
				continue;
			}
			let (dx, dy) = (dx / magnitude, dy / magnitude);

			for sign in [1.0f32, -1.0] {
				for r in min_radius..=max_radius {
					let cx = (x as f32 + sign * dx * r as f32).round();
					let cy = (y as f32 + sign * dy * r as f32).round();
					if cx < 0.0 || cy < 0.0 || cx >= w as f32 || cy >= h as f32 {
						break;
					}
					accumulator[cy as usize * w as usize + cx as usize].fetch_add(1, Ordering::Relaxed);
				}
			}
		}
	});
	let accumulator = accumulator.into_iter().map(AtomicU32::into_inner).collect::<Vec<_>>();

	let votes = |x: u32, y: u32| accumulator[y as usize * w as usize + x as usize];

	// Local maxima; strict on the left and top so a plateau yields a single centre
	let mut centres = Vec::new();
	for y in 1..h.saturating_sub(1) {
		for x in 1..w.saturating_sub(1) {
			let v = votes(x, y);
			if v >= params.param2 && v > votes(x - 1, y) && v >= votes(x + 1, y) && v > votes(x, y - 1) && v >= votes(x, y + 1) {
				centres.push((x, y, v));
			}
		}
	}
	centres.sort_unstable_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)).then(a.0.cmp(&b.0)));

	let min_dist_sqr = params.min_dist * params.min_dist;
	let mut circles: Vec<Circle> = Vec::new();
	let mut histogram = vec![0u32; max_radius as usize + 2];
	for (cx, cy, _) in centres {
		if circles.iter().any(|c| {
			let (dx, dy) = (c.x as f64 - cx as f64, c.y as f64 - cy as f64);
			dx * dx + dy * dy < min_dist_sqr
		}) {
			continue;
		}

		histogram.iter_mut().for_each(|bin| *bin = 0);
		let x0 = cx.saturating_sub(max_radius + 1);
		let y0 = cy.saturating_sub(max_radius + 1);
		let x1 = (cx + max_radius + 1).min(w - 1);
		let y1 = (cy + max_radius + 1).min(h - 1);
		for y in y0..=y1 {
			for x in x0..=x1 {
				if edges.get_pixel(x, y).0[0] == 0 {
					continue;
				}
				let (dx, dy) = (x as f32 - cx as f32, y as f32 - cy as f32);
				let distance = (dx * dx + dy * dy).sqrt().round() as usize;
				if distance < histogram.len() {
					histogram[distance] += 1;
				}
			}
		}

		// Larger circles have more edge pixels, so support is compared per unit of radius
		let best = (min_radius..=max_radius)
			.map(|r| (r, histogram[r as usize]))
			.filter(|(_, support)| *support >= params.param2)
			.max_by(|(ra, sa), (rb, sb)| (*sa as f32 / *ra as f32).total_cmp(&(*sb as f32 / *rb as f32)).then(rb.cmp(ra)));

		if let Some((radius, _)) = best {
			circles.push(Circle { x: cx, y: cy, radius });
		}
	}

	if circles.is_empty() {
		None
	} else {
		Some(circles)
	}
}

/// Accepts circles whose centre lies in a vertical band around `center_x` and at or below `min_y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialConstraint {
	pub center_x: f64,
	pub band: f64,
	pub min_y: f64,
}
impl SpatialConstraint {
	/// `width / 2 ± band`, in the bottom `1 / floor_divisor` of the frame.
	pub fn bottom_center(width: u32, height: u32, band: u32, floor_divisor: f64) -> SpatialConstraint {
		SpatialConstraint {
			center_x: width as f64 / 2.0,
			band: band as f64,
			min_y: height as f64 - height as f64 / floor_divisor,
		}
	}

	#[inline]
	pub fn contains(&self, circle: &Circle) -> bool {
		(circle.x as f64 - self.center_x).abs() <= self.band && circle.y as f64 >= self.min_y
	}
}

/// A circle search over one region of a frame.
///
/// Radius bounds are always derived from the width of the whole frame, not the region, so the same ratio
/// describes the same feature wherever it is searched for.
#[derive(Clone, Copy, Debug)]
pub struct CircleQuery {
	pub ratio: f64,
	pub second_ratio: Option<f64>,
	pub region: RelativeRect,
	/// Applied in frame coordinates.
	pub constraint: Option<SpatialConstraint>,
	pub preblur: bool,
}
impl CircleQuery {
	pub fn new(ratio: f64, region: RelativeRect) -> Self {
		CircleQuery {
			ratio,
			second_ratio: None,
			region,
			constraint: None,
			preblur: false,
		}
	}

	/// Circles matching the query, in frame coordinates.
	///
	/// `None` means the detector found no circle anywhere in the region; `Some` may still be empty if every
	/// circle was rejected by the spatial constraint.
	pub fn find(&self, frame: &Frame, tuning: &CircleTuning) -> Option<Vec<Circle>> {
		let (crop, [ox, oy, ..]) = frame.crop(self.region)?;

		let (min_radius, max_radius) = radius_bounds(frame.width(), self.ratio, self.second_ratio, tuning.radius_slack);
		let params = HoughCircleParams {
			min_radius,
			max_radius,
			min_dist: frame.width() as f64 / tuning.min_dist_divisor,
			param1: tuning.param1,
			param2: tuning.param2,
			preblur: self.preblur.then_some(tuning.preblur),
		};
		log::trace!("circle search ratio {} radius {}..={} in {}x{}", self.ratio, min_radius, max_radius, crop.width(), crop.height());

		let circles = hough_circles(&crop.to_gray(), &params)?;
		Some(
			circles
				.into_iter()
				.map(|circle| circle.offset(ox, oy))
				.filter(|circle| self.constraint.map(|constraint| constraint.contains(circle)).unwrap_or(true))
				.collect(),
		)
	}

	#[inline]
	pub fn count(&self, frame: &Frame, tuning: &CircleTuning) -> FeatureCount {
		match self.find(frame, tuning) {
			Some(circles) => FeatureCount::Count(circles.len() as u32),
			None => FeatureCount::NotFound,
		}
	}
}

#[cfg(test)]
fn test_tuning() -> CircleTuning {
	Tuning::embedded().unwrap().circles
}

#[cfg(test)]
fn disc_frame(w: u32, h: u32, discs: &[(i32, i32, i32)]) -> Frame {
	let mut image = RgbImage::from_pixel(w, h, image::Rgb([30, 30, 30]));
	for &(x, y, r) in discs {
		imageproc::drawing::draw_filled_circle_mut(&mut image, (x, y), r, image::Rgb([230, 230, 230]));
	}
	Frame::from_image(image)
}

#[test]
fn test_radius_bounds() {
	assert_eq!(radius_bounds(1080, 4.7, None, 3.0), (113, 116));
	assert_eq!(radius_bounds(1080, 6.8, Some(6.0), 3.0), (77, 91));
	for width in [320, 720, 1080, 1440] {
		for ratio in [1.0, 4.7, 10.0, 18.0, 200.0] {
			let (min, max) = radius_bounds(width, ratio, None, 3.0);
			assert!(min < max, "{width} / {ratio}");
		}
	}
}

#[test]
fn test_clamp() {
	assert_eq!(FeatureCount::Count(9).clamp(6), FeatureCount::Count(6));
	assert_eq!(FeatureCount::Count(2).clamp(6), FeatureCount::Count(2));
	assert_eq!(FeatureCount::NotFound.clamp(6), FeatureCount::NotFound);
}

#[test]
fn test_hough_single_disc() {
	let frame = disc_frame(400, 300, &[(200, 150, 40)]);
	let params = HoughCircleParams {
		min_radius: 35,
		max_radius: 45,
		min_dist: 50.0,
		param1: 100.0,
		param2: 15,
		preblur: None,
	};
	let circles = hough_circles(&frame.to_gray(), &params).unwrap();
	assert_eq!(circles.len(), 1);
	let circle = circles[0];
	assert!(circle.x.abs_diff(200) <= 2 && circle.y.abs_diff(150) <= 2, "{circle:?}");
	assert!(circle.radius.abs_diff(40) <= 2, "{circle:?}");
}

#[test]
fn test_hough_blank_is_not_found() {
	let frame = disc_frame(200, 200, &[]);
	let params = HoughCircleParams {
		min_radius: 10,
		max_radius: 20,
		min_dist: 25.0,
		param1: 100.0,
		param2: 15,
		preblur: Some(3),
	};
	assert_eq!(hough_circles(&frame.to_gray(), &params), None);
}

#[test]
fn test_query_bottom_center_disc() {
	let radius = ((1080.0 / 4.7) / 2.0f64).round() as i32;
	let frame = disc_frame(1080, 1920, &[(540, 1700, radius)]);

	let tuning = test_tuning();
	let mut query = CircleQuery::new(4.7, RelativeRect { left: 0.25, top: 2.0 / 3.0, width: 0.5, height: 1.0 / 3.0 });
	query.constraint = Some(SpatialConstraint::bottom_center(1080, 1920, tuning.center_band, tuning.floor_divisor));

	let circles = query.find(&frame, &tuning).unwrap();
	assert_eq!(circles.len(), 1);
	assert!(circles[0].x.abs_diff(540) <= 2 && circles[0].y.abs_diff(1700) <= 2, "{:?}", circles[0]);
	assert_eq!(query.count(&frame, &tuning), FeatureCount::Count(1));
}

#[test]
fn test_query_constraint_rejects_off_center() {
	let radius = ((1080.0 / 4.7) / 2.0f64).round() as i32;
	let frame = disc_frame(1080, 1920, &[(400, 1700, radius)]);

	let tuning = test_tuning();
	let mut query = CircleQuery::new(4.7, RelativeRect { left: 0.0, top: 2.0 / 3.0, width: 1.0, height: 1.0 / 3.0 });
	assert_eq!(query.count(&frame, &tuning), FeatureCount::Count(1));

	query.constraint = Some(SpatialConstraint::bottom_center(1080, 1920, tuning.center_band, tuning.floor_divisor));
	assert_eq!(query.count(&frame, &tuning), FeatureCount::Count(0));
}

#[test]
fn test_spatial_constraint() {
	let constraint = SpatialConstraint::bottom_center(1080, 1920, 100, 3.0);
	assert!(constraint.contains(&Circle { x: 640, y: 1280, radius: 10 }));
	assert!(!constraint.contains(&Circle { x: 641, y: 1300, radius: 10 }));
	assert!(!constraint.contains(&Circle { x: 540, y: 1279, radius: 10 }));
}
