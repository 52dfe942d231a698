//! CPU implementations of the geometric detectors and the image transforms that feed them.

pub mod circles;
pub mod lines;
pub mod preprocess;

pub use circles::{Circle, CircleQuery, FeatureCount, SpatialConstraint};
pub use lines::{HorizontalFilter, SegmentParams};

use sw_vision_common::{prelude::*, tuning::LineTuning};

/// Edge map used for line searches: blur, Canny, then a morphological gradient to merge double edges.
pub fn line_edges(gray: &GrayImage, blur: u32, canny: [f32; 2]) -> GrayImage {
	let blurred = preprocess::gaussian_blur(gray, blur);
	let edges = preprocess::canny_edges(&blurred, canny[0], canny[1]);
	preprocess::morphological_gradient(&edges)
}

/// Straight segments of `gray` at least `min_length` long, in the coordinates of `gray`.
pub fn detect_lines(gray: &GrayImage, blur: u32, canny: [f32; 2], min_length: f64, tuning: &LineTuning) -> Vec<Line<i32>> {
	let edges = line_edges(gray, blur, canny);
	lines::hough_segments(
		&edges,
		&SegmentParams {
			vote_threshold: tuning.vote_threshold,
			suppression_radius: tuning.suppression_radius,
			min_length: min_length.max(1.0),
			max_gap: tuning.max_gap,
		},
	)
}
