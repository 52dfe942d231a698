use crate::prelude::*;

/// A rectangle expressed as fractions of the frame it is applied to.
///
/// Every crop in the engine is described this way so that it scales with the screenshot resolution.
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
pub struct RelativeRect {
	pub left: f64,
	pub top: f64,
	pub width: f64,
	pub height: f64,
}
impl RelativeRect {
	pub const FULL: RelativeRect = RelativeRect { left: 0.0, top: 0.0, width: 1.0, height: 1.0 };

	/// Returns `[x, y, w, h]` in pixels, truncated and constrained to the frame.
	#[inline]
	pub fn into_absolute(self, screen_size: [u32; 2]) -> [u32; 4] {
		let [sw, sh] = screen_size;
		let x = ((self.left * sw as f64) as u32).min(sw);
		let y = ((self.top * sh as f64) as u32).min(sh);
		let w = ((self.width * sw as f64) as u32).min(sw - x);
		let h = ((self.height * sh as f64) as u32).min(sh - y);
		[x, y, w, h]
	}

	pub fn view<I: GenericImageView>(self, image: &I) -> image::SubImage<&<I as GenericImageView>::InnerImageView> {
		let [x, y, w, h] = self.into_absolute([image.width(), image.height()]);
		image.view(x, y, w, h)
	}
}

#[test]
fn test_into_absolute() {
	let top_seventh = RelativeRect { left: 0.0, top: 0.0, width: 1.0, height: 1.0 / 7.0 };
	assert_eq!(top_seventh.into_absolute([1080, 1920]), [0, 0, 1080, 274]);

	let bottom_centre = RelativeRect { left: 0.375, top: 0.75, width: 0.25, height: 0.25 };
	assert_eq!(bottom_centre.into_absolute([1080, 1920]), [405, 1440, 270, 480]);

	assert_eq!(RelativeRect::FULL.into_absolute([720, 1280]), [0, 0, 720, 1280]);
}

#[test]
fn test_into_absolute_constrained() {
	let overhanging = RelativeRect { left: 0.9, top: 0.9, width: 0.5, height: 0.5 };
	assert_eq!(overhanging.into_absolute([100, 200]), [90, 180, 10, 20]);
}

#[test]
fn test_view() {
	let image = GrayImage::new(200, 100);
	let view = RelativeRect { left: 0.5, top: 0.5, width: 0.5, height: 0.5 }.view(&image);
	assert_eq!(view.dimensions(), (100, 50));
}
