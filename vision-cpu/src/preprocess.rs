use sw_vision_common::prelude::{image::Pixel, *};
use sw_vision_common::prelude::imageproc::{distance_transform::Norm, morphology};

/// Gaussian blur by kernel size, deriving sigma the way OpenCV does when it is left unspecified.
pub fn gaussian_blur(image: &GrayImage, kernel: u32) -> GrayImage {
	if kernel <= 1 {
		return image.clone();
	}
	let sigma = 0.3 * ((kernel - 1) as f32 * 0.5 - 1.0) + 0.8;
	imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Canny edge map. The thresholds may be given in either order.
#[inline]
pub fn canny_edges(image: &GrayImage, low: f32, high: f32) -> GrayImage {
	imageproc::edges::canny(image, low.min(high), low.max(high))
}

/// Dilation minus erosion over each 3x3 neighbourhood, which merges the double edges Canny leaves around thin strokes.
pub fn morphological_gradient(edges: &GrayImage) -> GrayImage {
	let dilated = morphology::dilate(edges, Norm::LInf, 1);
	let eroded = morphology::erode(edges, Norm::LInf, 1);

	let mut out = dilated;
	out.pixels_mut().zip(eroded.pixels()).for_each(|(d, e)| d.0[0] = d.0[0].saturating_sub(e.0[0]));
	out
}

/// Pixels brighter than `threshold` become white, everything else black.
#[inline]
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
	imageproc::contrast::threshold(image, threshold)
}

pub fn resize<I>(image: &I, scale: f32) -> image::ImageBuffer<I::Pixel, Vec<<I::Pixel as Pixel>::Subpixel>>
where
	I: GenericImageView,
	I::Pixel: 'static,
	<I::Pixel as Pixel>::Subpixel: 'static,
{
	let (w, h) = image.dimensions();
	let w = ((w as f32 * scale) as u32).max(1);
	let h = ((h as f32 * scale) as u32).max(1);
	image::imageops::resize(image, w, h, image::imageops::FilterType::Lanczos3)
}

#[cfg(test)]
fn square(size: u32, from: u32, to: u32) -> GrayImage {
	GrayImage::from_fn(size, size, |x, y| {
		if (from..to).contains(&x) && (from..to).contains(&y) {
			image::Luma([255])
		} else {
			image::Luma([0])
		}
	})
}

#[test]
fn test_blur_kernel_one_is_identity() {
	let image = square(16, 4, 12);
	assert_eq!(gaussian_blur(&image, 1), image);
	assert_ne!(gaussian_blur(&image, 5), image);
}

#[test]
fn test_canny_threshold_order() {
	let image = square(32, 8, 24);
	assert_eq!(canny_edges(&image, 100.0, 50.0), canny_edges(&image, 50.0, 100.0));
	assert!(canny_edges(&image, 50.0, 100.0).pixels().any(|p| p.0[0] == 255));
}

#[test]
fn test_morphological_gradient_outlines() {
	let gradient = morphological_gradient(&square(16, 4, 12));
	// interior and background are flat
	assert_eq!(gradient.get_pixel(8, 8).0[0], 0);
	assert_eq!(gradient.get_pixel(0, 0).0[0], 0);
	assert_eq!(gradient.get_pixel(4, 8).0[0], 255);
	assert_eq!(gradient.get_pixel(3, 8).0[0], 255);
}

#[test]
fn test_binarize() {
	let image = GrayImage::from_fn(3, 1, |x, _| image::Luma([[150, 175, 176][x as usize]]));
	let binary = binarize(&image, 175);
	assert_eq!(binary.into_raw(), [0, 0, 255]);
}

#[test]
fn test_resize() {
	let image = RgbImage::new(540, 960);
	assert_eq!(resize(&image, 2.0).dimensions(), (1080, 1920));
	assert_eq!(resize(&GrayImage::new(10, 10), 0.01).dimensions(), (1, 1));
}
