use rayon::prelude::*;
use std::collections::HashMap;

/// Returns the colour that occurs most often in the image.
///
/// Ties resolve to the numerically smallest colour so the answer never depends on hash order.
pub fn most_frequent_colour(image: &image::RgbImage) -> Option<image::Rgb<u8>> {
	if image.width() == 0 || image.height() == 0 {
		return None;
	}

	let counts = image
		.as_raw()
		.par_chunks(image.width() as usize * 3)
		.fold(HashMap::<[u8; 3], u32>::new, |mut counts, row| {
			for px in row.chunks_exact(3) {
				*counts.entry([px[0], px[1], px[2]]).or_default() += 1;
			}
			counts
		})
		.reduce(HashMap::new, |mut a, b| {
			for (colour, n) in b {
				*a.entry(colour).or_default() += n;
			}
			a
		});

	counts
		.into_iter()
		.max_by(|(ca, na), (cb, nb)| na.cmp(nb).then_with(|| cb.cmp(ca)))
		.map(|(colour, _)| image::Rgb(colour))
}

#[test]
fn test_most_frequent_colour() {
	let mut image = image::RgbImage::from_pixel(10, 10, image::Rgb([240, 75, 95]));
	for x in 0..10 {
		for y in 0..4 {
			image.put_pixel(x, y, image::Rgb([0, 0, 0]));
		}
	}
	assert_eq!(most_frequent_colour(&image), Some(image::Rgb([240, 75, 95])));
	assert_eq!(most_frequent_colour(&image::RgbImage::new(0, 0)), None);
}

#[test]
fn test_most_frequent_colour_tie() {
	let mut image = image::RgbImage::from_pixel(2, 1, image::Rgb([9, 9, 9]));
	image.put_pixel(1, 0, image::Rgb([1, 1, 1]));
	assert_eq!(most_frequent_colour(&image), Some(image::Rgb([1, 1, 1])));
}
