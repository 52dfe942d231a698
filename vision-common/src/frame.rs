use crate::prelude::*;

/// A decoded screenshot. Loaded fresh for every request and never shared between requests.
#[derive(Clone, Debug)]
pub struct Frame {
	image: RgbImage,
}
impl Frame {
	/// Decodes the screenshot at `path`.
	///
	/// The caller has usually checked that the file exists already, but it can still vanish or be
	/// truncated before we get here, so every failure is reported as [`Error::CorruptImage`].
	pub fn load(path: &Path) -> Result<Self, Error> {
		let meta = std::fs::metadata(path).map_err(|err| Error::corrupt(path, err))?;
		if meta.len() == 0 {
			return Err(Error::corrupt(path, "file is empty"));
		}

		// Screenshots are not always named after their format
		let image = image::io::Reader::open(path)
			.and_then(|reader| reader.with_guessed_format())
			.map_err(|err| Error::corrupt(path, err))?
			.decode()
			.map_err(|err| Error::corrupt(path, err))?;
		let frame = Frame { image: image.into_rgb8() };
		if frame.width() == 0 || frame.height() == 0 {
			return Err(Error::corrupt(path, "image has no pixels"));
		}

		Ok(frame)
	}

	#[inline]
	pub fn from_image(image: RgbImage) -> Self {
		Frame { image }
	}

	#[inline]
	pub fn width(&self) -> u32 {
		self.image.width()
	}

	#[inline]
	pub fn height(&self) -> u32 {
		self.image.height()
	}

	#[inline]
	pub fn dimensions(&self) -> (u32, u32) {
		self.image.dimensions()
	}

	#[inline]
	pub fn rgb(&self) -> &RgbImage {
		&self.image
	}

	#[inline]
	pub fn into_rgb(self) -> RgbImage {
		self.image
	}

	#[inline]
	pub fn to_gray(&self) -> GrayImage {
		image::imageops::grayscale(&self.image)
	}

	/// Crops a proportional region, returning the crop and its `[x, y, w, h]` offset in this frame.
	///
	/// Returns `None` if the region collapses to nothing at this resolution.
	pub fn crop(&self, region: RelativeRect) -> Option<(Frame, [u32; 4])> {
		let bounds = region.into_absolute([self.width(), self.height()]);
		if bounds[2] == 0 || bounds[3] == 0 {
			return None;
		}
		Some((Frame { image: region.view(&self.image).to_image() }, bounds))
	}

	/// Crops a caller-specified pixel rectangle, which must lie inside the frame.
	pub fn crop_rect(&self, rect: Rect<u32>) -> Result<Frame, Error> {
		if !rect.fits_within(self.width(), self.height()) {
			return Err(Error::InvalidRegion { rect, width: self.width(), height: self.height() });
		}
		let image = image::imageops::crop_imm(&self.image, rect.left, rect.top, rect.width(), rect.height()).to_image();
		Ok(Frame { image })
	}
}

#[test]
fn test_load_empty_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("empty.png");
	std::fs::write(&path, b"").unwrap();
	assert!(matches!(Frame::load(&path), Err(Error::CorruptImage { .. })));
}

#[test]
fn test_load_vanished_file() {
	let dir = tempfile::tempdir().unwrap();
	assert!(matches!(Frame::load(&dir.path().join("gone.png")), Err(Error::CorruptImage { .. })));
}

#[test]
fn test_load_truncated_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("truncated.png");
	RgbImage::from_pixel(32, 32, image::Rgb([10, 20, 30])).save(&path).unwrap();
	let bytes = std::fs::read(&path).unwrap();
	std::fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();
	assert!(matches!(Frame::load(&path), Err(Error::CorruptImage { .. })));
}

#[test]
fn test_load_roundtrip_dimensions() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("frame.png");
	RgbImage::from_pixel(64, 48, image::Rgb([1, 2, 3])).save(&path).unwrap();
	let frame = Frame::load(&path).unwrap();
	assert_eq!(frame.dimensions(), (64, 48));
	assert_eq!(frame.rgb().get_pixel(5, 5), &image::Rgb([1, 2, 3]));
}

#[test]
fn test_load_sniffs_format() {
	let dir = tempfile::tempdir().unwrap();
	let png = dir.path().join("frame.png");
	RgbImage::from_pixel(20, 10, image::Rgb([240, 75, 95])).save(&png).unwrap();

	for name in ["screenshot", "screenshot.jpg"] {
		let path = dir.path().join(name);
		std::fs::copy(&png, &path).unwrap();
		let frame = Frame::load(&path).unwrap();
		assert_eq!(frame.dimensions(), (20, 10), "{name}");
		assert_eq!(frame.rgb().get_pixel(3, 3), &image::Rgb([240, 75, 95]), "{name}");
	}
}

#[test]
fn test_crop_rect() {
	let frame = Frame::from_image(RgbImage::new(100, 100));
	assert_eq!(frame.crop_rect(Rect::new(10, 20, 60, 30)).unwrap().dimensions(), (50, 10));
	assert!(matches!(frame.crop_rect(Rect::new(10, 20, 160, 30)), Err(Error::InvalidRegion { .. })));
}

#[test]
fn test_crop_region() {
	let frame = Frame::from_image(RgbImage::new(1080, 1920));
	let (crop, bounds) = frame.crop(RelativeRect { left: 0.0, top: 0.8, width: 0.25, height: 0.2 }).unwrap();
	assert_eq!(bounds, [0, 1536, 270, 384]);
	assert_eq!(crop.dimensions(), (270, 384));
}
