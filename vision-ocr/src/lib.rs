use sw_util::*;

mod tesseract;
pub use tesseract::TesseractCli;

pub mod tsv;

#[derive(thiserror::Error, Debug)]
pub enum OcrError {
	#[error("tesseract is not installed or not on PATH")]
	NotInstalled,

	#[error("failed to start tesseract: {0}")]
	Spawn(#[source] std::io::Error),

	#[error("tesseract did not finish within {0:?}")]
	Timeout(Duration),

	#[error("tesseract exited with {status}: {stderr}")]
	Failed { status: std::process::ExitStatus, stderr: Box<str> },

	#[error("malformed tesseract output on line {line}: {reason}")]
	Malformed { line: usize, reason: Box<str> },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// One box recognised by the OCR engine.
///
/// Boxes above word level (page, block, paragraph, line) are kept too and have no text.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OcrText {
	pub level: u32,
	pub text: String,
	pub confidence: f32,

	pub left: u32,
	pub top: u32,
	pub width: u32,
	pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct OcrResult {
	pub texts: Vec<OcrText>,
}
impl OcrResult {
	/// Boxes that carry text, in reading order.
	pub fn words(&self) -> impl Iterator<Item = &OcrText> + '_ {
		self.texts.iter().filter(|text| !text.text.is_empty())
	}
}

#[derive(Debug, Clone, Copy)]
pub struct OcrOptions {
	pub dpi: Option<u32>,
	pub timeout: Duration,
}
impl Default for OcrOptions {
	fn default() -> Self {
		Self {
			dpi: None,
			timeout: Duration::from_secs(40),
		}
	}
}

/// An optical character recogniser working on image files.
pub trait OcrEngine: Send + Sync {
	/// Recognises every box in the image, with its position.
	fn recognise(&self, image: &Path, options: &OcrOptions) -> Result<OcrResult, OcrError>;

	/// Recognises the image as plain text.
	fn recognise_text(&self, image: &Path, options: &OcrOptions) -> Result<String, OcrError>;
}
impl<E: OcrEngine + ?Sized> OcrEngine for Arc<E> {
	#[inline]
	fn recognise(&self, image: &Path, options: &OcrOptions) -> Result<OcrResult, OcrError> {
		(**self).recognise(image, options)
	}

	#[inline]
	fn recognise_text(&self, image: &Path, options: &OcrOptions) -> Result<String, OcrError> {
		(**self).recognise_text(image, options)
	}
}

#[test]
fn test_words_skip_structural_boxes() {
	let result = OcrResult {
		texts: vec![
			OcrText { level: 1, text: String::new(), confidence: -1.0, left: 0, top: 0, width: 100, height: 100 },
			OcrText { level: 5, text: "Password".into(), confidence: 91.0, left: 10, top: 60, width: 50, height: 10 },
		],
	};
	assert_eq!(result.words().map(|word| word.text.as_str()).collect::<Vec<_>>(), ["Password"]);
}
