#[macro_use]
extern crate lazy_static;

pub use sw_util::*;

pub mod prelude {
	pub use crate::{
		frame::Frame,
		screen::RelativeRect,
		screen_type::{Lexicon, LexiconEntry, ScreenType},
		tuning::Tuning,
		Error,
	};

	pub use sw_util::*;
}

pub mod frame;
pub mod screen;
pub mod screen_type;
pub mod tuning;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("{} does not exist", .0.display())]
	MissingInput(PathBuf),

	#[error("screenshot {} is corrupted: {reason}", path.display())]
	CorruptImage { path: PathBuf, reason: Box<str> },

	#[error("region {rect:?} is outside of the {width}x{height} frame")]
	InvalidRegion { rect: Rect<u32>, width: u32, height: u32 },

	#[error("worker job was lost: {0}")]
	WorkerLost(Box<str>),

	#[error("invalid tuning: {0}")]
	Config(Box<str>),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
impl Error {
	#[inline]
	pub(crate) fn corrupt(path: &Path, reason: impl std::fmt::Display) -> Self {
		Error::CorruptImage { path: path.to_owned(), reason: reason.to_string().into_boxed_str() }
	}
}
impl From<toml::de::Error> for Error {
	#[inline]
	fn from(err: toml::de::Error) -> Self {
		Error::Config(err.to_string().into_boxed_str())
	}
}
