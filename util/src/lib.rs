pub use image::{DynamicImage, GenericImage, GenericImageView, GrayImage, RgbImage};
pub use parking_lot::{Mutex, RwLock};
pub use rayon::prelude::*;

pub type AnyError = anyhow::Error;

pub use std::{
	borrow::Cow,
	collections::{BTreeMap, BTreeSet, HashMap, HashSet},
	fs::File,
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, AtomicUsize},
		Arc,
	},
	time::{Instant, SystemTime},
};

pub use core::{
	borrow::Borrow,
	ops::{Deref, DerefMut},
	time::Duration,
};

pub use crossbeam_channel as crossbeam;
pub use rayon;
pub use image;
pub use imageproc;
pub use parking_lot;
pub use anyhow;
pub use log;
pub use chrono;

mod geometry;
pub use geometry::*;

mod scratch;
pub use scratch::*;

#[path = "image.rs"]
mod util_image;
pub use util_image::*;

/// Prefixes a log line with the identifier of the session it belongs to.
///
/// ```ignore
/// origin_log!(debug, identifier, "found {} circles", n);
/// ```
#[macro_export]
macro_rules! origin_log {
	($level:ident, $origin:expr, $fmt:literal $($arg:tt)*) => {
		$crate::log::$level!(concat!("[{}] ", $fmt), $origin $($arg)*)
	};
}

pub trait LossyFrom<T>: Sized {
	fn lossy_from(val: T) -> Self;
}
impl<T> LossyFrom<T> for T {
	#[inline]
	fn lossy_from(val: T) -> Self {
		val
	}
}

macro_rules! impl_lossy_from {
	($($ty1:ty as $ty2:ty),*) => {$(
		impl LossyFrom<$ty1> for $ty2 {
			#[inline(always)]
			fn lossy_from(val: $ty1) -> Self {
				val as $ty2
			}
		}
		impl LossyFrom<$ty2> for $ty1 {
			#[inline(always)]
			fn lossy_from(val: $ty2) -> Self {
				val as $ty1
			}
		}
	)*}
}
impl_lossy_from!(
	i32 as f32,
	u32 as f32
);
