use super::*;
use core::ops::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect<T> {
	pub left: T,
	pub top: T,
	pub right: T,
	pub bottom: T,
}
impl<T: Copy> Rect<T> {
	#[inline]
	pub const fn new(left: T, top: T, right: T, bottom: T) -> Self {
		Self { left, top, right, bottom }
	}

	#[inline]
	pub fn top_left(&self) -> [T; 2] {
		[self.left, self.top]
	}

	#[inline]
	pub fn bottom_right(&self) -> [T; 2] {
		[self.right, self.bottom]
	}

	#[inline]
	pub fn width(&self) -> T
	where
		T: core::ops::Sub<Output = T>
	{
		self.right - self.left
	}

	#[inline]
	pub fn height(&self) -> T
	where
		T: core::ops::Sub<Output = T>
	{
		self.bottom - self.top
	}
}
impl Rect<u32> {
	/// Whether this rectangle is non-empty and lies entirely inside a `w`x`h` image
	#[inline]
	pub fn fits_within(&self, w: u32, h: u32) -> bool {
		self.left < self.right && self.top < self.bottom && self.right <= w && self.bottom <= h
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(C)]
pub struct Point<T> {
	pub x: T,
	pub y: T,
}
impl<T> Point<T> {
	#[inline]
	pub const fn new(x: T, y: T) -> Self {
		Self { x, y }
	}

	#[inline]
	pub fn distance_sqr(&self, other: &Self) -> f32
	where
		T: Sub<T, Output = T> + Mul<T, Output = T> + std::ops::Add<T, Output = T> + Copy + LossyFrom<f32>,
		f32: LossyFrom<T>
	{
		f32::lossy_from((self.x - other.x) * (self.x - other.x) + (self.y - other.y) * (self.y - other.y))
	}
}
impl<T> From<Point<T>> for (T, T) {
	#[inline]
	fn from(pt: Point<T>) -> Self {
		(pt.x, pt.y)
	}
}
impl<T> From<(T, T)> for Point<T> {
	#[inline]
	fn from((x, y): (T, T)) -> Self {
		Point { x, y }
	}
}
impl<T: Sub<T, Output = T>> Sub for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn sub(self, rhs: Self) -> Self::Output {
		Point::new(
			self.x - rhs.x,
			self.y - rhs.y
		)
	}
}
impl<T: Add<T, Output = T>> Add for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn add(self, rhs: Self) -> Self::Output {
		Point::new(
			self.x + rhs.x,
			self.y + rhs.y
		)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[repr(C)]
pub struct Line<T> {
	pub p0: Point<T>,
	pub p1: Point<T>,
}
impl<T> Line<T> {
	#[inline]
	pub const fn new(p0: Point<T>, p1: Point<T>) -> Self {
		Self { p0, p1 }
	}
}
impl<T: Copy + PartialEq> Line<T> {
	#[inline]
	pub fn is_horizontal(&self) -> bool {
		self.p0.y == self.p1.y
	}
}
impl Line<i32> {
	#[inline]
	pub fn length_x(&self) -> i32 {
		(self.p1.x - self.p0.x).abs()
	}

	/// Horizontal midpoint
	#[inline]
	pub fn mid_x(&self) -> f32 {
		(self.p0.x + self.p1.x) as f32 / 2.0
	}
}

#[test]
fn test_rect_fits_within() {
	assert!(Rect::new(0, 0, 10, 10).fits_within(10, 10));
	assert!(!Rect::new(0, 0, 11, 10).fits_within(10, 10));
	assert!(!Rect::new(5, 5, 5, 8).fits_within(10, 10));
}

#[test]
fn test_distance_sqr() {
	let a = Point::new(0.0f32, 0.0);
	let b = Point::new(3.0f32, 4.0);
	assert_eq!(a.distance_sqr(&b), 25.0);
	assert_eq!(Point::new(1, 1).distance_sqr(&Point::new(4, 5)), 25.0);
}
