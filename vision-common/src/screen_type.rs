use crate::prelude::*;

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenType {
	Undefined = -1,
	LoginDate = 1,
	ReturningPlayer = 2,
	LoginSelect = 3,
	PtcLogin = 4,
	AuthFailure = 5,
	RetryAccount = 6,
	WrongCredentials = 7,
	GameData = 8,
	Marketing = 12,
	Incompatible = 14,
	Update = 15,
	Strike = 16,
	Suspended = 17,
	Terminated = 18,
	GpsLost = 21,
	ClubKids = 23,
}
impl ScreenType {
	#[inline]
	pub fn code(self) -> i32 {
		self as i32
	}

	#[inline]
	pub fn is_defined(self) -> bool {
		self != ScreenType::Undefined
	}
}
impl TryFrom<i32> for ScreenType {
	type Error = i32;

	fn try_from(value: i32) -> Result<Self, Self::Error> {
		Ok(match value {
			-1 => ScreenType::Undefined,
			1 => ScreenType::LoginDate,
			2 => ScreenType::ReturningPlayer,
			3 => ScreenType::LoginSelect,
			4 => ScreenType::PtcLogin,
			5 => ScreenType::AuthFailure,
			6 => ScreenType::RetryAccount,
			7 => ScreenType::WrongCredentials,
			8 => ScreenType::GameData,
			12 => ScreenType::Marketing,
			14 => ScreenType::Incompatible,
			15 => ScreenType::Update,
			16 => ScreenType::Strike,
			17 => ScreenType::Suspended,
			18 => ScreenType::Terminated,
			21 => ScreenType::GpsLost,
			23 => ScreenType::ClubKids,
			_ => return Err(value),
		})
	}
}
impl std::fmt::Display for ScreenType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?} ({})", self, self.code())
	}
}

/// The tokens that identify one screen, and how far down the frame they must appear.
#[derive(Clone, Debug)]
pub struct LexiconEntry {
	pub screen: ScreenType,
	pub tokens: HashSet<Box<str>>,

	/// Fraction of the frame height a token's top edge must lie below. `None` accepts a token anywhere.
	pub floor: Option<f64>,
}
impl LexiconEntry {
	/// Exact, case-sensitive membership plus the vertical floor.
	pub fn matches(&self, text: &str, top: u32, frame_height: u32) -> bool {
		if let Some(floor) = self.floor {
			if top as f64 <= frame_height as f64 * floor {
				return false;
			}
		}
		self.tokens.contains(text)
	}
}

#[derive(Debug, serde::Deserialize)]
struct RawLexiconEntry {
	code: i32,
	tokens: Vec<String>,
	#[serde(default)]
	floor: Option<f64>,
}

/// Every recognisable screen, in ascending code order.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(try_from = "Vec<RawLexiconEntry>")]
pub struct Lexicon(Box<[LexiconEntry]>);
impl Lexicon {
	#[inline]
	pub fn entries(&self) -> &[LexiconEntry] {
		&self.0
	}

	#[inline]
	pub fn get(&self, screen: ScreenType) -> Option<&LexiconEntry> {
		self.0.iter().find(|entry| entry.screen == screen)
	}
}
impl TryFrom<Vec<RawLexiconEntry>> for Lexicon {
	type Error = String;

	fn try_from(raw: Vec<RawLexiconEntry>) -> Result<Self, Self::Error> {
		let mut entries = Vec::with_capacity(raw.len());
		for entry in raw {
			let screen = match ScreenType::try_from(entry.code) {
				Ok(ScreenType::Undefined) | Err(_) => return Err(format!("unknown screen code {}", entry.code)),
				Ok(screen) => screen,
			};
			if entries.iter().any(|existing: &LexiconEntry| existing.screen == screen) {
				return Err(format!("screen code {} is listed more than once", entry.code));
			}
			if let Some(floor) = entry.floor {
				if !(0.0..1.0).contains(&floor) {
					return Err(format!("floor {floor} of screen code {} must be a fraction of the frame height", entry.code));
				}
			}
			entries.push(LexiconEntry {
				screen,
				tokens: entry.tokens.into_iter().map(String::into_boxed_str).collect(),
				floor: entry.floor,
			});
		}
		entries.sort_unstable_by_key(|entry| entry.screen);
		Ok(Lexicon(entries.into_boxed_slice()))
	}
}

#[cfg(test)]
fn lexicon(raw: &str) -> Result<Lexicon, toml::de::Error> {
	#[derive(serde::Deserialize)]
	struct Doc {
		screen: Lexicon,
	}
	toml::from_str::<Doc>(raw).map(|doc| doc.screen)
}

#[test]
fn test_screen_type_codes() {
	assert_eq!(ScreenType::try_from(21), Ok(ScreenType::GpsLost));
	assert_eq!(ScreenType::try_from(9), Err(9));
	assert_eq!(ScreenType::Marketing.code(), 12);
	assert!(!ScreenType::Undefined.is_defined());
}

#[test]
fn test_lexicon_sorted_by_code() {
	let lexicon = lexicon(
		r#"
		[[screen]]
		code = 21
		tokens = ["signal"]

		[[screen]]
		code = 1
		tokens = ["date"]
		floor = 0.25
		"#,
	)
	.unwrap();
	let screens = lexicon.entries().iter().map(|entry| entry.screen).collect::<Vec<_>>();
	assert_eq!(screens, [ScreenType::LoginDate, ScreenType::GpsLost]);
}

#[test]
fn test_lexicon_rejects_bad_codes() {
	assert!(lexicon("[[screen]]\ncode = 9\ntokens = []").is_err());
	assert!(lexicon("[[screen]]\ncode = -1\ntokens = []").is_err());
	assert!(lexicon("[[screen]]\ncode = 1\ntokens = []\n[[screen]]\ncode = 1\ntokens = []").is_err());
	assert!(lexicon("[[screen]]\ncode = 1\ntokens = []\nfloor = 2.0").is_err());
}

#[test]
fn test_entry_matches_floor() {
	let entry = LexiconEntry {
		screen: ScreenType::LoginDate,
		tokens: ["date".into()].into_iter().collect(),
		floor: Some(0.25),
	};
	assert!(entry.matches("date", 500, 1920));
	assert!(!entry.matches("date", 480, 1920));
	assert!(!entry.matches("Date", 500, 1920));

	// a zero floor still rejects words touching the top edge
	let top = LexiconEntry { floor: Some(0.0), ..entry.clone() };
	assert!(!top.matches("date", 0, 1920));
	assert!(top.matches("date", 1, 1920));

	let anywhere = LexiconEntry { floor: None, ..entry };
	assert!(anywhere.matches("date", 0, 1920));
}
