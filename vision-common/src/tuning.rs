use crate::prelude::*;
use serde::Deserialize;

static EMBEDDED_TUNING: &str = include_str!("tuning.toml");

lazy_static! {
	static ref EMBEDDED: Result<Tuning, Box<str>> = Tuning::parse(None).map_err(|err| err.to_string().into_boxed_str());
}

#[derive(Clone, Debug, Deserialize)]
pub struct OcrTuning {
	/// Frames narrower than this are upscaled before classification.
	pub min_width: u32,
	pub upscale: f32,
	pub thresholds: Vec<u8>,
	pub dpi: u32,
	pub timeout_secs: u64,
	pub min_token_chars: usize,
}
impl OcrTuning {
	#[inline]
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct CircleTuning {
	pub radius_slack: f64,
	pub min_dist_divisor: f64,
	pub param1: f32,
	pub param2: u32,
	pub center_band: u32,
	pub floor_divisor: f64,
	pub preblur: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LineTuning {
	pub vote_threshold: u32,
	pub suppression_radius: u32,
	pub max_gap: u32,
	pub dedup_divisor: f64,
	pub center_tolerance: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GpsTuning {
	pub region: RelativeRect,
	pub alert_colour: [u8; 3],
}

#[derive(Clone, Debug, Deserialize)]
pub struct RaidCountTuning {
	pub ratio: f64,
	pub max: u32,
	pub region: RelativeRect,
	pub settle_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RaidCounterTuning {
	pub ratio: f64,
	pub region: RelativeRect,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RaidLineTuning {
	pub gate_ratio: f64,
	pub gate_region: RelativeRect,
	pub band: RelativeRect,
	pub blur: u32,
	pub canny: [f32; 2],
	pub min_ratio: f64,
	pub max_ratio: f64,
	pub slack: f64,
	/// Fraction of the frame height, measured from the top of the band.
	pub max_top: f64,
	pub tap_scale: f64,
	pub settle_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DismissTuning {
	pub width_divisor: f64,
	pub height_divisor: f64,
	pub settle_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CloseButtonTuning {
	/// Tried in order, the first ratio that finds a circle wins.
	pub ratios: Vec<f64>,
	pub region: RelativeRect,
	pub settle_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MainscreenTuning {
	pub min_ratio: f64,
	pub max_ratio: f64,
	pub region: RelativeRect,
	pub x_fraction: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ButtonTuning {
	pub blur: u32,
	pub canny: [f32; 2],
	pub min_slack: f64,
	pub max_slack: f64,
	pub floor_divisor: f64,
	pub min_lines: usize,
	pub max_lines: usize,
	pub upper_offset: u32,
	pub settle_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InventoryTuning {
	pub upscale: f32,
}

/// Every tuned constant the engine uses, plus the screen lexicon.
///
/// Loaded from the embedded `tuning.toml`, optionally with a deployment override deep-merged on top.
#[derive(Clone, Debug, Deserialize)]
pub struct Tuning {
	pub ocr: OcrTuning,
	pub circles: CircleTuning,
	pub lines: LineTuning,
	pub gps: GpsTuning,
	pub raid_count: RaidCountTuning,
	pub raid_counter: RaidCounterTuning,
	pub raid_line: RaidLineTuning,
	pub dismiss: DismissTuning,
	pub close_button: CloseButtonTuning,
	pub mainscreen: MainscreenTuning,
	pub button: ButtonTuning,
	pub inventory: InventoryTuning,

	#[serde(rename = "screen")]
	pub lexicon: Lexicon,
}
impl Tuning {
	/// The defaults shipped with the crate.
	pub fn embedded() -> Result<Tuning, Error> {
		EMBEDDED.clone().map_err(Error::Config)
	}

	/// The defaults with `overrides` (a TOML document) merged on top.
	pub fn with_overrides(overrides: &str) -> Result<Tuning, Error> {
		Self::parse(Some(overrides))
	}

	pub fn load_overrides(path: &Path) -> Result<Tuning, Error> {
		let overrides = std::fs::read_to_string(path)?;
		log::info!("Loading tuning overrides from {}", path.display());
		Self::with_overrides(&overrides)
	}

	fn parse(overrides: Option<&str>) -> Result<Tuning, Error> {
		let mut table = toml::from_str::<toml::Table>(EMBEDDED_TUNING)?;
		if let Some(overrides) = overrides {
			merge(&mut table, toml::from_str::<toml::Table>(overrides)?);
		}
		let tuning = toml::Value::Table(table).try_into::<Tuning>()?;
		tuning.validate()?;
		Ok(tuning)
	}

	fn validate(&self) -> Result<(), Error> {
		let ratios = [
			("raid_count.ratio", self.raid_count.ratio),
			("raid_counter.ratio", self.raid_counter.ratio),
			("raid_line.gate_ratio", self.raid_line.gate_ratio),
			("raid_line.min_ratio", self.raid_line.min_ratio),
			("raid_line.max_ratio", self.raid_line.max_ratio),
			("mainscreen.min_ratio", self.mainscreen.min_ratio),
			("mainscreen.max_ratio", self.mainscreen.max_ratio),
			("dismiss.width_divisor", self.dismiss.width_divisor),
			("dismiss.height_divisor", self.dismiss.height_divisor),
			("circles.min_dist_divisor", self.circles.min_dist_divisor),
			("circles.floor_divisor", self.circles.floor_divisor),
			("lines.dedup_divisor", self.lines.dedup_divisor),
			("button.floor_divisor", self.button.floor_divisor),
		];
		for (name, ratio) in ratios.into_iter().chain(self.close_button.ratios.iter().map(|ratio| ("close_button.ratios", *ratio))) {
			if !(ratio > 0.0) {
				return Err(Error::Config(format!("{name} must be positive, got {ratio}").into_boxed_str()));
			}
		}
		if self.close_button.ratios.is_empty() {
			return Err(Error::Config("close_button.ratios must not be empty".into()));
		}
		if self.ocr.upscale < 1.0 || self.inventory.upscale < 1.0 {
			return Err(Error::Config("upscale factors must be at least 1".into()));
		}
		if self.button.min_lines > self.button.max_lines {
			return Err(Error::Config("button.min_lines exceeds button.max_lines".into()));
		}
		Ok(())
	}
}

// Tables merge key by key, anything else in `overrides` replaces the default outright
fn merge(defaults: &mut toml::Table, overrides: toml::Table) {
	for (key, value) in overrides {
		let overrides = match value {
			toml::Value::Table(overrides) => overrides,
			value => {
				defaults.insert(key, value);
				continue;
			}
		};
		if let Some(toml::Value::Table(defaults)) = defaults.get_mut(&key) {
			merge(defaults, overrides);
			continue;
		}
		defaults.insert(key, toml::Value::Table(overrides));
	}
}

#[test]
fn test_embedded_tuning() {
	let tuning = Tuning::embedded().unwrap();
	assert_eq!(tuning.ocr.thresholds, [200, 175, 150]);
	assert_eq!(tuning.close_button.ratios, [10.0, 11.0, 12.0, 14.0, 13.0]);
	assert_eq!(tuning.gps.alert_colour, [240, 75, 95]);
	assert_eq!(tuning.lexicon.entries().len(), 16);
	assert_eq!(tuning.lexicon.get(ScreenType::GpsLost).unwrap().floor, Some(0.0));
	assert_eq!(tuning.lexicon.get(ScreenType::Suspended).unwrap().floor, Some(0.25));
	assert!(tuning.lexicon.get(ScreenType::ReturningPlayer).unwrap().tokens.contains("ZURÜCKKEHRENDER"));
}

#[test]
fn test_partial_override() {
	let tuning = Tuning::with_overrides("[raid_count]\nmax = 4\n[ocr]\nthresholds = [190]").unwrap();
	assert_eq!(tuning.raid_count.max, 4);
	assert_eq!(tuning.raid_count.ratio, 4.7);
	assert_eq!(tuning.ocr.thresholds, [190]);
	assert_eq!(tuning.ocr.dpi, 70);
}

#[test]
fn test_override_lexicon_replaces_table() {
	let tuning = Tuning::with_overrides("[[screen]]\ncode = 23\ntokens = [\"CLUB\"]").unwrap();
	assert_eq!(tuning.lexicon.entries().len(), 1);
}

#[test]
fn test_invalid_overrides() {
	assert!(matches!(Tuning::with_overrides("[close_button]\nratios = []"), Err(Error::Config(_))));
	assert!(matches!(Tuning::with_overrides("[raid_count]\nratio = 0.0"), Err(Error::Config(_))));
	assert!(matches!(Tuning::with_overrides("[raid_count]\nratio = \"big\""), Err(Error::Config(_))));
	assert!(matches!(Tuning::with_overrides("not toml at all ["), Err(Error::Config(_))));
}
