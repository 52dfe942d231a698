use crate::prelude::*;
use ocr::OcrResult;

/// Decides which screen the recognised text belongs to.
///
/// Screens are tried in ascending code order and the first one with any matching word wins, so the order the
/// words were recognised in does not matter. Words shorter than `min_token_chars` never match. `frame_height`
/// is the height of the screenshot as loaded, before any upscaling for recognition.
pub fn classify(ocr: &OcrResult, frame_height: u32, lexicon: &Lexicon, min_token_chars: usize) -> ScreenType {
	let words = ocr.words().filter(|word| word.text.chars().count() >= min_token_chars).collect::<Vec<_>>();
	if words.is_empty() {
		return ScreenType::Undefined;
	}

	lexicon
		.entries()
		.iter()
		.find(|entry| words.iter().any(|word| entry.matches(&word.text, word.top, frame_height)))
		.map(|entry| entry.screen)
		.unwrap_or(ScreenType::Undefined)
}

#[cfg(test)]
use crate::procedures::testing::word;

#[cfg(test)]
fn run(words: &[(&str, u32)]) -> ScreenType {
	let tuning = Tuning::embedded().unwrap();
	let ocr = OcrResult {
		texts: words.iter().map(|&(text, top)| word(text, top)).collect(),
	};
	classify(&ocr, 1920, &tuning.lexicon, tuning.ocr.min_token_chars)
}

#[test]
fn test_short_tokens_never_match() {
	assert_eq!(run(&[("GPS", 100)]), ScreenType::Undefined);
	assert_eq!(run(&[("GPS", 1000)]), ScreenType::Undefined);
	assert_eq!(run(&[]), ScreenType::Undefined);
}

#[test]
fn test_gps_only_needs_to_be_off_the_top_edge() {
	assert_eq!(run(&[("GPS-Signal", 100)]), ScreenType::GpsLost);
	assert_eq!(run(&[("gefunden.", 1500)]), ScreenType::GpsLost);
	assert_eq!(run(&[("GPS-Signal", 1)]), ScreenType::GpsLost);
	assert_eq!(run(&[("GPS-Signal", 0)]), ScreenType::Undefined);
}

#[test]
fn test_floor() {
	// floor is 1920 / 4 = 480, strictly below
	assert_eq!(run(&[("Password", 480)]), ScreenType::Undefined);
	assert_eq!(run(&[("Password", 481)]), ScreenType::PtcLogin);
}

#[test]
fn test_lowest_code_wins() {
	assert_eq!(run(&[("terminated", 900), ("Password", 900)]), ScreenType::PtcLogin);
	assert_eq!(run(&[("Password", 900), ("terminated", 900)]), ScreenType::PtcLogin);
	assert_eq!(run(&[("GPS-Signal", 100), ("CLUB", 900)]), ScreenType::GpsLost);
}

#[test]
fn test_case_sensitive() {
	assert_eq!(run(&[("password", 900)]), ScreenType::Undefined);
	assert_eq!(run(&[("Suspension", 900)]), ScreenType::Suspended);
	assert_eq!(run(&[("suspension", 900)]), ScreenType::Strike);
}

#[test]
fn test_non_word_boxes_are_ignored() {
	let tuning = Tuning::embedded().unwrap();
	let mut block = word("", 900);
	block.level = 2;
	let ocr = OcrResult { texts: vec![block, word("Google", 900)] };
	assert_eq!(classify(&ocr, 1920, &tuning.lexicon, 4), ScreenType::LoginSelect);
}
