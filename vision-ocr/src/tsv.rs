//! Parser for tesseract's `tsv` output.
//!
//! ```text
//! level	page_num	block_num	par_num	line_num	word_num	left	top	width	height	conf	text
//! 5	1	1	1	1	1	36	92	60	24	96.063751	Password
//! ```

use crate::{OcrError, OcrResult, OcrText};

const COLUMNS: usize = 12;

pub fn parse(tsv: &str) -> Result<OcrResult, OcrError> {
	let mut texts = Vec::new();
	for (i, row) in tsv.lines().enumerate() {
		let line = i + 1;
		if row.trim().is_empty() || row.starts_with("level") {
			continue;
		}

		let columns = row.splitn(COLUMNS, '\t').collect::<Vec<_>>();
		if columns.len() < COLUMNS - 1 {
			return Err(OcrError::Malformed {
				line,
				reason: format!("expected {COLUMNS} columns, got {}", columns.len()).into_boxed_str(),
			});
		}

		let int = |idx: usize| -> Result<u32, OcrError> {
			columns[idx].trim().parse::<u32>().map_err(|err| OcrError::Malformed {
				line,
				reason: format!("column {} ({:?}): {err}", idx + 1, columns[idx]).into_boxed_str(),
			})
		};

		let confidence = columns[10].trim().parse::<f32>().map_err(|err| OcrError::Malformed {
			line,
			reason: format!("confidence {:?}: {err}", columns[10]).into_boxed_str(),
		})?;

		texts.push(OcrText {
			level: int(0)?,
			left: int(6)?,
			top: int(7)?,
			width: int(8)?,
			height: int(9)?,
			confidence,
			text: columns.get(11).map(|text| text.trim().to_owned()).unwrap_or_default(),
		});
	}
	Ok(OcrResult { texts })
}

#[test]
fn test_parse_tsv() {
	let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
		1\t1\t0\t0\t0\t0\t0\t0\t1080\t1920\t-1\t\n\
		5\t1\t1\t1\t1\t1\t36\t920\t160\t24\t96.063751\tPassword\n\
		5\t1\t1\t1\t1\t2\t210\t920\t40\t24\t95\tGPS-Signal\n";

	let result = parse(tsv).unwrap();
	assert_eq!(result.texts.len(), 3);
	assert_eq!(result.texts[0].text, "");
	assert_eq!(result.texts[0].confidence, -1.0);
	assert_eq!(
		result.texts[1],
		OcrText {
			level: 5,
			text: "Password".into(),
			confidence: 96.063751,
			left: 36,
			top: 920,
			width: 160,
			height: 24,
		}
	);
	assert_eq!(result.words().count(), 2);
}

#[test]
fn test_parse_missing_text_column() {
	let result = parse("2\t1\t1\t0\t0\t0\t5\t6\t7\t8\t-1").unwrap();
	assert_eq!(result.texts[0].top, 6);
	assert_eq!(result.texts[0].text, "");
}

#[test]
fn test_parse_malformed() {
	assert!(matches!(parse("5\t1\t1\n"), Err(OcrError::Malformed { line: 1, .. })));
	assert!(matches!(parse("level\n5\t1\t1\t1\t1\t1\tx\t0\t0\t0\t90\tword"), Err(OcrError::Malformed { line: 2, .. })));
}
