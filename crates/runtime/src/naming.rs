//! Workspace file naming.

use chrono::{DateTime, TimeZone};

/// Generates `<prefix>-YYYYMMDD_HHMMSS` from a timestamp.
pub fn generated_name<Tz: TimeZone>(prefix: &str, at: &DateTime<Tz>) -> String
where
	Tz::Offset: std::fmt::Display,
{
	format!("{prefix}-{}", at.format("%Y%m%d_%H%M%S"))
}

/// Strips a trailing `.png` (any case) so a picked file name can be proposed again.
pub fn workspace_stem(file_name: &str) -> &str {
	let len = file_name.len();
	if len > 4 && file_name.is_char_boundary(len - 4) && file_name[len - 4..].eq_ignore_ascii_case(".png") {
		&file_name[..len - 4]
	} else {
		file_name
	}
}

#[cfg(test)]
mod tests {
	use chrono::{FixedOffset, TimeZone};

	use super::*;

	#[test]
	fn generated_name_uses_compact_timestamp() {
		let at = FixedOffset::east_opt(9 * 3600).unwrap().with_ymd_and_hms(2024, 3, 7, 5, 4, 3).unwrap();
		assert_eq!(generated_name("pixel", &at), "pixel-20240307_050403");
	}

	#[test]
	fn stem_strips_png_extension() {
		assert_eq!(workspace_stem("sprites.PNG"), "sprites");
		assert_eq!(workspace_stem("notes.txt"), "notes.txt");
		assert_eq!(workspace_stem(".png"), ".png");
	}
}
