use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::app::config::OutputFormat;

pub fn city_slug(city: &str) -> String {
    city.to_lowercase().replace(' ', "_")
}

/// `<dir>/<city_slug>_<theme>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn output_filename(dir: &Path, city: &str, theme: &str, format: OutputFormat, at: DateTime<Local>) -> PathBuf {
    let timestamp = at.format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}_{}.{}", city_slug(city), theme, timestamp, format.extension()))
}

/// Build the output path for now, creating the directory if needed
pub fn generate_output_filename(dir: &Path, city: &str, theme: &str, format: OutputFormat) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))?;
    }
    Ok(output_filename(dir, city, theme, format, Local::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_city_slug() {
        assert_eq!(city_slug("Kuala Lumpur"), "kuala_lumpur");
        assert_eq!(city_slug("New York City"), "new_york_city");
        assert_eq!(city_slug("paris"), "paris");
    }

    #[test]
    fn test_output_filename() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        let path = output_filename(Path::new("posters"), "Kuala Lumpur", "noir", OutputFormat::Png, at);
        assert_eq!(path, PathBuf::from("posters/kuala_lumpur_noir_20260307_090501.png"));
    }

    #[test]
    fn test_generate_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("posters");
        let path = generate_output_filename(&out, "Oslo", "paper", OutputFormat::Svg).unwrap();
        assert!(out.is_dir());
        assert_eq!(path.parent(), Some(out.as_path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("oslo_paper_"));
        assert!(name.ends_with(".svg"));
    }
}
