// src/config.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FloodError, Result};

pub const GREEN_BAND: &str = "B3";
pub const NIR_BAND: &str = "B8";
pub const SWIR_BAND: &str = "B11";

pub const NDWI_THRESHOLD: f32 = 0.3;
pub const MNDWI_THRESHOLD: f32 = 0.2;

pub const CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Half-open date interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end <= start {
            return Err(FloodError::InvalidConfig(format!(
                "date window end {} is not after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| FloodError::InvalidConfig(format!("bad date '{}': {}", s, e)))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Run configuration. `Default` is the 2022 Sindh flood study.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    pub study_area: String,
    pub collection: String,
    pub pre_flood: DateWindow,
    pub post_flood: DateWindow,
    pub cloud_ceiling: f64,
    pub map_zoom: f64,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            study_area: "users/adewaleolayemi004/sindh".to_string(),
            collection: "COPERNICUS/S2_SR_HARMONIZED".to_string(),
            pre_flood: DateWindow {
                start: ymd(2022, 1, 1),
                end: ymd(2022, 1, 30),
            },
            post_flood: DateWindow {
                start: ymd(2022, 9, 1),
                end: ymd(2022, 9, 30),
            },
            cloud_ceiling: 20.0,
            map_zoom: 6.5,
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("literal calendar date")
}

impl FloodConfig {
    /// Load a JSON config; omitted fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: FloodConfig = serde_json::from_str(&text).map_err(|source| FloodError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, window) in [("pre_flood", &self.pre_flood), ("post_flood", &self.post_flood)] {
            if window.end <= window.start {
                return Err(FloodError::InvalidConfig(format!(
                    "{} window {} is empty",
                    name, window
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.cloud_ceiling) {
            return Err(FloodError::InvalidConfig(format!(
                "cloud_ceiling {} outside 0..=100",
                self.cloud_ceiling
            )));
        }
        if self.study_area.is_empty() || self.collection.is_empty() {
            return Err(FloodError::InvalidConfig(
                "study_area and collection ids must be set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_study() {
        let config = FloodConfig::default();
        assert_eq!(config.pre_flood.to_string(), "2022-01-01..2022-01-30");
        assert_eq!(config.post_flood.to_string(), "2022-09-01..2022-09-30");
        assert_eq!(config.cloud_ceiling, 20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn window_is_half_open() {
        let window = DateWindow::parse("2022-01-01", "2022-01-30").unwrap();
        assert!(window.contains(ymd(2022, 1, 1)));
        assert!(window.contains(ymd(2022, 1, 29)));
        assert!(!window.contains(ymd(2022, 1, 30)));
        assert!(!window.contains(ymd(2021, 12, 31)));
    }

    #[test]
    fn rejects_inverted_window() {
        assert!(DateWindow::parse("2022-02-01", "2022-01-01").is_err());
        assert!(DateWindow::parse("2022-13-01", "2022-01-01").is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: FloodConfig = serde_json::from_str(r#"{"cloud_ceiling": 10.0}"#).unwrap();
        assert_eq!(config.cloud_ceiling, 10.0);
        assert_eq!(config.collection, "COPERNICUS/S2_SR_HARMONIZED");
    }
}
