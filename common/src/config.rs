use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionSection,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Raw detection values as written in the config file. They are only
/// trusted after [`DetectionSection::validate`] turns them into a
/// [`DetectionConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionSection {
    #[serde(default = "default_contour_area")]
    pub contour_area: i64,
    #[serde(default = "default_threshold")]
    pub threshold: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// `"camera"` or `"file"`.
    #[serde(default = "default_source_kind")]
    pub kind: String,
    #[serde(default)]
    pub device: u32,
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Capture size requested from the camera.
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    /// DirectShow device name, only used on Windows.
    #[serde(default)]
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_enabled")]
    pub enabled: bool,
    #[serde(default = "default_title")]
    pub title: String,
    /// Bounded wait for operator cancellation after each processed sample.
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            contour_area: default_contour_area(),
            threshold: default_threshold(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            device: 0,
            file: None,
            width: default_width(),
            height: default_height(),
            framerate: default_framerate(),
            device_name: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: default_display_enabled(),
            title: default_title(),
            wait_ms: default_wait_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl DetectionSection {
    pub fn validate(&self) -> Result<DetectionConfig, ValidationError> {
        DetectionConfig::new(self.contour_area, self.threshold)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Validated, immutable detection parameters.
///
/// `contour_area_threshold` is the minimum enclosed area (in pixels) a
/// changed region needs before it is reported, `diff_threshold` the minimum
/// per-pixel intensity delta that counts as change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionConfig {
    contour_area_threshold: u32,
    diff_threshold: u8,
}

impl DetectionConfig {
    pub fn new(contour_area_threshold: i64, diff_threshold: i64) -> Result<Self, ValidationError> {
        if contour_area_threshold <= 0 || contour_area_threshold > i64::from(u32::MAX) {
            return Err(ValidationError::ContourAreaThreshold(contour_area_threshold));
        }
        let diff_threshold = u8::try_from(diff_threshold)
            .map_err(|_| ValidationError::DiffThreshold(diff_threshold))?;
        Ok(Self {
            contour_area_threshold: contour_area_threshold as u32,
            diff_threshold,
        })
    }

    pub fn contour_area_threshold(&self) -> u32 {
        self.contour_area_threshold
    }

    pub fn diff_threshold(&self) -> u8 {
        self.diff_threshold
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            contour_area_threshold: default_contour_area() as u32,
            diff_threshold: default_threshold() as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("contour area threshold must be a positive integer, got {0}")]
    ContourAreaThreshold(i64),
    #[error("diff threshold must be in [0, 255], got {0}")]
    DiffThreshold(i64),
}

/// Log verbosity names accepted on the command line and in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Warning,
    Error,
    Critical,
    Trace,
}

impl LogLevel {
    /// `tracing` filter directive for this level. `CRITICAL` has no
    /// counterpart in tracing and maps to `error`.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse a level name, falling back to INFO for anything unknown.
    /// The second element is false when the fallback was taken.
    pub fn parse_or_info(name: &str) -> (Self, bool) {
        match name.parse() {
            Ok(level) => (level, true),
            Err(_) => (LogLevel::Info, false),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            "TRACE" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Trace => "TRACE",
        };
        f.write_str(name)
    }
}

// Default value functions
fn default_contour_area() -> i64 {
    50
}
fn default_threshold() -> i64 {
    20
}
fn default_source_kind() -> String {
    "camera".into()
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_framerate() -> u32 {
    30
}
fn default_display_enabled() -> bool {
    true
}
fn default_title() -> String {
    "Drone detector".into()
}
fn default_wait_ms() -> u64 {
    30
}
fn default_log_level() -> String {
    "INFO".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.contour_area_threshold(), 50);
        assert_eq!(config.diff_threshold(), 20);
        assert_eq!(DetectionSection::default().validate().unwrap(), config);
    }

    #[test]
    fn non_positive_contour_area_rejected() {
        for bad in [0, -1, -50, i64::MIN] {
            assert_eq!(
                DetectionConfig::new(bad, 20),
                Err(ValidationError::ContourAreaThreshold(bad))
            );
        }
    }

    #[test]
    fn diff_threshold_outside_byte_range_rejected() {
        for bad in [-1, 256, 1000] {
            assert_eq!(
                DetectionConfig::new(50, bad),
                Err(ValidationError::DiffThreshold(bad))
            );
        }
        assert!(DetectionConfig::new(1, 0).is_ok());
        assert!(DetectionConfig::new(1, 255).is_ok());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.detection.contour_area, 50);
        assert_eq!(config.detection.threshold, 20);
        assert_eq!(config.source.kind, "camera");
        assert_eq!(config.source.device, 0);
        assert!(config.display.enabled);
        assert_eq!(config.display.wait_ms, 30);
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn partial_file_overrides() {
        let config = Config::parse(
            r#"
            [detection]
            threshold = 35

            [source]
            kind = "file"
            file = "clips/sky.mp4"
            device_name = "USB Camera"

            [display]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.contour_area, 50);
        assert_eq!(config.detection.threshold, 35);
        assert_eq!(config.source.kind, "file");
        assert_eq!(config.source.file, Some(PathBuf::from("clips/sky.mp4")));
        assert_eq!(config.source.device_name.as_deref(), Some("USB Camera"));
        assert!(!config.display.enabled);
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        assert!(matches!(
            Config::parse("[detection\ncontour_area = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let path = std::env::temp_dir().join("drone-detector-missing-config.toml");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ReadFile(_, _))
        ));
    }

    #[test]
    fn log_level_names() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::Critical.directive(), "error");
        assert_eq!(LogLevel::Trace.directive(), "trace");
        assert_eq!(LogLevel::parse_or_info("VERBOSE"), (LogLevel::Info, false));
        assert_eq!(LogLevel::parse_or_info("ERROR"), (LogLevel::Error, true));
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
    }
}
