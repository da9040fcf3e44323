use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use drone_detector_common::config::{Config, LogLevel};

/// Real-time motion detector for a camera or a video file.
#[derive(Parser, Debug)]
#[command(name = "drone-detector", version, about, long_about = None)]
pub struct Cli {
    /// Log level; RUST_LOG takes precedence when set
    #[arg(long, value_enum, ignore_case = true, global = true)]
    pub level: Option<Level>,

    /// Minimum enclosed area of a changed region before it is boxed (default: 50)
    #[arg(long, alias = "contour_area", global = true)]
    pub contour_area: Option<i64>,

    /// Per-pixel intensity change (0 to 255) above which two samples differ (default: 20)
    #[arg(long, alias = "treshold", global = true)]
    pub threshold: Option<i64>,

    /// Optional TOML config file; command line values override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run without a display window
    #[arg(long, global = true)]
    pub headless: bool,

    #[command(subcommand)]
    pub input: Option<InputCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Read from a capture device
    Camera {
        /// Device index
        #[arg(long)]
        device: Option<u32>,
    },
    /// Read from a video file
    Video {
        /// Path to the video
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "UPPER")]
pub enum Level {
    Info,
    Debug,
    Warning,
    Error,
    Critical,
    Trace,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Info => LogLevel::Info,
            Level::Debug => LogLevel::Debug,
            Level::Warning => LogLevel::Warning,
            Level::Error => LogLevel::Error,
            Level::Critical => LogLevel::Critical,
            Level::Trace => LogLevel::Trace,
        }
    }
}

impl Cli {
    /// Fold the command line into `config`. Only values actually given on
    /// the command line replace what the file said.
    pub fn apply(&self, config: &mut Config) {
        if let Some(area) = self.contour_area {
            config.detection.contour_area = area;
        }
        if let Some(threshold) = self.threshold {
            config.detection.threshold = threshold;
        }
        if let Some(level) = self.level {
            config.logging.level = LogLevel::from(level).to_string();
        }
        if self.headless {
            config.display.enabled = false;
        }
        match &self.input {
            Some(InputCommand::Camera { device }) => {
                config.source.kind = "camera".into();
                if let Some(device) = device {
                    config.source.device = *device;
                }
            }
            Some(InputCommand::Video { file }) => {
                config.source.kind = "file".into();
                config.source.file = Some(file.clone());
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("drone-detector").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_keeps_config() {
        let mut config = Config::default();
        parse(&[]).apply(&mut config);
        assert_eq!(config.detection.contour_area, 50);
        assert_eq!(config.detection.threshold, 20);
        assert_eq!(config.source.kind, "camera");
        assert_eq!(config.logging.level, "INFO");
        assert!(config.display.enabled);
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::parse("[detection]\ncontour_area = 10\nthreshold = 5\n").unwrap();
        parse(&["--contour-area", "80", "--level", "WARNING", "--headless"]).apply(&mut config);
        assert_eq!(config.detection.contour_area, 80);
        assert_eq!(config.detection.threshold, 5);
        assert_eq!(config.logging.level, "WARNING");
        assert!(!config.display.enabled);
    }

    #[test]
    fn legacy_spellings_accepted() {
        let cli = parse(&["--contour_area", "70", "--treshold", "30"]);
        assert_eq!(cli.contour_area, Some(70));
        assert_eq!(cli.threshold, Some(30));
    }

    #[test]
    fn video_requires_file() {
        assert!(Cli::try_parse_from(["drone-detector", "video"]).is_err());

        let mut config = Config::default();
        parse(&["video", "--file", "sky.mp4"]).apply(&mut config);
        assert_eq!(config.source.kind, "file");
        assert_eq!(config.source.file, Some(PathBuf::from("sky.mp4")));
    }

    #[test]
    fn camera_device_selectable() {
        let mut config = Config::default();
        parse(&["camera", "--device", "2"]).apply(&mut config);
        assert_eq!(config.source.kind, "camera");
        assert_eq!(config.source.device, 2);
    }

    #[test]
    fn unknown_level_rejected() {
        assert!(Cli::try_parse_from(["drone-detector", "--level", "LOUD"]).is_err());
    }

    #[test]
    fn negative_values_reach_validation() {
        let cli = parse(&["--contour-area=-5"]);
        assert_eq!(cli.contour_area, Some(-5));
    }
}
