mod cli;
mod detection;
mod error;
mod logging;
mod pipeline;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use drone_detector_capture::ffmpeg::check_tools_available;
use drone_detector_capture::{open_source, CaptureOptions, InputDescriptor};
use drone_detector_common::config::Config;
use tracing::{error, info, warn};

use cli::Cli;
use detection::{
    cancel, DetectionLoop, FfplayDisplay, NullDisplay, RunSummary, TerminationReason,
};
use error::DetectorError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    cli.apply(&mut config);

    let (level, known) = logging::init(&config.logging.level);
    if !known {
        warn!(
            configured = config.logging.level,
            "unknown log level, falling back to INFO"
        );
    }

    info!(
        log_level = %level,
        source = config.source.kind,
        display = config.display.enabled,
        "starting drone detector"
    );

    match run(config).await {
        Ok(summary) => exit_code(summary.reason),
        Err(e) => {
            error!(error = %e, "drone detector failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<RunSummary, DetectorError> {
    let detection = config.detection.validate()?;
    let input = InputDescriptor::try_from(&config.source)?;

    info!("Press Esc to exit");
    info!(
        threshold = detection.diff_threshold(),
        "Threshold applied to the difference of two images: {}",
        detection.diff_threshold()
    );
    info!(
        contour_area = detection.contour_area_threshold(),
        "Filter contours with an area lower than {}",
        detection.contour_area_threshold()
    );

    check_tools_available().await;
    info!(%input, "opening source");
    let source = open_source(&input, &CaptureOptions::from(&config.source)).await?;

    let (handle, signal) = cancel::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            error!("You pressed Ctrl+C");
            handle.cancel();
        }
    });

    let wait = Duration::from_millis(config.display.wait_ms);
    if config.display.enabled {
        let display = FfplayDisplay::new(config.display.title.as_str());
        let mut detector = DetectionLoop::new(source, display, detection, signal, wait);
        detector.run().await
    } else {
        info!("running headless");
        let mut detector = DetectionLoop::new(source, NullDisplay::new(), detection, signal, wait);
        detector.run().await
    }
}

fn exit_code(reason: TerminationReason) -> ExitCode {
    ExitCode::from(exit_status(reason))
}

/// 0 for a finished stream, 2 for an operator stop, 1 for a failed source.
fn exit_status(reason: TerminationReason) -> u8 {
    match reason {
        TerminationReason::EndOfStream => 0,
        TerminationReason::SourceError => 1,
        TerminationReason::Cancelled => 2,
    }
}

#[cfg(test)]
mod tests {
    use drone_detector_capture::CaptureError;

    use super::*;

    #[test]
    fn exit_statuses() {
        assert_eq!(exit_status(TerminationReason::EndOfStream), 0);
        assert_eq!(exit_status(TerminationReason::SourceError), 1);
        assert_eq!(exit_status(TerminationReason::Cancelled), 2);
    }

    #[tokio::test]
    async fn invalid_thresholds_fail_before_opening_a_source() {
        let mut config = Config::default();
        config.detection.contour_area = 0;
        // a file that does not exist would be SourceUnavailable if reached
        config.source.kind = "file".into();
        config.source.file = Some(std::env::temp_dir().join("drone-detector-never-opened.mp4"));
        let err = run(config).await.unwrap_err();
        assert!(matches!(err, DetectorError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_source_kind_is_unsupported() {
        let mut config = Config::default();
        config.source.kind = "rtsp".into();
        let err = run(config).await.unwrap_err();
        assert!(matches!(
            err,
            DetectorError::Capture(CaptureError::UnsupportedInputType(_))
        ));
    }
}
