use std::path::{Path, PathBuf};

use drone_detector_common::frame::ColorFrame;
use tracing::{debug, info};

use crate::ffmpeg::{probe_dimensions, RawVideoReader};
use crate::{CaptureError, FrameSource};

/// A recorded video file, read front to back exactly once.
///
/// `has_more` stays true while the decoder is open and turns false as soon
/// as the file is exhausted or decoding fails.
pub struct FileSource {
    path: PathBuf,
    reader: Option<RawVideoReader>,
    pending: Option<ColorFrame>,
    frames: u64,
}

impl FileSource {
    pub async fn open(path: &Path) -> Result<Self, CaptureError> {
        info!(file = %path.display(), "Use video");

        if !path.is_file() {
            return Err(CaptureError::SourceUnavailable(format!(
                "video file {} does not exist",
                path.display()
            )));
        }

        let (width, height) = probe_dimensions(path).await?;
        let args = file_input_args(path);
        let reader = RawVideoReader::spawn(&args, width, height, false)?;
        let source = Self::start(path, reader).await?;
        if source.has_more() {
            info!(file = %path.display(), width, height, "video opened");
        }
        Ok(source)
    }

    /// A file source over frames that are already being decoded, for
    /// driving the loop from memory.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn from_reader(path: &Path, reader: RawVideoReader) -> Result<Self, CaptureError> {
        Self::start(path, reader).await
    }

    /// Prefetch the first frame. A video without frames is exhausted
    /// straight away rather than an error.
    async fn start(path: &Path, mut reader: RawVideoReader) -> Result<Self, CaptureError> {
        let pending = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                reader.close().await;
                return Err(CaptureError::SourceUnavailable(format!(
                    "failed to decode {}: {e}",
                    path.display()
                )));
            }
        };

        let mut source = Self {
            path: path.to_path_buf(),
            reader: Some(reader),
            pending,
            frames: 0,
        };
        if source.pending.is_none() {
            debug!(file = %path.display(), "video holds no frames");
            source.close().await;
        }
        Ok(source)
    }
}

impl FrameSource for FileSource {
    fn has_more(&self) -> bool {
        self.pending.is_some() || self.reader.is_some()
    }

    async fn try_acquire(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
        if let Some(frame) = self.pending.take() {
            self.frames += 1;
            return Ok(Some(frame));
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        match reader.read_frame().await {
            Ok(Some(frame)) => {
                self.frames += 1;
                Ok(Some(frame))
            }
            Ok(None) => {
                info!(file = %self.path.display(), frames = self.frames, "end of video");
                self.close().await;
                Ok(None)
            }
            Err(e) => {
                self.close().await;
                Err(e)
            }
        }
    }

    async fn close(&mut self) {
        self.pending = None;
        if let Some(reader) = self.reader.take() {
            reader.close().await;
            debug!(file = %self.path.display(), "video released");
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// ffmpeg input arguments for a video file. Rotation metadata is ignored
/// so decoded frames keep the stored size reported by ffprobe.
pub fn file_input_args(path: &Path) -> Vec<String> {
    vec![
        "-noautorotate".to_string(),
        "-i".to_string(),
        path.display().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use drone_detector_common::frame::rgb24_len;

    use super::*;

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let path = std::env::temp_dir().join("drone-detector-no-such-clip.mp4");
        let err = FileSource::open(&path).await.err().unwrap();
        assert!(matches!(err, CaptureError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn directory_is_unavailable() {
        let err = FileSource::open(&std::env::temp_dir()).await.err().unwrap();
        assert!(matches!(err, CaptureError::SourceUnavailable(_)));
    }

    #[test]
    fn input_args_point_at_file() {
        let args = file_input_args(Path::new("clips/sky.mp4"));
        assert_eq!(args, vec!["-noautorotate", "-i", "clips/sky.mp4"]);
    }

    #[test]
    fn rotation_is_disabled_before_the_input() {
        let args = file_input_args(Path::new("phone.mov"));
        let rotate = args.iter().position(|a| a == "-noautorotate").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(rotate < input);
    }

    fn raw_frames(count: usize, width: u32, height: u32) -> RawVideoReader {
        let data: Vec<u8> = (0..count * rgb24_len(width, height))
            .map(|v| v as u8)
            .collect();
        RawVideoReader::from_reader(Cursor::new(data), width, height)
    }

    #[tokio::test]
    async fn has_more_turns_false_once_exhausted() {
        let mut source = FileSource::from_reader(Path::new("two.raw"), raw_frames(2, 2, 2))
            .await
            .unwrap();

        assert!(source.has_more());
        assert!(source.try_acquire().await.unwrap().is_some());
        assert!(source.has_more());
        assert!(source.try_acquire().await.unwrap().is_some());
        assert!(source.has_more());
        assert!(source.try_acquire().await.unwrap().is_none());
        assert!(!source.has_more());
        assert_eq!(source.frames, 2);
    }

    #[tokio::test]
    async fn empty_video_is_exhausted_at_open() {
        let source = FileSource::from_reader(Path::new("empty.raw"), raw_frames(0, 2, 2))
            .await
            .unwrap();
        assert!(!source.has_more());
    }

    #[tokio::test]
    async fn truncated_video_fails_and_closes() {
        let mut data = vec![0u8; rgb24_len(2, 2)];
        data.extend_from_slice(&[1, 2, 3]);
        let reader = RawVideoReader::from_reader(Cursor::new(data), 2, 2);
        let mut source = FileSource::from_reader(Path::new("cut.raw"), reader)
            .await
            .unwrap();

        assert!(source.try_acquire().await.unwrap().is_some());
        let err = source.try_acquire().await.unwrap_err();
        assert!(matches!(err, CaptureError::TruncatedFrame { got: 3, expected: 12 }));
        assert!(!source.has_more());
    }
}
