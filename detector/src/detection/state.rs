use std::fmt;
use std::time::Duration;

use drone_detector_capture::FrameSource;
use drone_detector_common::config::DetectionConfig;
use drone_detector_common::frame::{BoundingBox, ColorFrame};
use tracing::{debug, error, info, trace};

use crate::error::DetectorError;
use crate::pipeline::{annotate, dilate, extract, mirror, prepare, DiffEngine};

use super::cancel::CancelSignal;
use super::display::{FrameSink, Presented};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// A finite source ran out of frames.
    EndOfStream,
    /// Stop requested by the operator (Ctrl+C or closing the window).
    Cancelled,
    /// Acquiring a frame failed mid-run.
    SourceError,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::EndOfStream => f.write_str("end of stream"),
            TerminationReason::Cancelled => f.write_str("cancelled"),
            TerminationReason::SourceError => f.write_str("source error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No sample has been analysed yet; the next one seeds the differ.
    AwaitingSeed,
    Running,
    Terminated(TerminationReason),
}

/// The outcome of one [`DetectionLoop::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Odd frame: mirrored and shown, not analysed.
    Decimated { index: u64 },
    /// First sample: stored as the reference and shown raw.
    Seeded { index: u64 },
    /// Sample compared against the previous one; `boxes` were drawn.
    Analyzed { index: u64, boxes: Vec<BoundingBox> },
    Ended(TerminationReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: TerminationReason,
    pub frames_acquired: u64,
    /// Frames that went through preprocessing, the seed included.
    pub frames_analyzed: u64,
    /// Boxes reported over the whole run.
    pub detections: u64,
}

/// Drives one source through the detection pipeline into one sink.
///
/// Every acquired frame is mirrored and gets an index counted from 0. Even
/// indices are analysed, odd ones are only displayed. After each analysed
/// sample the loop waits up to `wait` for a stop request, which also paces
/// the display.
pub struct DetectionLoop<S, D> {
    source: S,
    display: D,
    config: DetectionConfig,
    differ: DiffEngine,
    cancel: CancelSignal,
    wait: Duration,
    state: LoopState,
    next_index: u64,
    frames_analyzed: u64,
    detections: u64,
}

impl<S, D> DetectionLoop<S, D>
where
    S: FrameSource,
    D: FrameSink,
{
    pub fn new(
        source: S,
        display: D,
        config: DetectionConfig,
        cancel: CancelSignal,
        wait: Duration,
    ) -> Self {
        Self {
            source,
            display,
            config,
            differ: DiffEngine::new(),
            cancel,
            wait,
            state: LoopState::AwaitingSeed,
            next_index: 0,
            frames_analyzed: 0,
            detections: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[cfg(test)]
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Advance by one acquired frame.
    ///
    /// An acquisition failure moves the loop to `Terminated(SourceError)`
    /// and returns the error. Frame and display errors are returned as is;
    /// the caller is expected to stop stepping after any error.
    pub async fn step(&mut self) -> Result<Transition, DetectorError> {
        if let LoopState::Terminated(reason) = self.state {
            return Ok(Transition::Ended(reason));
        }

        if !self.source.has_more() {
            return Ok(self.terminate(TerminationReason::EndOfStream));
        }

        let frame = match self.source.try_acquire().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(self.terminate(TerminationReason::EndOfStream)),
            Err(e) => {
                error!(error = %e, source = self.source.name(), "failed to acquire frame");
                self.terminate(TerminationReason::SourceError);
                return Err(e.into());
            }
        };

        let mut shown = mirror(&frame);
        let index = self.next_index;
        self.next_index += 1;

        if index % 2 == 1 {
            trace!(index, "frame decimated");
            self.show(&shown).await?;
            return Ok(Transition::Decimated { index });
        }

        self.frames_analyzed += 1;
        let transition = match self.differ.diff(prepare(&shown)?)? {
            None => {
                debug!(index, "reference frame stored");
                self.state = LoopState::Running;
                Transition::Seeded { index }
            }
            Some(diff_map) => {
                let boxes = extract(&dilate(&diff_map)?, &self.config)?;
                annotate(&mut shown, &boxes)?;
                self.detections += boxes.len() as u64;
                Transition::Analyzed { index, boxes }
            }
        };

        self.show(&shown).await?;
        if !matches!(self.state, LoopState::Terminated(_)) && self.cancel.wait(self.wait).await {
            info!(index, "stop requested");
            self.terminate(TerminationReason::Cancelled);
        }
        Ok(transition)
    }

    /// Step until the loop terminates, then release the source and the
    /// display. Both are released on the error path too.
    pub async fn run(&mut self) -> Result<RunSummary, DetectorError> {
        info!(source = self.source.name(), "detection loop started");

        let outcome = loop {
            match self.step().await {
                Ok(Transition::Ended(reason)) => break Ok(reason),
                Ok(transition) => trace!(?transition, "step"),
                Err(e) => break Err(e),
            }
        };

        self.source.close().await;
        self.display.close().await;

        let reason = outcome?;
        let summary = self.summary(reason);
        info!(
            %reason,
            frames = summary.frames_acquired,
            analyzed = summary.frames_analyzed,
            detections = summary.detections,
            "detection loop finished"
        );
        Ok(summary)
    }

    pub fn summary(&self, reason: TerminationReason) -> RunSummary {
        RunSummary {
            reason,
            frames_acquired: self.next_index,
            frames_analyzed: self.frames_analyzed,
            detections: self.detections,
        }
    }

    async fn show(&mut self, frame: &ColorFrame) -> Result<(), DetectorError> {
        if self.display.present(frame).await? == Presented::Closed {
            info!("display closed");
            self.terminate(TerminationReason::Cancelled);
        }
        Ok(())
    }

    fn terminate(&mut self, reason: TerminationReason) -> Transition {
        debug!(%reason, "loop terminated");
        self.state = LoopState::Terminated(reason);
        Transition::Ended(reason)
    }
}
