use std::time::Duration;

use log::{debug, info, warn};

use super::canvas::CanvasNormalizer;
use super::classifier::{Classification, ClassificationAdapter};
use super::config::{RecognizerConfig, TwoHandStrategy};
use super::detector::HandDetector;
use super::error::SignError;
use super::frame::{Frame, FrameInfo, RawFrame};
use super::region::{BoundingBox, HandMode, Region, RegionSelector};
use super::sentence::{SentenceBuilder, Transcript};
use super::stabilizer::Stabilizer;

/// Discrete user commands, applied between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SwitchMode,
    Clear,
    ForceCommit,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    ModeChanged(HandMode),
    Cleared,
    Committed(String),
    NothingToCommit,
    Quit,
}

/// Why a frame produced no label. The stabilizer sees all of these as "no hand".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRejection {
    NoHands,
    NotEnoughHands,
    EmptyRegion,
    LowConfidence,
    InvalidModelOutput,
    InvalidFrame,
    ClassifierFailed,
}

impl From<&SignError> for FrameRejection {
    fn from(err: &SignError) -> Self {
        match err {
            SignError::EmptyRegion => FrameRejection::EmptyRegion,
            SignError::LowConfidence { .. } => FrameRejection::LowConfidence,
            SignError::InvalidModelOutput { .. } => FrameRejection::InvalidModelOutput,
            SignError::InvalidFrame { .. } => FrameRejection::InvalidFrame,
            _ => FrameRejection::ClassifierFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame_info: FrameInfo,
    pub mode: HandMode,
    pub classification: Option<Classification>,
    pub rejection: Option<FrameRejection>,
    pub committed: Option<String>,
    pub transcript: Transcript,
}

/// One signer's state. Frames must be fed in arrival order; nothing here is
/// shared with other sessions except the classifier.
pub struct SignSession {
    selector: RegionSelector,
    normalizer: CanvasNormalizer,
    adapter: ClassificationAdapter,
    stabilizer: Stabilizer,
    sentence: SentenceBuilder,
    mode: HandMode,
    two_hand_strategy: TwoHandStrategy,
    last_frame_time: Duration,
    frame_counter: u64,
}

impl SignSession {
    pub fn new(config: &RecognizerConfig, adapter: ClassificationAdapter) -> Self {
        Self {
            selector: RegionSelector::new(config.padding),
            normalizer: CanvasNormalizer::new(config.canvas_size),
            adapter,
            stabilizer: Stabilizer::with_config(config.stabilizer_config()),
            sentence: SentenceBuilder::new(config.max_sentence_len),
            mode: config.initial_mode,
            two_hand_strategy: config.two_hand_strategy,
            last_frame_time: Duration::ZERO,
            frame_counter: 0,
        }
    }

    pub fn process_frame(&mut self, frame: &Frame, detector: &dyn HandDetector) -> FrameOutcome {
        let hands = detector.detect(frame);
        self.process_detections(frame, &hands)
    }

    pub fn process_raw_frame(
        &mut self,
        raw_frame: &RawFrame,
        detector: &dyn HandDetector,
    ) -> FrameOutcome {
        match raw_frame.to_rgba() {
            Ok(frame) => self.process_frame(&frame, detector),
            Err(e) => {
                warn!("Frame {} dropped: {}", raw_frame.frame_number, e);
                let info = FrameInfo {
                    width: raw_frame.width,
                    height: raw_frame.height,
                    timestamp_ms: raw_frame.timestamp_ms,
                    frame_number: raw_frame.frame_number,
                };
                self.advance(info, Err(FrameRejection::InvalidFrame))
            }
        }
    }

    /// Runs one frame whose hands were already detected upstream.
    pub fn process_detections(&mut self, frame: &Frame, hands: &[BoundingBox]) -> FrameOutcome {
        let result = self.recognize(frame, hands);
        self.advance(frame.info(), result)
    }

    fn advance(
        &mut self,
        frame_info: FrameInfo,
        result: Result<Classification, FrameRejection>,
    ) -> FrameOutcome {
        self.frame_counter += 1;
        self.last_frame_time = Duration::from_millis(frame_info.timestamp_ms);

        let (classification, rejection) = match result {
            Ok(classification) => (Some(classification), None),
            Err(rejection) => {
                debug!("Frame {}: {:?}", frame_info.frame_number, rejection);
                (None, Some(rejection))
            }
        };

        let raw_label = classification.as_ref().map(|c| c.label.as_str());
        let committed = self
            .stabilizer
            .observe(raw_label, self.sentence.last(), self.last_frame_time);
        if let Some(word) = &committed {
            info!("Committed '{}' at frame {}", word, frame_info.frame_number);
            self.sentence.commit(word.as_str());
        }

        FrameOutcome {
            frame_info,
            mode: self.mode,
            classification,
            rejection,
            committed,
            transcript: self.transcript(),
        }
    }

    fn recognize(&self, frame: &Frame, hands: &[BoundingBox]) -> Result<Classification, FrameRejection> {
        if hands.is_empty() {
            return Err(FrameRejection::NoHands);
        }
        if hands.len() < self.mode.required_hands() {
            return Err(FrameRejection::NotEnoughHands);
        }

        match (self.mode, self.two_hand_strategy) {
            (HandMode::Double, TwoHandStrategy::MostConfident) => {
                self.most_confident(frame, &hands[..2])
            }
            _ => {
                let region = self
                    .selector
                    .select(hands, self.mode, frame.width, frame.height)
                    .ok_or(FrameRejection::EmptyRegion)?;
                self.classify_region(frame, &region)
            }
        }
    }

    fn classify_region(&self, frame: &Frame, region: &Region) -> Result<Classification, FrameRejection> {
        self.normalizer
            .normalize(frame, region)
            .and_then(|canvas| self.adapter.classify(&canvas))
            .map_err(|e| FrameRejection::from(&e))
    }

    fn most_confident(&self, frame: &Frame, hands: &[BoundingBox]) -> Result<Classification, FrameRejection> {
        let mut best: Option<Classification> = None;
        let mut first_rejection = None;

        for hand in hands {
            let result = self
                .selector
                .pad_and_clamp(hand, frame.width, frame.height)
                .ok_or(FrameRejection::EmptyRegion)
                .and_then(|region| self.classify_region(frame, &region));
            match result {
                Ok(candidate) => {
                    // Strictly greater, so ties keep the earlier hand.
                    if best
                        .as_ref()
                        .map_or(true, |b| candidate.confidence > b.confidence)
                    {
                        best = Some(candidate);
                    }
                }
                Err(rejection) => {
                    first_rejection.get_or_insert(rejection);
                }
            }
        }

        best.ok_or(first_rejection.unwrap_or(FrameRejection::EmptyRegion))
    }

    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::SwitchMode => {
                self.mode = self.mode.toggled();
                info!("Mode switched to {:?}", self.mode);
                CommandOutcome::ModeChanged(self.mode)
            }
            Command::Clear => {
                self.clear();
                info!("Sentence cleared");
                CommandOutcome::Cleared
            }
            Command::ForceCommit => match self.stabilizer.force_commit(self.last_frame_time) {
                Some(word) => {
                    info!("Word '{}' saved", word);
                    self.sentence.commit(word.as_str());
                    CommandOutcome::Committed(word)
                }
                None => {
                    debug!("No stable prediction to save");
                    CommandOutcome::NothingToCommit
                }
            },
            Command::Quit => CommandOutcome::Quit,
        }
    }

    pub fn clear(&mut self) {
        self.sentence.clear();
        self.stabilizer.reset();
    }

    pub fn transcript(&self) -> Transcript {
        self.sentence.render(self.stabilizer.candidate())
    }

    pub fn mode(&self) -> HandMode {
        self.mode
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    pub fn sentence(&self) -> &SentenceBuilder {
        &self.sentence
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }
}
