use std::time::Duration;

/// Per-session debounce state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StabilizerState {
    #[default]
    Idle,
    /// `run_length` counts consecutive frames agreeing on `label`, including
    /// the frame that introduced it. Reset to 0 after a commit.
    Tracking { label: String, run_length: u32 },
}

impl StabilizerState {
    pub fn transition(self, raw_label: Option<&str>) -> StabilizerState {
        match (self, raw_label) {
            (_, None) => StabilizerState::Idle,
            (StabilizerState::Tracking { label, run_length }, Some(raw)) if label == raw => {
                StabilizerState::Tracking {
                    label,
                    run_length: run_length.saturating_add(1),
                }
            }
            (_, Some(raw)) => StabilizerState::Tracking {
                label: raw.to_string(),
                run_length: 1,
            },
        }
    }

    pub fn candidate(&self) -> Option<&str> {
        match self {
            StabilizerState::Idle => None,
            StabilizerState::Tracking { label, .. } => Some(label),
        }
    }

    pub fn run_length(&self) -> u32 {
        match self {
            StabilizerState::Idle => 0,
            StabilizerState::Tracking { run_length, .. } => *run_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StabilizerConfig {
    pub stability_threshold: u32,
    /// Minimum time between automatic commits. Forced commits ignore it.
    pub commit_cooldown: Option<Duration>,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 5,
            commit_cooldown: None,
        }
    }
}

impl StabilizerConfig {
    pub fn for_fast_signing() -> Self {
        Self {
            stability_threshold: 3,
            commit_cooldown: None,
        }
    }

    pub fn for_deliberate_signing() -> Self {
        Self {
            stability_threshold: 8,
            commit_cooldown: Some(Duration::from_millis(1000)),
        }
    }
}

pub struct Stabilizer {
    state: StabilizerState,
    config: StabilizerConfig,
    last_commit_time: Option<Duration>,
    frame_counter: u64,
}

impl Stabilizer {
    pub fn new() -> Self {
        Self::with_config(StabilizerConfig::default())
    }

    pub fn with_config(config: StabilizerConfig) -> Self {
        Self {
            state: StabilizerState::Idle,
            config,
            last_commit_time: None,
            frame_counter: 0,
        }
    }

    /// Feeds one frame's label. Returns the word to commit, if any.
    ///
    /// `last_committed` is the newest word already in the sentence; a stable
    /// label equal to it is held back so a held sign is not repeated.
    pub fn observe(
        &mut self,
        raw_label: Option<&str>,
        last_committed: Option<&str>,
        now: Duration,
    ) -> Option<String> {
        self.frame_counter += 1;
        self.state = std::mem::take(&mut self.state).transition(raw_label);

        let cooled_down = match (self.config.commit_cooldown, self.last_commit_time) {
            (Some(cooldown), Some(last)) => now.saturating_sub(last) >= cooldown,
            _ => true,
        };
        let threshold = self.config.stability_threshold;

        match &mut self.state {
            StabilizerState::Tracking { label, run_length }
                if *run_length >= threshold
                    && last_committed != Some(label.as_str())
                    && cooled_down =>
            {
                *run_length = 0;
                self.last_commit_time = Some(now);
                Some(label.clone())
            }
            _ => None,
        }
    }

    /// Commits the current candidate if it is stable, whatever the last word was.
    pub fn force_commit(&mut self, now: Duration) -> Option<String> {
        let threshold = self.config.stability_threshold;
        match &mut self.state {
            StabilizerState::Tracking { label, run_length } if *run_length >= threshold => {
                *run_length = 0;
                self.last_commit_time = Some(now);
                Some(label.clone())
            }
            _ => None,
        }
    }

    pub fn current_state(&self) -> &StabilizerState {
        &self.state
    }

    pub fn candidate(&self) -> Option<&str> {
        self.state.candidate()
    }

    pub fn run_length(&self) -> u32 {
        self.state.run_length()
    }

    pub fn last_commit_time(&self) -> Option<Duration> {
        self.last_commit_time
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn reset(&mut self) {
        self.state = StabilizerState::Idle;
        self.last_commit_time = None;
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new()
    }
}
