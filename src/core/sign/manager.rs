//! 多会话管理器 - 共享分类器，不同会话并行处理，同一会话内按帧顺序处理

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;

use super::classifier::{ClassificationAdapter, Classifier, LabelSet};
use super::config::RecognizerConfig;
use super::error::SignError;
use super::frame::Frame;
use super::pipeline::{Command, CommandOutcome, FrameOutcome, SignSession};
use super::region::BoundingBox;
use super::sentence::Transcript;

pub type SessionId = u64;

/// One frame for one session, with the detector's boxes already attached.
#[derive(Debug, Clone)]
pub struct SessionFrame {
    pub session_id: SessionId,
    pub frame: Frame,
    pub hands: Vec<BoundingBox>,
}

#[derive(Debug)]
pub struct BatchResult {
    pub session_id: SessionId,
    pub frame_number: u64,
    pub outcome: Result<FrameOutcome, SignError>,
}

/// 处理统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecognitionStats {
    pub processed_frames: u64,
    pub committed_words: u64,
    pub active_sessions: usize,
}

type SharedSession = Arc<Mutex<SignSession>>;

pub struct SessionManager {
    config: RecognizerConfig,
    adapter: ClassificationAdapter,
    sessions: Mutex<HashMap<SessionId, SharedSession>>,
    next_id: AtomicU64,
    frame_count: Arc<Mutex<u64>>,
    committed_count: Arc<Mutex<u64>>,
    pool: ThreadPool,
}

impl SessionManager {
    pub fn new(
        config: RecognizerConfig,
        classifier: Arc<dyn Classifier>,
        labels: Arc<LabelSet>,
    ) -> Result<Self, SignError> {
        config.validate()?;
        let num_threads = num_cpus::get().min(4);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("sign-session-{}", i))
            .build()?;
        debug!(
            "SessionManager: {} labels, {} worker threads",
            labels.len(),
            num_threads
        );

        let adapter = ClassificationAdapter::new(classifier, labels, config.min_confidence);
        Ok(Self {
            config,
            adapter,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            frame_count: Arc::new(Mutex::new(0)),
            committed_count: Arc::new(Mutex::new(0)),
            pool,
        })
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelSet {
        self.adapter.labels()
    }

    pub fn open_session(&self) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = SignSession::new(&self.config, self.adapter.clone());
        self.sessions_map()
            .insert(id, Arc::new(Mutex::new(session)));
        info!("Session {} opened", id);
        id
    }

    pub fn close_session(&self, id: SessionId) -> bool {
        let removed = self.sessions_map().remove(&id).is_some();
        if removed {
            info!("Session {} closed", id);
        }
        removed
    }

    // The map holds only Arcs, so it stays consistent even if a holder panicked.
    fn sessions_map(&self) -> MutexGuard<'_, HashMap<SessionId, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self, id: SessionId) -> Result<SharedSession, SignError> {
        self.sessions_map()
            .get(&id)
            .cloned()
            .ok_or(SignError::UnknownSession(id))
    }

    /// Applies a command between two frames of the session. `Quit` also closes it.
    pub fn command(&self, id: SessionId, command: Command) -> Result<CommandOutcome, SignError> {
        let session = self.session(id)?;
        let outcome = session
            .lock()
            .map_err(|_| SignError::SessionPoisoned(id))?
            .apply(command);

        match &outcome {
            CommandOutcome::Committed(_) => {
                if let Ok(mut committed) = self.committed_count.lock() {
                    *committed += 1;
                }
            }
            CommandOutcome::Quit => {
                self.close_session(id);
            }
            _ => {}
        }
        Ok(outcome)
    }

    pub fn transcript(&self, id: SessionId) -> Result<Transcript, SignError> {
        let session = self.session(id)?;
        let transcript = session
            .lock()
            .map_err(|_| SignError::SessionPoisoned(id))?
            .transcript();
        Ok(transcript)
    }

    /// 批量处理 - 不同会话并行，同一会话内严格按提交顺序
    ///
    /// Results come back in the order the frames were submitted.
    pub fn process_batch(&self, frames: Vec<SessionFrame>) -> Vec<BatchResult> {
        let batch_len = frames.len();

        let mut order: Vec<SessionId> = Vec::new();
        let mut groups: HashMap<SessionId, Vec<(usize, SessionFrame)>> = HashMap::new();
        for (index, frame) in frames.into_iter().enumerate() {
            let entry = groups.entry(frame.session_id).or_insert_with(|| {
                order.push(frame.session_id);
                Vec::new()
            });
            entry.push((index, frame));
        }
        let grouped: Vec<(SessionId, Vec<(usize, SessionFrame)>)> = order
            .into_iter()
            .filter_map(|id| groups.remove(&id).map(|items| (id, items)))
            .collect();

        let mut results: Vec<(usize, BatchResult)> = self.pool.install(|| {
            grouped
                .into_par_iter()
                .flat_map_iter(|(id, items)| self.run_session_frames(id, items))
                .collect()
        });
        results.sort_by_key(|(index, _)| *index);

        let processed = results.iter().filter(|(_, r)| r.outcome.is_ok()).count() as u64;
        let committed = results
            .iter()
            .filter(|(_, r)| matches!(&r.outcome, Ok(o) if o.committed.is_some()))
            .count() as u64;
        if let Ok(mut count) = self.frame_count.lock() {
            *count += processed;
        }
        if let Ok(mut count) = self.committed_count.lock() {
            *count += committed;
        }
        debug!(
            "Batch of {} frames: {} processed, {} commits",
            batch_len, processed, committed
        );

        results.into_iter().map(|(_, r)| r).collect()
    }

    fn run_session_frames(
        &self,
        id: SessionId,
        items: Vec<(usize, SessionFrame)>,
    ) -> Vec<(usize, BatchResult)> {
        let session = match self.session(id) {
            Ok(session) => session,
            Err(_) => return reject_all(id, items, || SignError::UnknownSession(id)),
        };
        let mut session = match session.lock() {
            Ok(guard) => guard,
            Err(_) => return reject_all(id, items, || SignError::SessionPoisoned(id)),
        };

        items
            .into_iter()
            .map(|(index, item)| {
                let outcome = session.process_detections(&item.frame, &item.hands);
                (
                    index,
                    BatchResult {
                        session_id: id,
                        frame_number: item.frame.frame_number,
                        outcome: Ok(outcome),
                    },
                )
            })
            .collect()
    }

    pub fn get_stats(&self) -> RecognitionStats {
        let processed_frames = self.frame_count.lock().map(|c| *c).unwrap_or(0);
        let committed_words = self.committed_count.lock().map(|c| *c).unwrap_or(0);
        let active_sessions = self.sessions_map().len();
        RecognitionStats {
            processed_frames,
            committed_words,
            active_sessions,
        }
    }

    pub fn reset_stats(&self) {
        if let Ok(mut count) = self.frame_count.lock() {
            *count = 0;
        }
        if let Ok(mut committed) = self.committed_count.lock() {
            *committed = 0;
        }
    }
}

fn reject_all(
    id: SessionId,
    items: Vec<(usize, SessionFrame)>,
    make_err: impl Fn() -> SignError,
) -> Vec<(usize, BatchResult)> {
    items
        .into_iter()
        .map(|(index, item)| {
            (
                index,
                BatchResult {
                    session_id: id,
                    frame_number: item.frame.frame_number,
                    outcome: Err(make_err()),
                },
            )
        })
        .collect()
}
