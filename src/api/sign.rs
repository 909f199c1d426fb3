//! 手语翻译器

use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::core::sign::{
    BatchResult, Classifier, Command, CommandOutcome, LabelSet, RecognitionStats,
    RecognizerConfig, SessionFrame, SessionId, SessionManager, SignError, Transcript,
};

/// 手语翻译器 - 多会话，共享分类器
///
/// ```ignore
/// let translator = SignTranslator::create(config, classifier)?;
/// let session = translator.open_session();
/// let results = translator.process_batch(frames);
/// let text = translator.transcript(session)?.text;
/// ```
pub struct SignTranslator {
    manager: SessionManager,
}

impl SignTranslator {
    /// Loads the label list named by `config.labels_path`. Any config or
    /// label problem is returned here and the translator is not created.
    pub fn create(
        config: RecognizerConfig,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, SignError> {
        let path = config
            .labels_path
            .clone()
            .ok_or_else(|| SignError::InvalidConfig("labels_path is not set".to_string()))?;
        let labels = LabelSet::load(&path)?;
        Self::with_labels(config, classifier, labels)
    }

    pub fn from_config_file(
        path: &Path,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, SignError> {
        Self::create(RecognizerConfig::from_json_file(path)?, classifier)
    }

    pub fn with_labels(
        config: RecognizerConfig,
        classifier: Arc<dyn Classifier>,
        labels: LabelSet,
    ) -> Result<Self, SignError> {
        let label_count = labels.len();
        let manager = SessionManager::new(config, classifier, Arc::new(labels))?;
        info!("🤟 SignTranslator: created with {} labels", label_count);
        Ok(Self { manager })
    }

    pub fn open_session(&self) -> SessionId {
        self.manager.open_session()
    }

    pub fn close_session(&self, session: SessionId) -> bool {
        self.manager.close_session(session)
    }

    /// 批量处理帧（不同会话并行）
    pub fn process_batch(&self, frames: Vec<SessionFrame>) -> Vec<BatchResult> {
        self.manager.process_batch(frames)
    }

    pub fn command(
        &self,
        session: SessionId,
        command: Command,
    ) -> Result<CommandOutcome, SignError> {
        self.manager.command(session, command)
    }

    pub fn transcript(&self, session: SessionId) -> Result<Transcript, SignError> {
        self.manager.transcript(session)
    }

    /// Transcript as JSON, for hosts that only pass strings across the boundary.
    pub fn transcript_json(&self, session: SessionId) -> Result<String, SignError> {
        Ok(serde_json::to_string(&self.transcript(session)?)?)
    }

    /// 获取统计
    pub fn stats(&self) -> RecognitionStats {
        self.manager.get_stats()
    }

    pub fn labels(&self) -> Vec<String> {
        self.manager.labels().iter().map(str::to_string).collect()
    }
}

impl Drop for SignTranslator {
    fn drop(&mut self) {
        info!("🗑️ SignTranslator: released");
    }
}
