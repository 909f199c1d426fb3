//! 手语识别核心 - 将手部检测框归一化为分类器画布，并把逐帧标签稳定为句子
//!
//! 核心流程：
//! 1. 区域选择 - 单手取第一个检测框，双手取并集，加边距并裁剪到画面内
//! 2. 画布归一化 - 等比缩放后居中贴到固定尺寸白色方形画布
//! 3. 分类适配 - 调用外部分类器，过滤低置信度与越界输出
//! 4. 稳定器 - 连续 N 帧一致才提交单词
//! 5. 句子构建 - 固定长度，先进先出

pub mod canvas;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod manager;
pub mod pipeline;
pub mod region;
pub mod sentence;
pub mod stabilizer;

pub use canvas::{Canvas, CanvasNormalizer, Placement};
pub use classifier::{
    Classification, ClassificationAdapter, Classifier, LabelSet, MockClassifier, ModelBackend,
    Prediction, SerializedClassifier,
};
pub use config::{RecognizerConfig, TwoHandStrategy};
pub use detector::{HandDetector, MockHandDetector};
pub use error::SignError;
pub use frame::{Frame, FrameInfo, RawFrame};
pub use manager::{BatchResult, RecognitionStats, SessionFrame, SessionId, SessionManager};
pub use pipeline::{Command, CommandOutcome, FrameOutcome, FrameRejection, SignSession};
pub use region::{BoundingBox, HandMode, Region, RegionSelector};
pub use sentence::{SentenceBuilder, Transcript};
pub use stabilizer::{Stabilizer, StabilizerConfig, StabilizerState};
