use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use super::canvas::Canvas;
use super::error::SignError;

/// Raw model output: one score per label plus the argmax index.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub scores: Vec<f32>,
    pub index: usize,
}

impl Prediction {
    pub fn from_scores(scores: Vec<f32>) -> Self {
        let index = scores
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &s)| {
                if s > best.1 {
                    (i, s)
                } else {
                    best
                }
            })
            .0;
        Self { scores, index }
    }
}

/// Shared classifier. Must tolerate concurrent calls from independent sessions.
pub trait Classifier: Send + Sync {
    fn predict(&self, canvas: &Canvas) -> Result<Prediction, SignError>;
}

/// A model runtime that can only serve one inference at a time.
pub trait ModelBackend: Send {
    fn name(&self) -> &'static str;

    fn predict(&mut self, canvas: &Canvas) -> Result<Prediction, SignError>;

    /// Optional warm-up hook.
    fn warm_up(&mut self, canvas_size: u32) -> Result<(), SignError> {
        self.predict(&Canvas::blank(canvas_size)).map(|_| ())
    }
}

/// Serializes access to a non-reentrant [`ModelBackend`].
pub struct SerializedClassifier<B: ModelBackend> {
    backend: Mutex<B>,
}

impl<B: ModelBackend> SerializedClassifier<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    pub fn warm_up(&self, canvas_size: u32) -> Result<(), SignError> {
        let mut backend = self.lock()?;
        debug!("Warming up model backend {}", backend.name());
        backend.warm_up(canvas_size)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, B>, SignError> {
        self.backend
            .lock()
            .map_err(|_| SignError::Classifier("model backend lock poisoned".to_string()))
    }
}

impl<B: ModelBackend> Classifier for SerializedClassifier<B> {
    fn predict(&self, canvas: &Canvas) -> Result<Prediction, SignError> {
        self.lock()?.predict(canvas)
    }
}

/// Index-ordered label list, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn load(path: &Path) -> Result<Self, SignError> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SignError::MissingLabelSource {
                path: path.to_path_buf(),
            },
            _ => SignError::Io(e),
        })?;
        Self::parse(&text).ok_or_else(|| SignError::EmptyLabelSource {
            path: path.to_path_buf(),
        })
    }

    /// One label per line; blank lines are skipped. `None` when nothing remains.
    pub fn parse(text: &str) -> Option<Self> {
        let labels: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if labels.is_empty() {
            None
        } else {
            Some(Self { labels })
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// A label that passed the confidence floor.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// Runs the shared classifier and turns its output into a validated label.
#[derive(Clone)]
pub struct ClassificationAdapter {
    classifier: Arc<dyn Classifier>,
    labels: Arc<LabelSet>,
    min_confidence: f32,
}

impl ClassificationAdapter {
    pub fn new(classifier: Arc<dyn Classifier>, labels: Arc<LabelSet>, min_confidence: f32) -> Self {
        Self {
            classifier,
            labels,
            min_confidence,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn classify(&self, canvas: &Canvas) -> Result<Classification, SignError> {
        let prediction = self.classifier.predict(canvas)?;
        self.interpret(&prediction)
    }

    pub fn interpret(&self, prediction: &Prediction) -> Result<Classification, SignError> {
        let invalid = SignError::InvalidModelOutput {
            index: prediction.index,
            label_count: self.labels.len(),
        };
        let (Some(label), Some(&confidence)) = (
            self.labels.get(prediction.index),
            prediction.scores.get(prediction.index),
        ) else {
            warn!(
                "Model index {} out of range ({} labels, {} scores)",
                prediction.index,
                self.labels.len(),
                prediction.scores.len()
            );
            return Err(invalid);
        };

        if !(0.0..=1.0).contains(&confidence) {
            warn!("Model confidence {} outside [0, 1]", confidence);
            return Err(invalid);
        }
        if confidence < self.min_confidence {
            return Err(SignError::LowConfidence {
                confidence,
                floor: self.min_confidence,
            });
        }

        Ok(Classification {
            label: label.to_string(),
            confidence,
        })
    }
}

/// Scripted classifier for tests and offline replay. Returns the queued
/// predictions in order, then repeats the last one.
pub struct MockClassifier {
    script: Mutex<Vec<Prediction>>,
    last: Mutex<Option<Prediction>>,
}

impl MockClassifier {
    pub fn new(mut script: Vec<Prediction>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
            last: Mutex::new(None),
        }
    }

    /// Always predicts `index` with `confidence` out of `label_count` classes.
    pub fn fixed(index: usize, confidence: f32, label_count: usize) -> Self {
        Self::new(vec![one_hot(index, confidence, label_count)])
    }
}

impl Classifier for MockClassifier {
    fn predict(&self, _canvas: &Canvas) -> Result<Prediction, SignError> {
        let next = self
            .script
            .lock()
            .map_err(|_| SignError::Classifier("mock script poisoned".to_string()))?
            .pop();
        let mut last = self
            .last
            .lock()
            .map_err(|_| SignError::Classifier("mock state poisoned".to_string()))?;
        if let Some(prediction) = next {
            *last = Some(prediction);
        }
        (*last)
            .clone()
            .ok_or_else(|| SignError::Classifier("empty mock script".to_string()))
    }
}

pub fn one_hot(index: usize, confidence: f32, label_count: usize) -> Prediction {
    let rest = if label_count > 1 {
        (1.0 - confidence) / (label_count - 1) as f32
    } else {
        0.0
    };
    let scores = (0..label_count.max(index + 1))
        .map(|i| if i == index { confidence } else { rest })
        .collect();
    Prediction { scores, index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels() -> Arc<LabelSet> {
        Arc::new(LabelSet::parse("Hello\nNo\n\nYes\n").unwrap())
    }

    fn adapter(classifier: impl Classifier + 'static) -> ClassificationAdapter {
        ClassificationAdapter::new(Arc::new(classifier), labels(), 0.8)
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let set = LabelSet::parse("  Hello \n\n\nThank you\n   \nYes").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(1), Some("Thank you"));
        assert_eq!(set.get(3), None);
        assert!(LabelSet::parse("\n \n").is_none());
    }

    #[test]
    fn test_load_label_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Hello").unwrap();
        writeln!(file, "I love you").unwrap();
        let set = LabelSet::load(file.path()).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["Hello", "I love you"]);
    }

    #[test]
    fn test_missing_and_empty_label_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("labels.txt");
        assert!(matches!(
            LabelSet::load(&missing),
            Err(SignError::MissingLabelSource { .. })
        ));

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "\n\n").unwrap();
        assert!(matches!(
            LabelSet::load(&empty),
            Err(SignError::EmptyLabelSource { .. })
        ));
    }

    #[test]
    fn test_prediction_argmax() {
        let p = Prediction::from_scores(vec![0.1, 0.7, 0.2]);
        assert_eq!(p.index, 1);
    }

    #[test]
    fn test_classify_maps_label() {
        let result = adapter(MockClassifier::fixed(2, 0.93, 3))
            .classify(&Canvas::blank(4))
            .unwrap();
        assert_eq!(result.label, "Yes");
        assert!((result.confidence - 0.93).abs() < 1e-6);
    }

    #[test]
    fn test_low_confidence_rejected() {
        let result = adapter(MockClassifier::fixed(0, 0.5, 3)).classify(&Canvas::blank(4));
        assert!(matches!(result, Err(SignError::LowConfidence { .. })));
    }

    #[test]
    fn test_index_out_of_range() {
        let result = adapter(MockClassifier::fixed(7, 0.99, 8)).classify(&Canvas::blank(4));
        assert!(matches!(
            result,
            Err(SignError::InvalidModelOutput {
                index: 7,
                label_count: 3
            })
        ));
    }

    #[test]
    fn test_mock_script_repeats_last() {
        let mock = MockClassifier::new(vec![one_hot(0, 0.9, 3), one_hot(1, 0.9, 3)]);
        let canvas = Canvas::blank(2);
        assert_eq!(mock.predict(&canvas).unwrap().index, 0);
        assert_eq!(mock.predict(&canvas).unwrap().index, 1);
        assert_eq!(mock.predict(&canvas).unwrap().index, 1);
    }

    struct CountingBackend {
        calls: usize,
    }

    impl ModelBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn predict(&mut self, _canvas: &Canvas) -> Result<Prediction, SignError> {
            self.calls += 1;
            Ok(one_hot(self.calls % 3, 0.9, 3))
        }
    }

    #[test]
    fn test_serialized_classifier_shared_across_threads() {
        let classifier = Arc::new(SerializedClassifier::new(CountingBackend { calls: 0 }));
        classifier.warm_up(8).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let classifier = Arc::clone(&classifier);
                std::thread::spawn(move || {
                    let canvas = Canvas::blank(8);
                    for _ in 0..10 {
                        classifier.predict(&canvas).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(classifier.lock().unwrap().calls, 41);
    }
}
