use std::collections::VecDeque;

use serde::Serialize;

/// Bounded FIFO of committed words.
#[derive(Debug, Clone)]
pub struct SentenceBuilder {
    words: VecDeque<String>,
    max_len: usize,
}

impl SentenceBuilder {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            words: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    /// Appends `word`, evicting the oldest word first when full.
    pub fn commit(&mut self, word: impl Into<String>) {
        while self.words.len() >= self.max_len {
            self.words.pop_front();
        }
        self.words.push_back(word.into());
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn last(&self) -> Option<&str> {
        self.words.back().map(String::as_str)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Joined sentence, or the uncommitted `candidate` in parentheses while
    /// nothing has been committed yet.
    pub fn render(&self, candidate: Option<&str>) -> Transcript {
        let words: Vec<String> = self.words.iter().cloned().collect();
        let tentative = if words.is_empty() {
            candidate.map(str::to_string)
        } else {
            None
        };
        let text = match &tentative {
            Some(candidate) => format!("({})", candidate),
            None => words.join(" "),
        };
        Transcript {
            words,
            tentative,
            text,
        }
    }
}

/// Rendered output for one session after a frame or command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Transcript {
    pub words: Vec<String>,
    pub tentative: Option<String>,
    pub text: String,
}

impl Transcript {
    pub fn is_tentative(&self) -> bool {
        self.tentative.is_some()
    }
}
