//! Test fixtures for pipeline integration tests
//!
//! Deterministic classifiers standing in for the local model and the remote
//! service.

use async_trait::async_trait;
use finmention::classify::{ClassificationError, ClassifyResult, SentimentClassifier};
use finmention::models::{ClassificationResult, Mention, Sentiment};
use std::collections::HashSet;
use std::sync::Mutex;

/// Positive when the context talks about growth, Negative for declines,
/// Neutral otherwise
pub struct KeywordClassifier {
    calls: Mutex<Vec<String>>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Entities classified so far, in call order
    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SentimentClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, mention: &Mention) -> ClassifyResult<ClassificationResult> {
        self.calls.lock().unwrap().push(mention.entity.clone());

        let context = mention.context().to_lowercase();
        let sentiment = if context.contains("grew") || context.contains("strong") {
            Sentiment::Positive
        } else if context.contains("declined") || context.contains("weak") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        };

        Ok(ClassificationResult::sentiment(sentiment).with_confidence(0.9))
    }
}

/// Fails for a fixed set of entities, Neutral for the rest
pub struct FailingClassifier {
    failing: HashSet<String>,
}

impl FailingClassifier {
    pub fn failing_on(entities: &[&str]) -> Self {
        Self {
            failing: entities.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    async fn classify(&self, mention: &Mention) -> ClassifyResult<ClassificationResult> {
        if self.failing.contains(&mention.entity) {
            return Err(ClassificationError::Service {
                status: 503,
                body: "model overloaded".to_string(),
            });
        }
        Ok(ClassificationResult::sentiment(Sentiment::Neutral))
    }
}
