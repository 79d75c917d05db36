//! Local sentiment classification using Candle
//!
//! Runs a BERT sequence classifier (FinBERT by default) on the context of
//! each mention:
//! - Weights and tokenizer downloaded from HuggingFace Hub or loaded from disk
//! - Repositories without `tokenizer.json` get a BERT WordPiece tokenizer
//!   built from `vocab.txt`
//! - Input truncated to the model's maximum sequence length
//! - Pooled `[CLS]` output -> linear head -> softmax -> `id2label`
//!
//! The forward pass is deterministic and runs on the blocking thread pool;
//! the model is shared read-only between concurrent callers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::decoders::wordpiece::WordPiece as WordPieceDecoder;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::Tokenizer;

use super::{ClassificationError, ClassifyResult, SentimentClassifier};
use crate::models::{ClassificationResult, Mention, Sentiment};

/// Local model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelConfig {
    /// HuggingFace model ID
    pub model_id: String,

    /// Maximum sequence length in tokens (capped by the model's own limit)
    pub max_seq_length: usize,

    /// Use GPU if available
    pub use_gpu: bool,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_id: "ProsusAI/finbert".to_string(),
            max_seq_length: 512,
            use_gpu: false,
        }
    }
}

impl LocalModelConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_id: std::env::var("FINMENTION_LOCAL_MODEL").unwrap_or(defaults.model_id),
            max_seq_length: std::env::var("FINMENTION_LOCAL_MAX_SEQ")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_seq_length),
            use_gpu: std::env::var("FINMENTION_USE_GPU")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.use_gpu),
        }
    }
}

/// Classification head settings read from the model's `config.json`
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,

    #[serde(default = "default_max_position_embeddings")]
    max_position_embeddings: usize,

    id2label: HashMap<String, String>,
}

fn default_max_position_embeddings() -> usize {
    512
}

/// Casing setting read from `tokenizer_config.json`
#[derive(Debug, Deserialize)]
struct TokenizerSettings {
    #[serde(default = "default_do_lower_case")]
    do_lower_case: bool,
}

fn default_do_lower_case() -> bool {
    true
}

/// Where a model's tokenizer comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerSource {
    /// Serialized `tokenizer.json`
    Json(PathBuf),

    /// BERT WordPiece vocabulary (`vocab.txt`)
    WordPiece { vocab: PathBuf, lowercase: bool },
}

impl TokenizerSource {
    fn load(&self) -> Result<Tokenizer> {
        match self {
            Self::Json(path) => Tokenizer::from_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {e}")),
            Self::WordPiece { vocab, lowercase } => wordpiece_tokenizer(vocab, *lowercase),
        }
    }
}

/// Build the standard BERT tokenizer pipeline around a WordPiece vocabulary
fn wordpiece_tokenizer(vocab: &Path, lowercase: bool) -> Result<Tokenizer> {
    let vocab_path = vocab
        .to_str()
        .context("Vocabulary path is not valid UTF-8")?;
    let model = WordPiece::from_file(vocab_path)
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to load WordPiece vocabulary: {e}"))?;

    let mut tokenizer = Tokenizer::new(model);
    tokenizer
        .with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_decoder(Some(WordPieceDecoder::default()));

    let special = |token: &str| {
        tokenizer
            .token_to_id(token)
            .map(|id| (token.to_string(), id))
            .with_context(|| format!("Vocabulary has no {token} token"))
    };
    let sep = special("[SEP]")?;
    let cls = special("[CLS]")?;

    tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));
    Ok(tokenizer)
}

fn read_do_lower_case(path: &Path) -> Result<bool> {
    let raw = std::fs::read_to_string(path).context("Failed to read tokenizer config")?;
    let settings: TokenizerSettings =
        serde_json::from_str(&raw).context("Failed to parse tokenizer config")?;
    Ok(settings.do_lower_case)
}

/// Loaded model, tokenizer and label table
struct FinBertModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    labels: Vec<Sentiment>,
    max_seq_length: usize,
    sep_token_id: Option<u32>,
}

impl FinBertModel {
    /// Forward pass for one text; returns the winning label and its probability
    fn predict(&self, text: &str) -> ClassifyResult<(Sentiment, f32)> {
        if text.trim().is_empty() {
            return Err(ClassificationError::EmptyInput);
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassificationError::Tokenization(e.to_string()))?;

        let ids = truncate_ids(encoding.get_ids(), self.max_seq_length, self.sep_token_id);
        let seq_len = ids.len();

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::ones((1, seq_len), DType::U32, &self.device)?;

        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;

        let (idx, score) = argmax(&probs)
            .ok_or_else(|| ClassificationError::Inference("empty logits".to_string()))?;

        let label = self.labels.get(idx).copied().ok_or_else(|| {
            ClassificationError::Inference(format!("label index {idx} out of range"))
        })?;

        Ok((label, score))
    }
}

/// FinBERT-style local sentiment classifier
pub struct FinBertClassifier {
    model: Arc<FinBertModel>,
    name: String,
}

impl FinBertClassifier {
    /// Load a classifier from HuggingFace Hub
    pub fn from_pretrained(config: LocalModelConfig) -> Result<Self> {
        let device = if config.use_gpu {
            Device::cuda_if_available(0).unwrap_or(Device::Cpu)
        } else {
            Device::Cpu
        };

        tracing::info!(
            model = %config.model_id,
            device = device_name(&device),
            "Loading local sentiment model"
        );

        let api = Api::new().context("Failed to create HuggingFace API")?;
        let repo = api.repo(Repo::new(config.model_id.clone(), RepoType::Model));

        let tokenizer = match repo.get("tokenizer.json") {
            Ok(path) => TokenizerSource::Json(path),
            Err(e) => {
                tracing::debug!(
                    model = %config.model_id,
                    error = %e,
                    "No tokenizer.json, building WordPiece tokenizer from vocab.txt"
                );
                let vocab = repo
                    .get("vocab.txt")
                    .context("Failed to download tokenizer vocabulary")?;
                let lowercase = match repo.get("tokenizer_config.json") {
                    Ok(path) => read_do_lower_case(&path)?,
                    Err(_) => default_do_lower_case(),
                };
                TokenizerSource::WordPiece { vocab, lowercase }
            }
        };

        let config_path = repo
            .get("config.json")
            .context("Failed to download config")?;

        let weights_path = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .context("Failed to download model weights")?;

        Self::from_files(&tokenizer, config_path, weights_path, config, device)
    }

    /// Load a classifier from local files
    pub fn from_files(
        tokenizer: &TokenizerSource,
        config_path: PathBuf,
        weights_path: PathBuf,
        config: LocalModelConfig,
        device: Device,
    ) -> Result<Self> {
        let tokenizer = tokenizer.load()?;

        let raw_config =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let bert_config: BertConfig =
            serde_json::from_str(&raw_config).context("Failed to parse BERT config")?;
        let head: HeadConfig =
            serde_json::from_str(&raw_config).context("Failed to parse classification head config")?;

        let labels = labels_from_id2label(&head.id2label)?;

        let vb = if weights_path
            .extension()
            .is_some_and(|e| e == "safetensors")
        {
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                    .context("Failed to load safetensors")?
            }
        } else {
            VarBuilder::from_pth(&weights_path, DType::F32, &device)
                .context("Failed to load PyTorch weights")?
        };

        let bert = BertModel::load(vb.pp("bert"), &bert_config).context("Failed to build BERT model")?;
        let pooler = linear(head.hidden_size, head.hidden_size, vb.pp("bert.pooler.dense"))
            .context("Failed to load pooler")?;
        let classifier = linear(head.hidden_size, labels.len(), vb.pp("classifier"))
            .context("Failed to load classification head")?;

        let sep_token_id = tokenizer.token_to_id("[SEP]");
        let max_seq_length = config.max_seq_length.min(head.max_position_embeddings);

        tracing::info!(
            model = %config.model_id,
            labels = ?labels,
            max_seq_length = max_seq_length,
            "Local sentiment model ready"
        );

        Ok(Self {
            model: Arc::new(FinBertModel {
                bert,
                pooler,
                classifier,
                tokenizer,
                device,
                labels,
                max_seq_length,
                sep_token_id,
            }),
            name: format!("local:{}", config.model_id),
        })
    }
}

#[async_trait]
impl SentimentClassifier for FinBertClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, mention: &Mention) -> ClassifyResult<ClassificationResult> {
        let model = Arc::clone(&self.model);
        let text = mention.context().to_string();

        let (sentiment, score) = tokio::task::spawn_blocking(move || model.predict(&text))
            .await
            .map_err(|e| ClassificationError::Unavailable(format!("inference task failed: {e}")))??;

        Ok(ClassificationResult::sentiment(sentiment).with_confidence(score))
    }
}

fn device_name(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}

/// Order the model's `id2label` table by id and map it onto [`Sentiment`]
fn labels_from_id2label(id2label: &HashMap<String, String>) -> Result<Vec<Sentiment>> {
    let mut indexed = id2label
        .iter()
        .map(|(id, label)| {
            let id: usize = id
                .parse()
                .with_context(|| format!("Invalid label id in id2label: {id}"))?;
            let sentiment: Sentiment = label
                .parse()
                .with_context(|| format!("Unsupported model label: {label}"))?;
            Ok((id, sentiment))
        })
        .collect::<Result<Vec<_>>>()?;

    indexed.sort_by_key(|(id, _)| *id);

    if indexed.is_empty() || indexed.iter().enumerate().any(|(pos, (id, _))| pos != *id) {
        anyhow::bail!("id2label must map ids 0..n without gaps");
    }

    Ok(indexed.into_iter().map(|(_, s)| s).collect())
}

/// Cap a token sequence at `max_len`, keeping a trailing separator if present
fn truncate_ids(ids: &[u32], max_len: usize, sep: Option<u32>) -> Vec<u32> {
    if ids.len() <= max_len {
        return ids.to_vec();
    }

    let mut truncated = ids[..max_len].to_vec();
    if let (Some(sep), Some(last)) = (sep, truncated.last_mut()) {
        *last = sep;
    }
    truncated
}

/// Index and value of the largest element; ties go to the lowest index
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((idx, v)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_config_default() {
        let config = LocalModelConfig::default();
        assert_eq!(config.model_id, "ProsusAI/finbert");
        assert_eq!(config.max_seq_length, 512);
        assert!(!config.use_gpu);
    }

    #[test]
    fn test_labels_from_finbert_table() {
        let id2label: HashMap<String, String> = [
            ("0".to_string(), "positive".to_string()),
            ("1".to_string(), "negative".to_string()),
            ("2".to_string(), "neutral".to_string()),
        ]
        .into();

        let labels = labels_from_id2label(&id2label).unwrap();
        assert_eq!(
            labels,
            vec![Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral]
        );
    }

    #[test]
    fn test_labels_reject_unknown_or_gapped() {
        let unknown: HashMap<String, String> =
            [("0".to_string(), "bullish".to_string())].into();
        assert!(labels_from_id2label(&unknown).is_err());

        let gapped: HashMap<String, String> = [
            ("0".to_string(), "positive".to_string()),
            ("2".to_string(), "neutral".to_string()),
        ]
        .into();
        assert!(labels_from_id2label(&gapped).is_err());
    }

    #[test]
    fn test_truncate_ids() {
        let ids = vec![101, 5, 6, 7, 8, 102];
        assert_eq!(truncate_ids(&ids, 10, Some(102)), ids);
        assert_eq!(truncate_ids(&ids, 4, Some(102)), vec![101, 5, 6, 102]);
        assert_eq!(truncate_ids(&ids, 4, None), vec![101, 5, 6, 7]);
    }

    fn write_vocab(dir: &Path) -> PathBuf {
        let vocab = dir.join("vocab.txt");
        std::fs::write(
            &vocab,
            "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\napple\nwatch\nsales\ngrew\n##s\n.\n",
        )
        .unwrap();
        vocab
    }

    #[test]
    fn test_wordpiece_tokenizer_frames_input() {
        let dir = tempfile::tempdir().unwrap();
        let source = TokenizerSource::WordPiece {
            vocab: write_vocab(dir.path()),
            lowercase: true,
        };

        let tokenizer = source.load().unwrap();
        let encoding = tokenizer.encode("Apple Watch sales grew.", true).unwrap();

        assert_eq!(
            encoding.get_tokens(),
            &["[CLS]", "apple", "watch", "sales", "grew", ".", "[SEP]"]
        );
        assert_eq!(encoding.get_ids(), &[2, 5, 6, 7, 8, 10, 3]);
        assert_eq!(tokenizer.token_to_id("[SEP]"), Some(3));
    }

    #[test]
    fn test_wordpiece_tokenizer_keeps_case_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let source = TokenizerSource::WordPiece {
            vocab: write_vocab(dir.path()),
            lowercase: false,
        };

        let encoding = source.load().unwrap().encode("Apple watch", true).unwrap();
        assert_eq!(encoding.get_tokens(), &["[CLS]", "[UNK]", "watch", "[SEP]"]);
    }

    #[test]
    fn test_wordpiece_vocab_requires_special_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.txt");
        std::fs::write(&vocab, "[UNK]\napple\n").unwrap();

        let err = TokenizerSource::WordPiece {
            vocab,
            lowercase: true,
        }
        .load()
        .unwrap_err();
        assert!(err.to_string().contains("[SEP]"));
    }

    #[test]
    fn test_do_lower_case_from_tokenizer_config() {
        let dir = tempfile::tempdir().unwrap();
        let cased = dir.path().join("cased.json");
        let unset = dir.path().join("unset.json");
        std::fs::write(&cased, r#"{"do_lower_case": false, "model_max_length": 512}"#).unwrap();
        std::fs::write(&unset, r#"{"model_max_length": 512}"#).unwrap();

        assert!(!read_do_lower_case(&cased).unwrap());
        assert!(read_do_lower_case(&unset).unwrap());
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
        assert_eq!(argmax(&[]), None);
    }

    // Integration tests require model download
    #[tokio::test]
    #[ignore = "Requires model download"]
    async fn test_finbert_classifies_context() {
        let classifier = FinBertClassifier::from_pretrained(LocalModelConfig::default()).unwrap();
        let mention = Mention {
            entity: "iPhone".to_string(),
            variation: "iPhone".to_string(),
            window: crate::models::ContextWindow {
                start: 0,
                end: 52,
                match_start: 0,
                match_end: 6,
                text: "iPhone revenue declined sharply amid weak demand.".to_string(),
            },
        };

        let result = classifier.classify(&mention).await.unwrap();
        assert!(result.confidence.is_some());
    }
}
