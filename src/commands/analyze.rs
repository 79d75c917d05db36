use anyhow::{Context, Result};
use std::path::PathBuf;

use finmention::classify::{build_classifier, BackendKind};
use finmention::config::Config;
use finmention::locator::locate_mentions;
use finmention::pipeline::{load_inputs, AnalysisOutcome, Analyzer, AnalyzerOptions};
use finmention::report::{ReportFormat, ReportWriter};

use super::load_seeds;

/// Parameters for the analyze command
#[derive(Debug, Clone)]
pub struct AnalyzeParams {
    pub document: PathBuf,
    pub taxonomy: PathBuf,
    pub seed_aliases: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub window: Option<usize>,
    pub max_concurrent: Option<usize>,
    pub format: Option<ReportFormat>,
    pub output: Option<PathBuf>,
}

impl AnalyzeParams {
    /// Apply command-line overrides on top of loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.analysis.backend = backend;
        }
        if let Some(window) = self.window {
            config.analysis.window = window;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.analysis.max_concurrent = max_concurrent;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }
    }
}

pub async fn analyze(mut config: Config, params: AnalyzeParams) -> Result<()> {
    params.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    println!("Step 1: Parsing documents...");
    let seeds = load_seeds(params.seed_aliases.as_deref())?;
    let document_path = params.document.clone();
    let taxonomy_path = params.taxonomy.clone();

    let inputs =
        tokio::task::spawn_blocking(move || load_inputs(&document_path, &taxonomy_path, &seeds))
            .await
            .context("Input loading task failed")??;

    println!("Step 2: Finding technology mentions...");
    let mentions = locate_mentions(&inputs.document, &inputs.index, config.analysis.window);

    println!(
        "Step 3: Analyzing text with the {} backend...",
        config.analysis.backend
    );
    if mentions.is_empty() {
        println!("No technologies found in the document.");
        return Ok(());
    }

    let classifier = build_classifier(&config)
        .await
        .context("Failed to initialize classification backend")?;
    let analyzer = Analyzer::new(classifier, AnalyzerOptions::from(&config.analysis));

    for mention in &mentions {
        println!("  - Analyzing '{}'...", mention.entity);
    }

    let report = match analyzer.analyze(&inputs.index, &mentions).await {
        AnalysisOutcome::Report(report) => report,
        AnalysisOutcome::NothingFound => {
            println!("No technologies found in the document.");
            return Ok(());
        }
    };

    let writer = ReportWriter::new()?;
    writer.write(&report, config.output.format, config.output.path.as_deref())?;

    if report.unclassified_count() > 0 {
        println!(
            "{} of {} technologies could not be classified.",
            report.unclassified_count(),
            report.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmention::utils::retry::RetryConfig;
    use std::path::Path;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    fn params(dir: &Path, document: &str, output: PathBuf) -> AnalyzeParams {
        let document_path = dir.join("10q.txt");
        let taxonomy_path = dir.join("gartner.csv");
        std::fs::write(&document_path, document).unwrap();
        std::fs::write(&taxonomy_path, "name,technologies\nhype,Blockchain; Edge AI\n").unwrap();

        AnalyzeParams {
            document: document_path,
            taxonomy: taxonomy_path,
            seed_aliases: None,
            backend: Some(BackendKind::Remote),
            window: Some(40),
            max_concurrent: Some(2),
            format: Some(ReportFormat::Json),
            output: Some(output),
        }
    }

    fn remote_config(endpoint: String) -> Config {
        let mut config = Config::default();
        config.remote.endpoint = endpoint;
        config.remote.api_key_env = "FINMENTION_TEST_UNSET_KEY".to_string();
        config.retry = RetryConfig::disabled();
        config
    }

    #[test]
    fn test_cli_overrides_config() {
        let params = AnalyzeParams {
            document: PathBuf::from("10q.pdf"),
            taxonomy: PathBuf::from("taxonomy.csv"),
            seed_aliases: None,
            backend: Some(BackendKind::Remote),
            window: Some(120),
            max_concurrent: None,
            format: Some(ReportFormat::Json),
            output: None,
        };

        let mut config = Config::default();
        params.apply(&mut config);

        assert_eq!(config.analysis.backend, BackendKind::Remote);
        assert_eq!(config.analysis.window, 120);
        assert_eq!(config.analysis.max_concurrent, 4);
        assert_eq!(config.output.format, ReportFormat::Json);
        assert!(config.output.path.is_none());
    }

    #[tokio::test]
    async fn test_analyze_writes_report_from_remote_backend() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains(r#"related to \"Edge AI\""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(
                r#"{"Sentiment":"Negative","ToneAndStyle":"Cautious","Emotion":"Concern","Intent":"risk disclosure"}"#,
            )))
            .with_priority(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(
                r#"{"Sentiment":"Positive","ToneAndStyle":"Informative","Emotion":"Confident","Intent":"performance summary","Stance":"Agreement"}"#,
            )))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.json");
        let params = params(
            dir.path(),
            "Blockchain pilots grew. Apple Pay adoption was strong. Edge AI shipments declined.",
            output.clone(),
        );

        analyze(remote_config(mock_server.uri()), params).await.unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        let rows = report["rows"].as_array().unwrap();
        let entities: Vec<_> = rows.iter().map(|r| r["entity"].as_str().unwrap()).collect();

        assert_eq!(entities, vec!["Apple Pay", "Blockchain", "Edge AI"]);
        assert_eq!(report["columns"], "extended");
        assert_eq!(rows[0]["status"], "classified");
        assert_eq!(rows[1]["stance"], "Agreement");
        assert_eq!(rows[2]["status"], "unclassified");
    }

    #[tokio::test]
    async fn test_analyze_without_mentions_builds_no_backend() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.json");
        let params = params(dir.path(), "Quarterly revenue was flat.", output.clone());

        analyze(remote_config(mock_server.uri()), params).await.unwrap();

        assert!(!output.exists());
    }
}
