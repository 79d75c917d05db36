//! Error scenario tests
//!
//! Missing inputs abort a run; backend failures only degrade the affected
//! entity.

use finmention::classify::{RemoteClassifier, RemoteConfig, RemoteProtocol};
use finmention::document::DocumentText;
use finmention::error::{Error, ErrorCategory, FinmentionErrorTrait};
use finmention::pipeline::{load_inputs, AnalysisOutcome, Analyzer, AnalyzerOptions};
use finmention::report::{Outcome, ReportFormat, ReportWriter};
use finmention::taxonomy::{build_synonym_index, SeedAliases};
use finmention::utils::retry::RetryConfig;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::FailingClassifier;
use crate::common::{write_file, write_taxonomy};

const DOCUMENT: &str = "Blockchain pilots grew. Apple Pay adoption was strong. \
                        Edge AI shipments declined in the quarter.";

fn options() -> AnalyzerOptions {
    AnalyzerOptions {
        window: 30,
        max_concurrent: 2,
        call_timeout: Duration::from_secs(10),
    }
}

fn chat_completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_one_failing_entity_is_unclassified() {
    let index = build_synonym_index(&SeedAliases::default(), [Some("Blockchain; Edge AI")]);
    let document = DocumentText::new(DOCUMENT);
    let analyzer = Analyzer::new(Arc::new(FailingClassifier::failing_on(&["Edge AI"])), options());

    let AnalysisOutcome::Report(report) = analyzer.run(&document, &index).await else {
        panic!("expected a report");
    };

    assert_eq!(report.len(), 3);
    assert_eq!(report.classified_count(), 2);
    assert_eq!(report.unclassified_count(), 1);

    match &report.row("Edge AI").unwrap().outcome {
        Outcome::Unclassified { reason } => assert!(reason.contains("503")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_remote_failure_for_one_of_three_entities() {
    let mock_server = MockServer::start().await;

    // Judgment without a Stance for Edge AI only
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
        .mount(&mock_server)
        .await;

    let config = RemoteConfig {
        protocol: RemoteProtocol::OpenAi,
        endpoint: mock_server.uri(),
        ..RemoteConfig::default()
    };
    let classifier = RemoteClassifier::with_config(config, RetryConfig::disabled())
        .unwrap()
        .with_api_key("test-key");

    let index = build_synonym_index(&SeedAliases::default(), [Some("Blockchain; Edge AI")]);
    let document = DocumentText::new(DOCUMENT);
    let analyzer = Analyzer::new(Arc::new(classifier), options());

    let AnalysisOutcome::Report(report) = analyzer.run(&document, &index).await else {
        panic!("expected a report");
    };

    let entities: Vec<_> = report.rows.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(entities, vec!["Apple Pay", "Blockchain", "Edge AI"]);
    assert_eq!(report.classified_count(), 2);

    match &report.row("Edge AI").unwrap().outcome {
        Outcome::Unclassified { reason } => assert!(reason.contains("Stance")),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let markdown = ReportWriter::new()
        .unwrap()
        .render(&report, ReportFormat::Markdown)
        .unwrap();
    assert!(markdown.contains(
        "| Blockchain | Positive | Informative | Confident | performance summary | Agreement |"
    ));
    assert!(markdown.contains("| Edge AI | Unclassified ("));
}

#[test]
fn test_missing_document_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let taxonomy = write_taxonomy(dir.path(), &["Blockchain"]);

    let err = load_inputs(&dir.path().join("missing-10q.pdf"), &taxonomy, &SeedAliases::default())
        .unwrap_err();

    assert!(matches!(err, Error::InputNotFound { kind: "Document", .. }));
    assert_eq!(err.category(), ErrorCategory::Input);
    assert!(!err.is_recoverable());
    assert!(err.to_string().contains("missing-10q.pdf"));
}

#[test]
fn test_missing_taxonomy_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_file(dir.path(), "10q.txt", "Blockchain pilots grew.");

    let err = load_inputs(&document, &dir.path().join("gartner.csv"), &SeedAliases::default())
        .unwrap_err();

    assert!(matches!(err, Error::InputNotFound { kind: "Taxonomy", .. }));
    assert!(err.to_string().starts_with("Taxonomy file not found"));
}

#[test]
fn test_taxonomy_without_technologies_column() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_file(dir.path(), "10q.txt", "Blockchain pilots grew.");
    let taxonomy = write_file(dir.path(), "gartner.csv", "name,phase\nBlockchain,peak\n");

    let err = load_inputs(&document, &taxonomy, &SeedAliases::default()).unwrap_err();

    assert!(matches!(err, Error::Taxonomy(_)));
    assert_eq!(err.category(), ErrorCategory::Taxonomy);
}
