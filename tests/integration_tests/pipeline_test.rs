//! End-to-end pipeline tests
//!
//! Documents and taxonomies are written to temp files and go through the same
//! loading path as the CLI.

use finmention::document::DocumentText;
use finmention::locator::{locate_mentions, MentionLocator};
use finmention::models::Sentiment;
use finmention::pipeline::{load_inputs, AnalysisOutcome, Analyzer, AnalyzerOptions};
use finmention::report::{Outcome, ReportFormat, ReportWriter};
use finmention::taxonomy::{build_synonym_index, SeedAliases};
use std::sync::Arc;
use std::time::Duration;

use super::fixtures::KeywordClassifier;
use crate::common::{padded_document, write_file, write_taxonomy};

fn options(window: usize) -> AnalyzerOptions {
    AnalyzerOptions {
        window,
        max_concurrent: 4,
        call_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_apple_watch_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_file(
        dir.path(),
        "10q.txt",
        &padded_document(
            800,
            "Apple Watch sales grew 20% year over year amid strong demand",
            800,
        ),
    );
    let taxonomy = write_taxonomy(dir.path(), &["Generative AI; Quantum Computing", ""]);

    let inputs = load_inputs(&document, &taxonomy, &SeedAliases::default()).unwrap();
    let analyzer = Analyzer::new(Arc::new(KeywordClassifier::new()), options(500));

    let mentions = analyzer.locate(&inputs.document, &inputs.index);
    let mention = mentions.get("Apple Watch").unwrap();
    assert_eq!(mention.window.match_start, 800);
    assert!(mention.context().contains("sales grew 20%"));

    let AnalysisOutcome::Report(report) = analyzer.run(&inputs.document, &inputs.index).await else {
        panic!("expected a report");
    };

    assert_eq!(report.len(), 1);
    let row = report.row("Apple Watch").unwrap();
    assert_eq!(row.variation, "Apple Watch");
    match &row.outcome {
        Outcome::Classified(result) => assert_eq!(result.sentiment, Sentiment::Positive),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let markdown = ReportWriter::new()
        .unwrap()
        .render(&report, ReportFormat::Markdown)
        .unwrap();
    assert!(markdown.contains("| Technology | Sentiment |"));
    assert!(markdown.contains("| Apple Watch | Positive |"));
}

#[tokio::test]
async fn test_each_entity_classified_once_in_index_order() {
    let classifier = Arc::new(KeywordClassifier::new());
    let analyzer = Analyzer::new(classifier.clone(), options(20));

    let index = build_synonym_index(&SeedAliases::default(), [Some("Blockchain; Edge AI")]);
    let document = DocumentText::new(
        "Edge AI pilots were weak across regions this year. Separately, the iPhone grew. \
         Blockchain spend was flat overall. The iPhone grew again and Edge AI recovered.",
    );

    let AnalysisOutcome::Report(report) = analyzer.run(&document, &index).await else {
        panic!("expected a report");
    };

    let entities: Vec<_> = report.rows.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(entities, vec!["iPhone", "Blockchain", "Edge AI"]);

    let mut calls = classifier.calls();
    calls.sort();
    assert_eq!(calls, vec!["Blockchain", "Edge AI", "iPhone"]);

    let sentiment = |entity: &str| report.row(entity).unwrap().outcome.result().unwrap().sentiment;
    assert_eq!(sentiment("iPhone"), Sentiment::Positive);
    assert_eq!(sentiment("Edge AI"), Sentiment::Negative);
}

#[tokio::test]
async fn test_nothing_found_skips_classification() {
    let classifier = Arc::new(KeywordClassifier::new());
    let analyzer = Analyzer::new(classifier.clone(), options(500));

    let index = build_synonym_index(&SeedAliases::default(), [Some("Quantum Computing")]);
    let document = DocumentText::new(&padded_document(300, "Revenue was stable.", 300));

    assert_eq!(analyzer.run(&document, &index).await, AnalysisOutcome::NothingFound);
    assert!(classifier.calls().is_empty());
}

#[test]
fn test_first_match_wins_by_position() {
    let index = build_synonym_index(&SeedAliases::empty(), [Some("Blockchain")]);
    let text = format!(
        "{}{}",
        padded_document(100, "Blockchain", 4000),
        padded_document(890, "blockchain", 100)
    );
    let document = DocumentText::new(&text);

    let mentions = locate_mentions(&document, &index, 50);
    let mention = mentions.get("Blockchain").unwrap();

    assert_eq!(mention.window.match_start, 100);
    assert_eq!(mention.window.start, 50);
    assert_eq!(mention.window.end, 160);
    assert_eq!(mention.window.len(), 110);
}

#[test]
fn test_mention_at_document_start() {
    let index = build_synonym_index(&SeedAliases::default(), std::iter::empty::<Option<&str>>());
    let document = DocumentText::new(&padded_document(0, "iCloud revenue grew", 900));

    let mentions = locate_mentions(&document, &index, 500);
    let window = &mentions.get("iCloud").unwrap().window;

    assert_eq!(window.start, 0);
    assert_eq!(window.match_start, 0);
    assert_eq!(window.match_end, 6);
    assert_eq!(window.end, 506);
    assert!(window.text.starts_with("iCloud revenue grew"));
}

#[test]
fn test_window_never_exceeds_bound() {
    let index = build_synonym_index(&SeedAliases::default(), [Some("Spatial Computing")]);
    let text = format!(
        "{} {} {}",
        padded_document(1200, "Spatial Computing", 30),
        padded_document(20, "macOS", 2000),
        "tvOS"
    );
    let document = DocumentText::new(&text);

    for window_size in [0, 10, 500] {
        let mut locator = MentionLocator::new(window_size);
        for mention in &locator.locate(&document, &index) {
            let window = &mention.window;
            assert!(window.end <= document.char_len());
            assert!(window.start <= window.match_start);
            assert!(window.len() <= window.match_len() + 2 * window_size);
            assert_eq!(window.text.chars().count(), window.len());
        }
    }
}

#[test]
fn test_hyphenated_line_break_is_rejoined_before_matching() {
    let index = build_synonym_index(&SeedAliases::empty(), [Some("Blockchain")]);
    let document = DocumentText::new("Our block-\nchain initiatives expanded.");

    let mentions = locate_mentions(&document, &index, 10);
    assert_eq!(mentions.get("Blockchain").unwrap().variation, "Blockchain");
}
