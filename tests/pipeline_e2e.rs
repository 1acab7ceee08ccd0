use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use graffiti_prep_lib::config::AppConfig;
use graffiti_prep_lib::corpus::Inscription;
use graffiti_prep_lib::infill::{InfillFailure, MaskScorer, ScoreRequest, ScoreResponse, ScoredToken, SpanInfiller};
use graffiti_prep_lib::language::Language;
use graffiti_prep_lib::normalize::{NormalizationEngine, RuleOutcome, RuleStep};
use graffiti_prep_lib::pipeline::RecordStatus;
use graffiti_prep_lib::{process_corpus, RunOptions};

// ============================================================================
// 测试桩
// ============================================================================

/// 返回固定候选，可选延迟，并记录最大并发
struct StubScorer {
    token: String,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubScorer {
    fn new(token: &str, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            token: token.to_string(),
            delay: Duration::from_millis(delay_ms),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MaskScorer for StubScorer {
    async fn score(&self, _request: ScoreRequest) -> anyhow::Result<ScoreResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(ScoreResponse {
            candidates: vec![ScoredToken::new(self.token.clone(), 0.9)],
        })
    }
}

/// 按掩码所在位置返回不同长度的词
struct PositionalScorer;

#[async_trait]
impl MaskScorer for PositionalScorer {
    async fn score(&self, request: ScoreRequest) -> anyhow::Result<ScoreResponse> {
        let token = if request.mask_position == 0 { "a" } else { "longerword" };
        Ok(ScoreResponse {
            candidates: vec![ScoredToken::new(token, 0.5)],
        })
    }
}

fn latin(id: &str, content: &str, translation: Option<&str>) -> Inscription {
    Inscription {
        id: id.to_string(),
        raw_content: Some(content.to_string()),
        source_translation: translation.map(str::to_string),
        language_hint: Some("Latin".to_string()),
        ..Default::default()
    }
}

fn greek(id: &str, content: &str, translation: Option<&str>) -> Inscription {
    Inscription {
        language_hint: Some("Greek".to_string()),
        ..latin(id, content, translation)
    }
}

fn engine() -> NormalizationEngine {
    NormalizationEngine::new(&AppConfig::new().normalization).unwrap()
}

// ============================================================================
// 规则行为
// ============================================================================

#[tokio::test]
async fn test_end_to_end_example_without_scorer() {
    let config = AppConfig::new();
    let report = process_corpus(
        &config,
        SpanInfiller::new(&config.infill),
        vec![latin("e2e", "Salve[---]<ignore this>+mark?", None)],
        &HashMap::new(),
    )
    .await
    .unwrap();

    let record = &report.records[0];
    assert_eq!(record.final_text, "salve[---]mark");
    assert_eq!(record.unresolved_count, 1);
    assert!(record.include_in_model);
}

#[test]
fn test_editorial_correction_single_rule() {
    assert_eq!(
        engine().apply_rule(RuleStep::EditorialCorrection, "A(:b)", Language::Latin),
        RuleOutcome::Matched("b".to_string())
    );
}

#[test]
fn test_bracket_unwrap_table() {
    let e = engine();
    let table = [
        ("[abc]", "abc"),
        ("[[abc]]", "abc"),
        ("[multi word]", "multi word"),
        ("[---]", "[---]"),
        ("[[---]]", "[---]"),
    ];
    for (input, expected) in table {
        let output = match e.apply_rule(RuleStep::UnwrapBrackets, input, Language::Latin) {
            RuleOutcome::Matched(text) => text,
            RuleOutcome::Unmatched => input.to_string(),
            RuleOutcome::Rejected(reason) => panic!("rejected {}: {}", input, reason),
        };
        assert_eq!(output, expected, "input: {}", input);
    }
}

#[test]
fn test_sentinel_survives_rules_before_infill() {
    let prepared = engine()
        .prepare("A〈x [---] y〉B 〚[---]〛 [[---]] <[---]>")
        .unwrap();
    assert_eq!(prepared.cleaned_content.matches("[---]").count(), 4);
}

#[tokio::test]
async fn test_normalization_is_idempotent() {
    let e = engine();
    let samples = [
        "Salve[---]<ignore this>+mark?",
        "C(aius) Iulius (:felix) fecit\r\n[[---]] VALE",
        "Ζωσίμη &amp; Ἀφροδίτη 〚x〛 [---]",
    ];
    for sample in samples {
        let language = if sample.contains('Ζ') { Language::Greek } else { Language::Latin };
        let once = e.normalize(sample, language).await.unwrap();
        let twice = e.normalize(&once.final_text, language).await.unwrap();
        assert_eq!(once.final_text, twice.final_text, "sample: {}", sample);
    }
}

// ============================================================================
// 补全
// ============================================================================

#[tokio::test]
async fn test_timeout_leaves_sentinel_and_batch_completes() {
    let mut config = AppConfig::new();
    config.infill.timeout_ms = 20;
    let infiller = SpanInfiller::new(&config.infill).with_scorer(Language::Latin, StubScorer::new("felix", 2_000));

    let report = process_corpus(
        &config,
        infiller,
        vec![latin("slow", "salve [---] amice", None), latin("plain", "vale", None)],
        &HashMap::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].final_text, "salve [---] amice");
    assert_eq!(report.records[0].unresolved_count, 1);
    assert_eq!(report.records[1].final_text, "vale");
    assert_eq!(report.summary.unresolved_infill, 1);
    assert!(report.summary.is_reconciled());
}

#[tokio::test]
async fn test_timeout_failure_is_recorded_on_span() {
    let mut config = AppConfig::new();
    config.infill.timeout_ms = 10;
    let infiller = SpanInfiller::new(&config.infill).with_scorer(Language::Latin, StubScorer::new("x", 1_000));
    let e = engine().with_infiller(Arc::new(infiller));

    let result = e.normalize("a [---]", Language::Latin).await.unwrap();
    assert_eq!(result.spans[0].failure, Some(InfillFailure::Timeout));
    assert!(!result.final_text.contains("[MASK]"));
}

#[tokio::test]
async fn test_multiple_sentinels_with_length_changes() {
    let config = AppConfig::new();
    let infiller = SpanInfiller::new(&config.infill).with_scorer(Language::Latin, Arc::new(PositionalScorer));
    let e = engine().with_infiller(Arc::new(infiller));

    let result = e.normalize("[---] b [---] d [---]", Language::Latin).await.unwrap();
    assert_eq!(result.final_text, "a b longerword d longerword");
    assert_eq!(result.unresolved_count, 0);
    assert_eq!(
        result.spans.iter().map(|s| s.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    // 位置以规则 1-13 之后的文本为准，不随替换移动
    assert_eq!(result.spans[1].position, 8..13);
    assert_eq!(&result.cleaned_content[16..21], "[---]");
}

#[tokio::test]
async fn test_scorer_concurrency_is_capped() {
    let mut config = AppConfig::new();
    config.batch.workers = 16;
    config.infill.max_in_flight = 2;
    let scorer = StubScorer::new("et", 20);
    let infiller = SpanInfiller::new(&config.infill).with_scorer(Language::Latin, scorer.clone());

    let inscriptions: Vec<Inscription> = (0..12)
        .map(|i| latin(&format!("r{}", i), "salve [---] vale", None))
        .collect();
    let report = process_corpus(&config, infiller, inscriptions, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(report.summary.resolved_infill, 12);
    assert!(scorer.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert!(report.records.iter().all(|r| r.final_text == "salve et vale"));
}

// ============================================================================
// 语料构建与汇总
// ============================================================================

#[tokio::test]
async fn test_greek_denylist_exclusion() {
    let config = AppConfig::new();
    let report = process_corpus(
        &config,
        SpanInfiller::new(&config.infill),
        vec![
            greek("g1", "ΑΒΓΔΕ", Some("Incomprehensible series of characters")),
            greek("g2", "χαῖρε", Some("Greetings")),
        ],
        &HashMap::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.records.len(), 2);
    assert!(!report.records[0].include_in_model);
    assert!(report.records[1].include_in_model);
    assert_eq!(report.summary.excluded_by_denylist, 1);
    assert_eq!(report.summary.included_in_model, 1);
}

#[tokio::test]
async fn test_order_restored_under_concurrency() {
    let mut config = AppConfig::new();
    config.batch.workers = 8;
    let infiller = SpanInfiller::new(&config.infill).with_scorer(Language::Latin, StubScorer::new("et", 5));

    let inscriptions: Vec<Inscription> = (0..40)
        .map(|i| {
            // 一半记录需要调用打分服务，完成顺序与输入顺序不同
            let content = if i % 2 == 0 { "salve [---]" } else { "vale" };
            latin(&format!("r{}", i), content, None)
        })
        .collect();
    let report = process_corpus(&config, infiller, inscriptions, &HashMap::new())
        .await
        .unwrap();

    let ids: Vec<String> = report.records.iter().map(|r| r.id.clone()).collect();
    let expected: Vec<String> = (0..40).map(|i| format!("r{}", i)).collect();
    assert_eq!(ids, expected);
    assert!(report.records.windows(2).all(|w| w[0].index < w[1].index));
}

#[tokio::test]
async fn test_summary_reconciles_with_skips() {
    let config = AppConfig::new();
    let mut translations = HashMap::new();
    translations.insert("ext".to_string(), "A single letter".to_string());

    let report = process_corpus(
        &config,
        SpanInfiller::new(&config.infill),
        vec![
            latin("empty", "   ", None),
            latin("marker", "ABC scribbles", None),
            latin("ext", "M", None),
            latin("ok", "Salve", Some("Hello")),
        ],
        &translations,
    )
    .await
    .unwrap();

    let summary = &report.summary;
    assert_eq!(summary.total, 4);
    assert_eq!(summary.skipped_empty, 1);
    assert_eq!(summary.skipped_marker, 1);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.excluded_by_denylist, 1);
    assert_eq!(summary.included_in_model, 1);
    assert!(summary.is_reconciled());
    assert_eq!(report.records[0].translation, "A single letter");
    assert!(matches!(report.skipped[1].status, RecordStatus::Skipped { .. }));
}

#[tokio::test]
async fn test_run_reads_and_writes_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("inscriptions.jsonl");
    std::fs::write(
        &input,
        concat!(
            "{\"id\": 1, \"content\": \"Salve[---]<ignore this>+mark?\", \"languageInEnglish\": \"Latin\"}\n",
            "{\"id\": 2, \"content\": \"ABC\", \"languageInEnglish\": \"Latin\"}\n",
        ),
    )
    .unwrap();

    let mut config = AppConfig::new();
    config.infill.enabled = false;
    let options = RunOptions {
        input,
        translations: None,
        output: Some(dir.path().join("report.json")),
        model_texts: Some(dir.path().join("model.txt")),
    };

    let summary = graffiti_prep_lib::run(config, &options).await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.skipped_marker, 1);

    let texts = std::fs::read_to_string(dir.path().join("model.txt")).unwrap();
    assert_eq!(texts, "salve[---]mark\n");

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["records"][0]["id"], "1");
    assert_eq!(report["skipped"][0]["reason"], "skip_marker");
}
