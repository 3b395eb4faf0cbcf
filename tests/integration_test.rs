use quiz_rebrand::config::Config;
use quiz_rebrand::models::{MarkingScheme, QuizQuestion};
use quiz_rebrand::orchestrator::{App, DocumentAssembler};
use quiz_rebrand::services::scoring_injector::ENGINE_SCRIPT_ID;
use quiz_rebrand::services::theme_injector::STYLESHEET_ID;
use quiz_rebrand::services::{BrandRewriter, EnginePlacement, StylesheetPlacement};
use quiz_rebrand::workflow::{score, QuizSession, SessionPhase, SubmitOutcome};
use quiz_rebrand::PatternExtractor;
use std::collections::BTreeMap;
use std::fs;

// ========== 测试数据 ==========

/// 生成 n 道两选项题目，正确答案都是第 2 项
fn questions(n: usize) -> Vec<QuizQuestion> {
    (0..n)
        .map(|i| QuizQuestion {
            question: format!("Question {}?", i + 1),
            options: vec!["wrong".to_string(), "right".to_string()],
            correct: 2,
            marks: 4.0,
            explanation: Some(format!("Explanation {}", i + 1)),
        })
        .collect()
}

/// 带题目数组的完整测验页面
fn quiz_document(n: usize) -> String {
    let data = serde_json::to_string(&questions(n)).unwrap();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Chemistry Test</title>
<style>
body {{ background: #000; }}
</style>
</head>
<body>
<div class="header">
  <a class="brand" href="https://t.me/Boss_Quiz_Robot">🤖 Boss_Quiz_Robot</a>
  <button id="theme-toggle">🌙 Dark Mode</button>
</div>
<div class="start-screen">
  <div class="instructions">
    <div class="instruction-item">Each question has one correct answer</div>
  </div>
  <button onclick="startQuiz()">Start</button>
</div>
<p class="footer">Generated by Boss_Quiz_Robot</p>
<script>
const Q = {data};
let timeLeft = 1200;
function startQuiz() {{ document.querySelector('.start-screen').style.display = 'none'; }}
function submitQuiz() {{ alert('submitted'); }}
</script>
</body>
</html>"#
    )
}

fn all_correct(n: usize) -> BTreeMap<usize, usize> {
    (0..n).map(|i| (i, 2)).collect()
}

// ========== 计分场景 ==========

#[test]
fn test_scenario_all_correct() {
    let assembler = DocumentAssembler::new(&Config::default()).unwrap();
    let set = assembler.questions(&quiz_document(20));
    assert_eq!(set.len(), 20);

    let scheme = MarkingScheme::default();
    let report = score(&set.questions, &all_correct(20), &scheme);

    assert_eq!(report.correct, 20);
    assert_eq!(report.wrong, 0);
    assert_eq!(report.unanswered, 0);
    assert_eq!(report.raw_score, 20.0 * scheme.positive_mark);
    assert_eq!(report.percentage, 100.0);
}

#[test]
fn test_scenario_mixed_answers() {
    let qs = questions(25);
    let mut responses = BTreeMap::new();
    for i in 0..15 {
        responses.insert(i, 2);
    }
    for i in 15..20 {
        responses.insert(i, 1);
    }
    let report = score(&qs, &responses, &MarkingScheme::flat(4.0, 1.0));

    assert_eq!(report.correct, 15);
    assert_eq!(report.wrong, 5);
    assert_eq!(report.unanswered, 5);
    assert_eq!(report.raw_score, 55.0);
    assert_eq!(report.max_score, 100.0);
    assert!((report.percentage - 55.0).abs() < 1e-9);
}

#[test]
fn test_scenario_no_question_literal() {
    let html = r#"<html><head><title>Empty</title></head><body><p>No data here</p></body></html>"#;
    let assembler = DocumentAssembler::new(&Config::default()).unwrap();

    let out = assembler.transform(html).unwrap();
    assert_eq!(out.report.question_count, 0);
    assert!(!out.report.questions_malformed);
    assert!(out.html.contains("var QUESTIONS = [];"));
    assert!(out.html.contains(&format!(r#"<script id="{}">"#, ENGINE_SCRIPT_ID)));
}

#[test]
fn test_scenario_token_in_three_contexts() {
    let html = r#"<div><a href="https://t.me/Boss_Quiz_Robot">Join boss_quiz_robot</a></div><p>Powered by Boss_Quiz_Robot</p>"#;
    let config = Config::default();
    let rewriter = BrandRewriter::new(&config.source_brand_token, &config.brand).unwrap();
    let extractor = PatternExtractor::new().unwrap();

    let out = rewriter.rewrite(html, &extractor);
    assert!(out.anchor_rewritten);
    assert!(!out.html.to_lowercase().contains("boss_quiz_robot"));
    assert_eq!(out.html.matches(&rewriter.canonical_anchor()).count(), 1);
    assert!(out.html.contains("<p>Powered by Nomis Quiz</p>"));
}

#[test]
fn test_scenario_zero_questions() {
    let report = score(&[], &BTreeMap::new(), &MarkingScheme::default());
    assert_eq!(report.total, 0);
    assert_eq!(report.percentage, 0.0);
    assert_eq!(report.percentile_estimate, 0.0);
}

// ========== 性质 ==========

#[test]
fn test_branding_is_idempotent() {
    let config = Config::default();
    let rewriter = BrandRewriter::new(&config.source_brand_token, &config.brand).unwrap();
    let extractor = PatternExtractor::new().unwrap();
    let html = quiz_document(3);

    let once = rewriter.rewrite(&html, &extractor).html;
    let twice = rewriter.rewrite(&once, &extractor).html;
    assert_eq!(once, twice);
}

#[test]
fn test_fallback_single_stylesheet() {
    let html = "<html><head><title>Plain</title></head><body><a href=\"/x\">x</a> Boss_Quiz_Robot</body></html>";
    let assembler = DocumentAssembler::new(&Config::default()).unwrap();
    let out = assembler.transform(html).unwrap();

    assert_eq!(out.report.stylesheet, StylesheetPlacement::Inserted);
    assert_eq!(out.html.matches("<style").count(), 1);
    assert!(out.html.contains(&format!(r#"<style id="{}">"#, STYLESHEET_ID)));
    assert!(out.html.contains("</a> Nomis Quiz"));
    assert!(!out.report.anchor_rewritten);
    assert_eq!(out.report.brand_replacements, 1);
}

#[test]
fn test_conservation_and_bounds() {
    let qs = questions(6);
    let schemes = [MarkingScheme::flat(4.0, 1.0), MarkingScheme::fractional(1.0, 0.25)];
    // 每道题：未答 / 答对 / 答错
    for mask in 0..3usize.pow(6) {
        let mut responses = BTreeMap::new();
        let mut rest = mask;
        for i in 0..6 {
            match rest % 3 {
                1 => {
                    responses.insert(i, 2);
                }
                2 => {
                    responses.insert(i, 1);
                }
                _ => {}
            }
            rest /= 3;
        }
        for scheme in &schemes {
            let report = score(&qs, &responses, scheme);
            assert_eq!(report.correct + report.wrong + report.unanswered, report.total);
            assert!((0.0..=99.9).contains(&report.percentile_estimate));
            assert!(report.percentage <= 100.0);
            assert_eq!(report, score(&qs, &responses, scheme));
        }
    }
}

// ========== 完整流程 ==========

#[test]
fn test_full_document_transform() {
    let assembler = DocumentAssembler::new(&Config::default()).unwrap();
    let out = assembler.transform(&quiz_document(10)).unwrap();
    let report = &out.report;

    assert_eq!(report.title, "Chemistry Test - Nomis Quiz");
    assert_eq!(report.question_count, 10);
    assert_eq!(report.duration_secs, 1200);
    assert_eq!(report.stylesheet, StylesheetPlacement::Replaced);
    assert_eq!(report.engine, EnginePlacement::Injected);
    assert!(report.anchor_rewritten);
    assert_eq!(report.brand_replacements, 1);
    assert_eq!(
        report.replaced_functions,
        vec!["startQuiz".to_string(), "submitQuiz".to_string()]
    );

    let html = &out.html;
    assert!(html.contains(r#"<button id="theme-toggle">🌙 Dark</button>"#));
    assert!(html.contains(r#"id="marking-scheme-note""#));
    assert!(html.contains("📝 10 questions · 🏆 Max 40"));
    assert!(html.contains(r#"id="nav""#));
    assert!(html.contains(r#"id="result-modal""#));
    assert!(!html.contains("alert('submitted')"));
    assert!(!html.contains("background: #000"));

    // 样式表在 </head> 之前，引擎在 </body> 之前
    assert!(html.find(STYLESHEET_ID).unwrap() < html.find("</head>").unwrap());
    assert!(html.find(ENGINE_SCRIPT_ID).unwrap() < html.find("</body>").unwrap());
}

#[test]
fn test_transform_twice_matches_once() {
    let assembler = DocumentAssembler::new(&Config::default()).unwrap();
    let once = assembler.transform(&quiz_document(5)).unwrap();
    let twice = assembler.transform(&once.html).unwrap();

    assert_eq!(twice.report.engine, EnginePlacement::Replaced);
    assert_eq!(twice.html, once.html);
    assert_eq!(twice.html.matches(ENGINE_SCRIPT_ID).count(), 1);
    assert_eq!(twice.html.matches(r#"id="marking-scheme-note""#).count(), 1);
}

#[test]
fn test_session_lifecycle_matches_scoring() {
    let qs = questions(3);
    let scheme = MarkingScheme::default();
    let mut session = QuizSession::new(qs.clone(), scheme, 60);

    assert!(session.start());
    assert!(session.select(2));
    assert!(session.next());
    assert!(session.select(1));

    match session.request_submit() {
        SubmitOutcome::NeedsConfirmation { unanswered } => assert_eq!(unanswered, 1),
        other => panic!("unexpected outcome: {other:?}"),
    }
    let report = match session.confirm_submit() {
        SubmitOutcome::Submitted(report) => report,
        other => panic!("unexpected outcome: {other:?}"),
    };

    let mut responses = BTreeMap::new();
    responses.insert(0, 2);
    responses.insert(1, 1);
    assert_eq!(report, score(&qs, &responses, &scheme));
    assert_eq!(report.raw_score, 3.0);
    assert_eq!(session.phase(), SessionPhase::Submitted);
    assert!(!session.select(2));
    assert!(session.review());
}

// ========== 批处理 ==========

#[tokio::test]
async fn test_batch_processes_folder() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();

    fs::write(input.join("mock1.html"), quiz_document(4)).unwrap();
    fs::write(input.join("Mock2.HTM"), quiz_document(2)).unwrap();
    fs::write(input.join("empty.html"), "   ").unwrap();
    fs::write(input.join("notes.txt"), "not a quiz").unwrap();

    let config = Config {
        input_folder: input.display().to_string(),
        output_folder: output.display().to_string(),
        output_log_file: dir.path().join("run.log").display().to_string(),
        max_concurrent_documents: 2,
        ..Config::default()
    };

    let stats = App::initialize(config).await.unwrap().run().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 2);
    assert_eq!(stats.failed, 1);

    let converted = fs::read_to_string(output.join("nomis_mock1.html")).unwrap();
    assert!(converted.contains("Chemistry Test - Nomis Quiz"));
    assert!(output.join("nomis_Mock2.HTM").exists());
    assert!(!output.join("nomis_empty.html").exists());
    assert!(!output.join("nomis_notes.txt").exists());

    let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
    assert!(log.contains("测验文档处理日志"));
    assert!(log.contains("mock1.html"));
    assert!(log.contains("empty.html"));
}

#[tokio::test]
async fn test_batch_with_empty_folder() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        input_folder: dir.path().display().to_string(),
        output_folder: dir.path().join("out").display().to_string(),
        output_log_file: dir.path().join("run.log").display().to_string(),
        ..Config::default()
    };

    let stats = App::initialize(config).await.unwrap().run().await.unwrap();
    assert_eq!(stats.total, 0);
}
