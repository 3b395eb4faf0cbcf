//! 文档组装器 - 编排层
//!
//! ## 职责
//!
//! 按固定顺序执行 品牌改写 → 主题注入 → 评分引擎注入，返回完整文档或明确的失败。
//!
//! - 题目数据在改写之前从原始文档中只读提取
//! - 任何步骤意外中断都返回 `TransformError`，不会返回半成品
//! - 不做 I/O，可以在多个任务中同时调用

use crate::config::Config;
use crate::error::{AppResult, TransformError};
use crate::infrastructure::PatternExtractor;
use crate::models::load_question_set;
use crate::models::question::{ExtractionStatus, QuestionSet};
use crate::services::scoring_injector::{storage_key_for, ENGINE_SCRIPT_ID};
use crate::services::theme_injector::STYLESHEET_ID;
use crate::services::{
    BrandRewriter, EnginePlacement, EngineSettings, ScoringInjector, StylesheetPlacement,
    ThemeInjector,
};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

/// 一次转换的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct TransformReport {
    /// 裸文本品牌标识的替换次数
    pub brand_replacements: usize,
    pub anchor_rewritten: bool,
    pub title: String,
    pub stylesheet: StylesheetPlacement,
    pub question_count: usize,
    pub questions_malformed: bool,
    /// 正确答案越界、永远无法答对的题目数量
    pub questions_defective: usize,
    /// 删除的旧 `<style>` 块数量
    pub styles_removed: usize,
    /// 被换成存根的来源函数
    pub replaced_functions: Vec<String>,
    pub engine: EnginePlacement,
    /// 补齐的标记片段数量
    pub markup_added: usize,
    pub duration_secs: u32,
}

impl fmt::Display for TransformReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "标题「{}」| 品牌替换 {} 处{} | 题目 {} 道{}{} | 时长 {} 秒 | 样式表{}{} | 引擎{}",
            self.title,
            self.brand_replacements,
            if self.anchor_rewritten { "，已改写链接" } else { "" },
            self.question_count,
            if self.questions_malformed { "（数据无法解析）" } else { "" },
            match self.questions_defective {
                0 => String::new(),
                n => format!("，{} 道答案越界", n),
            },
            self.duration_secs,
            match self.stylesheet {
                StylesheetPlacement::Replaced => "已替换",
                StylesheetPlacement::Inserted => "新插入",
            },
            match self.styles_removed {
                0 => String::new(),
                n => format!("，删除旧样式 {} 个", n),
            },
            match self.engine {
                EnginePlacement::Injected => "已注入",
                EnginePlacement::Replaced => "已替换",
            },
        )
    }
}

/// 转换结果
#[derive(Debug, Clone)]
pub struct TransformedDocument {
    pub html: String,
    pub report: TransformReport,
}

/// 文档组装器
pub struct DocumentAssembler {
    extractor: PatternExtractor,
    brand: BrandRewriter,
    theme: ThemeInjector,
    engine_settings: EngineSettings,
}

impl DocumentAssembler {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            extractor: PatternExtractor::new()?,
            brand: BrandRewriter::new(&config.source_brand_token, &config.brand)?,
            theme: ThemeInjector::new(&config.title_suffix, &config.default_title),
            engine_settings: EngineSettings {
                scheme: config.marking,
                persistence: config.persistence,
                default_duration_secs: config.default_duration_secs,
                fallback_question_count: config.fallback_question_count,
                storage_key: String::new(),
            },
        })
    }

    /// 转换一个 HTML 文档
    pub fn transform(&self, html: &str) -> AppResult<TransformedDocument> {
        if html.trim().is_empty() {
            return Err(TransformError::EmptyDocument.into());
        }

        let questions = run_step("extract", || load_question_set(html, &self.extractor))?;
        let branded = run_step("brand", || self.brand.rewrite(html, &self.extractor))?;
        let themed = run_step("theme", || self.theme.inject(&branded.html, &self.extractor))?;
        let scored = run_step("scoring", || {
            let settings = EngineSettings {
                storage_key: storage_key_for(&themed.title),
                ..self.engine_settings.clone()
            };
            ScoringInjector::new(settings).inject(&themed.html, &questions, &self.extractor)
        })?;

        self.verify(&scored.html)?;

        let report = TransformReport {
            brand_replacements: branded.replacements,
            anchor_rewritten: branded.anchor_rewritten,
            title: themed.title,
            stylesheet: themed.stylesheet,
            question_count: questions.len(),
            questions_malformed: questions.status == ExtractionStatus::Malformed,
            questions_defective: questions.defect_count(),
            styles_removed: themed.styles_removed,
            replaced_functions: scored.replaced_functions,
            engine: scored.engine,
            markup_added: scored.markup_added,
            duration_secs: scored.duration_secs,
        };
        debug!("转换完成: {}", report);

        Ok(TransformedDocument {
            html: scored.html,
            report,
        })
    }

    /// 转换一段字节，必须是 UTF-8
    pub fn transform_bytes(&self, bytes: Vec<u8>) -> AppResult<TransformedDocument> {
        let html = String::from_utf8(bytes).map_err(|source| TransformError::NotUtf8 { source })?;
        self.transform(&html)
    }

    /// 只提取题目，不修改文档
    pub fn questions(&self, html: &str) -> QuestionSet {
        load_question_set(html, &self.extractor)
    }

    fn verify(&self, html: &str) -> AppResult<()> {
        if self.extractor.find_tagged_block(html, STYLESHEET_ID).is_none() {
            error!("❌ 输出文档中找不到主题样式表");
            return Err(TransformError::MissingStylesheet.into());
        }
        if self.extractor.find_tagged_block(html, ENGINE_SCRIPT_ID).is_none() {
            error!("❌ 输出文档中找不到评分引擎");
            return Err(TransformError::MissingEngine.into());
        }
        Ok(())
    }
}

/// 执行一个步骤，把 panic 转换为 `StepPanicked`
fn run_step<T>(step: &'static str, f: impl FnOnce() -> T) -> AppResult<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "未知原因".to_string());
        error!("❌ 步骤 {} 意外中断: {}", step, message);
        TransformError::StepPanicked { step, message }.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const QUIZ: &str = r#"<!DOCTYPE html>
<html><head><title>Physics Mock</title><style>body{color:red}</style></head>
<body>
<div class="header"><a href="https://t.me/Boss_Quiz_Robot">🤖 Boss_Quiz_Robot</a></div>
<div class="instructions"><div class="instruction-item">Read all questions</div></div>
<script>
const Q = [
  {question: "1+1?", options: ["1", "2"], correct: 2, marks: 4},
  {question: "2+2?", options: ["4", "5"], correct: 1, marks: 4}
];
let timeLeft = 600;
function submitQuiz() { alert('done'); }
</script>
</body></html>"#;

    fn assembler() -> DocumentAssembler {
        DocumentAssembler::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_transform_full_document() {
        let out = assembler().transform(QUIZ).unwrap();
        let report = &out.report;

        assert!(report.anchor_rewritten);
        assert_eq!(report.brand_replacements, 0);
        assert_eq!(report.title, "Physics Mock - Nomis Quiz");
        assert_eq!(report.stylesheet, StylesheetPlacement::Replaced);
        assert_eq!(report.question_count, 2);
        assert!(!report.questions_malformed);
        assert_eq!(report.replaced_functions, vec!["submitQuiz".to_string()]);
        assert_eq!(report.engine, EnginePlacement::Injected);
        assert_eq!(report.duration_secs, 600);

        assert!(out.html.contains("<title>Physics Mock - Nomis Quiz</title>"));
        assert!(!out.html.contains("color:red"));
        assert!(out.html.contains("marking-scheme-note"));
        assert!(out.html.contains(r#""storageKey":"quiz:physics-mock-nomis-quiz""#));
        assert!(!out.html.contains("alert('done')"));
    }

    #[test]
    fn test_every_legacy_stylesheet_is_discarded() {
        let html = "<html><head><script>var tpl = '<style>.x{}</style>';</script><style>body{color:red}</style><style>.q{color:blue}</style></head><body></body></html>";
        let out = assembler().transform(html).unwrap();

        assert_eq!(out.report.styles_removed, 1);
        assert!(!out.html.contains("body{color:red}"));
        assert!(!out.html.contains(".q{color:blue}"));
        assert!(out.html.contains("var tpl = '<style>.x{}</style>';"));
        assert_eq!(out.html.matches(r#"<style id="quiz-theme">"#).count(), 1);
    }

    #[test]
    fn test_defective_questions_are_reported() {
        let html = r#"<html><head><title>T</title></head><body><script>
const Q = [
  {question: "ok", options: ["a", "b"], correct: 1},
  {question: "bad", options: ["a", "b"], correct: 7}
];
</script></body></html>"#;
        let out = assembler().transform(html).unwrap();
        assert_eq!(out.report.question_count, 2);
        assert_eq!(out.report.questions_defective, 1);
        assert!(out.report.to_string().contains("1 道答案越界"));
    }

    #[test]
    fn test_rejects_brand_containing_source_token() {
        let config = Config::with_brand("Boss_Quiz_Robot Fans", "https://t.me/King_Nomis");
        let err = DocumentAssembler::new(&config).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_empty_document_fails() {
        let err = assembler().transform("  \n ").unwrap_err();
        assert!(matches!(err, AppError::Transform(TransformError::EmptyDocument)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let err = assembler().transform_bytes(vec![0xff, 0xfe, 0x3c]).unwrap_err();
        assert!(matches!(err, AppError::Transform(TransformError::NotUtf8 { .. })));
    }

    #[test]
    fn test_second_transform_is_stable() {
        let a = assembler();
        let once = a.transform(QUIZ).unwrap();
        let twice = a.transform(&once.html).unwrap();
        assert_eq!(twice.report.engine, EnginePlacement::Replaced);
        assert_eq!(twice.report.markup_added, 0);
        assert_eq!(twice.report.title, once.report.title);
        assert_eq!(twice.html, once.html);
    }

    #[test]
    fn test_run_step_converts_panic() {
        let err = run_step("theme", || -> usize { panic!("boom") }).unwrap_err();
        match err {
            AppError::Transform(TransformError::StepPanicked { step, message }) => {
                assert_eq!(step, "theme");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
