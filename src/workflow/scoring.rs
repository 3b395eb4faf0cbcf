//! 计分
//!
//! 交卷时执行一次：统计对/错/未答，按计分规则算出原始分、百分比和估算百分位。

use crate::models::marking::MarkingScheme;
use crate::models::question::QuizQuestion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 估算百分位的上限
pub const PERCENTILE_CAP: f64 = 99.9;

/// 成绩报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    pub unanswered: usize,
    pub raw_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    /// 模拟出来的"超过多少考生"，不来自任何真实数据
    pub percentile_estimate: f64,
}

impl ScoreReport {
    /// 作答的题目数
    pub fn attempted(&self) -> usize {
        self.correct + self.wrong
    }

    /// 正确率（只算作答的题），没有作答时为 0
    pub fn accuracy(&self) -> f64 {
        match self.attempted() {
            0 => 0.0,
            n => 100.0 * self.correct as f64 / n as f64,
        }
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "得分 {}/{} ({:.2}%) | 对 {} 错 {} 未答 {} | 估算百分位 {:.1}",
            trim_number(self.raw_score),
            trim_number(self.max_score),
            self.percentage,
            self.correct,
            self.wrong,
            self.unanswered,
            self.percentile_estimate
        )
    }
}

/// 计算成绩
///
/// `responses` 的键是 0 起始的题号，值是 1 起始的选项号；题号越界的作答被忽略。
/// 正确答案越界的题目只要作答就算错。
pub fn score(
    questions: &[QuizQuestion],
    responses: &BTreeMap<usize, usize>,
    scheme: &MarkingScheme,
) -> ScoreReport {
    let total = questions.len();
    let mut correct = 0;
    let mut wrong = 0;
    let mut raw_score = 0.0;
    let mut max_score = 0.0;

    for (index, question) in questions.iter().enumerate() {
        let award = scheme.award(question);
        max_score += award;
        match responses.get(&index) {
            Some(&choice) if question.is_correct(choice) => {
                correct += 1;
                raw_score += award;
            }
            Some(_) => {
                wrong += 1;
                raw_score -= scheme.penalty(question);
            }
            None => {}
        }
    }

    let unanswered = total - correct - wrong;
    let (percentage, percentile_estimate) = if max_score > 0.0 {
        let percentage = 100.0 * raw_score / max_score;
        (percentage, percentile_estimate(percentage))
    } else {
        (0.0, 0.0)
    };

    ScoreReport {
        total,
        correct,
        wrong,
        unanswered,
        raw_score,
        max_score,
        percentage,
        percentile_estimate,
    }
}

/// 估算百分位：`min(99.9, max(0, p + (100 - p) * 0.3))`
pub fn percentile_estimate(percentage: f64) -> f64 {
    (percentage + (100.0 - percentage) * 0.3).clamp(0.0, PERCENTILE_CAP)
}

/// 整数分值不带小数点
pub fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.2}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
