use crate::models::question::QuizQuestion;
use serde::{Deserialize, Serialize};

/// 错题扣分方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeMarking {
    /// 每题统一加 `positive_mark`，答错统一扣 `negative_mark`
    #[default]
    Flat,
    /// 每题按自身 `marks` 计分，答错扣 `marks * negative_mark`
    Fractional,
}

impl NegativeMarking {
    pub fn as_str(self) -> &'static str {
        match self {
            NegativeMarking::Flat => "flat",
            NegativeMarking::Fractional => "fractional",
        }
    }

    /// 从配置字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Some(NegativeMarking::Flat),
            "fractional" | "fraction" | "per-question" => Some(NegativeMarking::Fractional),
            _ => None,
        }
    }
}

/// 计分规则：答对 +k，答错 −m，未答 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkingScheme {
    pub positive_mark: f64,
    /// `Flat` 模式下是每道错题的扣分，`Fractional` 模式下是题目分值的比例
    pub negative_mark: f64,
    #[serde(default)]
    pub negative_marking: NegativeMarking,
}

impl Default for MarkingScheme {
    fn default() -> Self {
        Self {
            positive_mark: 4.0,
            negative_mark: 1.0,
            negative_marking: NegativeMarking::Flat,
        }
    }
}

impl MarkingScheme {
    pub fn flat(positive_mark: f64, negative_mark: f64) -> Self {
        Self {
            positive_mark,
            negative_mark,
            negative_marking: NegativeMarking::Flat,
        }
    }

    pub fn fractional(fallback_mark: f64, fraction: f64) -> Self {
        Self {
            positive_mark: fallback_mark,
            negative_mark: fraction,
            negative_marking: NegativeMarking::Fractional,
        }
    }

    /// 答对这道题的得分，同时也是这道题对满分的贡献
    pub fn award(&self, question: &QuizQuestion) -> f64 {
        match self.negative_marking {
            NegativeMarking::Flat => self.positive_mark,
            NegativeMarking::Fractional => question_weight(question),
        }
    }

    /// 答错这道题的扣分（正数）
    pub fn penalty(&self, question: &QuizQuestion) -> f64 {
        match self.negative_marking {
            NegativeMarking::Flat => self.negative_mark,
            NegativeMarking::Fractional => question_weight(question) * self.negative_mark,
        }
    }

    /// 没有题目数据时用于说明文字的单题分值
    pub fn nominal_award(&self) -> f64 {
        self.positive_mark
    }
}

// 负分值或非有限值的题目按 0 分处理
fn question_weight(question: &QuizQuestion) -> f64 {
    if question.marks.is_finite() && question.marks > 0.0 {
        question.marks
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(marks: f64) -> QuizQuestion {
        QuizQuestion {
            question: "Q".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            correct: 1,
            marks,
            explanation: None,
        }
    }

    #[test]
    fn test_flat_ignores_question_marks() {
        let scheme = MarkingScheme::default();
        assert_eq!(scheme.award(&question(2.0)), 4.0);
        assert_eq!(scheme.penalty(&question(2.0)), 1.0);
    }

    #[test]
    fn test_fractional_uses_question_marks() {
        let scheme = MarkingScheme::fractional(4.0, 0.25);
        assert_eq!(scheme.award(&question(2.0)), 2.0);
        assert_eq!(scheme.penalty(&question(2.0)), 0.5);
        assert_eq!(scheme.award(&question(-3.0)), 0.0);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(NegativeMarking::from_str("FLAT"), Some(NegativeMarking::Flat));
        assert_eq!(
            NegativeMarking::from_str(" fractional "),
            Some(NegativeMarking::Fractional)
        );
        assert_eq!(NegativeMarking::from_str("both"), None);
    }
}
