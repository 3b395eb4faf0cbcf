use serde::{Deserialize, Serialize};

/// 内嵌在测验页面脚本中的单道题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// 题干（HTML 片段）
    pub question: String,
    /// 选项，按原始顺序
    #[serde(default)]
    pub options: Vec<String>,
    /// 正确选项，1 起始
    #[serde(deserialize_with = "deserialize_index")]
    pub correct: i64,
    /// 本题分值
    #[serde(default = "default_marks", deserialize_with = "deserialize_marks")]
    pub marks: f64,
    /// 解析（可选）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

fn default_marks() -> f64 {
    1.0
}

impl QuizQuestion {
    /// 正确选项在 `options` 中的 0 起始位置
    ///
    /// `correct` 超出 `[1, options.len()]` 时返回 `None`，这道题永远判不对
    pub fn correct_position(&self) -> Option<usize> {
        usize::try_from(self.correct)
            .ok()
            .filter(|&c| c >= 1 && c <= self.options.len())
            .map(|c| c - 1)
    }

    /// 判断 1 起始的 `choice` 是否为正确答案
    pub fn is_correct(&self, choice: usize) -> bool {
        self.correct_position().map(|p| p + 1) == Some(choice)
    }

    /// 数据是否完整（正确答案落在选项范围内）
    pub fn is_well_formed(&self) -> bool {
        self.correct_position().is_some()
    }
}

/// 题目数组的提取状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// 找到并成功解析
    Found,
    /// 文档中没有题目数组
    Missing,
    /// 找到了数组但无法解析
    Malformed,
}

/// 从文档中提取出的题目集合
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    /// 数组赋值的变量名，例如 `Q` 或 `questions`
    pub identifier: Option<String>,
    pub questions: Vec<QuizQuestion>,
    pub status: ExtractionStatus,
}

impl QuestionSet {
    pub fn missing() -> Self {
        Self {
            identifier: None,
            questions: Vec::new(),
            status: ExtractionStatus::Missing,
        }
    }

    pub fn malformed(identifier: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            questions: Vec::new(),
            status: ExtractionStatus::Malformed,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// 用于展示的题目数量，没有题目时退回到 `fallback`
    pub fn display_count(&self, fallback: usize) -> usize {
        if self.questions.is_empty() {
            fallback
        } else {
            self.questions.len()
        }
    }

    /// 数据不完整的题目数量
    pub fn defect_count(&self) -> usize {
        self.questions.iter().filter(|q| !q.is_well_formed()).count()
    }
}

// 正确答案可能写成数字、字符串或浮点数
fn deserialize_index<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IndexVisitor;

    impl<'de> Visitor<'de> for IndexVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer or numeric string option index")
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(i64::try_from(value).unwrap_or(i64::MAX))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.fract() == 0.0 && value.is_finite() {
                Ok(value as i64)
            } else {
                // 非整数索引不可能命中任何选项
                Ok(0)
            }
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().parse::<i64>().unwrap_or(0))
        }
    }

    deserializer.deserialize_any(IndexVisitor)
}

fn deserialize_marks<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct MarksVisitor;

    impl<'de> Visitor<'de> for MarksVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("无法解析分值: {}", value)))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(default_marks())
        }
    }

    deserializer.deserialize_any(MarksVisitor)
}
