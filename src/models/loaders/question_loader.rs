use crate::error::DataError;
use crate::infrastructure::{PatternExtractor, Target};
use crate::models::question::{ExtractionStatus, QuestionSet, QuizQuestion};
use tracing::{debug, info, warn};

/// 从 HTML 文档中提取题目数组
///
/// 找不到数组返回 `Missing`，数组无法解析返回 `Malformed`，两种情况都不会中断处理流程。
pub fn load_question_set(html: &str, extractor: &PatternExtractor) -> QuestionSet {
    let Some(found) = extractor.find(html, Target::DataArray) else {
        debug!("文档中没有题目数组");
        return QuestionSet::missing();
    };
    let identifier = found.name.clone().unwrap_or_default();
    let literal = found.inner(html);

    if !literal.trim_end().ends_with(']') {
        let err = DataError::UnterminatedArray {
            identifier: identifier.clone(),
        };
        warn!("⚠️ {}", err);
        return QuestionSet::malformed(identifier);
    }

    match parse_question_literal(literal) {
        Ok(questions) => {
            info!("✓ 提取到题目数组 {}，共 {} 道题", identifier, questions.len());
            QuestionSet {
                identifier: Some(identifier),
                questions,
                status: ExtractionStatus::Found,
            }
        }
        Err(source) => {
            let err = DataError::MalformedQuestions {
                identifier: identifier.clone(),
                source,
            };
            warn!("⚠️ {}", err);
            QuestionSet::malformed(identifier)
        }
    }
}

/// 解析题目数组字面量
///
/// 先按 JSON 解析，失败后把脚本字面量（裸键名、单引号、尾逗号、注释）规整成 JSON 再试一次。
pub fn parse_question_literal(literal: &str) -> Result<Vec<QuizQuestion>, serde_json::Error> {
    match serde_json::from_str(literal) {
        Ok(questions) => Ok(questions),
        Err(_) => serde_json::from_str(&normalize_script_literal(literal)),
    }
}

/// 把脚本对象字面量规整为 JSON 文本
pub fn normalize_script_literal(literal: &str) -> String {
    let chars: Vec<char> = literal.chars().collect();
    let mut out = String::with_capacity(literal.len() + literal.len() / 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = string_end(&chars, i, '"');
                out.extend(&chars[i..end]);
                i = end;
            }
            '\'' | '`' => {
                let end = string_end(&chars, i, c);
                out.push('"');
                push_requoted(&mut out, &chars[i + 1..end.saturating_sub(1).max(i + 1)], c);
                out.push('"');
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some(']') | Some('}')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let next = chars[i..].iter().find(|ch| !ch.is_whitespace());
                let prev = out.chars().rev().find(|ch| !ch.is_whitespace());
                if next == Some(&':') && matches!(prev, Some('{') | Some(',')) {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else if word == "undefined" {
                    out.push_str("null");
                } else {
                    out.push_str(&word);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

// 返回结束引号之后的位置，不闭合时返回末尾
fn string_end(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn push_requoted(out: &mut String, body: &[char], quote: char) {
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            '\\' if body.get(i + 1) == Some(&quote) => {
                out.push(quote);
                i += 2;
            }
            '\\' => {
                out.push('\\');
                if let Some(next) = body.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            '\n' => {
                out.push_str("\\n");
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let literal = r#"[{"question":"A?","options":["x","y"],"correct":1,"marks":4}]"#;
        let questions = parse_question_literal(literal).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].marks, 4.0);
    }

    #[test]
    fn test_parse_script_literal() {
        let literal = r#"[
            // 第一题
            { question: 'It\'s <b>bold</b>', options: ['say "hi"', "b"], correct: 2, marks: 4, },
            /* 第二题 */
            { question: `multi`, options: ['a', 'b', 'c'], correct: 3, explanation: undefined },
        ]"#;
        let questions = parse_question_literal(literal).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "It's <b>bold</b>");
        assert_eq!(questions[0].options[0], "say \"hi\"");
        assert_eq!(questions[1].correct, 3);
        assert_eq!(questions[1].explanation, None);
    }

    #[test]
    fn test_colon_inside_string_is_not_a_key() {
        let literal = r#"[{question: 'Ratio a:b', options: ['1:2'], correct: 1}]"#;
        let questions = parse_question_literal(literal).unwrap();
        assert_eq!(questions[0].question, "Ratio a:b");
        assert_eq!(questions[0].options[0], "1:2");
    }

    #[test]
    fn test_malformed_literal_is_error() {
        assert!(parse_question_literal("[{question: }]").is_err());
        assert!(parse_question_literal("[{options: ['a']}]").is_err());
    }

    #[test]
    fn test_load_question_set_statuses() {
        let extractor = PatternExtractor::new().unwrap();

        let html = r#"<script>const Q = [{question:"1",options:["a","b"],correct:1,marks:4}];</script>"#;
        let set = load_question_set(html, &extractor);
        assert_eq!(set.status, ExtractionStatus::Found);
        assert_eq!(set.identifier.as_deref(), Some("Q"));
        assert_eq!(set.len(), 1);

        let set = load_question_set("<script>let x = 1;</script>", &extractor);
        assert_eq!(set.status, ExtractionStatus::Missing);

        let html = r#"<script>const Q = [{question: oops(), options: []}];</script>"#;
        let set = load_question_set(html, &extractor);
        assert_eq!(set.status, ExtractionStatus::Malformed);
        assert!(set.is_empty());
    }
}
