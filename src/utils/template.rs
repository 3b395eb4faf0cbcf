//! `%%KEY%%` 占位符替换
//!
//! 样式表和脚本里到处是花括号，不适合用 `format!`，这里用固定的占位符。

use crate::models::element_ids;

/// 把模板中的 `%%KEY%%` 替换为对应的值，未知占位符保持原样
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(start) = rest.find("%%") {
        let after = &rest[start + 2..];
        let Some(len) = after.find("%%") else {
            break;
        };
        let key = &after[..len];
        let is_key = !key.is_empty() && key.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        match vars.iter().find(|(name, _)| is_key && *name == key) {
            Some((_, value)) => {
                out.push_str(&rest[..start]);
                out.push_str(value);
                rest = &after[len + 2..];
            }
            None => {
                out.push_str(&rest[..start + 2]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// 元素 ID 占位符
pub fn element_id_vars() -> Vec<(&'static str, String)> {
    element_ids::ALL
        .iter()
        .map(|(key, id)| (*key, (*id).to_string()))
        .collect()
}
