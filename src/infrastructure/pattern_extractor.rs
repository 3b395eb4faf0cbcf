//! 模式提取器 - 基础设施层
//!
//! 持有编译好的正则，只暴露"在原始 HTML 中定位某个区域"的能力。
//! 所有查找都只取第一个匹配，找不到时返回 `None`，由调用方决定退路。

use crate::error::AppResult;
use crate::infrastructure::scanner::{find_element_end, find_matching};
use regex::Regex;

/// 可以定位的目标区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// `<title>` 元素
    Title,
    /// `<body>` 元素
    Body,
    /// 第一个不在 `<script>` 内的 `<style>` 块
    StyleBlock,
    /// 第一个 `<script>` 块
    ScriptBlock,
    /// `href` 或文字中包含给定品牌标识的第一个 `<a>` 元素
    BrandAnchor(&'a str),
    /// `class` 含 `instructions` 的说明区域
    InstructionsBlock,
    /// 指定名称的函数定义（`function f(..) {..}` 或 `const f = (..) => {..}`）
    NamedFunction(&'a str),
    /// 脚本中 `name = [ {...}, ... ]` 形式的题目数组
    DataArray,
    /// 脚本中的倒计时秒数赋值
    TimerSeconds,
}

impl Target<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Title => "title",
            Target::Body => "body",
            Target::StyleBlock => "style-block",
            Target::ScriptBlock => "script-block",
            Target::BrandAnchor(_) => "brand-anchor",
            Target::InstructionsBlock => "instructions-block",
            Target::NamedFunction(_) => "named-function",
            Target::DataArray => "data-array",
            Target::TimerSeconds => "timer-seconds",
        }
    }
}

/// 一次匹配的位置
///
/// `start..end` 是整个区域，`inner_start..inner_end` 是区域内容
/// （标签之间的文本、函数体、数组字面量等）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub inner_start: usize,
    pub inner_end: usize,
    /// 数组赋值的变量名
    pub name: Option<String>,
}

impl Match {
    fn new(start: usize, end: usize, inner_start: usize, inner_end: usize) -> Self {
        Self {
            start,
            end,
            inner_start,
            inner_end,
            name: None,
        }
    }

    pub fn outer<'h>(&self, html: &'h str) -> &'h str {
        &html[self.start..self.end]
    }

    pub fn inner<'h>(&self, html: &'h str) -> &'h str {
        &html[self.inner_start..self.inner_end]
    }

    fn shifted(mut self, offset: usize) -> Self {
        self.start += offset;
        self.end += offset;
        self.inner_start += offset;
        self.inner_end += offset;
        self
    }
}

/// 模式提取器
///
/// 职责：
/// - 持有所有固定的正则
/// - 只读扫描，不修改文档
/// - 不认识品牌、主题或计分规则
pub struct PatternExtractor {
    title: Regex,
    body: Regex,
    style: Regex,
    script: Regex,
    anchor: Regex,
    instructions_open: Regex,
    data_array: Regex,
    timer_seconds: Regex,
    head_open: Regex,
    head_close: Regex,
    body_close: Regex,
    html_open: Regex,
}

impl PatternExtractor {
    /// 编译所有正则
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            title: Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>")?,
            body: Regex::new(r"(?is)<body\b[^>]*>(.*?)</body\s*>")?,
            style: Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>")?,
            script: Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>")?,
            anchor: Regex::new(r"(?is)<a\b[^>]*>(.*?)</a\s*>")?,
            instructions_open: Regex::new(
                r#"(?i)<div\b[^>]*\bclass\s*=\s*["'][^"']*\binstructions\b[^"']*["'][^>]*>"#,
            )?,
            data_array: Regex::new(
                r"(?:\b(?:const|let|var)\s+)?([A-Za-z_$][\w$]*)\s*=\s*(\[)\s*\{",
            )?,
            timer_seconds: Regex::new(
                r"(?i)\b(?:timeLeft|totalTime|duration|timeRemaining)\s*=\s*(\d+)\s*[;,\n]",
            )?,
            head_open: Regex::new(r"(?i)<head\b[^>]*>")?,
            head_close: Regex::new(r"(?i)</head\s*>")?,
            body_close: Regex::new(r"(?i)</body\s*>")?,
            html_open: Regex::new(r"(?i)<html\b[^>]*>")?,
        })
    }

    /// 定位目标区域，只返回第一个匹配
    pub fn find(&self, html: &str, target: Target<'_>) -> Option<Match> {
        match target {
            Target::Title => captured(&self.title, html),
            Target::Body => captured(&self.body, html),
            Target::StyleBlock => self.style_blocks(html).into_iter().next(),
            Target::ScriptBlock => captured(&self.script, html),
            Target::BrandAnchor(token) => self.find_brand_anchor(html, token),
            Target::InstructionsBlock => self.find_instructions(html),
            Target::NamedFunction(name) => self.find_in_scripts(html, |script| {
                find_function(script, name)
            }),
            Target::DataArray => self.find_in_scripts(html, |script| self.find_data_array(script)),
            Target::TimerSeconds => self.find_in_scripts(html, |script| {
                captured(&self.timer_seconds, script)
            }),
        }
    }

    /// 找到目标区域的文本
    pub fn extract<'h>(&self, html: &'h str, target: Target<'_>) -> Option<&'h str> {
        self.find(html, target).map(|m| m.inner(html))
    }

    /// 所有 `<script>` 块（跳过 `skip_id` 指定的脚本）
    pub fn scripts(&self, html: &str, skip_id: Option<&str>) -> Vec<Match> {
        self.script
            .captures_iter(html)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let inner = caps.get(1)?;
                let open_tag = &html[whole.start()..inner.start()];
                if let Some(id) = skip_id {
                    if open_tag.contains(&format!("id=\"{}\"", id)) {
                        return None;
                    }
                }
                Some(Match::new(whole.start(), whole.end(), inner.start(), inner.end()))
            })
            .collect()
    }

    /// 所有不在 `<script>` 内的 `<style>` 块，按出现顺序
    pub fn style_blocks(&self, html: &str) -> Vec<Match> {
        let scripts = self.scripts(html, None);
        let mut blocks = Vec::new();
        let mut at = 0;
        while at <= html.len() {
            let Some(caps) = self.style.captures_at(html, at) else {
                break;
            };
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            // 脚本里的字符串不算样式块，从脚本结尾继续找
            if let Some(script) = scripts
                .iter()
                .find(|s| s.start < whole.start() && whole.start() < s.end)
            {
                at = script.end;
                continue;
            }
            blocks.push(Match::new(whole.start(), whole.end(), inner.start(), inner.end()));
            at = whole.end();
        }
        blocks
    }

    /// 找到 `id` 对应的 `<script>` 或 `<style>` 块
    pub fn find_tagged_block(&self, html: &str, id: &str) -> Option<Match> {
        let marker = format!("id=\"{}\"", id);
        self.scripts(html, None)
            .into_iter()
            .chain(self.style_blocks(html))
            .find(|m| html[m.start..m.inner_start].contains(&marker))
    }

    /// `</head>` 的起始位置
    pub fn head_close(&self, html: &str) -> Option<usize> {
        self.head_close.find(html).map(|m| m.start())
    }

    /// `<head ...>` 之后的位置
    pub fn head_open_end(&self, html: &str) -> Option<usize> {
        self.head_open.find(html).map(|m| m.end())
    }

    /// `</body>` 的起始位置
    pub fn body_close(&self, html: &str) -> Option<usize> {
        self.body_close.find(html).map(|m| m.start())
    }

    /// `<html ...>` 之后的位置
    pub fn html_open_end(&self, html: &str) -> Option<usize> {
        self.html_open.find(html).map(|m| m.end())
    }

    fn find_brand_anchor(&self, html: &str, token: &str) -> Option<Match> {
        if token.is_empty() {
            return None;
        }
        let token = token.to_lowercase();
        self.anchor.captures_iter(html).find_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            whole
                .as_str()
                .to_lowercase()
                .contains(&token)
                .then(|| Match::new(whole.start(), whole.end(), inner.start(), inner.end()))
        })
    }

    fn find_instructions(&self, html: &str) -> Option<Match> {
        let open = self.instructions_open.find(html)?;
        let end = find_element_end(html, open.start(), "div")?;
        let close_start = html[..end].rfind("</")?;
        Some(Match::new(open.start(), end, open.end(), close_start))
    }

    fn find_data_array(&self, script: &str) -> Option<Match> {
        let mut first = None;
        for caps in self.data_array.captures_iter(script) {
            let (Some(whole), Some(name), Some(bracket)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let Some(close) = find_matching(script, bracket.start()) else {
                // 括号不闭合：保留位置，内容为到脚本结尾，交给解析阶段判为格式错误
                let mut m = Match::new(whole.start(), script.len(), bracket.start(), script.len());
                m.name = Some(name.as_str().to_string());
                first.get_or_insert(m);
                continue;
            };
            let mut m = Match::new(whole.start(), close + 1, bracket.start(), close + 1);
            m.name = Some(name.as_str().to_string());
            if m.inner(script).contains("question") {
                return Some(m);
            }
            first.get_or_insert(m);
        }
        first
    }

    fn find_in_scripts<F>(&self, html: &str, mut find: F) -> Option<Match>
    where
        F: FnMut(&str) -> Option<Match>,
    {
        self.scripts(html, None).into_iter().find_map(|script| {
            let content = script.inner(html);
            find(content).map(|m| m.shifted(script.inner_start))
        })
    }
}

fn captured(re: &Regex, text: &str) -> Option<Match> {
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    let inner = caps.get(1)?;
    Some(Match::new(whole.start(), whole.end(), inner.start(), inner.end()))
}

/// 在一段脚本中找到函数定义，`inner` 为函数体（含花括号）
fn find_function(script: &str, name: &str) -> Option<Match> {
    let escaped = regex::escape(name);
    let declaration = Regex::new(&format!(
        r"(?:\bfunction\s+{0}\s*(\()|\b(?:const|let|var)\s+{0}\s*=\s*(?:function\b\s*\w*\s*(\()|(\()))",
        escaped
    ))
    .ok()?;

    let caps = declaration.captures(script)?;
    let whole = caps.get(0)?;
    let paren = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    let params_end = find_matching(script, paren.start())?;

    let after = &script[params_end + 1..];
    let offset = after.find(|c: char| !c.is_whitespace() && c != '=' && c != '>')?;
    let body_open = params_end + 1 + offset;
    if script.as_bytes().get(body_open) != Some(&b'{') {
        return None;
    }
    let body_close = find_matching(script, body_open)?;

    let mut end = body_close + 1;
    if script[end..].starts_with(';') {
        end += 1;
    }
    Some(Match::new(whole.start(), end, body_open, body_close + 1))
}
