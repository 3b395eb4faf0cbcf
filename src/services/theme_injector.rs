//! 主题注入服务 - 业务能力层
//!
//! 负责标题、整套样式表和主题按钮文字。样式表整体替换，不与原样式合并。

use crate::infrastructure::{PatternExtractor, Target};
use crate::utils::template::{element_id_vars, render};
use tracing::debug;

/// 注入的样式表的 `id`
pub const STYLESHEET_ID: &str = "quiz-theme";

/// 旧版文档中的长按钮文字 → 短文字
static BUTTON_LABELS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "🌙 Dark Mode" => "🌙 Dark",
    "☀️ Light Mode" => "☀️ Light",
};

/// 样式表的放置方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylesheetPlacement {
    /// 替换了已有的 `<style>`
    Replaced,
    /// 文档中没有 `<style>`，新插入
    Inserted,
}

/// 主题注入结果
#[derive(Debug, Clone)]
pub struct ThemedDocument {
    pub html: String,
    /// 替换后的完整标题
    pub title: String,
    pub stylesheet: StylesheetPlacement,
    /// 删除的多余 `<style>` 块数量
    pub styles_removed: usize,
    /// 规整过的按钮文字数量
    pub labels_normalized: usize,
}

/// 主题注入服务
pub struct ThemeInjector {
    title_suffix: String,
    default_title: String,
}

impl ThemeInjector {
    pub fn new(title_suffix: impl Into<String>, default_title: impl Into<String>) -> Self {
        Self {
            title_suffix: title_suffix.into(),
            default_title: default_title.into(),
        }
    }

    /// 文档原标题（去掉首尾空白），没有时使用默认标题
    pub fn source_title(&self, html: &str, extractor: &PatternExtractor) -> String {
        extractor
            .extract(html, Target::Title)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_title.clone())
    }

    /// "{标题} - {后缀}"，标题已经带后缀时不重复添加
    pub fn display_title(&self, title: &str) -> String {
        let suffix = format!(" - {}", self.title_suffix);
        if title.ends_with(&suffix) || title == self.title_suffix {
            title.to_string()
        } else {
            format!("{}{}", title, suffix)
        }
    }

    pub fn inject(&self, html: &str, extractor: &PatternExtractor) -> ThemedDocument {
        let title = self.display_title(&self.source_title(html, extractor));
        let html = self.replace_title(html, &title, extractor);
        let (html, stylesheet, styles_removed) = self.replace_stylesheet(&html, extractor);
        let (html, labels_normalized) = normalize_button_labels(&html);

        ThemedDocument {
            html,
            title,
            stylesheet,
            styles_removed,
            labels_normalized,
        }
    }

    fn replace_title(&self, html: &str, title: &str, extractor: &PatternExtractor) -> String {
        let tag = format!("<title>{}</title>", title);
        if let Some(found) = extractor.find(html, Target::Title) {
            return splice(html, found.start, found.end, &tag);
        }
        match extractor.head_open_end(html) {
            Some(at) => splice(html, at, at, &tag),
            None => {
                debug!("没有 <title> 和 <head>，跳过标题");
                html.to_string()
            }
        }
    }

    /// 保留一个位置写入新样式表，其余 `<style>` 块全部删除
    ///
    /// 位置优先取带 `quiz-theme` 标记的块，其次是第一个块。
    fn replace_stylesheet(
        &self,
        html: &str,
        extractor: &PatternExtractor,
    ) -> (String, StylesheetPlacement, usize) {
        let block = stylesheet_block();
        let blocks = extractor.style_blocks(html);

        if blocks.is_empty() {
            debug!("没有 <style>，插入新样式表");
            let at = extractor
                .head_close(html)
                .or_else(|| extractor.head_open_end(html))
                .or_else(|| extractor.html_open_end(html))
                .unwrap_or(0);
            return (
                splice(html, at, at, &format!("{}\n", block)),
                StylesheetPlacement::Inserted,
                0,
            );
        }

        let marker = format!("id=\"{}\"", STYLESHEET_ID);
        let keep = blocks
            .iter()
            .position(|m| html[m.start..m.inner_start].contains(&marker))
            .unwrap_or(0);

        let mut out = String::with_capacity(html.len() + block.len());
        let mut last = 0;
        for (i, m) in blocks.iter().enumerate() {
            out.push_str(&html[last..m.start]);
            if i == keep {
                out.push_str(&block);
            }
            last = m.end;
        }
        out.push_str(&html[last..]);

        let removed = blocks.len() - 1;
        if removed > 0 {
            debug!("删除了 {} 个旧的 <style> 块", removed);
        }
        (out, StylesheetPlacement::Replaced, removed)
    }
}

/// 完整的 `<style>` 块
pub fn stylesheet_block() -> String {
    format!(
        "<style id=\"{}\">\n{}</style>",
        STYLESHEET_ID,
        render(STYLESHEET, &element_id_vars())
    )
}

/// 把长按钮文字替换为短文字，返回替换次数
pub fn normalize_button_labels(html: &str) -> (String, usize) {
    let mut out = html.to_string();
    let mut count = 0;
    for (&long, &short) in BUTTON_LABELS.entries() {
        let n = out.matches(long).count();
        if n > 0 {
            out = out.replace(long, short);
            count += n;
        }
    }
    (out, count)
}

fn splice(html: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(html.len() + replacement.len());
    out.push_str(&html[..start]);
    out.push_str(replacement);
    out.push_str(&html[end..]);
    out
}

const STYLESHEET: &str = r#":root {
  --primary:#3a86ff; --secondary:#00bbf9; --danger:#ff5a5f; --warning:#ff9e00; --success:#10b981;
  --bg:#f0f2f5; --bg2:#e1e5eb; --card:#ffffff; --text:#1a1a1a; --muted:#666666; --border:#d1d9e6;
  --shadow:0 2px 8px rgba(0,0,0,0.08); --grad:linear-gradient(135deg,#3a86ff,#00bbf9);
  --opt:#f8fafc; --optH:#edf2f7;
}
body.dark-mode {
  --bg:#121826; --bg2:#1a2236; --card:#1f2937; --text:#e2e8f0; --muted:#94a3b8; --border:#374151; --opt:#2d3748; --optH:#374151;
}
*{box-sizing:border-box;margin:0;padding:0}
body{font-family:'Segoe UI', system-ui, -apple-system, sans-serif;background:var(--bg);color:var(--text);line-height:1.5;padding:16px;min-height:100vh}
.header{position:fixed;top:16px;left:16px;right:16px;display:flex;gap:12px;z-index:1001;align-items:center;justify-content:space-between}
.brand{background:var(--grad);color:#ffffff;padding:8px 16px;border-radius:8px;font-weight:600;text-decoration:none;font-size:14px;display:flex;align-items:center;gap:6px}
.brand:hover{opacity:0.9;transform:translateY(-1px)}
.timer,#%%ID_TIMER%%{background:var(--card);color:var(--primary);padding:8px 16px;border-radius:8px;font-weight:600;border:2px solid var(--primary);font-size:14px}
.timer.warning,#%%ID_TIMER%%.warning{background:var(--danger);color:#fff;animation:pulse 1s infinite}
@keyframes pulse{50%{opacity:0.7}}
.theme-btn,.submit-btn,#%%ID_THEME_TOGGLE%%,#%%ID_SUBMIT%%{background:var(--card);color:var(--primary);padding:8px 16px;border:2px solid var(--primary);border-radius:8px;font-weight:600;cursor:pointer;font-size:14px;transition:all 0.2s}
.submit-btn,#%%ID_SUBMIT%%{background:var(--primary);color:#fff}
.theme-btn:hover,.submit-btn:hover{opacity:0.9;transform:translateY(-1px)}

.start-screen,#%%ID_START%%{display:flex;flex-direction:column;align-items:center;justify-content:center;min-height:calc(100vh - 32px);background:linear-gradient(135deg,#3a86ff 0%,#00bbf9 100%);text-align:center;border-radius:16px;padding:40px 24px}
.start-title{font-size:2em;font-weight:700;color:#fff;margin-bottom:20px}
.instructions{background:var(--card);padding:24px;border-radius:12px;box-shadow:var(--shadow);max-width:500px;width:100%}
.instructions h2{color:var(--primary);margin-bottom:16px;font-size:1.2em}
.instruction-item{margin:12px 0;color:var(--muted);display:flex;align-items:center;gap:8px}
#marking-scheme-note{color:var(--text);font-weight:600}
.start-btn{background:#fff;color:var(--primary);padding:12px 32px;border:none;border-radius:25px;font-weight:600;cursor:pointer;margin-top:24px;font-size:16px;transition:all 0.2s}
.start-btn:hover{transform:translateY(-2px);box-shadow:0 4px 12px rgba(0,0,0,0.15)}

.container,#%%ID_QUIZ%%{display:flex;max-width:1200px;margin:80px auto 110px;gap:20px;min-height:calc(100vh - 200px)}
.question-panel,#%%ID_QUESTION%%{flex:3;background:var(--card);padding:24px;border-radius:12px;box-shadow:var(--shadow)}
.q-header{font-size:18px;font-weight:600;color:var(--primary);padding-bottom:12px;margin-bottom:16px;display:flex;justify-content:space-between;align-items:center}
.q-marks{background:var(--primary);color:#fff;padding:4px 12px;border-radius:20px;font-size:13px}
.q-timer{color:var(--primary);padding:8px 12px;background:var(--optH);border-radius:6px;text-align:right;margin-bottom:16px;font-size:14px}
.q-text{margin:16px 0;line-height:1.7;font-size:16px;background:var(--opt);padding:16px;border-radius:8px;border-left:3px solid var(--primary)}

.options,#%%ID_OPTIONS%%{list-style:none;margin-top:20px}
.option{margin:10px 0;padding:14px 16px;border-radius:8px;background:var(--opt);border:1px solid var(--border);cursor:pointer;display:flex;align-items:center;gap:12px;transition:all 0.2s}
.option:hover{background:var(--optH);border-color:var(--primary)}
.option input{transform:scale(1.1)}
.option.selected{background:var(--optH);border-color:var(--primary);font-weight:500}
.option.correct{background:#d1fae5!important;border-color:#10b981!important;color:#065f46}
.option.wrong{background:#fee2e2!important;border-color:#ef4444!important;color:#7f1d1d}
.option.locked{cursor:default}
.explanation{margin-top:16px;padding:14px 16px;border-radius:8px;background:var(--optH);border-left:3px solid var(--success);font-size:14px}

.palette,#%%ID_PALETTE%%{flex:1;background:var(--card);padding:20px;border-radius:12px;box-shadow:var(--shadow);height:fit-content}
.status-legend{background:var(--opt);padding:16px;border-radius:8px;margin-bottom:20px;display:grid;grid-template-columns:repeat(2,1fr);gap:12px;text-align:center}
.status-item div:first-child{font-size:20px;margin-bottom:4px;font-weight:600}
.palette-title{font-weight:600;margin-bottom:16px;color:var(--primary);text-align:center;font-size:16px}
.q-numbers{display:grid;grid-template-columns:repeat(5,1fr);gap:8px}
.q-num{background:#e2e8f0;padding:12px;text-align:center;cursor:pointer;border-radius:6px;font-weight:600;transition:all 0.2s;min-height:42px;display:flex;align-items:center;justify-content:center;font-size:14px;border:none;color:#1f2937}
.q-num.answered{background:#10b981;color:#fff}
.q-num.viewed{background:#3b82f6;color:#fff}
.q-num.reviewed{background:#f59e0b;color:#1f2937}
.q-num.current{border:2px solid var(--primary);box-shadow:0 0 0 2px rgba(58,134,255,0.2)}
.q-num.correct{background:#10b981;color:#fff}
.q-num.wrong{background:#ef4444;color:#fff}

body.dark-mode .q-num { background:#374151; color:#e5e7eb; }
body.dark-mode .q-num.current { background:#1e40af; color:#fff; }
body.dark-mode .q-num.answered { background:#065f46; color:#fff; }
body.dark-mode .q-num.viewed { background:#1d4ed8; color:#fff; }
body.dark-mode .q-num.reviewed { background:#d97706; color:#1f2937; }

#%%ID_NAV%%{position:fixed;bottom:20px;left:50%;transform:translateX(-50%);z-index:1000;display:flex;gap:12px;width:calc(100% - 32px);max-width:800px;background:var(--card);padding:16px;border-radius:12px;box-shadow:var(--shadow)}
#%%ID_NAV%% button{padding:12px 20px;border:2px solid var(--primary);background:var(--card);color:var(--primary);cursor:pointer;border-radius:8px;font-weight:600;flex:1;transition:all 0.2s}
#%%ID_NAV%% button:disabled{background:#e5e7eb;color:#6b7280;cursor:not-allowed;border-color:#e5e7eb;opacity:0.6}
#%%ID_NAV%% button:not(:disabled):hover{background:var(--primary);color:#fff}
#%%ID_NAV%% button.active{background:var(--warning);border-color:var(--warning);color:#1f2937}
#%%ID_PALETTE_TOGGLE%%{display:none}

#%%ID_MOBILE_PALETTE%%{display:none;position:fixed;left:0;right:0;bottom:0;max-height:70vh;overflow-y:auto;z-index:1002;background:var(--card);padding:20px 16px 96px;border-radius:16px 16px 0 0;box-shadow:0 -4px 16px rgba(0,0,0,0.2)}
#%%ID_MOBILE_PALETTE%%.open{display:block}
#%%ID_MOBILE_PALETTE%% .q-numbers{grid-template-columns:repeat(6,1fr)}

.result{text-align:center;padding:32px;background:linear-gradient(135deg,#f1f5f9,#e2e8f0);border-radius:12px}
body.dark-mode .result{background:linear-gradient(135deg,#1f2937,#374151)}
.result-title{font-size:24px;font-weight:700;color:var(--primary);margin-bottom:24px}
.metrics,#%%ID_METRICS%%{display:grid;grid-template-columns:repeat(2,1fr);gap:16px;margin-bottom:24px}
@media(min-width:768px){.metrics,#%%ID_METRICS%%{grid-template-columns:repeat(3,1fr)}}
.metric{background:var(--card);padding:16px;border-radius:8px;box-shadow:var(--shadow)}
.metric .metric-value{font-size:20px;font-weight:700;color:var(--primary);margin-bottom:4px}
.metric .metric-label{font-size:13px;color:var(--muted)}
.estimate-note{font-size:12px;color:var(--muted);margin-top:-12px;margin-bottom:20px}

#%%ID_RESULT_MODAL%%{display:none;position:fixed;inset:0;z-index:2000;background:rgba(15,23,42,0.6);align-items:center;justify-content:center;padding:16px}
#%%ID_RESULT_MODAL%%.open{display:flex}
#%%ID_RESULT_MODAL%% .result{max-width:640px;width:100%;max-height:90vh;overflow-y:auto;box-shadow:0 12px 32px rgba(0,0,0,0.3)}
.result-actions{display:flex;gap:12px;justify-content:center;flex-wrap:wrap}
.result-actions button{padding:10px 24px;border-radius:8px;border:2px solid var(--primary);background:var(--primary);color:#fff;font-weight:600;cursor:pointer}
.result-actions button.secondary{background:var(--card);color:var(--primary)}

@media(max-width:768px){
  .container,#%%ID_QUIZ%%{flex-direction:column;margin-top:100px}
  .question-panel,.palette,#%%ID_QUESTION%%{width:100%}
  #%%ID_PALETTE%%{display:none}
  #%%ID_NAV%%{bottom:0;left:0;right:0;transform:none;width:100%;max-width:none;border-radius:12px 12px 0 0;padding:10px;gap:8px}
  #%%ID_NAV%% button{padding:10px 6px;font-size:13px}
  #%%ID_PALETTE_TOGGLE%%{display:block}
  .header{flex-direction:column;gap:12px;align-items:stretch}
  .start-screen,#%%ID_START%%{padding:24px 16px}
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::element_ids;

    fn injector() -> (ThemeInjector, PatternExtractor) {
        (
            ThemeInjector::new("Nomis Quiz", "Nomis Quiz"),
            PatternExtractor::new().unwrap(),
        )
    }

    #[test]
    fn test_replaces_title_and_style() {
        let (injector, extractor) = injector();
        let html = "<html><head><title> Mock 3 </title><style>body{color:red}</style></head><body><button>🌙 Dark Mode</button></body></html>";
        let out = injector.inject(html, &extractor);

        assert_eq!(out.title, "Mock 3 - Nomis Quiz");
        assert!(out.html.contains("<title>Mock 3 - Nomis Quiz</title>"));
        assert_eq!(out.stylesheet, StylesheetPlacement::Replaced);
        assert!(!out.html.contains("color:red"));
        assert_eq!(out.html.matches("<style").count(), 1);
        assert!(out.html.contains("<button>🌙 Dark</button>"));
        assert_eq!(out.labels_normalized, 1);
    }

    #[test]
    fn test_discards_every_legacy_style() {
        let (injector, extractor) = injector();
        let html = "<html><head><style>body{color:red}</style><style>.q{color:blue}</style></head><body><style>.late{}</style></body></html>";
        let out = injector.inject(html, &extractor);

        assert_eq!(out.stylesheet, StylesheetPlacement::Replaced);
        assert_eq!(out.styles_removed, 2);
        assert_eq!(out.html.matches("<style").count(), 1);
        assert!(!out.html.contains("color:red"));
        assert!(!out.html.contains(".q{color:blue}"));
        assert!(!out.html.contains(".late{}"));
        assert!(out.html.find(STYLESHEET_ID).unwrap() < out.html.find("</head>").unwrap());

        let twice = injector.inject(&out.html, &extractor);
        assert_eq!(twice.styles_removed, 0);
        assert_eq!(twice.html, out.html);
    }

    #[test]
    fn test_style_literal_in_script_is_untouched() {
        let (injector, extractor) = injector();
        let html = "<html><head><script>var tpl = '<style>.x{}</style>';</script><style>body{color:red}</style></head><body></body></html>";
        let out = injector.inject(html, &extractor);

        assert!(out.html.contains("<script>var tpl = '<style>.x{}</style>';</script>"));
        assert!(!out.html.contains("body{color:red}"));
        assert_eq!(extractor.style_blocks(&out.html).len(), 1);
        assert!(extractor.find_tagged_block(&out.html, STYLESHEET_ID).is_some());
    }

    #[test]
    fn test_keeps_position_of_tagged_block() {
        let (injector, extractor) = injector();
        let html = "<html><head><style>.legacy{}</style></head><body></body></html>";
        let once = injector.inject(html, &extractor).html;
        // 在已转换的文档末尾再加一个旧样式
        let patched = once.replace("</body>", "<style>.added{}</style></body>");
        let out = injector.inject(&patched, &extractor);

        assert_eq!(out.styles_removed, 1);
        assert_eq!(out.html, once);
    }

    #[test]
    fn test_inserts_style_before_head_close() {
        let (injector, extractor) = injector();
        let html = "<html><head><title>T</title></head><body></body></html>";
        let out = injector.inject(html, &extractor);
        assert_eq!(out.stylesheet, StylesheetPlacement::Inserted);
        assert_eq!(out.html.matches("<style").count(), 1);
        let style_at = out.html.find("<style").unwrap();
        assert!(style_at < out.html.find("</head>").unwrap());
    }

    #[test]
    fn test_fallbacks_without_head() {
        let (injector, extractor) = injector();
        let out = injector.inject("<div>bare fragment</div>", &extractor);
        assert_eq!(out.title, "Nomis Quiz");
        assert!(out.html.starts_with("<style id=\"quiz-theme\">"));
        assert!(out.html.ends_with("<div>bare fragment</div>"));
    }

    #[test]
    fn test_second_pass_is_stable() {
        let (injector, extractor) = injector();
        let html = "<html><head><title>T</title></head><body><button>☀️ Light Mode</button></body></html>";
        let once = injector.inject(html, &extractor).html;
        let twice = injector.inject(&once, &extractor);
        assert_eq!(twice.html, once);
        assert_eq!(twice.title, "T - Nomis Quiz");
        assert_eq!(twice.stylesheet, StylesheetPlacement::Replaced);
    }

    #[test]
    fn test_stylesheet_uses_shared_ids() {
        let css = stylesheet_block();
        assert!(!css.contains("%%"));
        for id in [
            element_ids::NAV,
            element_ids::MOBILE_PALETTE,
            element_ids::RESULT_MODAL,
            element_ids::TIMER,
            element_ids::METRICS,
        ] {
            assert!(css.contains(&format!("#{}", id)), "样式表缺少 #{}", id);
        }
    }
}
