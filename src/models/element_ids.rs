//! 主题样式与评分脚本共用的元素 ID 词表
//!
//! 样式表、补充的导航标记和评分脚本都只从这里取 ID，
//! 模板中以 `%%KEY%%` 占位，渲染时统一替换。

/// 题目区域
pub const QUESTION_CONTAINER: &str = "question-area";
/// 选项列表
pub const OPTIONS_LIST: &str = "options";
/// 桌面端题号面板
pub const PALETTE: &str = "palette";
/// 移动端题号面板
pub const MOBILE_PALETTE: &str = "mobile-palette";
/// 倒计时显示
pub const TIMER: &str = "timer";
/// 成绩指标容器
pub const METRICS: &str = "metrics";
/// 成绩弹窗
pub const RESULT_MODAL: &str = "result-modal";
/// 固定底部导航栏
pub const NAV: &str = "nav";
/// 上一题
pub const PREV_BUTTON: &str = "prev-btn";
/// 下一题
pub const NEXT_BUTTON: &str = "next-btn";
/// 标记复查
pub const MARK_BUTTON: &str = "mark-btn";
/// 交卷
pub const SUBMIT_BUTTON: &str = "submit-btn";
/// 移动端题号面板开关
pub const PALETTE_TOGGLE: &str = "palette-toggle";
/// 深色/浅色切换
pub const THEME_TOGGLE: &str = "theme-toggle";
/// 开始界面
pub const START_SCREEN: &str = "start-screen";
/// 答题界面
pub const QUIZ_CONTAINER: &str = "quiz-container";

/// 模板占位符与 ID 的对应表
pub const ALL: &[(&str, &str)] = &[
    ("ID_QUESTION", QUESTION_CONTAINER),
    ("ID_OPTIONS", OPTIONS_LIST),
    ("ID_PALETTE", PALETTE),
    ("ID_MOBILE_PALETTE", MOBILE_PALETTE),
    ("ID_TIMER", TIMER),
    ("ID_METRICS", METRICS),
    ("ID_RESULT_MODAL", RESULT_MODAL),
    ("ID_NAV", NAV),
    ("ID_PREV", PREV_BUTTON),
    ("ID_NEXT", NEXT_BUTTON),
    ("ID_MARK", MARK_BUTTON),
    ("ID_SUBMIT", SUBMIT_BUTTON),
    ("ID_PALETTE_TOGGLE", PALETTE_TOGGLE),
    ("ID_THEME_TOGGLE", THEME_TOGGLE),
    ("ID_START", START_SCREEN),
    ("ID_QUIZ", QUIZ_CONTAINER),
];

/// 文档中是否已有某个 ID 的元素
pub fn present_in(html: &str, id: &str) -> bool {
    html.contains(&format!("id=\"{}\"", id)) || html.contains(&format!("id='{}'", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = ALL.iter().map(|(_, id)| *id).collect();
        assert_eq!(ids.len(), ALL.len());
        let keys: HashSet<_> = ALL.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys.len(), ALL.len());
    }

    #[test]
    fn test_present_in_both_quote_styles() {
        assert!(present_in(r#"<div id="nav"></div>"#, NAV));
        assert!(present_in("<div id='nav'></div>", NAV));
        assert!(!present_in(r#"<div id="navbar"></div>"#, NAV));
    }
}
