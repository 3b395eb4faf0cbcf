//! 品牌改写服务 - 业务能力层
//!
//! 只负责把来源品牌换成目标品牌，纯文本替换，可以重复执行

use crate::error::{AppError, AppResult};
use crate::infrastructure::{PatternExtractor, Target};
use crate::models::brand::BrandIdentity;
use crate::utils::html::escape;
use regex::{NoExpand, Regex};
use tracing::debug;

/// 一次品牌改写的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandRewrite {
    pub html: String,
    /// 是否改写了品牌链接
    pub anchor_rewritten: bool,
    /// 替换的裸文本出现次数
    pub replacements: usize,
}

/// 品牌改写服务
///
/// 职责：
/// - 把包含来源标识的第一个 `<a>` 改写成标准品牌链接
/// - 把其余所有来源标识（大小写不敏感）替换成目标名称
pub struct BrandRewriter {
    token: String,
    token_re: Regex,
    identity: BrandIdentity,
}

impl BrandRewriter {
    /// 目标品牌的名称或链接含有来源标识时返回配置错误
    pub fn new(source_token: &str, identity: &BrandIdentity) -> AppResult<Self> {
        let token = source_token.to_lowercase();
        if token.trim().is_empty() {
            return Err(AppError::invalid_config("source_brand_token", "品牌标识不能为空"));
        }
        if identity.name.to_lowercase().contains(&token)
            || identity.link.to_lowercase().contains(&token)
        {
            return Err(AppError::invalid_config(
                "brand_name",
                format!("品牌名称和链接不能包含来源标识 {}", source_token),
            ));
        }
        let token_re = Regex::new(&format!("(?i){}", regex::escape(source_token)))?;
        Ok(Self {
            token: source_token.to_string(),
            token_re,
            identity: identity.clone(),
        })
    }

    /// 标准品牌链接
    pub fn canonical_anchor(&self) -> String {
        format!(
            r#"<a class="brand" href="{}" target="_blank" rel="noopener">{}</a>"#,
            escape(&self.identity.link),
            escape(&self.identity.name)
        )
    }

    pub fn rewrite(&self, html: &str, extractor: &PatternExtractor) -> BrandRewrite {
        let mut output = String::with_capacity(html.len());
        let anchor_rewritten = match extractor.find(html, Target::BrandAnchor(&self.token)) {
            Some(anchor) => {
                debug!("改写品牌链接: {}", anchor.outer(html));
                output.push_str(&html[..anchor.start]);
                output.push_str(&self.canonical_anchor());
                output.push_str(&html[anchor.end..]);
                true
            }
            None => {
                debug!("没有找到品牌链接，只替换文本");
                output.push_str(html);
                false
            }
        };

        let replacements = self.token_re.find_iter(&output).count();
        let html = if replacements > 0 {
            self.token_re
                .replace_all(&output, NoExpand(&escape(&self.identity.name)))
                .into_owned()
        } else {
            output
        };

        BrandRewrite {
            html,
            anchor_rewritten,
            replacements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> (BrandRewriter, PatternExtractor) {
        let identity = BrandIdentity::new("Nomis Quiz", "https://t.me/King_Nomis");
        (
            BrandRewriter::new("Boss_Quiz_Robot", &identity).unwrap(),
            PatternExtractor::new().unwrap(),
        )
    }

    #[test]
    fn test_rewrites_anchor_and_bare_text() {
        let (rewriter, extractor) = rewriter();
        let html = r#"<div class="header"><a class="brand" href="https://t.me/Boss_Quiz_Robot">🤖 @boss_quiz_robot</a></div><p>Made by BOSS_QUIZ_ROBOT</p>"#;
        let out = rewriter.rewrite(html, &extractor);

        assert!(out.anchor_rewritten);
        assert_eq!(out.replacements, 1);
        assert_eq!(out.html.matches(&rewriter.canonical_anchor()).count(), 1);
        assert!(out.html.contains("<p>Made by Nomis Quiz</p>"));
        assert!(!out.html.to_lowercase().contains("boss_quiz_robot"));
    }

    #[test]
    fn test_rejects_brand_containing_token() {
        for identity in [
            BrandIdentity::new("Boss_Quiz_Robot Fans", "https://t.me/King_Nomis"),
            BrandIdentity::new("Nomis Quiz", "https://t.me/boss_quiz_robot_mirror"),
        ] {
            let err = BrandRewriter::new("Boss_Quiz_Robot", &identity).err().unwrap();
            assert!(matches!(
                err,
                AppError::Config(crate::error::ConfigError::InvalidValue { .. })
            ));
        }
        let identity = BrandIdentity::new("Nomis Quiz", "https://t.me/King_Nomis");
        assert!(BrandRewriter::new("  ", &identity).is_err());
    }

    #[test]
    fn test_without_anchor_replaces_text_only() {
        let (rewriter, extractor) = rewriter();
        let out = rewriter.rewrite("<h1>Boss_Quiz_Robot Test</h1>", &extractor);
        assert!(!out.anchor_rewritten);
        assert_eq!(out.html, "<h1>Nomis Quiz Test</h1>");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let (rewriter, extractor) = rewriter();
        let html = r#"<a href="https://t.me/Boss_Quiz_Robot">bot</a> Boss_Quiz_Robot <a href="/x">x</a>"#;
        let once = rewriter.rewrite(html, &extractor).html;
        let twice = rewriter.rewrite(&once, &extractor);
        assert_eq!(twice.html, once);
        assert!(!twice.anchor_rewritten);
        assert_eq!(twice.replacements, 0);
    }

    #[test]
    fn test_replacement_text_is_not_expanded() {
        let identity = BrandIdentity::new("$1 <Quiz>", "https://example.com/?a=1&b=2");
        let rewriter = BrandRewriter::new("Boss_Quiz_Robot", &identity).unwrap();
        let extractor = PatternExtractor::new().unwrap();
        let out = rewriter.rewrite(
            r#"<a href="https://t.me/Boss_Quiz_Robot">x</a> Boss_Quiz_Robot"#,
            &extractor,
        );
        assert!(out.html.contains(r#"href="https://example.com/?a=1&amp;b=2""#));
        assert!(out.html.ends_with(" $1 &lt;Quiz&gt;"));
    }
}
