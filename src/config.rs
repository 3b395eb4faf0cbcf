use crate::error::{AppError, AppResult, ConfigError};
use crate::models::brand::{BrandIdentity, DEFAULT_BRAND_NAME, DEFAULT_SOURCE_TOKEN};
use crate::models::marking::{MarkingScheme, NegativeMarking};
use crate::workflow::quiz_session::PersistenceScope;
use serde::Deserialize;
use std::str::FromStr;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 替换后的品牌
    pub brand: BrandIdentity,
    /// 来源文档中的品牌标识
    pub source_brand_token: String,
    /// 标题后缀，生成 "{标题} - {后缀}"
    pub title_suffix: String,
    /// 文档没有 `<title>` 时使用的标题
    pub default_title: String,
    /// 计分规则
    pub marking: MarkingScheme,
    /// 评分脚本在本地存储中保存的范围
    pub persistence: PersistenceScope,
    /// 没有题目数据时用于展示的题目数量
    pub fallback_question_count: usize,
    /// 文档中没有倒计时设置时的时长（秒）
    pub default_duration_secs: u32,
    // --- 批处理配置 ---
    /// 待处理 HTML 文件目录
    pub input_folder: String,
    /// 输出目录
    pub output_folder: String,
    /// 输出文件名前缀
    pub output_prefix: String,
    /// 同时处理的文档数量
    pub max_concurrent_documents: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brand: BrandIdentity::default(),
            source_brand_token: DEFAULT_SOURCE_TOKEN.to_string(),
            title_suffix: DEFAULT_BRAND_NAME.to_string(),
            default_title: DEFAULT_BRAND_NAME.to_string(),
            marking: MarkingScheme::default(),
            persistence: PersistenceScope::Answers,
            fallback_question_count: 25,
            default_duration_secs: 25 * 60,
            input_folder: "input_html".to_string(),
            output_folder: "output_html".to_string(),
            output_prefix: "nomis_".to_string(),
            max_concurrent_documents: 8,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

/// TOML 配置文件，所有字段可选，缺省时沿用默认值
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub brand_name: Option<String>,
    pub brand_link: Option<String>,
    pub source_brand_token: Option<String>,
    pub title_suffix: Option<String>,
    pub default_title: Option<String>,
    pub positive_mark: Option<f64>,
    pub negative_mark: Option<f64>,
    pub negative_marking: Option<NegativeMarking>,
    pub persistence: Option<PersistenceScope>,
    pub fallback_question_count: Option<usize>,
    pub default_duration_secs: Option<u32>,
    pub input_folder: Option<String>,
    pub output_folder: Option<String>,
    pub output_prefix: Option<String>,
    pub max_concurrent_documents: Option<usize>,
    pub verbose_logging: Option<bool>,
    pub output_log_file: Option<String>,
}

impl FileConfig {
    /// 把文件中的配置叠加到 `base` 上
    pub fn apply_to(self, mut base: Config) -> Config {
        if let Some(v) = self.brand_name {
            base.brand.name = v;
        }
        if let Some(v) = self.brand_link {
            base.brand.link = v;
        }
        if let Some(v) = self.source_brand_token {
            base.source_brand_token = v;
        }
        if let Some(v) = self.title_suffix {
            base.title_suffix = v;
        }
        if let Some(v) = self.default_title {
            base.default_title = v;
        }
        if let Some(v) = self.positive_mark {
            base.marking.positive_mark = v;
        }
        if let Some(v) = self.negative_mark {
            base.marking.negative_mark = v;
        }
        if let Some(v) = self.negative_marking {
            base.marking.negative_marking = v;
        }
        if let Some(v) = self.persistence {
            base.persistence = v;
        }
        if let Some(v) = self.fallback_question_count {
            base.fallback_question_count = v;
        }
        if let Some(v) = self.default_duration_secs {
            base.default_duration_secs = v;
        }
        if let Some(v) = self.input_folder {
            base.input_folder = v;
        }
        if let Some(v) = self.output_folder {
            base.output_folder = v;
        }
        if let Some(v) = self.output_prefix {
            base.output_prefix = v;
        }
        if let Some(v) = self.max_concurrent_documents {
            base.max_concurrent_documents = v;
        }
        if let Some(v) = self.verbose_logging {
            base.verbose_logging = v;
        }
        if let Some(v) = self.output_log_file {
            base.output_log_file = v;
        }
        base
    }
}

impl Config {
    /// 使用指定品牌的默认配置
    pub fn with_brand(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            brand: BrandIdentity::new(name, link),
            ..Self::default()
        }
    }

    /// 默认配置叠加环境变量
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> AppResult<Self> {
        let base = self;
        let marking = MarkingScheme {
            positive_mark: env_parse("POSITIVE_MARK", "f64")?.unwrap_or(base.marking.positive_mark),
            negative_mark: env_parse("NEGATIVE_MARK", "f64")?.unwrap_or(base.marking.negative_mark),
            negative_marking: match env_string("NEGATIVE_MARKING") {
                Some(v) => NegativeMarking::from_str(&v)
                    .ok_or_else(|| parse_failed("NEGATIVE_MARKING", &v, "flat|fractional"))?,
                None => base.marking.negative_marking,
            },
        };
        let persistence = match env_string("PERSISTENCE") {
            Some(v) => PersistenceScope::from_str(&v)
                .ok_or_else(|| parse_failed("PERSISTENCE", &v, "answers|full"))?,
            None => base.persistence,
        };

        Ok(Self {
            brand: BrandIdentity {
                name: env_string("BRAND_NAME").unwrap_or(base.brand.name),
                link: env_string("BRAND_LINK").unwrap_or(base.brand.link),
            },
            source_brand_token: env_string("SOURCE_BRAND_TOKEN").unwrap_or(base.source_brand_token),
            title_suffix: env_string("TITLE_SUFFIX").unwrap_or(base.title_suffix),
            default_title: env_string("DEFAULT_TITLE").unwrap_or(base.default_title),
            marking,
            persistence,
            fallback_question_count: env_parse("FALLBACK_QUESTION_COUNT", "usize")?
                .unwrap_or(base.fallback_question_count),
            default_duration_secs: env_parse("DEFAULT_DURATION_SECS", "u32")?
                .unwrap_or(base.default_duration_secs),
            input_folder: env_string("INPUT_FOLDER").unwrap_or(base.input_folder),
            output_folder: env_string("OUTPUT_FOLDER").unwrap_or(base.output_folder),
            output_prefix: env_string("OUTPUT_PREFIX").unwrap_or(base.output_prefix),
            max_concurrent_documents: env_parse("MAX_CONCURRENT_DOCUMENTS", "usize")?
                .unwrap_or(base.max_concurrent_documents),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?.unwrap_or(base.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(base.output_log_file),
        })
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        let name = self.brand.name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_config("brand_name", "品牌名称不能为空"));
        }
        let link = self.brand.link.trim();
        if !(link.starts_with("https://") || link.starts_with("http://")) {
            return Err(AppError::invalid_config(
                "brand_link",
                format!("链接必须以 http:// 或 https:// 开头: {}", link),
            ));
        }
        let token = self.source_brand_token.to_lowercase();
        if token.trim().is_empty() {
            return Err(AppError::invalid_config("source_brand_token", "品牌标识不能为空"));
        }
        // 目标品牌里含有来源标识会让第二次替换继续改写文本
        if name.to_lowercase().contains(&token) || link.to_lowercase().contains(&token) {
            return Err(AppError::invalid_config(
                "brand_name",
                format!("品牌名称和链接不能包含来源标识 {}", self.source_brand_token),
            ));
        }
        for (field, value) in [
            ("positive_mark", self.marking.positive_mark),
            ("negative_mark", self.marking.negative_mark),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::invalid_config(
                    field,
                    format!("分值必须是非负数: {}", value),
                ));
            }
        }
        if self.max_concurrent_documents == 0 {
            return Err(AppError::invalid_config(
                "max_concurrent_documents",
                "并发数量必须大于 0",
            ));
        }
        Ok(())
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match env_string(var_name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| parse_failed(var_name, &value, expected_type)),
        None => Ok(None),
    }
}

fn parse_failed(var_name: &str, value: &str, expected_type: &str) -> AppError {
    AppError::Config(ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: value.to_string(),
        expected_type: expected_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::brand::DEFAULT_BRAND_LINK;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.brand.name, DEFAULT_BRAND_NAME);
        assert_eq!(config.brand.link, DEFAULT_BRAND_LINK);
        assert_eq!(config.marking, MarkingScheme::flat(4.0, 1.0));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config::with_brand("", "https://t.me/x");
        assert!(config.validate().is_err());

        let config = Config::with_brand("Mine", "t.me/x");
        assert!(config.validate().is_err());

        let config = Config::with_brand("Boss_Quiz_Robot Fan", "https://t.me/x");
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.marking.negative_mark = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_concurrent_documents = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_config_overlays_defaults() {
        let file: FileConfig = toml::from_str(
            r#"
            brand_name = "Physics Hub"
            positive_mark = 2.0
            negative_mark = 0.25
            negative_marking = "fractional"
            persistence = "full"
            "#,
        )
        .unwrap();
        let config = file.apply_to(Config::default());
        assert_eq!(config.brand.name, "Physics Hub");
        assert_eq!(config.brand.link, DEFAULT_BRAND_LINK);
        assert_eq!(config.marking, MarkingScheme::fractional(2.0, 0.25));
        assert_eq!(config.persistence, PersistenceScope::Full);
        assert_eq!(config.fallback_question_count, 25);
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        let parsed: Result<FileConfig, _> = toml::from_str("brand = 1");
        assert!(parsed.is_err());
    }
}
