use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文档转换失败（唯一会返回给调用方的致命错误）
    #[error("转换错误: {0}")]
    Transform(#[from] TransformError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 匹配模式编译失败
    #[error("匹配模式错误: {0}")]
    Pattern(#[from] regex::Error),
}

/// 文档转换的致命错误
#[derive(Debug, Error)]
pub enum TransformError {
    /// 输入文档为空
    #[error("输入文档为空")]
    EmptyDocument,
    /// 输入不是合法的 UTF-8 文本
    #[error("输入不是 UTF-8 文本: {source}")]
    NotUtf8 {
        #[source]
        source: std::string::FromUtf8Error,
    },
    /// 样式表注入后未出现在文档中
    #[error("样式表注入失败，输出文档中找不到主题样式")]
    MissingStylesheet,
    /// 评分脚本注入后未出现在文档中
    #[error("评分脚本注入失败，输出文档中找不到评分引擎")]
    MissingEngine,
    /// 某个步骤发生了意外中断
    #[error("步骤 {step} 意外中断: {message}")]
    StepPanicked { step: &'static str, message: String },
}

/// 内嵌题目数据错误，在提取阶段本地恢复并写入日志
#[derive(Debug, Error)]
pub enum DataError {
    /// 题目数组无法解析
    #[error("题目数组 {identifier} 无法解析: {source}")]
    MalformedQuestions {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
    /// 找到了赋值但数组括号不闭合
    #[error("题目数组 {identifier} 括号不闭合")]
    UnterminatedArray { identifier: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建配置值错误
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        })
    }

    /// 是否为致命的转换错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Transform(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
