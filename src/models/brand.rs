use serde::{Deserialize, Serialize};

/// 默认品牌名称
pub const DEFAULT_BRAND_NAME: &str = "Nomis Quiz";
/// 默认品牌链接
pub const DEFAULT_BRAND_LINK: &str = "https://t.me/King_Nomis";
/// 来源文档中需要替换掉的品牌标识
pub const DEFAULT_SOURCE_TOKEN: &str = "Boss_Quiz_Robot";

/// 目标品牌（名称 + 外链）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandIdentity {
    pub name: String,
    pub link: String,
}

impl Default for BrandIdentity {
    fn default() -> Self {
        Self {
            name: DEFAULT_BRAND_NAME.to_string(),
            link: DEFAULT_BRAND_LINK.to_string(),
        }
    }
}

impl BrandIdentity {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
        }
    }
}
