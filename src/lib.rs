//! # Quiz Rebrand
//!
//! 测验 HTML 文档改写引擎：替换品牌、整套主题样式和评分逻辑，生成新的文档。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 只读扫描，定位文档中的区域
//! - `PatternExtractor` - 持有所有正则，找不到时返回 `None`
//!
//! ### ② 业务能力层（Services）
//! - `BrandRewriter` - 品牌链接和品牌文字替换
//! - `ThemeInjector` - 标题、样式表、主题按钮文字
//! - `ScoringInjector` - 评分引擎脚本、处理函数存根、缺失的标记
//!
//! ### ③ 流程层（Workflow）
//! - `scoring` - 计分算法
//! - `QuizSession` - 答题状态机，注入脚本的参考模型
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/document_assembler` - 单个文档的固定转换顺序
//! - `orchestrator/batch_processor` - 目录批处理，管理并发
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, TransformError};
pub use infrastructure::PatternExtractor;
pub use models::{BrandIdentity, MarkingScheme, NegativeMarking, QuestionSet, QuizQuestion};
pub use orchestrator::{App, DocumentAssembler, TransformReport, TransformedDocument};
pub use workflow::{score, PersistenceScope, QuizSession, ScoreReport};
