//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `document_assembler` - 单个文档转换
//! - 固定顺序调用三个服务
//! - 把意外中断转换为 `TransformError`
//! - 生成 `TransformReport`
//!
//! ### `batch_processor` - 批量文档处理器
//! - 扫描输入目录，写出转换后的文件
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PathBuf>)
//!     ↓
//! document_assembler (处理一个 HTML 文档)
//!     ↓
//! services (brand / theme / scoring)
//!     ↓
//! infrastructure (PatternExtractor)
//! ```

pub mod batch_processor;
pub mod document_assembler;

pub use batch_processor::{process_document, App, RunStats};
pub use document_assembler::{DocumentAssembler, TransformReport, TransformedDocument};
