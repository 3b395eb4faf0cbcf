//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是命令行入口使用的批处理驱动，负责文件 I/O 和并发调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、构建 `DocumentAssembler`
//! 2. **批量加载**：扫描输入目录中的 `.html` / `.htm` 文件
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将文档分批次处理，每批完成后再开始下一批
//! 5. **结果输出**：以 `{前缀}{原文件名}` 写入输出目录
//! 6. **全局统计**：汇总所有文档的处理结果

use crate::config::Config;
use crate::models::loaders::list_html_files;
use crate::orchestrator::document_assembler::{DocumentAssembler, TransformReport};
use crate::utils::logging;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    assembler: Arc<DocumentAssembler>,
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(config.max_concurrent_documents, &config.brand.name);

        let assembler = DocumentAssembler::new(&config).context("构建文档组装器失败")?;

        Ok(Self {
            config: Arc::new(config),
            assembler: Arc::new(assembler),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        let documents = self.load_documents().await?;

        if documents.is_empty() {
            warn!("⚠️ 没有找到待处理的 HTML 文件，程序结束");
            return Ok(RunStats::default());
        }

        fs::create_dir_all(&self.config.output_folder)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.config.output_folder))?;

        logging::log_documents_loaded(documents.len(), self.config.max_concurrent_documents);

        let stats = self.process_all_documents(documents).await?;

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// 扫描输入目录
    async fn load_documents(&self) -> Result<Vec<PathBuf>> {
        info!("📁 正在扫描待处理的文档...");
        let files = list_html_files(&self.config.input_folder).await?;
        Ok(files)
    }

    /// 处理所有文档
    async fn process_all_documents(&self, documents: Vec<PathBuf>) -> Result<RunStats> {
        let per_batch = self.config.max_concurrent_documents.max(1);
        let semaphore = Arc::new(Semaphore::new(per_batch));
        let total = documents.len();
        let total_batches = total.div_ceil(per_batch);
        let mut stats = RunStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in documents.chunks(per_batch).enumerate() {
            let batch_start = batch_idx * per_batch;
            let batch_num = batch_idx + 1;

            logging::log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let result = self.process_batch(batch, batch_start, semaphore.clone()).await?;

            stats.success += result.success;
            stats.failed += result.failed;

            logging::log_batch_complete(batch_num, result.success, result.success + result.failed);
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[PathBuf],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::new();

        for (idx, path) in batch.iter().enumerate() {
            let doc_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let assembler = self.assembler.clone();
            let config = self.config.clone();
            let path = path.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                match process_document(&assembler, &path, doc_index, &config).await {
                    Ok(_) => true,
                    Err(e) => {
                        error!("[文档 {}] ❌ 处理失败: {:#}", doc_index, e);
                        let line = format!("[文档 {}] ❌ {} | {:#}", doc_index, path.display(), e);
                        if let Err(log_err) = append_log_line(&config.output_log_file, &line).await {
                            warn!("[文档 {}] 写入日志文件失败: {}", doc_index, log_err);
                        }
                        false
                    }
                }
            });
            handles.push((doc_index, handle));
        }

        // 等待本批所有任务完成
        let outcomes = join_all(
            handles
                .into_iter()
                .map(|(doc_index, handle)| async move { (doc_index, handle.await) }),
        )
        .await;

        let mut result = BatchResult::default();
        for (doc_index, outcome) in outcomes {
            match outcome {
                Ok(true) => result.success += 1,
                Ok(false) => result.failed += 1,
                Err(e) => {
                    error!("[文档 {}] 任务执行失败: {}", doc_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理单个文档：读取、转换、写出
pub async fn process_document(
    assembler: &DocumentAssembler,
    path: &Path,
    doc_index: usize,
    config: &Config,
) -> Result<TransformReport> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("无法解析文件名: {}", path.display()))?;

    info!("[文档 {}] 📄 {}", doc_index, file_name);

    let bytes = fs::read(path)
        .await
        .with_context(|| format!("读取文件失败: {}", path.display()))?;
    let transformed = assembler
        .transform_bytes(bytes)
        .with_context(|| format!("无法转换文档: {}", file_name))?;

    let output_path = Path::new(&config.output_folder).join(output_name(&config.output_prefix, file_name));
    fs::write(&output_path, transformed.html.as_bytes())
        .await
        .with_context(|| format!("写入文件失败: {}", output_path.display()))?;

    let report = transformed.report;
    info!(
        "[文档 {}] ✓ 品牌: {} / {} → {}",
        doc_index,
        config.brand.name,
        config.brand.link,
        output_path.display()
    );
    if config.verbose_logging {
        info!("[文档 {}] {}", doc_index, report);
    }
    if report.questions_malformed {
        warn!("[文档 {}] ⚠️ 题目数据无法解析，使用默认题目数量", doc_index);
    }
    if report.questions_defective > 0 {
        warn!(
            "[文档 {}] ⚠️ {} 道题目的正确答案不在选项范围内",
            doc_index, report.questions_defective
        );
    }

    let line = format!(
        "[文档 {}] ✅ {} → {} | {}",
        doc_index,
        file_name,
        output_path.display(),
        logging::truncate_text(&report.to_string(), 160)
    );
    append_log_line(&config.output_log_file, &line).await?;

    Ok(report)
}

/// 输出文件名，已经带前缀时不重复添加
pub fn output_name(prefix: &str, file_name: &str) -> String {
    if file_name.starts_with(prefix) {
        file_name.to_string()
    } else {
        format!("{}{}", prefix, file_name)
    }
}

async fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .await
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    Ok(())
}
