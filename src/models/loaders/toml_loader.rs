use crate::config::FileConfig;
use crate::error::{AppError, AppResult, FileError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载配置
pub async fn load_config_file(toml_file_path: &Path) -> AppResult<FileConfig> {
    let path_str = toml_file_path.display().to_string();
    if !toml_file_path.exists() {
        return Err(FileError::NotFound { path: path_str }.into());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(path_str.clone(), e))?;

    let config: FileConfig = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
        path: path_str,
        source,
    })?;

    Ok(config)
}

/// 列出文件夹中所有 `.html` / `.htm` 文件，按文件名排序
pub async fn list_html_files(folder_path: &str) -> AppResult<Vec<PathBuf>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut html_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_html_file(&path) {
            html_files.push(path);
        } else if path.is_file() {
            tracing::warn!(
                "跳过非 HTML 文件: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );
        }
    }

    html_files.sort();
    tracing::info!("在 {} 中找到 {} 个 HTML 文件", folder_path, html_files.len());
    Ok(html_files)
}

/// 扩展名是否为 `.html` 或 `.htm`（大小写不敏感）
pub fn is_html_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}
