use anyhow::{Context, Result};
use quiz_rebrand::models::loaders::load_config_file;
use quiz_rebrand::utils::logging;
use quiz_rebrand::{App, Config};
use std::path::Path;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：CONFIG_FILE 为底，环境变量覆盖
    let config = load_config().await?;

    // 初始化日志
    logging::init(config.verbose_logging);

    config.validate().context("配置校验失败")?;

    // 初始化并运行应用
    let stats = App::initialize(config).await?.run().await?;
    if stats.failed > 0 {
        warn!("⚠️ 有 {} 个文档处理失败，详见日志文件", stats.failed);
    }

    Ok(())
}

async fn load_config() -> Result<Config> {
    let base = match std::env::var("CONFIG_FILE") {
        Ok(path) if !path.trim().is_empty() => load_config_file(Path::new(&path))
            .await
            .with_context(|| format!("无法加载配置文件: {}", path))?
            .apply_to(Config::default()),
        _ => Config::default(),
    };
    Ok(base.with_env_overrides()?)
}
