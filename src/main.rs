use anyhow::{Context, Result};
use cctv_console::{
    ActionOutcome, ConfigLoader, ConfigOverrides, ConsoleConfig, ConsoleNotifier, HttpBackend,
    LiveMonitoringPage, UploadPage,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// CCTV 视频处理控制台 - 上传录像、控制实时监控
#[derive(Parser, Debug)]
#[command(name = "cctv-console")]
#[command(about = "CCTV footage optimizer console: upload recordings and run live monitoring", long_about = None)]
struct Args {
    /// 配置文件路径（可选，支持 .ini 格式）
    /// 优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 后端地址，也可通过环境变量 CCTV_BACKEND_URL 设置
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// 阶段提示之间的间隔（毫秒）
    #[arg(long, global = true)]
    stage_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 上传录像并下载优化后的视频
    Upload {
        /// 输入视频文件路径
        file: PathBuf,

        /// 结果视频保存目录
        #[arg(short, long)]
        download_dir: Option<PathBuf>,
    },
    /// 通知后端开始实时采集（画面在 live 命令中查看）
    StartLive {
        #[arg(long)]
        cam_index: Option<u32>,
    },
    /// 实时监控：开始采集，Ctrl-C 停止并下载摘要视频
    Live {
        #[arg(long)]
        cam_index: Option<u32>,

        /// 摘要视频保存目录
        #[arg(short, long)]
        download_dir: Option<PathBuf>,
    },
    /// 配置文件管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 写入默认配置文件
    Init { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Commands::Config {
        action: ConfigAction::Init { path },
    } = &args.command
    {
        ConfigLoader::create_default_config(path).context("创建配置文件失败")?;
        println!("已写入默认配置: {}", path.display());
        return Ok(());
    }

    let (cam_index, download_dir) = match &args.command {
        Commands::Upload { download_dir, .. } => (None, download_dir.clone()),
        Commands::StartLive { cam_index } => (*cam_index, None),
        Commands::Live {
            cam_index,
            download_dir,
        } => (*cam_index, download_dir.clone()),
        Commands::Config { .. } => (None, None),
    };

    let config = ConfigLoader::load_config(
        args.config.as_deref(),
        ConfigOverrides {
            backend_url: args.backend_url.clone(),
            stage_interval_ms: args.stage_interval_ms,
            download_dir,
            cam_index,
        },
    )
    .context("加载配置失败")?;

    // 初始化日志，RUST_LOG 优先于配置中的级别
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!("使用配置: {:?}", config);

    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
        .with_context(|| format!("无效的后端地址: {}", config.backend_url))?;

    match args.command {
        Commands::Upload { file, .. } => run_upload(backend, &config, &file).await,
        Commands::StartLive { .. } => run_start_live(backend, &config).await,
        Commands::Live { .. } => run_live(backend, &config).await,
        Commands::Config { .. } => Ok(()),
    }
}

async fn run_upload(backend: HttpBackend, config: &ConsoleConfig, file: &Path) -> Result<()> {
    let mut page =
        UploadPage::new(backend, ConsoleNotifier).with_stage_interval(config.stage_interval());

    page.select_path(file)
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("无法选择视频: {}", file.display()))?;
    if let Some(video) = page.video_file() {
        println!("{} ({})", video.name, video.size_label());
    }

    let token = page.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let outcome = page.submit().await;
    for step in page.process_steps() {
        println!("> {}", step);
    }

    if outcome != ActionOutcome::Completed {
        anyhow::bail!("视频处理失败");
    }

    print_logs(page.detection_logs());
    if let Some(saved) = page
        .download_result(&config.download_dir)
        .context("保存结果视频失败")?
    {
        println!("Saved optimized video to {}", saved.display());
    }

    Ok(())
}

async fn run_start_live(backend: HttpBackend, config: &ConsoleConfig) -> Result<()> {
    let mut page = UploadPage::new(backend, ConsoleNotifier).with_cam_index(config.cam_index);
    if page.start_live().await != ActionOutcome::Completed {
        for step in page.process_steps() {
            println!("> {}", step);
        }
        anyhow::bail!("启动实时监控失败");
    }
    Ok(())
}

async fn run_live(backend: HttpBackend, config: &ConsoleConfig) -> Result<()> {
    let mut page =
        LiveMonitoringPage::new(backend, ConsoleNotifier).with_cam_index(config.cam_index);

    if page.start().await != ActionOutcome::Completed {
        anyhow::bail!("启动实时监控失败");
    }
    if let Some(url) = page.stream_url() {
        println!("Live stream (MJPEG): {}", url);
    }
    println!("Press Ctrl-C to stop live monitoring.");

    tokio::signal::ctrl_c()
        .await
        .context("等待 Ctrl-C 失败")?;

    let outcome = page.stop().await;
    print_logs(page.detection_logs());
    if outcome != ActionOutcome::Completed {
        anyhow::bail!("停止实时监控失败");
    }

    match page
        .download_summary(&config.download_dir)
        .context("保存摘要视频失败")?
    {
        Some(saved) => println!("Saved summary clip to {}", saved.display()),
        None => println!("No summary clip available."),
    }

    Ok(())
}

fn print_logs(logs: &[String]) {
    println!("Detection Logs");
    if logs.is_empty() {
        println!("  No logs available.");
    }
    for log in logs {
        println!("  > {}", log);
    }
}
