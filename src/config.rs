use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_STAGE_INTERVAL_MS: u64 = 1200;
const CONFIG_FILE_NAME: &str = "cctv-console.ini";

/// 控制台配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// 后端地址
    pub backend_url: String,
    /// 上传页阶段文字之间的间隔（毫秒）
    pub stage_interval_ms: u64,
    /// 结果视频保存目录
    pub download_dir: PathBuf,
    /// 请求超时（秒），不设置则不限制
    pub request_timeout_secs: Option<u64>,
    /// 实时采集使用的摄像头编号
    pub cam_index: Option<u32>,
    /// 日志级别（trace, debug, info, warn, error）
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            stage_interval_ms: DEFAULT_STAGE_INTERVAL_MS,
            download_dir: PathBuf::from("."),
            request_timeout_secs: None,
            cam_index: None,
            log_level: "info".to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn stage_interval(&self) -> Duration {
        Duration::from_millis(self.stage_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// 命令行上给出的覆盖项
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub stage_interval_ms: Option<u64>,
    pub download_dir: Option<PathBuf>,
    pub cam_index: Option<u32>,
}

/// 配置文件中读到的值，缺省的项为 None
#[derive(Debug, Clone, Default)]
struct PartialConfig {
    backend_url: Option<String>,
    stage_interval_ms: Option<u64>,
    download_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    cam_index: Option<u32>,
    log_level: Option<String>,
}

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从多个源加载配置，优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    pub fn load_config(config_file: Option<&Path>, overrides: ConfigOverrides) -> Result<ConsoleConfig> {
        // 显式指定的配置文件必须能读取，默认位置找不到则忽略
        let file_config = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_from_default_locations().unwrap_or_default(),
        };
        let env_config = Self::load_from_env();

        Ok(Self::merge(overrides, env_config, file_config))
    }

    fn merge(cli: ConfigOverrides, env: PartialConfig, file: PartialConfig) -> ConsoleConfig {
        let defaults = ConsoleConfig::default();
        ConsoleConfig {
            backend_url: cli
                .backend_url
                .or(env.backend_url)
                .or(file.backend_url)
                .unwrap_or(defaults.backend_url),
            stage_interval_ms: cli
                .stage_interval_ms
                .or(env.stage_interval_ms)
                .or(file.stage_interval_ms)
                .unwrap_or(defaults.stage_interval_ms),
            download_dir: cli
                .download_dir
                .or(env.download_dir)
                .or(file.download_dir)
                .unwrap_or(defaults.download_dir),
            request_timeout_secs: env.request_timeout_secs.or(file.request_timeout_secs),
            cam_index: cli.cam_index.or(env.cam_index).or(file.cam_index),
            log_level: env
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
        }
    }

    /// 从环境变量加载配置
    fn load_from_env() -> PartialConfig {
        PartialConfig {
            backend_url: env::var("CCTV_BACKEND_URL").ok().filter(|v| !v.is_empty()),
            stage_interval_ms: env::var("CCTV_STAGE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok()),
            download_dir: env::var("CCTV_DOWNLOAD_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            request_timeout_secs: env::var("CCTV_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok()),
            cam_index: env::var("CCTV_CAM_INDEX").ok().and_then(|v| v.parse().ok()),
            log_level: env::var("LOG_LEVEL").ok().filter(|v| !v.is_empty()),
        }
    }

    /// 从INI配置文件加载配置
    fn load_from_file(config_path: &Path) -> Result<PartialConfig> {
        if !config_path.exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {}", config_path.display()));
        }

        let mut config_parser = configparser::ini::Ini::new();
        config_parser
            .load(config_path)
            .map_err(|e| anyhow::anyhow!("读取配置文件失败: {}: {}", config_path.display(), e))?;

        // 优先读取 [console] 节，没有则使用 [DEFAULT] 节
        let get = |section: &str, key: &str| {
            config_parser
                .get(section, key)
                .or_else(|| config_parser.get("DEFAULT", key))
                .filter(|v| !v.is_empty())
        };

        Ok(PartialConfig {
            backend_url: get("console", "backend_url"),
            stage_interval_ms: get("console", "stage_interval_ms").and_then(|v| v.parse().ok()),
            download_dir: get("console", "download_dir").map(PathBuf::from),
            request_timeout_secs: get("console", "request_timeout_secs")
                .and_then(|v| v.parse().ok()),
            cam_index: get("live", "cam_index").and_then(|v| v.parse().ok()),
            log_level: get("logging", "level"),
        })
    }

    /// 从默认位置加载配置文件
    fn load_from_default_locations() -> Result<PartialConfig> {
        // 1. 当前目录的 cctv-console.ini
        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Self::load_from_file(&current_dir_config);
        }

        // 2. 当前目录的 .cctv-console.ini
        let hidden_config = PathBuf::from(format!(".{}", CONFIG_FILE_NAME));
        if hidden_config.exists() {
            return Self::load_from_file(&hidden_config);
        }

        // 3. 用户主目录的 .cctv-console.ini
        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home).join(format!(".{}", CONFIG_FILE_NAME));
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        // 4. /etc/cctv-console.ini
        let etc_config = PathBuf::from("/etc").join(CONFIG_FILE_NAME);
        if etc_config.exists() {
            return Self::load_from_file(&etc_config);
        }

        Err(anyhow::anyhow!("未找到配置文件"))
    }

    /// 创建默认配置文件
    pub fn create_default_config(config_path: &Path) -> Result<()> {
        let mut config_parser = configparser::ini::Ini::new();
        config_parser.set("console", "backend_url", Some(DEFAULT_BACKEND_URL.to_string()));
        config_parser.set(
            "console",
            "stage_interval_ms",
            Some(DEFAULT_STAGE_INTERVAL_MS.to_string()),
        );
        config_parser.set("console", "download_dir", Some(".".to_string()));
        config_parser.set("console", "request_timeout_secs", Some("".to_string()));
        config_parser.set("live", "cam_index", Some("".to_string()));
        config_parser.set("logging", "level", Some("info".to_string()));

        config_parser
            .write(config_path)
            .map_err(|e| anyhow::anyhow!("写入配置文件失败: {}: {}", config_path.display(), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_round_trips_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        ConfigLoader::create_default_config(&path).unwrap();

        let file = ConfigLoader::load_from_file(&path).unwrap();
        let config = ConfigLoader::merge(ConfigOverrides::default(), PartialConfig::default(), file);
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.ini");
        std::fs::write(
            &path,
            "[console]\nbackend_url = http://file:8000\nstage_interval_ms = 10\nrequest_timeout_secs = 30\n\n[live]\ncam_index = 3\n",
        )
        .unwrap();

        let file = ConfigLoader::load_from_file(&path).unwrap();
        let env = PartialConfig {
            backend_url: Some("http://env:8000".to_string()),
            stage_interval_ms: Some(20),
            ..Default::default()
        };
        let cli = ConfigOverrides {
            backend_url: Some("http://cli:8000".to_string()),
            ..Default::default()
        };

        let config = ConfigLoader::merge(cli, env, file);
        assert_eq!(config.backend_url, "http://cli:8000");
        assert_eq!(config.stage_interval_ms, 20);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.cam_index, Some(3));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigLoader::load_config(
            Some(Path::new("/no/such/cctv-console.ini")),
            ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("配置文件不存在"));
    }
}
