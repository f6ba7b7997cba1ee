use std::path::{Path, PathBuf};

use crate::error::{ConsoleError, Result};

/// 用户选中的待处理视频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedVideo {
    /// 本地文件路径
    pub path: PathBuf,
    /// 文件名（上传时作为 multipart 的 filename）
    pub name: String,
    /// 文件大小（字节）
    pub size: u64,
    /// 媒体类型，例如 video/mp4
    pub media_type: String,
}

impl SelectedVideo {
    /// 从本地路径构造，媒体类型根据扩展名推断
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(ConsoleError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("不是普通文件: {}", path.display()),
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            media_type: guess_content_type(&name).to_string(),
            name,
            size: metadata.len(),
        })
    }

    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }

    /// 以 MB 显示的大小，保留两位小数
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size as f64 / (1024.0 * 1024.0))
    }
}

/// 根据文件扩展名猜测 Content-Type
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mpg" | "mpeg" => "video/mpeg",
        "ts" => "video/mp2t",
        "3gp" => "video/3gpp",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "mp3" => "audio/mpeg",
        "aac" => "audio/aac",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
