//! 本地 blob 句柄
//!
//! 后端返回的视频内容写入临时文件，由 [`ObjectUrl`] 持有。句柄被替换或
//! drop 时临时文件随之删除，不会在多次操作之间累积。

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::Result;

/// 引用内存外 blob 的本地地址
#[derive(Debug)]
pub struct ObjectUrl {
    file: NamedTempFile,
    len: u64,
}

impl ObjectUrl {
    /// 创建空的 blob，随后用 [`ObjectUrl::append`] 逐块写入
    pub fn empty() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("cctv-blob-")
            .suffix(".mp4")
            .tempfile()?;
        Ok(Self { file, len: 0 })
    }

    /// 把字节写入新的临时文件
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut url = Self::empty()?;
        url.append(bytes)?;
        url.finish()?;
        Ok(url)
    }

    pub fn append(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk)?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// 写入完成后调用
    pub fn finish(&mut self) -> Result<()> {
        self.file.flush()?;
        debug!("创建 blob: {} ({} 字节)", self.file.path().display(), self.len);
        Ok(())
    }

    /// file:// 形式的地址，可直接交给播放器
    pub fn url(&self) -> String {
        format!("file://{}", self.file.path().display())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 把 blob 另存为 `<dir>/<file_name>`，目录不存在时自动创建
    pub fn save_as(&self, dir: impl AsRef<Path>, file_name: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let target = dir.join(file_name);
        std::fs::copy(self.file.path(), &target)?;

        info!("已保存视频: {}", target.display());
        Ok(target)
    }
}
