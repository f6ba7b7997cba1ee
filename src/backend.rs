use std::future::Future;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::{ConsoleError, Result};
use crate::media::SelectedVideo;
use crate::object_url::ObjectUrl;

pub const PROCESS_VIDEO_PATH: &str = "/process-video";
pub const PROCESS_LIVE_PATH: &str = "/process-live";
pub const STREAM_LIVE_PATH: &str = "/stream-live";
pub const STOP_LIVE_PATH: &str = "/stop-live";
pub const DOWNLOAD_VIDEO_PATH: &str = "/download-video";

/// 与浏览器 encodeURIComponent 一致：保留 A-Z a-z 0-9 - _ . ! ~ * ' ( )
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `/process-video` 的响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessVideoResponse {
    #[serde(default)]
    pub logs: Vec<String>,
    /// 后端生成的视频路径标识，用于 `/download-video`
    #[serde(default)]
    pub summary_video: Option<String>,
}

/// `/stop-live` 的响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopLiveResponse {
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub summary_video: Option<String>,
}

impl StopLiveResponse {
    /// 非空的摘要视频标识；后端在没有录到内容时会返回空字符串
    pub fn summary_token(&self) -> Option<&str> {
        self.summary_video.as_deref().filter(|s| !s.is_empty())
    }
}

/// 视频处理后端
///
/// 页面控制器只通过这个 trait 访问后端，测试中可以替换为内存实现。
pub trait Backend: Send + Sync {
    /// 上传视频并等待处理结果
    fn process_video(
        &self,
        video: &SelectedVideo,
    ) -> impl Future<Output = Result<ProcessVideoResponse>> + Send;

    /// 启动实时采集，响应体不使用
    fn start_live(&self, cam_index: Option<u32>) -> impl Future<Output = Result<()>> + Send;

    /// 停止实时采集并取回日志
    fn stop_live(&self) -> impl Future<Output = Result<StopLiveResponse>> + Send;

    /// 按后端给出的路径标识下载视频，内容写入本地 blob
    fn download_video(&self, video_path: &str) -> impl Future<Output = Result<ObjectUrl>> + Send;

    /// MJPEG 流地址
    fn stream_url(&self) -> String;
}

/// 基于 reqwest 的后端客户端
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// 创建客户端
    ///
    /// # 参数
    /// - `base_url`: 后端地址，例如 http://localhost:8000
    /// - `timeout`: 单个请求的超时时间，`None` 表示不限制
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|_| ConsoleError::InvalidUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConsoleError::InvalidUrl(base_url.to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ConsoleError::Transport {
            endpoint: base_url.to_string(),
            source: e,
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/download-video?video_path=<token>` 的完整地址
    pub fn download_url(&self, video_path: &str) -> String {
        format!(
            "{}?video_path={}",
            self.endpoint(DOWNLOAD_VIDEO_PATH),
            utf8_percent_encode(video_path, URI_COMPONENT)
        )
    }

    /// 发送请求，非 2xx 状态视为失败（不读取错误响应体）
    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| ConsoleError::Transport {
            endpoint: endpoint.to_string(),
            source: e,
        })?;

        let status = response.status();
        debug!("{} -> {}", endpoint, status);
        if !status.is_success() {
            return Err(ConsoleError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.bytes().await.map_err(|e| ConsoleError::Transport {
            endpoint: endpoint.to_string(),
            source: e,
        })?;
        serde_json::from_slice(&body).map_err(|e| ConsoleError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

impl Backend for HttpBackend {
    async fn process_video(&self, video: &SelectedVideo) -> Result<ProcessVideoResponse> {
        // 边读边传，不把整个录像读进内存
        let file = tokio::fs::File::open(&video.path).await?;
        let len = file.metadata().await?.len();
        info!(
            "正在上传视频: {} ({}) -> {}",
            video.name,
            video.size_label(),
            PROCESS_VIDEO_PATH
        );

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = reqwest::multipart::Part::stream_with_length(body, len)
            .file_name(video.name.clone())
            .mime_str(&video.media_type)
            .map_err(|e| {
                ConsoleError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("无效的媒体类型 {}: {}", video.media_type, e),
                ))
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.endpoint(PROCESS_VIDEO_PATH);
        let response = self
            .send(PROCESS_VIDEO_PATH, self.client.post(&url).multipart(form))
            .await?;
        Self::read_json(PROCESS_VIDEO_PATH, response).await
    }

    async fn start_live(&self, cam_index: Option<u32>) -> Result<()> {
        let url = self.endpoint(PROCESS_LIVE_PATH);
        let mut request = self.client.get(&url);
        if let Some(index) = cam_index {
            request = request.query(&[("cam_index", index)]);
        }
        self.send(PROCESS_LIVE_PATH, request).await?;
        Ok(())
    }

    async fn stop_live(&self) -> Result<StopLiveResponse> {
        let url = self.endpoint(STOP_LIVE_PATH);
        let response = self.send(STOP_LIVE_PATH, self.client.get(&url)).await?;
        Self::read_json(STOP_LIVE_PATH, response).await
    }

    async fn download_video(&self, video_path: &str) -> Result<ObjectUrl> {
        let url = self.download_url(video_path);
        debug!("下载视频: {}", url);
        let mut response = self
            .send(DOWNLOAD_VIDEO_PATH, self.client.get(&url))
            .await?;

        let mut blob = ObjectUrl::empty()?;
        while let Some(chunk) = response.chunk().await.map_err(|e| ConsoleError::Transport {
            endpoint: DOWNLOAD_VIDEO_PATH.to_string(),
            source: e,
        })? {
            blob.append(&chunk)?;
        }
        blob.finish()?;

        info!("视频已下载: {} ({} 字节)", video_path, blob.len());
        Ok(blob)
    }

    fn stream_url(&self) -> String {
        self.endpoint(STREAM_LIVE_PATH)
    }
}

impl<B: Backend> Backend for std::sync::Arc<B> {
    async fn process_video(&self, video: &SelectedVideo) -> Result<ProcessVideoResponse> {
        (**self).process_video(video).await
    }

    async fn start_live(&self, cam_index: Option<u32>) -> Result<()> {
        (**self).start_live(cam_index).await
    }

    async fn stop_live(&self) -> Result<StopLiveResponse> {
        (**self).stop_live().await
    }

    async fn download_video(&self, video_path: &str) -> Result<ObjectUrl> {
        (**self).download_video(video_path).await
    }

    fn stream_url(&self) -> String {
        (**self).stream_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(
            HttpBackend::new("ftp://cams.local", None),
            Err(ConsoleError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpBackend::new("not a url", None),
            Err(ConsoleError::InvalidUrl(_))
        ));
    }

    #[test]
    fn download_url_encodes_like_uri_component() {
        let backend = HttpBackend::new("http://localhost:8000/", None).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(
            backend.download_url("./output/summary (1).mp4"),
            "http://localhost:8000/download-video?video_path=.%2Foutput%2Fsummary%20(1).mp4"
        );
        assert_eq!(backend.stream_url(), "http://localhost:8000/stream-live");
    }

    #[test]
    fn stop_response_fields_are_optional() {
        let resp: StopLiveResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.logs, None);
        assert_eq!(resp.summary_token(), None);

        let resp: StopLiveResponse =
            serde_json::from_str(r#"{"logs":["a"],"summary_video":""}"#).unwrap();
        assert_eq!(resp.logs, Some(vec!["a".to_string()]));
        assert_eq!(resp.summary_token(), None);
    }

    #[test]
    fn process_response_defaults_missing_logs() {
        let resp: ProcessVideoResponse =
            serde_json::from_str(r#"{"summary_video":"out/x.mp4"}"#).unwrap();
        assert!(resp.logs.is_empty());
        assert_eq!(resp.summary_video.as_deref(), Some("out/x.mp4"));
    }
}
