use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::backend::{Backend, ProcessVideoResponse, StopLiveResponse};
use crate::error::{ConsoleError, Result};
use crate::media::SelectedVideo;
use crate::object_url::ObjectUrl;

/// 内存中的后端，记录每次调用
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub process_response: Mutex<Option<ProcessVideoResponse>>,
    pub stop_response: Mutex<Option<StopLiveResponse>>,
    pub live_fails: Mutex<bool>,
    pub videos: Mutex<HashMap<String, Vec<u8>>>,
    /// 每个请求在应答前等待的时间
    pub delay: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processed(self, logs: &[&str], summary: &str, content: &[u8]) -> Self {
        *self.process_response.lock().unwrap() = Some(ProcessVideoResponse {
            logs: logs.iter().map(|s| s.to_string()).collect(),
            summary_video: Some(summary.to_string()),
        });
        self.videos
            .lock()
            .unwrap()
            .insert(summary.to_string(), content.to_vec());
        self
    }

    pub fn with_stop(self, response: StopLiveResponse) -> Self {
        *self.stop_response.lock().unwrap() = Some(response);
        self
    }

    pub fn with_video(self, token: &str, content: &[u8]) -> Self {
        self.videos
            .lock()
            .unwrap()
            .insert(token.to_string(), content.to_vec());
        self
    }

    pub fn failing_live(self) -> Self {
        *self.live_fails.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// 记录调用并按设置的延迟等待
    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn unavailable(endpoint: &str) -> ConsoleError {
        ConsoleError::Status {
            endpoint: endpoint.to_string(),
            status: 503,
        }
    }
}

impl Backend for FakeBackend {
    async fn process_video(&self, video: &SelectedVideo) -> Result<ProcessVideoResponse> {
        self.record(format!("process-video {}", video.name)).await;
        let response = self.process_response.lock().unwrap().clone();
        response.ok_or_else(|| Self::unavailable("/process-video"))
    }

    async fn start_live(&self, cam_index: Option<u32>) -> Result<()> {
        self.record(format!("process-live {:?}", cam_index)).await;
        if *self.live_fails.lock().unwrap() {
            return Err(Self::unavailable("/process-live"));
        }
        Ok(())
    }

    async fn stop_live(&self) -> Result<StopLiveResponse> {
        self.record("stop-live".to_string()).await;
        let response = self.stop_response.lock().unwrap().clone();
        response.ok_or_else(|| Self::unavailable("/stop-live"))
    }

    async fn download_video(&self, video_path: &str) -> Result<ObjectUrl> {
        self.record(format!("download-video {}", video_path)).await;
        let content = self.videos.lock().unwrap().get(video_path).cloned();
        match content {
            Some(bytes) => ObjectUrl::from_bytes(&bytes),
            None => Err(ConsoleError::Status {
                endpoint: "/download-video".to_string(),
                status: 404,
            }),
        }
    }

    fn stream_url(&self) -> String {
        "http://backend.test/stream-live".to_string()
    }
}
