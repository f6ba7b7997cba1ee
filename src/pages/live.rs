use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::Backend;
use crate::error::Result;
use crate::lifecycle::run_cancellable;
use crate::notify::Notifier;
use crate::object_url::ObjectUrl;
use crate::pages::ActionOutcome;

pub const SUMMARY_FILE_NAME: &str = "live_summary.mp4";

const START_FAILED_ALERT: &str = "Could not start live monitoring.";
const STOP_FAILED_ALERT: &str = "Error stopping live monitoring.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Streaming,
}

/// 实时监控页
///
/// 后端同一时间只有一个采集会话，这里不区分多个会话。
pub struct LiveMonitoringPage<B, N> {
    backend: B,
    notifier: N,
    cam_index: Option<u32>,
    lifecycle: CancellationToken,
    action: CancellationToken,

    streaming: bool,
    stream_url: Option<String>,
    detection_logs: Vec<String>,
    summary: Option<ObjectUrl>,
    streaming_since: Option<Instant>,
}

impl<B: Backend, N: Notifier> LiveMonitoringPage<B, N> {
    pub fn new(backend: B, notifier: N) -> Self {
        let lifecycle = CancellationToken::new();
        Self {
            backend,
            notifier,
            cam_index: None,
            action: lifecycle.child_token(),
            lifecycle,
            streaming: false,
            stream_url: None,
            detection_logs: Vec::new(),
            summary: None,
            streaming_since: None,
        }
    }

    pub fn with_cam_index(mut self, cam_index: Option<u32>) -> Self {
        self.cam_index = cam_index;
        self
    }

    /// 当前（或下一个）动作的取消令牌；取消不影响之后的动作
    pub fn cancellation_token(&self) -> CancellationToken {
        self.action.clone()
    }

    pub fn cancel(&self) {
        self.action.cancel();
    }

    fn begin_action(&mut self) -> CancellationToken {
        if self.action.is_cancelled() {
            self.action = self.lifecycle.child_token();
        }
        self.action.clone()
    }

    /// 启动采集并切换到 MJPEG 流地址
    pub async fn start(&mut self) -> ActionOutcome {
        if self.streaming {
            warn!("实时监控已在进行中");
            return ActionOutcome::Skipped;
        }

        let token = self.begin_action();
        match run_cancellable(&token, self.backend.start_live(self.cam_index)).await {
            Ok(()) => {
                let stream_url = self.backend.stream_url();
                info!("🎥 [实时] 采集已开始，画面: {}", stream_url);
                self.streaming = true;
                self.stream_url = Some(stream_url);
                self.detection_logs.clear();
                self.summary = None;
                self.streaming_since = Some(Instant::now());
                ActionOutcome::Completed
            }
            Err(e) => {
                error!("❌ [实时] 启动失败: {}", e);
                self.notifier.alert(START_FAILED_ALERT);
                ActionOutcome::Failed
            }
        }
    }

    /// 停止采集，取回日志和可选的摘要视频
    ///
    /// 无论请求结果如何，流状态都会被清除。
    pub async fn stop(&mut self) -> ActionOutcome {
        let token = self.begin_action();
        let response = run_cancellable(&token, self.backend.stop_live()).await;

        self.streaming = false;
        self.stream_url = None;
        if let Some(since) = self.streaming_since.take() {
            info!("⏹ [实时] 采集结束，持续 {:.1} 秒", since.elapsed().as_secs_f64());
        }

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("❌ [实时] 停止失败: {}", e);
                self.notifier.alert(STOP_FAILED_ALERT);
                return ActionOutcome::Failed;
            }
        };

        let summary_path = response.summary_token().map(str::to_string);
        self.detection_logs = response.logs.unwrap_or_default();
        self.summary = None;
        info!("[实时] 收到 {} 条检测日志", self.detection_logs.len());

        // 摘要视频拿不到时静默跳过
        if let Some(path) = summary_path {
            match run_cancellable(&token, self.backend.download_video(&path)).await {
                Ok(blob) => self.summary = Some(blob),
                Err(e) => warn!("下载摘要视频失败，跳过: {}", e),
            }
        }

        ActionOutcome::Completed
    }

    /// 把摘要视频保存为 `<dir>/live_summary.mp4`；没有摘要时什么也不做
    pub fn download_summary(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        match &self.summary {
            Some(url) => url.save_as(dir, SUMMARY_FILE_NAME).map(Some),
            None => Ok(None),
        }
    }

    pub fn state(&self) -> LiveState {
        if self.streaming {
            LiveState::Streaming
        } else {
            LiveState::Idle
        }
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref()
    }

    pub fn detection_logs(&self) -> &[String] {
        &self.detection_logs
    }

    pub fn summary(&self) -> Option<&ObjectUrl> {
        self.summary.as_ref()
    }
}

impl<B, N> Drop for LiveMonitoringPage<B, N> {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
