use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::error::{ConsoleError, Result};
use crate::lifecycle::{pause, run_cancellable};
use crate::media::SelectedVideo;
use crate::notify::Notifier;
use crate::object_url::ObjectUrl;
use crate::pages::ActionOutcome;

/// 提交后依次显示的阶段文字
///
/// 只是给用户的进度感，和后端真实进度无关。
pub const PROCESSING_STAGES: [&str; 5] = [
    "Initializing CCTV footage processing...",
    "Analyzing footage for motion...",
    "Detecting objects of interest...",
    "Optimizing video segments...",
    "Generating optimized output...",
];

pub const RESULT_FILE_NAME: &str = "cctv_optimized_video.mp4";

const UPLOAD_ERROR_STEP: &str = "Error processing video.";
const LIVE_ERROR_STEP: &str = "Error starting live monitoring.";
const UPLOAD_DONE_ALERT: &str = "Video processing complete! Check the Results tab.";
const LIVE_STARTED_ALERT: &str =
    "Live monitoring started.\nOpen the Live Monitoring page to view the stream.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTab {
    #[default]
    Upload,
    Results,
}

/// 录像上传页
pub struct UploadPage<B, N> {
    backend: B,
    notifier: N,
    stage_interval: Duration,
    cam_index: Option<u32>,
    lifecycle: CancellationToken,
    action: CancellationToken,

    video_file: Option<SelectedVideo>,
    loading: bool,
    processing_stage: usize,
    process_steps: Vec<String>,
    detection_logs: Vec<String>,
    result: Option<ObjectUrl>,
    video_ready: bool,
    active_tab: ActiveTab,
}

impl<B: Backend, N: Notifier> UploadPage<B, N> {
    pub fn new(backend: B, notifier: N) -> Self {
        let lifecycle = CancellationToken::new();
        Self {
            backend,
            notifier,
            stage_interval: Duration::from_millis(1200),
            cam_index: None,
            action: lifecycle.child_token(),
            lifecycle,
            video_file: None,
            loading: false,
            processing_stage: 0,
            process_steps: Vec::new(),
            detection_logs: Vec::new(),
            result: None,
            video_ready: false,
            active_tab: ActiveTab::Upload,
        }
    }

    /// 阶段文字之间的间隔，0 表示不等待
    pub fn with_stage_interval(mut self, interval: Duration) -> Self {
        self.set_stage_interval(interval);
        self
    }

    pub fn set_stage_interval(&mut self, interval: Duration) {
        self.stage_interval = interval;
    }

    pub fn with_cam_index(mut self, cam_index: Option<u32>) -> Self {
        self.cam_index = cam_index;
        self
    }

    /// 当前（或下一个）动作的取消令牌
    ///
    /// 取消只影响正在进行的动作，之后的动作会换用新的令牌。
    pub fn cancellation_token(&self) -> CancellationToken {
        self.action.clone()
    }

    pub fn cancel(&self) {
        self.action.cancel();
    }

    /// 上一个动作被取消过时换一个新令牌；页面 drop 时所有令牌一起取消
    fn begin_action(&mut self) -> CancellationToken {
        if self.action.is_cancelled() {
            self.action = self.lifecycle.child_token();
        }
        self.action.clone()
    }

    fn reset_state(&mut self) {
        self.process_steps.clear();
        self.detection_logs.clear();
        self.result = None;
        self.video_ready = false;
        self.processing_stage = 0;
        self.active_tab = ActiveTab::Upload;
    }

    /// 选择视频；非 video/* 类型被拒绝且不改变任何状态
    pub fn select_file(&mut self, video: SelectedVideo) -> Result<()> {
        if !video.is_video() {
            debug!("忽略非视频文件: {} ({})", video.name, video.media_type);
            return Err(ConsoleError::UnsupportedMedia {
                name: video.name,
                media_type: video.media_type,
            });
        }

        self.reset_state();
        info!("已选择视频: {} ({})", video.name, video.size_label());
        self.video_file = Some(video);
        Ok(())
    }

    pub fn select_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let video = SelectedVideo::from_path(path)?;
        self.select_file(video)
    }

    /// 上传已选视频并取回处理结果
    pub async fn submit(&mut self) -> ActionOutcome {
        let Some(video) = self.video_file.clone() else {
            debug!("未选择视频，忽略提交");
            return ActionOutcome::Skipped;
        };

        self.loading = true;
        self.reset_state();

        let token = self.begin_action();
        let started = Instant::now();
        let outcome = match self.run_upload(&video, &token).await {
            Ok(()) => {
                info!(
                    "✅ [上传] 处理完成: {}，耗时: {:.2}秒",
                    video.name,
                    started.elapsed().as_secs_f64()
                );
                ActionOutcome::Completed
            }
            Err(e) => {
                error!("❌ [上传] 处理视频失败: {}", e);
                self.process_steps.push(UPLOAD_ERROR_STEP.to_string());
                ActionOutcome::Failed
            }
        };

        self.loading = false;
        outcome
    }

    async fn run_upload(&mut self, video: &SelectedVideo, token: &CancellationToken) -> Result<()> {
        for (i, stage) in PROCESSING_STAGES.iter().enumerate() {
            self.process_steps.push(stage.to_string());
            pause(token, self.stage_interval).await?;
            self.processing_stage = i + 1;
        }

        let response = run_cancellable(token, self.backend.process_video(video)).await?;
        info!("⏳ [上传] 收到 {} 条检测日志", response.logs.len());
        self.detection_logs = response.logs;

        let summary = response
            .summary_video
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConsoleError::Decode {
                endpoint: crate::backend::PROCESS_VIDEO_PATH.to_string(),
                message: "missing summary_video".to_string(),
            })?;

        let blob = run_cancellable(token, self.backend.download_video(&summary)).await?;
        self.result = Some(blob);
        self.video_ready = true;
        self.active_tab = ActiveTab::Results;
        self.notifier.alert(UPLOAD_DONE_ALERT);
        Ok(())
    }

    /// 通知后端开始实时采集，画面需要到实时监控页查看
    pub async fn start_live(&mut self) -> ActionOutcome {
        self.loading = true;
        self.reset_state();

        let token = self.begin_action();
        let outcome = match run_cancellable(&token, self.backend.start_live(self.cam_index)).await
        {
            Ok(()) => {
                self.notifier.alert(LIVE_STARTED_ALERT);
                ActionOutcome::Completed
            }
            Err(e) => {
                error!("启动实时监控失败: {}", e);
                self.process_steps.push(LIVE_ERROR_STEP.to_string());
                ActionOutcome::Failed
            }
        };

        self.loading = false;
        outcome
    }

    /// 把结果视频保存为 `<dir>/cctv_optimized_video.mp4`；没有结果时什么也不做
    pub fn download_result(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        match &self.result {
            Some(url) => url.save_as(dir, RESULT_FILE_NAME).map(Some),
            None => {
                warn!("没有可下载的结果视频");
                Ok(None)
            }
        }
    }

    /// 切换标签页；结果页在没有结果也没有日志时不可用
    pub fn set_active_tab(&mut self, tab: ActiveTab) -> bool {
        if tab == ActiveTab::Results && !self.results_available() {
            return false;
        }
        self.active_tab = tab;
        true
    }

    pub fn results_available(&self) -> bool {
        self.video_ready || !self.detection_logs.is_empty()
    }

    pub fn video_file(&self) -> Option<&SelectedVideo> {
        self.video_file.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn processing_stage(&self) -> usize {
        self.processing_stage
    }

    pub fn process_steps(&self) -> &[String] {
        &self.process_steps
    }

    pub fn detection_logs(&self) -> &[String] {
        &self.detection_logs
    }

    pub fn video_ready(&self) -> bool {
        self.video_ready
    }

    pub fn result(&self) -> Option<&ObjectUrl> {
        self.result.as_ref()
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.active_tab
    }
}

impl<B, N> Drop for UploadPage<B, N> {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
