pub mod live;
pub mod upload;

#[cfg(test)]
pub(crate) mod fake;

pub use live::{LiveMonitoringPage, LiveState, SUMMARY_FILE_NAME};
pub use upload::{ActiveTab, UploadPage, PROCESSING_STAGES, RESULT_FILE_NAME};

/// 页面动作的结果
///
/// 失败已经在页面状态或提示里体现，这里只告诉调用方发生了什么。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// 前置条件不满足，没有发出请求
    Skipped,
    Completed,
    Failed,
}
