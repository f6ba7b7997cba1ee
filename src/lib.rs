pub mod backend;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod media;
pub mod notify;
pub mod object_url;
pub mod pages;

pub use backend::{Backend, HttpBackend, ProcessVideoResponse, StopLiveResponse};
pub use config::{ConfigLoader, ConfigOverrides, ConsoleConfig};
pub use error::{ConsoleError, Result};
pub use media::SelectedVideo;
pub use notify::{ConsoleNotifier, MemoryNotifier, Notifier};
pub use object_url::ObjectUrl;
pub use pages::{ActionOutcome, ActiveTab, LiveMonitoringPage, LiveState, UploadPage};
