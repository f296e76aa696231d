use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::platform::ChatPlatform;

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(8);

/// Periodic "still working" signal on the origin channel while a backend
/// call is outstanding. One heartbeat per in-flight call; dropping it stops
/// the task, so it cannot outlive the call on any exit path.
pub struct TypingHeartbeat {
    handle: Option<JoinHandle<()>>,
}

impl TypingHeartbeat {
    /// Emit one typing signal immediately, then repeat in the background
    /// until stopped. Emission failures are swallowed; typing is best-effort.
    pub async fn start<P: ChatPlatform + 'static>(platform: Arc<P>, channel_id: String) -> Self {
        platform.trigger_typing(&channel_id).await.ok();

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(HEARTBEAT_PERIOD).await;
                platform.trigger_typing(&channel_id).await.ok();
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Idempotent; safe to call at any point after `start`.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TypingHeartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
