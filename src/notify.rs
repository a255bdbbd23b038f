use anyhow::Context;
use axum::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Delivery of password-reset links. Best-effort: callers log failures and
/// carry on, the reset flow itself never depends on delivery succeeding.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, email: &str, url: &str) -> anyhow::Result<()>;
}

/// Dev-mode notifier: logs the link and appends it to a local file so it can
/// be copied during manual testing. Swap for a real mail provider in prod.
pub struct DevLogNotifier {
    log_dir: PathBuf,
}

impl DevLogNotifier {
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: log_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Notifier for DevLogNotifier {
    async fn notify(&self, email: &str, url: &str) -> anyhow::Result<()> {
        info!(to = %email, %url, "password reset link");

        tokio::fs::create_dir_all(&self.log_dir)
            .await
            .context("create email log dir")?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_dir.join("password_reset.log"))
            .await
            .context("open email log")?;
        file.write_all(format!("To: {} | URL: {}\n", email, url).as_bytes())
            .await
            .context("append email log")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_appends_to_log_file() {
        let dir = std::env::temp_dir().join(format!("civicreport-notify-{}", uuid::Uuid::new_v4()));
        let notifier = DevLogNotifier::new(&dir);

        notifier
            .notify("citizen@example.com", "http://localhost:5173/reset-password?token=abc")
            .await
            .expect("notify should succeed");
        notifier
            .notify("other@example.com", "http://localhost:5173/reset-password?token=def")
            .await
            .expect("second notify should append");

        let content =
            std::fs::read_to_string(dir.join("password_reset.log")).expect("log file readable");
        assert!(content.contains("citizen@example.com"));
        assert!(content.contains("token=def"));
        assert_eq!(content.lines().count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
