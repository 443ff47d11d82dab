//! Code delivery
//!
//! Verification codes leave the system through a [`Notifier`]. The trait
//! keeps delivery swappable; the default implementation only logs, which is
//! what development and tests want.

use async_trait::async_trait;
use shared::AppError;

use crate::auth::verification::CodeType;

/// Delivery channel for a verification code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

/// Outbound delivery of verification codes
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a code to a recipient. The reference code is included for
    /// support correlation, never shown to the recipient.
    async fn deliver(
        &self,
        channel: Channel,
        recipient: &str,
        code_type: CodeType,
        code: &str,
    ) -> Result<(), AppError>;
}

/// Notifier that writes deliveries to the log instead of sending them
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn deliver(
        &self,
        channel: Channel,
        recipient: &str,
        code_type: CodeType,
        code: &str,
    ) -> Result<(), AppError> {
        // The code is a live secret; it only appears at debug level
        tracing::info!(
            channel = ?channel,
            recipient = %recipient,
            purpose = code_type.as_str(),
            "Verification code issued"
        );
        tracing::debug!(
            purpose = code_type.as_str(),
            code = %code,
            "Verification code value"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_info_logs_omit_the_code_value() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .with_writer(capture.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async {
                TracingNotifier
                    .deliver(Channel::Email, "a@example.com", CodeType::Email, "4719")
                    .await
                    .unwrap();
            });
        });

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Verification code issued"));
        assert!(logs.contains("a@example.com"));
        assert!(!logs.contains("4719"));
    }
}
