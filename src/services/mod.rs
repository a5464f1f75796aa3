use std::future::Future;

pub mod mailer;
pub mod otp_service;

/// Dispatch a side effect whose outcome the caller must not wait on
/// (outbound mail, notification rows). Failures are logged and never
/// escalate to the parent request.
pub fn spawn_best_effort<F>(context: &'static str, fut: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            tracing::warn!("best-effort {} failed: {:#}", context, e);
        }
    });
}
