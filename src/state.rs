use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::middleware::rate_limit::RateLimiter;
use crate::services::mailer::{LogMailer, Mailer};
use crate::services::otp_service::OtpService;

/// Shared application state: the connection pool plus process-wide,
/// read-only configuration and services. No ambient globals; everything a
/// handler needs arrives through here.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let tokens = TokenService::new(&config.security);
        let limiter = RateLimiter::new(&config.rate_limit);
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(&config.mail));

        Self {
            pool,
            config: Arc::new(config),
            tokens,
            mailer,
            limiter,
        }
    }

    pub fn otp_service(&self) -> OtpService {
        OtpService::new(self.pool.clone(), self.mailer.clone())
    }
}
