use async_trait::async_trait;

use crate::config::MailConfig;

/// Outbound mail seam. Delivery is an external collaborator; everything the
/// API needs from it goes through this trait so transports can be swapped
/// without touching the flows that send mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Development transport: writes the message to the log instead of a wire.
pub struct LogMailer {
    from_name: String,
    from_address: String,
}

impl LogMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            from_name: config.from_name.clone(),
            from_address: config.from_address.clone(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(
            "mail from {} <{}> to {}: {} / {}",
            self.from_name,
            self.from_address,
            to,
            subject,
            body
        );
        Ok(())
    }
}

pub fn welcome_email(name: &str) -> (String, String) {
    let name = if name.is_empty() { "there" } else { name };
    (
        format!("Welcome to Infinicard, {}", name).trim().to_string(),
        format!("Hi {},\n\nWelcome to Infinicard!\n\nCheers,\nInfinicard Team", name),
    )
}

pub fn otp_email(code: &str, purpose: &str) -> (String, String) {
    (
        format!("Your {} code for Infinicard", purpose),
        format!(
            "Your {} code is: {}\n\nThis code is valid for 10 minutes. \
             If you did not request this, ignore this email.",
            purpose, code
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_email_contains_code_and_purpose() {
        let (subject, body) = otp_email("042137", "forgot-password");
        assert!(subject.contains("forgot-password"));
        assert!(body.contains("042137"));
        assert!(body.contains("10 minutes"));
    }

    #[test]
    fn welcome_email_falls_back_to_generic_greeting() {
        let (_, body) = welcome_email("");
        assert!(body.starts_with("Hi there,"));
    }
}
