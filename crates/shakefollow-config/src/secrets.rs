use anyhow::{Context, Result};

/// SMTP credentials loaded from the environment. `Debug` is implemented
/// manually so credentials never reach a log line via a derived impl.
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Load SMTP credentials from `SHAKEFOLLOW_SMTP_USERNAME` /
/// `SHAKEFOLLOW_SMTP_PASSWORD`. Fails loudly rather than silently sending
/// unauthenticated mail.
pub fn load_smtp_credentials_from_env() -> Result<SmtpCredentials> {
    let username = std::env::var("SHAKEFOLLOW_SMTP_USERNAME")
        .context("missing env SHAKEFOLLOW_SMTP_USERNAME")?;
    let password = std::env::var("SHAKEFOLLOW_SMTP_PASSWORD")
        .context("missing env SHAKEFOLLOW_SMTP_PASSWORD")?;
    Ok(SmtpCredentials { username, password })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_impl_redacts_password() {
        let c = SmtpCredentials {
            username: "alerts@example.org".to_string(),
            password: "hunter2".to_string(),
        };
        let out = format!("{c:?}");
        assert!(!out.contains("hunter2"));
    }
}
