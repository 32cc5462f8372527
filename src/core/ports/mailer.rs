use crate::error::Error;

/// Outbound transactional mail. Best effort by contract: callers must
/// never fail a primary action because a send failed.
pub trait Mailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), Error>;
}
