use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::core::ports::mailer::Mailer;
use crate::error::Error;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(relay: &str, username: String, password: String, from: &str) -> Result<Self, Error> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)
            .map_err(|e| Error::Mail(e.to_string()))?
            .credentials(Credentials::new(username, password))
            .build();
        let from = from.parse().map_err(|_| Error::Mail(format!("bad from address: {}", from)))?;
        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), Error> {
        let to = to.parse().map_err(|_| Error::Mail(format!("bad to address: {}", to)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_owned())
            .map_err(|e| Error::Mail(e.to_string()))?;
        self.transport.send(message).await.map_err(|e| Error::Mail(e.to_string()))?;
        Ok(())
    }
}
