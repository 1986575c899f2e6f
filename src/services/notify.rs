//! Team notification for newly captured leads.

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use thiserror::Error;

use crate::config::LeadsConfig;
use crate::core::Lead;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Outbound channel telling the support team about a new lead.
pub trait LeadNotifier: Send + Sync {
    fn notify(&self, lead: &Lead) -> Result<(), NotifyError>;
}

/// Subject and plain-text body of a lead notice.
pub fn compose_notice(lead: &Lead) -> (String, String) {
    let or_na = |value: &str| if value.is_empty() { "N/A".to_string() } else { value.to_string() };
    let subject = format!("🧭 New Chat Lead: {}", lead.contact_label());
    let body = format!(
        "Name: {}\nEmail: {}\nPhone: {}\nMessage: {}\nOpt-in: {}\nCreated: {}\n",
        or_na(&lead.name),
        or_na(&lead.email),
        or_na(&lead.phone),
        if lead.message.is_empty() { "—" } else { lead.message.as_str() },
        if lead.opt_in { "Yes" } else { "No" },
        lead.created_at.format("%Y-%m-%d %H:%M"),
    );
    (subject, body)
}

/// Sends notices through an SMTP relay. Without recipients or a host it only
/// logs a warning.
pub struct SmtpNotifier {
    settings: LeadsConfig,
}

impl SmtpNotifier {
    pub fn new(settings: LeadsConfig) -> Self {
        Self { settings }
    }

    fn is_configured(&self) -> bool {
        !self.settings.notification_emails.is_empty() && self.settings.smtp_host.is_some()
    }

    fn build_message(&self, lead: &Lead) -> Result<lettre::Message, NotifyError> {
        let (subject, body) = compose_notice(lead);
        let mut builder = lettre::Message::builder()
            .from(self.settings.from_email.parse::<Mailbox>()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.settings.notification_emails {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }
        Ok(builder.body(body)?)
    }
}

impl LeadNotifier for SmtpNotifier {
    fn notify(&self, lead: &Lead) -> Result<(), NotifyError> {
        let Some(host) = self.settings.smtp_host.as_deref().filter(|_| self.is_configured()) else {
            tracing::warn!(lead_id = lead.id, "no lead notification recipients or SMTP host configured, skipping");
            return Ok(());
        };

        let message = self.build_message(lead)?;
        let mut transport = SmtpTransport::relay(host)?.port(self.settings.smtp_port);
        if let (Some(user), Some(password)) = (&self.settings.smtp_username, &self.settings.smtp_password) {
            transport = transport.credentials(Credentials::new(user.clone(), password.clone()));
        }
        transport.build().send(&message)?;

        tracing::info!(lead_id = lead.id, recipients = self.settings.notification_emails.len(), "lead notification sent");
        Ok(())
    }
}
