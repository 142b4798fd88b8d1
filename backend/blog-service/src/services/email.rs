/// Outgoing mail for password resets, newsletter links and contact forms
use crate::config::{AppConfig, EmailConfig};
use crate::error::{AppError, Result};
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// A rendered message with text and HTML bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Async SMTP transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    admin_inbox: String,
    client_url: String,
    development: bool,
}

impl EmailService {
    /// If the SMTP host is empty the service logs instead of sending.
    pub fn new(email: &EmailConfig, app: &AppConfig) -> Result<Self> {
        let address = email
            .from_address
            .parse::<Address>()
            .map_err(|e| AppError::Internal(format!("Invalid EMAIL_FROM address: {}", e)))?;
        let from = Mailbox::new(Some(email.from_name.clone()), address);

        let transport = if email.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if email.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&email.smtp_host)
            }
            .map_err(|e| AppError::Internal(format!("Failed to configure SMTP transport: {}", e)))?
            .port(email.smtp_port);

            let builder = match (&email.smtp_username, &email.smtp_password) {
                (Some(user), Some(pass)) => {
                    builder.credentials(Credentials::new(user.clone(), pass.clone()))
                }
                _ => builder,
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            admin_inbox: email.admin_inbox.clone(),
            client_url: app.client_url.trim_end_matches('/').to_string(),
            development: !app.env.eq_ignore_ascii_case("production"),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn client_url(&self) -> &str {
        &self.client_url
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(
                subject = %message.subject,
                recipient = %message.to,
                "Email service running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient email address: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email message: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        info!(subject = %message.subject, "email sent successfully");
        Ok(())
    }

    fn subject(&self, base: &str) -> String {
        if self.development {
            format!("Fusion Hub (Development) – {}", base)
        } else {
            format!("Fusion Hub – {}", base)
        }
    }

    pub fn password_reset(&self, to: &str, name: &str, token: &str) -> EmailMessage {
        let link = format!("{}/reset-password/{}", self.client_url, token);
        EmailMessage {
            to: to.to_string(),
            subject: self.subject("Password Reset Instructions"),
            text: format!(
                "Hi {name},\n\nWe've received a request to change the password for your account. \
                 Use the link below to choose a new password. The link will expire in 10 minutes.\n\n\
                 Reset your password: {link}\n\n\
                 If you did not request this password reset, you may disregard this email."
            ),
            html: format!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: auto;">
    <h2>Password Reset Request</h2>
    <p>Hello <strong>{name}</strong>,</p>
    <p>Click the button below to choose a new password. The link will expire in <strong>10 minutes</strong>.</p>
    <p style="text-align: center; margin: 32px 0;">
        <a href="{link}" style="background: #3182ce; color: #fff; padding: 14px 32px; border-radius: 5px; text-decoration: none;">Reset Your Password</a>
    </p>
    <p>If you did not request this password reset, you may disregard this email.</p>
</div>"#
            ),
        }
    }

    pub fn newsletter_confirmation(&self, to: &str, token: &str) -> EmailMessage {
        let link = format!(
            "{}/confirm?token={}&email={}",
            self.client_url,
            urlencoding::encode(token),
            urlencoding::encode(to)
        );
        EmailMessage {
            to: to.to_string(),
            subject: self.subject("Confirm your subscription"),
            text: format!(
                "Thanks for subscribing to our newsletter.\n\n\
                 Please confirm your subscription within 30 minutes: {link}"
            ),
            html: format!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: auto;">
    <h2>Confirm your subscription</h2>
    <p>Please confirm your subscription within 30 minutes.</p>
    <p><a href="{link}">Confirm subscription</a></p>
</div>"#
            ),
        }
    }

    pub fn newsletter_unsubscribe(&self, to: &str, token: &str) -> EmailMessage {
        let link = format!(
            "{}/unsubscribe?token={}&email={}",
            self.client_url,
            urlencoding::encode(token),
            urlencoding::encode(to)
        );
        EmailMessage {
            to: to.to_string(),
            subject: self.subject("Confirm unsubscription"),
            text: format!("We received a request to unsubscribe this address.\n\nConfirm: {link}"),
            html: format!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: auto;">
    <h2>Unsubscribe</h2>
    <p>We received a request to unsubscribe this address from our newsletter.</p>
    <p><a href="{link}">Confirm unsubscription</a></p>
</div>"#
            ),
        }
    }

    pub fn contact_notification(
        &self,
        name: &str,
        email: &str,
        subject: &str,
        body: &str,
    ) -> EmailMessage {
        EmailMessage {
            to: self.admin_inbox.clone(),
            subject: format!("New contact message: {}", subject),
            text: format!("From: {name} <{email}>\n\n{body}"),
            html: format!(
                r#"<div style="font-family: Arial, sans-serif;">
    <p><strong>From:</strong> {name} &lt;{email}&gt;</p>
    <p><strong>Subject:</strong> {subject}</p>
    <p>{body}</p>
</div>"#
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EmailService {
        let email = EmailConfig {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            use_starttls: true,
            from_address: "noreply@example.com".into(),
            from_name: "Fusion Hub".into(),
            admin_inbox: "admin@example.com".into(),
        };
        let app = AppConfig {
            env: "development".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            public_url: "http://localhost:8080".into(),
            client_url: "http://localhost:3000/".into(),
        };
        EmailService::new(&email, &app).unwrap()
    }

    #[test]
    fn test_noop_without_smtp_host() {
        assert!(!service().is_enabled());
    }

    #[test]
    fn test_links_use_client_url() {
        let svc = service();
        let reset = svc.password_reset("a@example.com", "Jane", "tok123");
        assert!(reset.text.contains("http://localhost:3000/reset-password/tok123"));
        assert!(reset.subject.contains("(Development)"));

        let confirm = svc.newsletter_confirmation("a+b@example.com", "t");
        assert!(confirm.html.contains("email=a%2Bb%40example.com"));
    }

    #[test]
    fn test_contact_goes_to_admin_inbox() {
        let msg = service().contact_notification("Jane Writer", "j@example.com", "Hi", "Body");
        assert_eq!(msg.to, "admin@example.com");
        assert_eq!(msg.subject, "New contact message: Hi");
    }

    #[actix_rt::test]
    async fn test_noop_send_succeeds() {
        let svc = service();
        let msg = svc.password_reset("a@example.com", "Jane", "tok");
        assert!(svc.send(&msg).await.is_ok());
    }
}
