use campusflow_config::EmailConfig;
use campusflow_core::AppError;
use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, instrument, warn};

/// Transactional mail over SMTP.
///
/// Sends are skipped when `EMAIL_ENABLED` is off. Callers on request paths
/// use [`EmailService::send_or_log`] so a mail failure never fails the request.
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Awaits `send` and downgrades its error to a warning.
    pub async fn send_or_log<F>(kind: &'static str, send: F)
    where
        F: Future<Output = Result<(), AppError>>,
    {
        if let Err(e) = send.await {
            warn!(email.kind = kind, error = %e.message(), "Email delivery failed");
        }
    }

    #[instrument(skip(self, reset_token))]
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        to_name: &str,
        reset_token: &str,
    ) -> Result<(), AppError> {
        let reset_link = format!(
            "{}/reset-password?token={}",
            self.config.frontend_url, reset_token
        );

        let html_body = self.layout(
            "Reset your password",
            &format!(
                r#"<p>Hi {to_name},</p>
<p>We received a request to reset the password of your CampusFlow account.</p>
<p style="text-align: center; margin: 30px 0;">
    <a href="{reset_link}" style="background-color: #007bff; color: #ffffff; padding: 12px 28px; text-decoration: none; border-radius: 4px;">Reset password</a>
</p>
<p>The link expires in 1 hour. If you did not ask for a reset you can ignore this email.</p>"#
            ),
        );
        let text_body = format!(
            "Hi {to_name},\n\n\
             We received a request to reset the password of your CampusFlow account.\n\n\
             Reset it here (the link expires in 1 hour):\n\
             {reset_link}\n\n\
             If you did not ask for a reset you can ignore this email.\n\n\
             The CampusFlow Team"
        );

        self.send_email(to_email, "Reset your CampusFlow password", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self))]
    pub async fn send_password_reset_confirmation(
        &self,
        to_email: &str,
        to_name: &str,
    ) -> Result<(), AppError> {
        let html_body = self.layout(
            "Password changed",
            &format!(
                "<p>Hi {to_name},</p>\
                 <p>The password of your CampusFlow account was just changed.</p>\
                 <p>If this was not you, contact your college administrator right away.</p>"
            ),
        );
        let text_body = format!(
            "Hi {to_name},\n\n\
             The password of your CampusFlow account was just changed.\n\n\
             If this was not you, contact your college administrator right away.\n\n\
             The CampusFlow Team"
        );

        self.send_email(to_email, "Your password was changed", &text_body, &html_body)
            .await
    }

    /// Sent when an administrator creates an account, and to the first
    /// administrator of a college that signs up.
    #[instrument(skip(self))]
    pub async fn send_welcome_email(
        &self,
        to_email: &str,
        to_name: &str,
        college_name: &str,
    ) -> Result<(), AppError> {
        let login_link = format!("{}/login", self.config.frontend_url);
        let html_body = self.layout(
            &format!("Welcome to {college_name}"),
            &format!(
                r#"<p>Hi {to_name},</p>
<p>An account has been created for you at <strong>{college_name}</strong> on CampusFlow.</p>
<p>Sign in with this email address at <a href="{login_link}">{login_link}</a>.</p>"#
            ),
        );
        let text_body = format!(
            "Hi {to_name},\n\n\
             An account has been created for you at {college_name} on CampusFlow.\n\n\
             Sign in with this email address at {login_link}\n\n\
             The CampusFlow Team"
        );

        self.send_email(
            to_email,
            &format!("Welcome to {college_name}"),
            &text_body,
            &html_body,
        )
        .await
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        if !self.config.enabled {
            debug!(to = %to_email, subject, "Email disabled, not sending");
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal_error(format!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal_error(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal_error(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {}", e)))?;

        Ok(())
    }

    fn layout(&self, heading: &str, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
</head>
<body style="margin: 0; padding: 20px; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="600" align="center" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px;">
        <tr>
            <td style="background-color: #007bff; padding: 24px; text-align: center; border-radius: 8px 8px 0 0;">
                <h1 style="margin: 0; color: #ffffff; font-size: 24px;">{from_name}</h1>
            </td>
        </tr>
        <tr>
            <td style="padding: 32px; color: #333333; font-size: 15px; line-height: 1.6;">
                <h2 style="margin-top: 0;">{heading}</h2>
                {content}
            </td>
        </tr>
    </table>
</body>
</html>"#,
            from_name = self.config.from_name,
        )
    }
}
