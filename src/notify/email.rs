use std::future::Future;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::service::EmailConfig;
use crate::errors::Result;
use crate::observability::metrics::get_metrics;
use crate::watchlist::evaluator::Alert;

const SMTPS_PORT: u16 = 465;

/// Delivers one plain-text message to the configured recipient.
pub trait Mailer {
    fn send(&self, subject: &str, body: String) -> impl Future<Output = Result<()>> + Send;
}

pub fn format_alert_email(alerts: &[Alert], store_label: &str) -> String {
    let mut lines = vec![format!("The following products are on promotion at {}:\n", store_label)];
    lines.extend(alerts.iter().map(|alert| {
        format!(
            "- {}: Now ${:.2} (was ${:.2}, {:.1}% off)",
            alert.friendly_name, alert.promo_price, alert.regular_price, alert.discount_percent
        )
    }));
    lines.join("\n")
}

/// Send one message for `alerts`. Returns whether anything was sent.
pub async fn send_alerts<M: Mailer>(mailer: &M, subject: &str, alerts: &[Alert], store_label: &str) -> Result<bool> {
    if alerts.is_empty() {
        info!(store = store_label, "no alerts to send");
        return Ok(false);
    }

    mailer.send(subject, format_alert_email(alerts, store_label)).await?;
    get_metrics().await.emails_sent.inc();
    info!(store = store_label, alerts = alerts.len(), "alert email sent");
    Ok(true)
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let mut builder = if cfg.smtp_port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)?
        }
        .port(cfg.smtp_port);

        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.to_owned(), pass.to_owned()));
        }

        Ok(Self {
            transport: builder.build(),
            sender: cfg.sender.parse()?,
            recipient: cfg.recipient.parse()?,
        })
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: String) -> Result<()> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        let response = self.transport.send(message).await?;
        info!(code = %response.code(), "smtp accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::RecordingMailer;

    fn alert() -> Alert {
        Alert {
            product_id: "1-EA".to_owned(),
            friendly_name: "Aveeno Lotion".to_owned(),
            store: "Dunedin".to_owned(),
            regular_price: 6.99,
            promo_price: 4.50,
            discount_percent: 35.62,
            price_triggered: true,
            discount_triggered: false,
        }
    }

    #[test]
    fn body_lists_each_alert() {
        let body = format_alert_email(&[alert()], "Dunedin");

        assert_eq!(
            body,
            "The following products are on promotion at Dunedin:\n\n- Aveeno Lotion: Now $4.50 (was $6.99, 35.6% off)"
        );
    }

    #[tokio::test]
    async fn empty_alert_list_sends_nothing() {
        let mailer = RecordingMailer::default();

        assert!(!send_alerts(&mailer, "subject", &[], "Dunedin").await.unwrap());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn alerts_go_out_as_one_message() {
        let mailer = RecordingMailer::default();
        let mut second = alert();
        second.friendly_name = "Milk".to_owned();

        assert!(send_alerts(&mailer, "NewWorld Specials Alert", &[alert(), second], "Dunedin").await.unwrap());

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "NewWorld Specials Alert");
        assert!(sent[0].1.contains("- Milk: Now $4.50"));
    }

    #[test]
    fn lines_are_newline_separated_in_order() {
        let mut second = alert();
        second.friendly_name = "Milk".to_owned();
        second.promo_price = 2.0;
        second.regular_price = 4.0;
        second.discount_percent = 50.0;

        let body = format_alert_email(&[alert(), second], "Chaffers");
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(
            lines,
            vec![
                "The following products are on promotion at Chaffers:",
                "",
                "- Aveeno Lotion: Now $4.50 (was $6.99, 35.6% off)",
                "- Milk: Now $2.00 (was $4.00, 50.0% off)",
            ]
        );
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        let cfg = EmailConfig {
            smtp_host: "smtp.example.com".to_owned(),
            smtp_port: 587,
            username: None,
            password: None,
            sender: "not an address".to_owned(),
            recipient: "me@example.com".to_owned(),
            subject: "NewWorld Specials Alert".to_owned(),
        };

        assert!(SmtpMailer::from_config(&cfg).is_err());
    }
}
