pub mod email;

pub use email::{format_alert_email, send_alerts, Mailer, SmtpMailer};
