use chrono::{DateTime, Utc};
use services::{CertificateIssuer, Notifier};

/// Prints toasts to stderr so they do not mix with command output.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str) {
        eprintln!("** {title}: {message}");
    }
}

pub struct ConsoleCertificateIssuer;

impl CertificateIssuer for ConsoleCertificateIssuer {
    fn issue(&self, user_name: &str, completed_at: DateTime<Utc>) {
        let name = if user_name.is_empty() { "learner" } else { user_name };
        eprintln!(
            "** Certificate of completion issued to {name} on {}",
            completed_at.format("%Y-%m-%d")
        );
    }
}
