use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Shows a short, non-blocking notice to the learner (a toast).
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Produces a completion certificate once the whole curriculum is done.
pub trait CertificateIssuer: Send + Sync {
    fn issue(&self, user_name: &str, completed_at: DateTime<Utc>);
}

/// Optional presentation-side collaborators.
///
/// Each slot is either registered or absent; services ask with the `has_*`
/// queries or simply skip the call when a slot is empty.
#[derive(Clone, Default)]
pub struct Collaborators {
    notifier: Option<Arc<dyn Notifier>>,
    certificates: Option<Arc<dyn CertificateIssuer>>,
}

impl Collaborators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_certificate_issuer(mut self, issuer: Arc<dyn CertificateIssuer>) -> Self {
        self.certificates = Some(issuer);
        self
    }

    #[must_use]
    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    #[must_use]
    pub fn has_certificate_issuer(&self) -> bool {
        self.certificates.is_some()
    }

    #[must_use]
    pub fn notifier(&self) -> Option<&dyn Notifier> {
        self.notifier.as_deref()
    }

    #[must_use]
    pub fn certificate_issuer(&self) -> Option<&dyn CertificateIssuer> {
        self.certificates.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl Notifier for Recording {
        fn notify(&self, title: &str, message: &str) {
            self.0.lock().unwrap().push(format!("{title}: {message}"));
        }
    }

    #[test]
    fn empty_registry_reports_absence() {
        let collaborators = Collaborators::new();
        assert!(!collaborators.has_notifier());
        assert!(!collaborators.has_certificate_issuer());
        assert!(collaborators.notifier().is_none());
    }

    #[test]
    fn registered_notifier_is_reachable() {
        let recording = Arc::new(Recording::default());
        let collaborators = Collaborators::new().with_notifier(recording.clone());
        assert!(collaborators.has_notifier());

        collaborators.notifier().unwrap().notify("Badge", "First Steps");
        assert_eq!(*recording.0.lock().unwrap(), vec!["Badge: First Steps"]);
    }
}
