//! In-process publish/subscribe for course events.
//!
//! Dispatch is sequential in registration order and completes before
//! `publish` returns. Each subscriber runs in isolation: an error or a panic
//! is logged and the remaining subscribers still receive the event. Nothing
//! is replayed; components started later must read current state from the
//! progress store.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, warn};

use course_core::model::CourseEvent;

use crate::error::SubscriberError;

/// A component listening to course events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns `SubscriberError` if handling failed; the bus logs it.
    async fn on_event(&self, event: &CourseEvent) -> Result<(), SubscriberError>;
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of one `publish` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

type SubscriberList = Vec<(SubscriptionId, Arc<dyn EventSubscriber>)>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<SubscriberList>,
    next_id: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(subscriber = subscriber.name(), "subscribed to course events");
        self.guard().push((id, subscriber));
        id
    }

    /// Subscribe a synchronous closure.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&CourseEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnSubscriber {
            name: name.into(),
            handler,
        }))
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.guard();
        let before = guard.len();
        guard.retain(|(sub_id, _)| *sub_id != id);
        guard.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.guard().len()
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Subscribers may publish from inside their handler. Subscriptions
    /// added during a dispatch only see later events.
    pub async fn publish(&self, event: &CourseEvent) -> DispatchReport {
        let snapshot: Vec<Arc<dyn EventSubscriber>> = self
            .guard()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        let mut report = DispatchReport::default();
        for subscriber in snapshot {
            let outcome = AssertUnwindSafe(subscriber.on_event(event))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(
                        subscriber = subscriber.name(),
                        event = event.name(),
                        error = %err,
                        "event subscriber failed"
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        subscriber = subscriber.name(),
                        event = event.name(),
                        panic = panic_message(payload.as_ref()),
                        "event subscriber panicked"
                    );
                }
            }
        }
        report
    }

    fn guard(&self) -> MutexGuard<'_, SubscriberList> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct FnSubscriber<F> {
    name: String,
    handler: F,
}

#[async_trait]
impl<F> EventSubscriber for FnSubscriber<F>
where
    F: Fn(&CourseEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, event: &CourseEvent) -> Result<(), SubscriberError> {
        (self.handler)(event)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{LessonId, ModuleId};

    fn lesson_event() -> CourseEvent {
        CourseEvent::LessonCompleted {
            module_id: ModuleId::new(1),
            lesson_id: LessonId::new(1),
        }
    }

    fn recorder(bus: &EventBus, name: &'static str, log: &Arc<Mutex<Vec<String>>>) {
        let log = Arc::clone(log);
        bus.subscribe_fn(name, move |event| {
            log.lock().unwrap().push(format!("{name}:{}", event.name()));
            Ok(())
        });
    }

    #[tokio::test]
    async fn dispatches_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, "a", &log);
        recorder(&bus, "b", &log);

        let report = bus.publish(&lesson_event()).await;
        assert_eq!(report, DispatchReport { delivered: 2, failed: 0 });
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:lesson-completed", "b:lesson-completed"]
        );
    }

    #[tokio::test]
    async fn failing_and_panicking_subscribers_are_isolated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_fn("fails", |_| Err(SubscriberError::Message("boom".into())));
        bus.subscribe_fn("panics", |_| panic!("subscriber exploded"));
        recorder(&bus, "survivor", &log);

        let report = bus.publish(&lesson_event()).await;
        assert_eq!(report, DispatchReport { delivered: 1, failed: 2 });
        assert_eq!(*log.lock().unwrap(), vec!["survivor:lesson-completed"]);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let id = bus.subscribe_fn("once", move |_| {
            log_clone.lock().unwrap().push("hit".to_string());
            Ok(())
        });

        bus.publish(&lesson_event()).await;
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&lesson_event()).await;

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    struct Relay {
        bus: Arc<EventBus>,
    }

    #[async_trait]
    impl EventSubscriber for Relay {
        fn name(&self) -> &str {
            "relay"
        }

        async fn on_event(&self, event: &CourseEvent) -> Result<(), SubscriberError> {
            if let CourseEvent::LessonCompleted { module_id, .. } = event {
                self.bus
                    .publish(&CourseEvent::ModuleCompleted {
                        module_id: *module_id,
                    })
                    .await;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn subscribers_may_publish_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Arc::new(Relay {
            bus: Arc::clone(&bus),
        }));
        recorder(&bus, "listener", &log);

        bus.publish(&lesson_event()).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["listener:module-completed", "listener:lesson-completed"]
        );
    }
}
