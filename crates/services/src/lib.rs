#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod completion_engine;
pub mod course_services;
pub mod error;
pub mod events;
pub mod personalization_service;
pub mod registry;

pub use course_core::Clock;

pub use achievement_service::AchievementService;
pub use completion_engine::CompletionEngine;
pub use course_services::CourseServices;
pub use error::{CourseServicesError, ProfileUpdateError, SubscriberError};
pub use events::{DispatchReport, EventBus, EventSubscriber, SubscriptionId};
pub use personalization_service::{LearningPath, LearningPathEntry, PersonalizationService};
pub use registry::{CertificateIssuer, Collaborators, Notifier};
