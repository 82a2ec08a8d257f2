use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use course_core::achievements::{BADGES, BadgeContext, evaluate};
use course_core::model::{
    CourseEvent, Curriculum, LessonId, ModuleId, ModuleProgress, ProfileDraft, ProgressDocument,
    QuizResult, SkillCategoryId, UserProfile,
};
use course_core::personalization::current_module;
use course_core::time::{fixed_clock, fixed_now};
use services::{CertificateIssuer, Collaborators, CourseServices, Notifier};
use storage::{InMemoryKeyValueStore, Storage, keys};

fn m(id: u64) -> ModuleId {
    ModuleId::new(id)
}

fn l(id: u64) -> LessonId {
    LessonId::new(id)
}

fn curriculum(counts: &[u64]) -> Arc<Curriculum> {
    Arc::new(Curriculum::from_lesson_counts(counts).unwrap())
}

fn record_events(services: &CourseServices) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    services.bus().subscribe_fn("recorder", move |event| {
        let entry = match event {
            CourseEvent::AchievementUnlocked { achievement } => {
                format!("{}:{}", event.name(), achievement.id)
            }
            _ => event.name().to_string(),
        };
        sink.lock().unwrap().push(entry);
        Ok(())
    });
    log
}

fn module_events(log: &[String]) -> usize {
    log.iter().filter(|e| *e == "module-completed").count()
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Notifier for Recorder {
    fn notify(&self, title: &str, _message: &str) {
        self.0.lock().unwrap().push(title.to_string());
    }
}

impl CertificateIssuer for Recorder {
    fn issue(&self, user_name: &str, _completed_at: DateTime<Utc>) {
        self.0.lock().unwrap().push(format!("certificate for {user_name}"));
    }
}

#[tokio::test]
async fn module_completes_only_after_its_last_lesson() {
    let mut services =
        CourseServices::in_memory(fixed_clock(), curriculum(&[2, 3]), Collaborators::new()).await;
    let events = record_events(&services);

    let first = services.complete_lesson(m(1), l(1)).await;
    assert!(!first.completed);
    assert_eq!(module_events(&events.lock().unwrap()), 0);

    let second = services.complete_lesson(m(1), l(2)).await;
    assert!(second.completed);
    assert_eq!(module_events(&events.lock().unwrap()), 1);

    services.complete_lesson(m(1), l(2)).await;
    assert_eq!(module_events(&events.lock().unwrap()), 1);
}

#[test]
fn quiz_result_implies_first_lesson_badge() {
    let mut doc = ProgressDocument::new();
    doc.quiz_results.push(QuizResult::new(m(1), l(1), 100, 60));
    let profile = UserProfile::default();
    let curriculum = curriculum(&[2, 2]);
    let context = BadgeContext {
        progress: &doc,
        profile: &profile,
        curriculum: &curriculum,
    };

    let ids: BTreeSet<String> = evaluate(BADGES, &context, &BTreeSet::new(), fixed_now())
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert!(ids.contains("perfect_quiz"));
    assert!(ids.contains("first_lesson"));
}

#[tokio::test]
async fn malformed_stored_progress_starts_empty() {
    let kv = InMemoryKeyValueStore::new();
    kv.insert_raw(keys::COURSE_PROGRESS, "{not valid json").unwrap();
    let services = CourseServices::from_storage(
        Storage::from_store(Arc::new(kv)),
        fixed_clock(),
        curriculum(&[2]),
        Collaborators::new(),
    )
    .await;

    assert_eq!(services.document(), &ProgressDocument::default());
}

#[test]
fn resume_point_follows_given_order() {
    let mut doc = ProgressDocument::new();
    doc.modules.insert(
        m(3),
        ModuleProgress {
            completed: true,
            ..ModuleProgress::default()
        },
    );
    assert_eq!(current_module(&[m(3), m(1), m(2)], &doc), Some(m(1)));
}

#[tokio::test]
async fn zero_module_id_leaves_document_untouched() {
    let mut services =
        CourseServices::in_memory(fixed_clock(), curriculum(&[2]), Collaborators::new()).await;
    services.complete_lesson(m(1), l(1)).await;
    let before = services.document().clone();
    let events = record_events(&services);

    services.complete_lesson(m(0), l(1)).await;

    assert_eq!(services.document(), &before);
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn lesson_outside_curriculum_cannot_finish_a_module() {
    let mut services =
        CourseServices::in_memory(fixed_clock(), curriculum(&[2]), Collaborators::new()).await;
    let events = record_events(&services);

    services.complete_lesson(m(1), l(1)).await;
    let progress = services.complete_lesson(m(1), l(99)).await;
    services
        .record_quiz_result(QuizResult::new(m(1), l(99), 100, 30))
        .await;

    assert!(!progress.completed);
    assert!(!services.document().is_lesson_completed(m(1), l(99)));
    assert!(services.document().quiz_results.is_empty());
    assert_eq!(module_events(&events.lock().unwrap()), 0);
    assert!(!services.achievements().unlocked().await.contains("all_modules"));
}

#[tokio::test]
async fn dropping_services_releases_bus_subscribers() {
    let services =
        CourseServices::in_memory(fixed_clock(), curriculum(&[2]), Collaborators::new()).await;
    let bus = services.bus();
    let achievements = Arc::downgrade(&services.achievements());
    let personalization = Arc::downgrade(&services.personalization());
    assert_eq!(bus.subscriber_count(), 2);

    drop(services);
    assert_eq!(bus.subscriber_count(), 0);
    assert!(achievements.upgrade().is_none());
    assert!(personalization.upgrade().is_none());
}

#[tokio::test]
async fn finishing_a_module_updates_profile_and_badges() {
    let mut services =
        CourseServices::in_memory(fixed_clock(), curriculum(&[2, 2, 2]), Collaborators::new())
            .await;

    services.complete_lesson(m(1), l(1)).await;
    services.complete_lesson(m(1), l(2)).await;

    let profile = services.personalization().profile().await;
    assert!(profile.completed_modules.contains(&m(1)));
    let fundamentals = SkillCategoryId::new("authorization-fundamentals").unwrap();
    assert_eq!(profile.skill_level(&fundamentals), 1);

    let unlocked = services.achievements().unlocked().await;
    assert!(unlocked.contains("first_lesson"));
    assert!(unlocked.contains("first_module"));
    assert!(!unlocked.contains("half_way"));
}

#[tokio::test]
async fn profile_update_unlocks_profile_badge() {
    let services =
        CourseServices::in_memory(fixed_clock(), curriculum(&[2]), Collaborators::new()).await;
    let events = record_events(&services);

    let draft = ProfileDraft {
        role: "executive".into(),
        industry: "retail".into(),
        experience: "advanced".into(),
        learning_goals: vec!["governance".into()],
        ..ProfileDraft::new()
    };
    services.personalization().update_profile(draft).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["achievement-unlocked:profile_complete", "profile-updated"]
    );
    let path = services.personalization().learning_path().await;
    assert_eq!(path.order, vec![m(1)]);
}

#[tokio::test]
async fn whole_course_notifies_once_and_issues_certificate() {
    let recorder = Arc::new(Recorder::default());
    let collaborators = Collaborators::new()
        .with_notifier(recorder.clone())
        .with_certificate_issuer(recorder.clone());
    let mut services =
        CourseServices::in_memory(fixed_clock(), curriculum(&[1, 1]), collaborators).await;
    services.engine_mut().set_user_name("Ada").await;

    services
        .record_quiz_result(QuizResult::new(m(1), l(1), 100, 90))
        .await;
    services.complete_lesson(m(2), l(1)).await;

    let log = recorder.0.lock().unwrap().clone();
    let certificates: Vec<&String> = log.iter().filter(|e| e.starts_with("certificate")).collect();
    assert_eq!(certificates, vec!["certificate for Ada"]);
    assert!(services.achievements().unlocked().await.contains("all_modules"));
}

#[tokio::test]
async fn progress_survives_a_restart_on_the_same_backend() {
    let storage = Storage::in_memory();
    let mut first = CourseServices::from_storage(
        storage.clone(),
        fixed_clock(),
        curriculum(&[2]),
        Collaborators::new(),
    )
    .await;
    first.complete_lesson(m(1), l(1)).await;
    first.engine_mut().record_time_spent(m(1), l(1), 120).await;

    let second = CourseServices::from_storage(
        storage,
        fixed_clock(),
        curriculum(&[2]),
        Collaborators::new(),
    )
    .await;
    assert!(second.document().is_lesson_completed(m(1), l(1)));
    assert_eq!(second.document().time_spent_on(m(1), l(1)), 120);
    let unlocked = second.achievements().unlocked().await;
    assert!(unlocked.contains("first_lesson"));
    assert!(unlocked.contains("half_way"));
    assert_eq!(unlocked.len(), 2);
}
