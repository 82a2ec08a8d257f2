//! Completion rules over a [`ProgressDocument`].
//!
//! Every lesson and module transition goes through [`apply_lesson_completion`],
//! which recomputes the module's `completed` flag from its lessons instead of
//! trusting the stored value. Unlock eligibility and percentages are derived
//! on demand and never persisted.

use crate::model::{Curriculum, LessonId, ModuleId, ModuleProgress, ProgressDocument};

/// Outcome of marking a lesson completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCompletion {
    /// Module state after the write.
    pub progress: ModuleProgress,
    /// False when the lesson was already completed.
    pub lesson_newly_completed: bool,
    /// True only on the incomplete → complete edge.
    pub module_newly_completed: bool,
}

impl LessonCompletion {
    /// True if the document changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.lesson_newly_completed || self.module_newly_completed
    }
}

/// Marks `lesson_id` completed and recomputes the module's `completed` flag
/// against `total_lessons`, the module's lesson count from the curriculum.
///
/// Returns `None`, leaving `doc` untouched, when either id is not positive.
/// Calling it again for the same lesson changes nothing.
pub fn apply_lesson_completion(
    doc: &mut ProgressDocument,
    module_id: ModuleId,
    lesson_id: LessonId,
    total_lessons: usize,
) -> Option<LessonCompletion> {
    if !module_id.is_positive() || !lesson_id.is_positive() {
        return None;
    }
    Some(mark_completed(doc, module_id, lesson_id, |module| {
        derive_module_completed(module, total_lessons)
    }))
}

/// Like [`apply_lesson_completion`], but the module only completes once every
/// lesson the curriculum lists for it is done.
///
/// Returns `None`, leaving `doc` untouched, when the curriculum does not list
/// the lesson.
pub fn apply_curriculum_completion(
    doc: &mut ProgressDocument,
    curriculum: &Curriculum,
    module_id: ModuleId,
    lesson_id: LessonId,
) -> Option<LessonCompletion> {
    if !curriculum.contains(module_id, lesson_id) {
        return None;
    }
    let lessons = curriculum.lessons(module_id);
    Some(mark_completed(doc, module_id, lesson_id, |module| {
        derive_curriculum_completed(module, lessons)
    }))
}

fn mark_completed(
    doc: &mut ProgressDocument,
    module_id: ModuleId,
    lesson_id: LessonId,
    derive: impl FnOnce(&ModuleProgress) -> bool,
) -> LessonCompletion {
    let module = doc.modules.entry(module_id).or_default();
    let was_completed = module.completed;
    let lesson_newly_completed = !module.is_lesson_completed(lesson_id);
    module.lessons.insert(lesson_id, true);

    module.completed = derive(module);
    let module_newly_completed = !was_completed && module.completed;

    LessonCompletion {
        progress: module.clone(),
        lesson_newly_completed,
        module_newly_completed,
    }
}

/// Registers a visit: the lesson key is added as not completed unless it is
/// already present. A completed lesson is never downgraded.
///
/// Returns true if the document changed.
pub fn register_lesson_visit(
    doc: &mut ProgressDocument,
    module_id: ModuleId,
    lesson_id: LessonId,
) -> bool {
    if !module_id.is_positive() || !lesson_id.is_positive() {
        return false;
    }
    let module = doc.modules.entry(module_id).or_default();
    if module.lessons.contains_key(&lesson_id) {
        return false;
    }
    module.lessons.insert(lesson_id, false);
    // A module with a fresh, incomplete lesson can no longer be complete.
    module.completed = false;
    true
}

/// A module is complete iff it has at least `total_lessons` completed lessons
/// and no registered lesson is still incomplete.
#[must_use]
pub fn derive_module_completed(module: &ModuleProgress, total_lessons: usize) -> bool {
    total_lessons > 0
        && module.lessons.values().all(|done| *done)
        && module.completed_lessons() >= total_lessons
}

/// A module is complete iff every lesson in `lessons` is completed and no
/// registered lesson is still incomplete. Lessons outside `lessons` never
/// count towards completion.
#[must_use]
pub fn derive_curriculum_completed(module: &ModuleProgress, lessons: &[LessonId]) -> bool {
    !lessons.is_empty()
        && module.lessons.values().all(|done| *done)
        && lessons.iter().all(|lesson| module.is_lesson_completed(*lesson))
}

/// Recomputes every module's `completed` flag from the curriculum's lessons.
///
/// Used after hydrating a document whose stored flags may have drifted.
/// Returns the modules whose flag changed.
pub fn reconcile(doc: &mut ProgressDocument, curriculum: &Curriculum) -> Vec<ModuleId> {
    let mut changed = Vec::new();
    for (module_id, module) in &mut doc.modules {
        let lessons = curriculum.lessons(*module_id);
        if lessons.is_empty() {
            // Not part of the current curriculum; leave stored state alone.
            continue;
        }
        let completed = derive_curriculum_completed(module, lessons);
        if completed != module.completed {
            module.completed = completed;
            changed.push(*module_id);
        }
    }
    changed
}

//
// ─── UNLOCKING ─────────────────────────────────────────────────────────────────
//

/// Module 1 is always unlocked; module `n + 1` unlocks once module `n` has at
/// least one completed lesson.
#[must_use]
pub fn is_module_unlocked(doc: &ProgressDocument, module_id: ModuleId) -> bool {
    match module_id.value() {
        0 => false,
        1 => true,
        n => doc
            .module(ModuleId::new(n - 1))
            .is_some_and(ModuleProgress::is_started),
    }
}

/// Unlock rule over curriculum order: the first listed module is always
/// unlocked and every other one unlocks once the module listed before it has
/// started, so gaps in the ids do not lock anything. Modules the curriculum
/// does not list fall back to [`is_module_unlocked`].
#[must_use]
pub fn is_module_unlocked_in(
    doc: &ProgressDocument,
    curriculum: &Curriculum,
    module_id: ModuleId,
) -> bool {
    if curriculum.module_position(module_id).is_none() {
        return is_module_unlocked(doc, module_id);
    }
    match curriculum.previous_module(module_id) {
        None => true,
        Some(previous) => doc.module(previous).is_some_and(ModuleProgress::is_started),
    }
}

/// Unlocked modules of the curriculum, ascending.
#[must_use]
pub fn unlocked_modules(doc: &ProgressDocument, curriculum: &Curriculum) -> Vec<ModuleId> {
    curriculum
        .module_ids()
        .into_iter()
        .filter(|id| is_module_unlocked_in(doc, curriculum, *id))
        .collect()
}

/// A lesson is reachable when its module is unlocked and it is either the
/// module's first lesson or the lesson before it is completed.
#[must_use]
pub fn is_lesson_unlocked(
    doc: &ProgressDocument,
    curriculum: &Curriculum,
    module_id: ModuleId,
    lesson_id: LessonId,
) -> bool {
    if !is_module_unlocked_in(doc, curriculum, module_id) {
        return false;
    }
    let lessons = curriculum.lessons(module_id);
    match lessons.iter().position(|id| *id == lesson_id) {
        None => false,
        Some(0) => true,
        Some(idx) => doc.is_lesson_completed(module_id, lessons[idx - 1]),
    }
}

//
// ─── PERCENTAGES ───────────────────────────────────────────────────────────────
//

/// Completed share of a module, `0..=100`, rounded down.
#[must_use]
pub fn module_percentage(doc: &ProgressDocument, module_id: ModuleId, total_lessons: usize) -> u8 {
    let done = doc.module(module_id).map_or(0, ModuleProgress::completed_lessons);
    percentage(done, total_lessons)
}

/// Completed share of the whole curriculum, `0..=100`, rounded down.
///
/// Only lessons the curriculum knows about are counted.
#[must_use]
pub fn course_percentage(doc: &ProgressDocument, curriculum: &Curriculum) -> u8 {
    let done = curriculum
        .module_ids()
        .into_iter()
        .map(|module| {
            curriculum
                .lessons(module)
                .iter()
                .filter(|lesson| doc.is_lesson_completed(module, **lesson))
                .count()
        })
        .sum();
    percentage(done, curriculum.total_lessons())
}

fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = done.min(total) * 100 / total;
    u8::try_from(pct).unwrap_or(100)
}
