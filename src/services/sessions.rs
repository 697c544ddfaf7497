// src/services/sessions.rs

//! Session manager: exam session lifecycle from start to scored submission.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::{
    error::AppError,
    models::{
        exam_result::{DetailedResult, ExamResult, HistoryEntry},
        exam_session::{ExamSession, SessionQuestion, SubmitAnswerRequest},
        question::Question,
    },
    services::{access, catalog::ExamCatalog, questions::QuestionBank, scoring},
    store::{Collection, DocumentStore, Documents, Filter, StoreError},
    utils::{clock::Clock, jwt::Claims},
};

#[derive(Clone)]
pub struct SessionManager {
    sessions: Documents<ExamSession>,
    results: Documents<ExamResult>,
    catalog: ExamCatalog,
    questions: QuestionBank,
    clock: Arc<dyn Clock>,
}

/// Picks `count` question ids from `pool`.
///
/// Randomized selection is a uniform sample without replacement, in random
/// order; otherwise the first `count` questions in store order.
fn select_questions(pool: &[Question], count: usize, randomize: bool) -> Vec<String> {
    if randomize {
        let mut rng = rand::thread_rng();
        pool.choose_multiple(&mut rng, count)
            .map(|q| q.id.clone())
            .collect()
    } else {
        pool.iter().take(count).map(|q| q.id.clone()).collect()
    }
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog: ExamCatalog,
        questions: QuestionBank,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: Documents::new(store.clone(), Collection::ExamSessions),
            results: Documents::new(store, Collection::ExamResults),
            catalog,
            questions,
            clock,
        }
    }

    /// Starts an exam, or resumes the caller's unsubmitted session for it.
    pub async fn start(&self, caller: &Claims, exam_config_id: &str) -> Result<ExamSession, AppError> {
        let config = self
            .catalog
            .get(exam_config_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Exam configuration not found".to_string()))?;

        if let Some(existing) = self.open_session(caller.user_id(), &config.id).await? {
            tracing::info!(session_id = %existing.id, "resuming exam session");
            return Ok(existing);
        }

        let pool = self.questions.by_subjects(&config.subjects).await?;
        if pool.len() < config.total_questions {
            return Err(AppError::BadRequest(
                "Not enough questions available for this exam".to_string(),
            ));
        }

        let selected = select_questions(&pool, config.total_questions, config.randomize_questions);
        let session = ExamSession::new(
            uuid::Uuid::new_v4().to_string(),
            caller.user_id().to_string(),
            config.id.clone(),
            selected,
            self.clock.now(),
        );

        match self.sessions.insert(&session.id, &session).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %session.id,
                    exam_config_id = %config.id,
                    questions = session.questions.len(),
                    "started exam session"
                );
                Ok(session)
            }
            // A concurrent start for the same exam got there first; resume it.
            Err(StoreError::Conflict(_)) => self
                .open_session(caller.user_id(), &config.id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalServerError(
                        "session conflict without an open session".to_string(),
                    )
                }),
            Err(e) => {
                tracing::error!("Failed to create exam session: {}", e);
                Err(e.into())
            }
        }
    }

    /// The caller's session, submitted or not.
    pub async fn get(&self, caller: &Claims, session_id: &str) -> Result<ExamSession, AppError> {
        self.sessions
            .get(session_id)
            .await?
            .filter(|s| access::owns(caller, &s.user_id))
            .ok_or_else(|| AppError::NotFound("Exam session not found".to_string()))
    }

    /// Returns the question at `index` without its answer key and marks it as seen.
    pub async fn question_at(
        &self,
        caller: &Claims,
        session_id: &str,
        index: usize,
    ) -> Result<SessionQuestion, AppError> {
        let mut session = self.active_session(caller, session_id).await?;

        let question_id = session
            .visit(index)
            .ok_or_else(|| AppError::BadRequest("Invalid question index".to_string()))?;

        let question = self
            .questions
            .get(&question_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        self.save(&session).await?;

        Ok(SessionQuestion {
            question: (&question).into(),
            question_number: index + 1,
            total_questions: session.questions.len(),
            current_answer: session.answers.get(&question_id).cloned(),
            status: session.status_of(&question_id),
        })
    }

    /// Stores an answer with the status chosen by the client.
    pub async fn submit_answer(
        &self,
        caller: &Claims,
        session_id: &str,
        payload: SubmitAnswerRequest,
    ) -> Result<(), AppError> {
        if !payload.status.is_submittable() {
            return Err(AppError::BadRequest(
                "Status must be answered, marked or marked_answered".to_string(),
            ));
        }

        let mut session = self.active_session(caller, session_id).await?;

        if !session.questions.contains(&payload.question_id) {
            tracing::warn!(
                session_id = %session.id,
                question_id = %payload.question_id,
                "storing answer for a question outside the session"
            );
        }

        session.record_answer(&payload.question_id, payload.answer, payload.status);
        self.save(&session).await
    }

    /// Scores and closes the session. Repeat calls replay the stored result.
    pub async fn submit(&self, caller: &Claims, session_id: &str) -> Result<ExamResult, AppError> {
        let mut session = self.get(caller, session_id).await?;

        if session.submitted {
            if let Some(existing) = self.stored_result(&session.id).await? {
                tracing::info!(session_id = %session.id, "replaying stored result");
                return Ok(existing);
            }
            tracing::warn!(session_id = %session.id, "submitted session has no result, scoring again");
        }

        let snapshot = self.questions.snapshot(&session.questions).await?;
        if snapshot.len() < session.questions.len() {
            tracing::warn!(
                session_id = %session.id,
                missing = session.questions.len() - snapshot.len(),
                "session references questions that no longer exist"
            );
        }

        let result = scoring::score_session(
            &session,
            &snapshot,
            uuid::Uuid::new_v4().to_string(),
            self.clock.now(),
        );

        let result = match self.results.insert(&result.id, &result).await {
            Ok(()) => result,
            // Another submit for this session stored its result first.
            Err(StoreError::Conflict(_)) => self
                .stored_result(&session.id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalServerError("result conflict without a stored result".to_string())
                })?,
            Err(e) => {
                tracing::error!("Failed to store exam result: {}", e);
                return Err(e.into());
            }
        };

        if !session.submitted {
            session.submitted = true;
            session.end_time = Some(result.submitted_at);
            self.save(&session).await?;
        }

        tracing::info!(
            session_id = %session.id,
            score = result.score,
            correct = result.correct,
            total = result.total_questions,
            "exam submitted"
        );
        Ok(result)
    }

    pub async fn result(&self, caller: &Claims, session_id: &str) -> Result<ExamResult, AppError> {
        self.results
            .find_one(
                &Filter::new()
                    .eq("exam_session_id", session_id)
                    .eq("user_id", caller.user_id()),
            )
            .await?
            .ok_or_else(|| AppError::NotFound("Result not found".to_string()))
    }

    /// Result plus a per-question review with answer keys. Only after submission.
    pub async fn detailed_result(&self, caller: &Claims, session_id: &str) -> Result<DetailedResult, AppError> {
        let session = self.get(caller, session_id).await?;
        if !session.submitted {
            return Err(AppError::BadRequest(
                "Exam has not been submitted yet".to_string(),
            ));
        }

        let result = self.result(caller, session_id).await?;
        let snapshot = self.questions.snapshot(&session.questions).await?;

        Ok(DetailedResult {
            result,
            questions: scoring::review(&session, &snapshot),
        })
    }

    /// The caller's completed exams, newest first.
    pub async fn history(&self, caller: &Claims) -> Result<Vec<HistoryEntry>, AppError> {
        let results = self
            .results
            .find(&Filter::new().eq("user_id", caller.user_id()))
            .await?;

        let mut entries = Vec::with_capacity(results.len());
        for result in results {
            let exam_config_id = self
                .sessions
                .get(&result.exam_session_id)
                .await?
                .map(|s| s.exam_config_id);
            let exam_name = match &exam_config_id {
                Some(id) => self.catalog.get(id).await?.map(|c| c.name),
                None => None,
            };

            entries.push(HistoryEntry {
                session_id: result.exam_session_id,
                result_id: result.id,
                exam_config_id,
                exam_name,
                score: result.score,
                percentage: result.percentage,
                correct: result.correct,
                total_questions: result.total_questions,
                time_taken_minutes: result.time_taken_minutes,
                submitted_at: result.submitted_at,
            });
        }

        entries.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(entries)
    }

    async fn open_session(&self, user_id: &str, exam_config_id: &str) -> Result<Option<ExamSession>, AppError> {
        Ok(self
            .sessions
            .find_one(
                &Filter::new()
                    .eq("user_id", user_id)
                    .eq("exam_config_id", exam_config_id)
                    .eq("submitted", false),
            )
            .await?)
    }

    /// The caller's session, provided it is still open for answers.
    async fn active_session(&self, caller: &Claims, session_id: &str) -> Result<ExamSession, AppError> {
        self.sessions
            .get(session_id)
            .await?
            .filter(|s| access::owns(caller, &s.user_id) && !s.submitted)
            .ok_or_else(|| {
                AppError::NotFound("Exam session not found or already submitted".to_string())
            })
    }

    async fn stored_result(&self, session_id: &str) -> Result<Option<ExamResult>, AppError> {
        Ok(self
            .results
            .find_one(&Filter::new().eq("exam_session_id", session_id))
            .await?)
    }

    async fn save(&self, session: &ExamSession) -> Result<(), AppError> {
        if !self.sessions.replace(&session.id, session).await? {
            return Err(AppError::NotFound("Exam session not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            exam_config::CreateExamConfigRequest,
            exam_session::QuestionStatus,
            question::{Answer, CreateQuestionRequest, QuestionSource},
            user::Role,
        },
        services::users::UserDirectory,
        store::MemoryStore,
        utils::clock::ManualClock,
    };
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{Value, json};
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicBool, Ordering},
    };

    struct Fixture {
        manager: SessionManager,
        catalog: ExamCatalog,
        bank: QuestionBank,
        clock: Arc<ManualClock>,
        admin: Claims,
    }

    fn claims(id: &str, role: Role) -> Claims {
        Claims {
            sub: id.to_string(),
            role,
            exp: 0,
        }
    }

    /// Memory store that, once armed, slips a rival copy of the next session
    /// or result in ahead of the real insert.
    struct RacingStore {
        inner: MemoryStore,
        armed: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn insert(&self, collection: Collection, id: &str, doc: Value) -> Result<(), StoreError> {
            let racy = matches!(collection, Collection::ExamSessions | Collection::ExamResults);
            if racy && self.armed.swap(false, Ordering::SeqCst) {
                let mut rival = doc.clone();
                rival["id"] = json!("rival");
                self.inner.insert(collection, "rival", rival).await?;
            }
            self.inner.insert(collection, id, doc).await
        }

        async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Value>, StoreError> {
            self.inner.find_one(collection, filter).await
        }

        async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
            self.inner.find(collection, filter).await
        }

        async fn replace(&self, collection: Collection, id: &str, doc: Value) -> Result<bool, StoreError> {
            self.inner.replace(collection, id, doc).await
        }

        async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(collection, id).await
        }
    }

    fn fixture() -> Fixture {
        fixture_on(Arc::new(MemoryStore::new()))
    }

    fn fixture_on(store: Arc<dyn DocumentStore>) -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let users = UserDirectory::new(store.clone(), dyn_clock.clone());
        let bank = QuestionBank::new(store.clone(), users, dyn_clock.clone());
        let catalog = ExamCatalog::new(store.clone(), bank.clone(), dyn_clock.clone());
        let manager = SessionManager::new(store, catalog.clone(), bank.clone(), dyn_clock);
        Fixture {
            manager,
            catalog,
            bank,
            clock,
            admin: claims("admin-1", Role::Admin),
        }
    }

    async fn mcq(f: &Fixture, subject: &str) -> Question {
        let payload: CreateQuestionRequest = serde_json::from_value(json!({
            "question_text": "Pick the right one",
            "question_type": "MCQ",
            "subject": subject,
            "marks": 2.0,
            "negative_marks": 0.5,
            "options": [
                {"id": "right", "text": "Right", "is_correct": true},
                {"id": "wrong", "text": "Wrong"}
            ]
        }))
        .unwrap();
        f.bank.create(&f.admin, payload, QuestionSource::Admin).await.unwrap()
    }

    async fn exam(f: &Fixture, total: usize, subjects: &[&str], randomize: bool) -> String {
        let payload = CreateExamConfigRequest {
            name: "Mock".into(),
            description: String::new(),
            duration_minutes: 60,
            total_questions: total,
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            randomize_questions: randomize,
        };
        f.catalog.create(&f.admin, payload).await.unwrap().id
    }

    #[tokio::test]
    async fn start_selects_distinct_questions_from_matching_subjects() {
        let f = fixture();
        let mut math = HashSet::new();
        for _ in 0..5 {
            math.insert(mcq(&f, "Math").await.id);
        }
        mcq(&f, "Physics").await;
        let exam_id = exam(&f, 2, &["Math"], true).await;

        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        assert_eq!(session.questions.len(), 2);
        let distinct: HashSet<_> = session.questions.iter().cloned().collect();
        assert_eq!(distinct.len(), 2);
        assert!(distinct.is_subset(&math));
        assert_eq!(session.status_of(&session.questions[0]), QuestionStatus::NotAnswered);
        assert_eq!(session.status_of(&session.questions[1]), QuestionStatus::NotVisited);
    }

    #[tokio::test]
    async fn start_twice_resumes() {
        let f = fixture();
        for _ in 0..4 {
            mcq(&f, "Math").await;
        }
        let exam_id = exam(&f, 3, &["Math"], true).await;
        let student = claims("s1", Role::Student);

        let first = f.manager.start(&student, &exam_id).await.unwrap();
        let second = f.manager.start(&student, &exam_id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.questions, second.questions);

        // Another student gets their own session.
        let other = f.manager.start(&claims("s2", Role::Student), &exam_id).await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn first_n_when_not_randomized() {
        let f = fixture();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(mcq(&f, "Math").await.id);
        }
        let exam_id = exam(&f, 2, &["Math"], false).await;
        let session = f.manager.start(&claims("s1", Role::Student), &exam_id).await.unwrap();
        assert_eq!(session.questions, ids[..2].to_vec());
    }

    #[tokio::test]
    async fn start_errors() {
        let f = fixture();
        let student = claims("s1", Role::Student);
        assert!(matches!(
            f.manager.start(&student, "nope").await,
            Err(AppError::NotFound(_))
        ));

        let q1 = mcq(&f, "Math").await;
        let q2 = mcq(&f, "Math").await;
        let exam_id = exam(&f, 2, &["Math"], true).await;
        f.bank.delete(&q1.id).await.unwrap();
        assert!(matches!(
            f.manager.start(&student, &exam_id).await,
            Err(AppError::BadRequest(_))
        ));
        f.bank.delete(&q2.id).await.unwrap();
    }

    #[tokio::test]
    async fn question_at_hides_key_and_tracks_position() {
        let f = fixture();
        for _ in 0..3 {
            mcq(&f, "Math").await;
        }
        let exam_id = exam(&f, 3, &["Math"], true).await;
        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        let view = f.manager.question_at(&student, &session.id, 2).await.unwrap();
        assert_eq!(view.question_number, 3);
        assert_eq!(view.total_questions, 3);
        assert_eq!(view.current_answer, None);
        assert_eq!(view.status, QuestionStatus::NotAnswered);
        let payload = serde_json::to_value(&view).unwrap();
        assert!(payload["question"].get("correct_answer").is_none());
        assert!(payload["question"]["options"][0].get("is_correct").is_none());

        let stored = f.manager.get(&student, &session.id).await.unwrap();
        assert_eq!(stored.current_question, 2);

        assert!(matches!(
            f.manager.question_at(&student, &session.id, 3).await,
            Err(AppError::BadRequest(_))
        ));
        let unchanged = f.manager.get(&student, &session.id).await.unwrap();
        assert_eq!(unchanged.current_question, 2);
        assert!(matches!(
            f.manager.question_at(&claims("intruder", Role::Student), &session.id, 0).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn revisiting_keeps_answered_status_and_returns_answer() {
        let f = fixture();
        mcq(&f, "Math").await;
        let exam_id = exam(&f, 1, &["Math"], true).await;
        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();
        let qid = session.questions[0].clone();

        f.manager
            .submit_answer(
                &student,
                &session.id,
                SubmitAnswerRequest {
                    question_id: qid.clone(),
                    answer: Answer::Single("right".into()),
                    status: QuestionStatus::MarkedAnswered,
                },
            )
            .await
            .unwrap();

        let view = f.manager.question_at(&student, &session.id, 0).await.unwrap();
        assert_eq!(view.status, QuestionStatus::MarkedAnswered);
        assert_eq!(view.current_answer, Some(Answer::Single("right".into())));
    }

    #[tokio::test]
    async fn answer_status_must_be_submittable() {
        let f = fixture();
        mcq(&f, "Math").await;
        let exam_id = exam(&f, 1, &["Math"], true).await;
        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        let err = f
            .manager
            .submit_answer(
                &student,
                &session.id,
                SubmitAnswerRequest {
                    question_id: session.questions[0].clone(),
                    answer: Answer::Single("right".into()),
                    status: QuestionStatus::NotVisited,
                },
            )
            .await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn foreign_question_id_is_stored_silently() {
        let f = fixture();
        mcq(&f, "Math").await;
        let exam_id = exam(&f, 1, &["Math"], true).await;
        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        f.manager
            .submit_answer(
                &student,
                &session.id,
                SubmitAnswerRequest {
                    question_id: "not-in-session".into(),
                    answer: Answer::Numeric(1.0),
                    status: QuestionStatus::Answered,
                },
            )
            .await
            .unwrap();

        let stored = f.manager.get(&student, &session.id).await.unwrap();
        assert!(stored.answers.contains_key("not-in-session"));
        assert_eq!(stored.questions.len(), 1);

        let result = f.manager.submit(&student, &session.id).await.unwrap();
        assert_eq!(result.attempted, 0);
    }

    #[tokio::test]
    async fn submit_scores_once_and_replays() {
        let f = fixture();
        for _ in 0..3 {
            mcq(&f, "Math").await;
        }
        let exam_id = exam(&f, 3, &["Math"], true).await;
        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        let answer = |qid: &str, choice: &str| SubmitAnswerRequest {
            question_id: qid.to_string(),
            answer: Answer::Single(choice.to_string()),
            status: QuestionStatus::Answered,
        };
        f.manager.submit_answer(&student, &session.id, answer(&session.questions[0], "right")).await.unwrap();
        f.manager.submit_answer(&student, &session.id, answer(&session.questions[1], "wrong")).await.unwrap();

        f.clock.advance(Duration::seconds(45 * 60 + 59));
        let first = f.manager.submit(&student, &session.id).await.unwrap();
        assert_eq!(first.correct, 1);
        assert_eq!(first.incorrect, 1);
        assert_eq!(first.attempted, 2);
        assert_eq!(first.score, 1.5);
        assert!((first.percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(first.time_taken_minutes, 45);

        f.clock.advance(Duration::hours(2));
        let second = f.manager.submit(&student, &session.id).await.unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        let closed = f.manager.get(&student, &session.id).await.unwrap();
        assert!(closed.submitted);
        assert_eq!(closed.end_time, Some(first.submitted_at));

        // Closed sessions reject further interaction.
        assert!(matches!(
            f.manager.question_at(&student, &session.id, 0).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.submit_answer(&student, &session.id, answer(&session.questions[2], "right")).await,
            Err(AppError::NotFound(_))
        ));

        // A new attempt is now possible.
        let retake = f.manager.start(&student, &exam_id).await.unwrap();
        assert_ne!(retake.id, session.id);
    }

    #[tokio::test]
    async fn deleted_question_is_skipped_at_scoring() {
        let f = fixture();
        for _ in 0..2 {
            mcq(&f, "Math").await;
        }
        let exam_id = exam(&f, 2, &["Math"], false).await;
        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        for qid in &session.questions {
            f.manager
                .submit_answer(
                    &student,
                    &session.id,
                    SubmitAnswerRequest {
                        question_id: qid.clone(),
                        answer: Answer::Single("wrong".into()),
                        status: QuestionStatus::Answered,
                    },
                )
                .await
                .unwrap();
        }
        f.bank.delete(&session.questions[1]).await.unwrap();

        let result = f.manager.submit(&student, &session.id).await.unwrap();
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.incorrect, 1);
        assert_eq!(result.attempted, 1);
        assert_eq!(result.subject_wise_score["Math"].total, 1);

        let detailed = f.manager.detailed_result(&student, &session.id).await.unwrap();
        assert_eq!(detailed.questions.len(), 1);
        assert_eq!(detailed.questions[0].is_correct, Some(false));
    }

    #[tokio::test]
    async fn results_are_private_and_detail_needs_submission() {
        let f = fixture();
        mcq(&f, "Math").await;
        let exam_id = exam(&f, 1, &["Math"], true).await;
        let student = claims("s1", Role::Student);
        let intruder = claims("s2", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        assert!(matches!(
            f.manager.detailed_result(&student, &session.id).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            f.manager.submit(&intruder, &session.id).await,
            Err(AppError::NotFound(_))
        ));

        f.manager.submit(&student, &session.id).await.unwrap();
        assert!(f.manager.result(&student, &session.id).await.is_ok());
        assert!(matches!(
            f.manager.result(&intruder, &session.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.detailed_result(&intruder, &session.id).await,
            Err(AppError::NotFound(_))
        ));

        let detailed = f.manager.detailed_result(&student, &session.id).await.unwrap();
        assert_eq!(detailed.questions[0].question.correct_option_ids().len(), 1);
        assert_eq!(detailed.questions[0].is_correct, None);
    }

    #[tokio::test]
    async fn history_lists_newest_first_with_exam_names() {
        let f = fixture();
        mcq(&f, "Math").await;
        let exam_id = exam(&f, 1, &["Math"], true).await;
        let student = claims("s1", Role::Student);

        let first = f.manager.start(&student, &exam_id).await.unwrap();
        f.manager.submit(&student, &first.id).await.unwrap();
        f.clock.advance(Duration::minutes(10));
        let second = f.manager.start(&student, &exam_id).await.unwrap();
        f.manager.submit(&student, &second.id).await.unwrap();

        let history = f.manager.history(&student).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].session_id, second.id);
        assert_eq!(history[1].session_id, first.id);
        assert_eq!(history[0].exam_name.as_deref(), Some("Mock"));

        assert!(f.manager.history(&claims("s2", Role::Student)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn losing_start_race_resumes_the_winner() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            armed: AtomicBool::new(false),
        });
        let f = fixture_on(store.clone());
        for _ in 0..3 {
            mcq(&f, "Math").await;
        }
        let exam_id = exam(&f, 2, &["Math"], true).await;
        let student = claims("s1", Role::Student);

        store.armed.store(true, Ordering::SeqCst);
        let session = f.manager.start(&student, &exam_id).await.unwrap();
        assert_eq!(session.id, "rival");

        let again = f.manager.start(&student, &exam_id).await.unwrap();
        assert_eq!(again.id, "rival");
    }

    #[tokio::test]
    async fn losing_submit_race_returns_the_stored_result() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            armed: AtomicBool::new(false),
        });
        let f = fixture_on(store.clone());
        mcq(&f, "Math").await;
        let exam_id = exam(&f, 1, &["Math"], true).await;
        let student = claims("s1", Role::Student);
        let session = f.manager.start(&student, &exam_id).await.unwrap();

        store.armed.store(true, Ordering::SeqCst);
        let result = f.manager.submit(&student, &session.id).await.unwrap();
        assert_eq!(result.id, "rival");
        assert!(f.manager.get(&student, &session.id).await.unwrap().submitted);

        let replay = f.manager.submit(&student, &session.id).await.unwrap();
        assert_eq!(replay.id, "rival");
        assert_eq!(f.manager.history(&student).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_and_submits_agree() {
        let f = fixture();
        for _ in 0..3 {
            mcq(&f, "Math").await;
        }
        let exam_id = exam(&f, 2, &["Math"], true).await;
        let student = claims("s1", Role::Student);

        let (a, b) = tokio::join!(
            {
                let manager = f.manager.clone();
                let (student, exam_id) = (student.clone(), exam_id.clone());
                tokio::spawn(async move { manager.start(&student, &exam_id).await })
            },
            {
                let manager = f.manager.clone();
                let (student, exam_id) = (student.clone(), exam_id.clone());
                tokio::spawn(async move { manager.start(&student, &exam_id).await })
            }
        );
        let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());
        assert_eq!(a.id, b.id);
        assert_eq!(a.questions, b.questions);

        let (x, y) = tokio::join!(
            {
                let manager = f.manager.clone();
                let (student, session_id) = (student.clone(), a.id.clone());
                tokio::spawn(async move { manager.submit(&student, &session_id).await })
            },
            {
                let manager = f.manager.clone();
                let (student, session_id) = (student.clone(), a.id.clone());
                tokio::spawn(async move { manager.submit(&student, &session_id).await })
            }
        );
        let (x, y) = (x.unwrap().unwrap(), y.unwrap().unwrap());
        assert_eq!(
            serde_json::to_string(&x).unwrap(),
            serde_json::to_string(&y).unwrap()
        );
        assert_eq!(f.manager.history(&student).await.unwrap().len(), 1);
    }
}
