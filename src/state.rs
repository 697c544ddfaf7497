// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{
        catalog::ExamCatalog, import::QuestionImporter, questions::QuestionBank,
        sessions::SessionManager, users::UserDirectory,
    },
    store::DocumentStore,
    utils::clock::Clock,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: UserDirectory,
    pub questions: QuestionBank,
    pub importer: QuestionImporter,
    pub catalog: ExamCatalog,
    pub sessions: SessionManager,
}

impl AppState {
    /// Wires every service onto one store and clock.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let users = UserDirectory::new(store.clone(), clock.clone());
        let questions = QuestionBank::new(store.clone(), users.clone(), clock.clone());
        let catalog = ExamCatalog::new(store.clone(), questions.clone(), clock.clone());
        let sessions = SessionManager::new(store, catalog.clone(), questions.clone(), clock);

        Self {
            config,
            users,
            importer: QuestionImporter::new(questions.clone()),
            questions,
            catalog,
            sessions,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for UserDirectory {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for QuestionBank {
    fn from_ref(state: &AppState) -> Self {
        state.questions.clone()
    }
}

impl FromRef<AppState> for QuestionImporter {
    fn from_ref(state: &AppState) -> Self {
        state.importer.clone()
    }
}

impl FromRef<AppState> for ExamCatalog {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
