// src/services/access.rs

//! Role and ownership rules shared by every component.

use crate::{
    error::AppError,
    models::question::{Question, Relation},
    utils::jwt::Claims,
};

pub fn require_admin(caller: &Claims) -> Result<(), AppError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not enough permissions".to_string()))
    }
}

/// Sessions and results are private to their owner; anything else reads as absent.
pub fn owns(caller: &Claims, resource_user_id: &str) -> bool {
    caller.user_id() == resource_user_id
}

/// How the caller can see a question, or `None` if it is hidden from them.
///
/// Checked in order: owner, explicit share, public flag, admin override.
pub fn relation_to(caller: &Claims, question: &Question) -> Option<Relation> {
    if question.created_by == caller.user_id() {
        Some(Relation::Own)
    } else if question.shared_with.iter().any(|id| id == caller.user_id()) {
        Some(Relation::Shared)
    } else if question.is_public {
        Some(Relation::Public)
    } else if caller.is_admin() {
        Some(Relation::Admin)
    } else {
        None
    }
}

/// Owners and admins may delete or share a question.
pub fn can_manage(caller: &Claims, question: &Question) -> bool {
    caller.is_admin() || question.created_by == caller.user_id()
}
