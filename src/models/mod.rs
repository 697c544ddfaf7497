// src/models/mod.rs

pub mod exam_config;
pub mod exam_result;
pub mod exam_session;
pub mod question;
pub mod user;
