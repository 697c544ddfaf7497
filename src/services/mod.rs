// src/services/mod.rs

pub mod access;
pub mod catalog;
pub mod import;
pub mod questions;
pub mod scoring;
pub mod sessions;
pub mod users;
