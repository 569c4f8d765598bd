//! Unmute World - a social publishing platform backend
//!
//! This library provides the core functionality for the Unmute World platform:
//! user accounts, posts with per-reader ratings, categories, saved posts, and
//! the admin moderation surface.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
