//! Data models
//!
//! This module contains all data structures used throughout the Unmute World
//! backend: database entities (User, Post, Category, Session), input types,
//! and the rating tally used by the statistics computations.

mod category;
mod post;
mod session;
mod user;

pub use category::{Category, CreateCategoryInput};
pub use post::{CreatePostInput, Post, PostBasis, PostQuery, PostSort, RatingTally, UpdatePostInput};
pub use session::Session;
pub use user::{UpdateProfileInput, User, MAX_BIO_LENGTH};
