//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the persistence operations for one entity.

pub mod category;
pub mod post;
pub mod session;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
