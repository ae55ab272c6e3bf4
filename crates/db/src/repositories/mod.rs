//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod evaluation_repo;
pub mod favorite_repo;
pub mod output_repo;
pub mod prompt_repo;
pub mod prompt_version_repo;
pub mod suggestion_repo;

pub use evaluation_repo::EvaluationRepo;
pub use favorite_repo::FavoriteRepo;
pub use output_repo::OutputRepo;
pub use prompt_repo::PromptRepo;
pub use prompt_version_repo::PromptVersionRepo;
pub use suggestion_repo::SuggestionRepo;
