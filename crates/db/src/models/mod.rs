//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize`/plain input structs used by the repositories

pub mod evaluation;
pub mod output;
pub mod prompt;
pub mod prompt_version;
pub mod suggestion;
