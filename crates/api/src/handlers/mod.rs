pub mod favorites;
pub mod prompts;
