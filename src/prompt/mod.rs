//! The closed set of prompt types a request can be classified as

mod id_enum_macro;
mod prompt_type;

pub use prompt_type::PromptType;
