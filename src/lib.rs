//! Stages a pre-built onedir backend (executable plus its sibling files and
//! config) inside a frontend directory so a desktop packager can bundle it.

pub mod api;
pub mod errors;
pub mod layout;
pub mod plan;
mod preview;
mod prompt;
pub mod stage;
