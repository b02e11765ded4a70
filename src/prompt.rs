use inquire::{Confirm, InquireError};
use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PromptError {
    #[error("Error occurred trying to prompt user")]
    #[diagnostic(
        code(hakobu::prompt::confirm),
        help("Drop --confirm when running without a terminal")
    )]
    Confirm(#[source] InquireError),
}

/// Asks before the destination is wiped. Escape or Ctrl-C count as "no".
pub fn confirm_reset(destination: &Path) -> Result<bool, PromptError> {
    let question = format!("Replace everything in {}?", destination.display());

    match Confirm::new(&question)
        .with_default(false)
        .with_help_message("The directory is deleted and recreated from the build output")
        .prompt()
    {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(error) => Err(PromptError::Confirm(error)),
    }
}
