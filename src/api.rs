use crate::{
    errors::IoError,
    layout::{self, Layout, Overrides, Platform, Settings},
    plan::{self, Plan},
    preview::preview_as_tree,
    prompt,
    stage::{self, StageReport},
};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum HakobuError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Layout(#[from] layout::LayoutError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Stage(#[from] stage::StageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Plan(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] prompt::PromptError),
}

/// How a single invocation should behave.
#[derive(Debug, Clone)]
pub struct Options {
    pub root: PathBuf,
    pub overrides: Overrides,
    /// Print the plan and stop before touching the destination.
    pub dry_run: bool,
    /// Print the plan and ask before resetting the destination.
    pub confirm: bool,
}
impl Options {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overrides: Overrides::default(),
            dry_run: false,
            confirm: false,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Staged(StageReport),
    Planned(Plan),
    Declined,
}

/// Copies the pre-built onedir backend under `options.root` into the packaging directory.
///
/// # Errors
///
/// Returns a [`HakobuError`] if:
///
/// - `hakobu.toml` exists but cannot be read or parsed.
/// - The destination overlaps the build output.
/// - The source executable is missing, or still missing after the copy.
/// - The executable bit cannot be set.
/// - A directory or file cannot be removed, created, read or copied.
/// - The confirmation prompt fails.
pub fn stage_backend(options: &Options) -> Result<Outcome, HakobuError> {
    println!("📦 Copying pre-built backend executable...");

    let settings = Settings::load(&options.root)?;
    let layout = Layout::resolve(
        &options.root,
        &settings,
        &options.overrides,
        Platform::current(),
    );

    log::debug!("resolved layout: {:#?}", layout);

    layout.ensure_disjoint()?;

    if options.dry_run || options.confirm {
        stage::ensure_source_executable(&layout)?;

        let plan = plan::build_plan(&layout)?;

        preview_as_tree(&plan, &layout.backend_dir);

        if options.dry_run {
            return Ok(Outcome::Planned(plan));
        }

        if !prompt::confirm_reset(&layout.backend_dir)? {
            println!("{}", "Cancelled, nothing was changed".yellow());

            return Ok(Outcome::Declined);
        }
    }

    let report = stage::run(&layout)?;

    println!("🎉 {}", "Backend ready for packaging".green());

    Ok(Outcome::Staged(report))
}
