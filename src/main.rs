use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction,
    ArgMatches, Command,
};
use hakobu::{
    api::{self, Options},
    layout::Overrides,
};
use std::path::PathBuf;

// The CLI layer should only parse inputs and forward them to library code.
fn main() {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .help("Project root containing the dist/ build output")
                .value_parser(value_parser!(PathBuf))
                .default_value("."),
        )
        .arg(
            Arg::new("dist")
                .long("dist")
                .help("Build output directory, relative to the root unless absolute")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dest")
                .long("dest")
                .help("Packaging directory to (re)create, relative to the root unless absolute")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Show what would be copied without touching the destination")
                .action(ArgAction::SetTrue)
                .conflicts_with("confirm"),
        )
        .arg(
            Arg::new("confirm")
                .long("confirm")
                .help("Ask before deleting the destination directory")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    init_logger(matches.get_flag("verbose"));

    let options = build_options(&matches);

    if let Err(error) = api::stage_backend(&options) {
        eprintln!("{:?}", miette::Report::new(error));

        std::process::exit(1);
    }
}

fn init_logger(is_verbose: bool) {
    let default_filter = if is_verbose { "hakobu=debug" } else { "hakobu=info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn build_options(args: &ArgMatches) -> Options {
    let root = args
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));

    let mut options = Options::new(root);
    options.overrides = Overrides {
        dist: args.get_one::<PathBuf>("dist").cloned(),
        dest: args.get_one::<PathBuf>("dest").cloned(),
    };
    options.dry_run = args.get_flag("dry-run");
    options.confirm = args.get_flag("confirm");

    options
}
