use anyhow::{anyhow, Result};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use quill::build::build_site;
use quill::config::Config;
use std::path::Path;

fn main() {
    let matches = App::new("quill")
        .version(crate_version!())
        .about("Builds a static blog from markdown posts and HTML templates")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .global(true)
                .help("Logs more (repeat for even more)"),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site in SOURCE into OUTPUT, replacing OUTPUT's contents")
                .arg(
                    Arg::with_name("SOURCE")
                        .required(true)
                        .index(1)
                        .help("The site directory (holding posts/ and templates/)"),
                )
                .arg(
                    Arg::with_name("OUTPUT")
                        .required(true)
                        .index(2)
                        .help("The directory to write the site to"),
                ),
        )
        .get_matches();

    let verbose = match matches.subcommand() {
        (_, Some(sub)) => sub.occurrences_of("verbose"),
        _ => 0,
    }
    .max(matches.occurrences_of("verbose"));
    quill::init_tracing(verbose);

    if let Err(e) = run(&matches) {
        // Every error message already includes its causes.
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("build", Some(matches)) => build(matches),
        (name, _) => Err(anyhow!("unknown command `{}`", name)),
    }
}

fn build(matches: &ArgMatches) -> Result<()> {
    // Both are required, so clap has already rejected a missing one.
    let source = Path::new(matches.value_of("SOURCE").unwrap_or_default());
    let output = Path::new(matches.value_of("OUTPUT").unwrap_or_default());

    let config = Config::from_directory(source, output)?;
    let stats = build_site(&config)?;
    println!(
        "Built {} post(s) into {} ({} unpublished skipped, {} static file(s) copied)",
        stats.posts,
        output.display(),
        stats.unpublished,
        stats.static_files
    );
    Ok(())
}
