use anyhow::Context;
use clap::Parser;
use feedcheck::configuration::DAO_OPTIONS;
use feedcheck::validation::validator_descriptions;
use feedcheck::{FeedValidation, ValidatorConfig};
use gtfs_store::StoreMode;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(version, about = "Validates a GTFS feed, a directory or a zip archive")]
struct Args {
    /// The feed to validate
    #[arg(required_unless_present = "list_validators")]
    feed: Option<PathBuf>,

    /// Options of the validators, a JSON object
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Threads running the validators once the feed is loaded
    #[arg(long, default_value_t = 1)]
    num_threads: usize,

    #[arg(long)]
    stop_times_mode: Option<StoreMode>,

    #[arg(long)]
    shape_points_mode: Option<StoreMode>,

    #[arg(long)]
    max_stop_times_interleaving: Option<usize>,

    #[arg(long)]
    max_shape_points_interleaving: Option<usize>,

    /// Issues kept by category, the others are only counted
    #[arg(short = 'l', long, default_value_t = 100)]
    max_issues_per_category: usize,

    /// Print the issues
    #[arg(short, long)]
    print_issues: bool,

    #[arg(short, long)]
    verbose: bool,

    /// List the validators and their options, then exit
    #[arg(long)]
    list_validators: bool,
}

fn list_validators() {
    for validator in validator_descriptions() {
        let when = if validator.streaming { "streaming" } else { "dao" };
        println!("{} ({}): {}", validator.name, when, validator.description);
        for option in validator.options {
            println!(
                "    {}.{} ({}, default {}): {}",
                validator.name, option.name, option.kind, option.default, option.description
            );
        }
    }
    println!("dao:");
    for option in DAO_OPTIONS {
        println!(
            "    {} ({}, default {}): {}",
            option.name, option.kind, option.default, option.description
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if args.list_validators {
        list_validators();
        return Ok(());
    }
    let Some(feed) = args.feed else {
        anyhow::bail!("no feed given");
    };

    let config = match &args.config {
        Some(path) => ValidatorConfig::from_json_file(path)?,
        None => ValidatorConfig::new(),
    };
    let mut dao_options = config.dao_options(args.verbose);
    if let Some(mode) = args.stop_times_mode {
        dao_options.stop_times.mode = mode;
    }
    if let Some(mode) = args.shape_points_mode {
        dao_options.shape_points.mode = mode;
    }
    if let Some(max) = args.max_stop_times_interleaving {
        dao_options.stop_times.max_interleaving = max.max(1);
    }
    if let Some(max) = args.max_shape_points_interleaving {
        dao_options.shape_points.max_interleaving = max.max(1);
    }

    let start = Instant::now();
    let outcome = FeedValidation::new(config)
        .with_dao_options(dao_options)
        .with_num_threads(args.num_threads)
        .with_max_issues_per_category(Some(args.max_issues_per_category))
        .run(&feed);
    info!(
        "{} validated in {:.2}s, {}",
        feed.display(),
        start.elapsed().as_secs_f32(),
        outcome.phase()
    );

    let report = &outcome.report;
    if args.print_issues {
        for issue in report.sorted_issues() {
            println!("{}", issue);
        }
    }
    for category in report.summary() {
        println!("{}", category);
    }
    if let Some(output) = &args.output {
        let file = File::create(output)
            .with_context(|| format!("impossible to create {}", output.display()))?;
        report
            .write_json(
                BufWriter::new(file),
                &feed.display().to_string(),
                outcome.sha256.as_deref(),
            )
            .with_context(|| format!("impossible to write {}", output.display()))?;
        info!("report written to {}", output.display());
    }

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
