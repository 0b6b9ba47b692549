mod cli;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use zbxsync::api::{ApiClient, HttpTransport};
use zbxsync::config::Config;
use zbxsync::runner;
use zbxsync::store::TemplateStore;
use zbxsync::sync::{self, SyncOutcome};

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Per-item failures are reported as result entries and exit 0; only
    // setup failures reach this point.
    if let Err(e) = run(&cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "zbxsync=debug" } else { "zbxsync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let format = config.format()?;

    let transport = HttpTransport::new(config.api.url.clone());
    let client = ApiClient::connect(Box::new(transport), &config.api.user, &config.api.password)
        .context("failed to connect to the API")?;
    debug!(version = client.version(), url = %config.api.url, "connected");

    let store = TemplateStore::new(client, format);
    let work_all = if cli.export_all {
        Some(store.list_all().context("failed to enumerate templates")?)
    } else {
        None
    };
    let syncer = sync::for_format(format, store);

    let dest_dir = cli
        .dest_dir
        .clone()
        .unwrap_or_else(|| config.export_dir.clone());

    let results: Vec<SyncOutcome> = if let Some(all) = work_all {
        let items: Vec<(String, String)> = all.into_iter().collect();
        runner::run(
            config.pool_limit,
            |(name, id): &(String, String)| syncer.save_to_file(&dest_dir, name, Some(id.as_str())),
            &items,
        )
    } else if !cli.export.is_empty() {
        runner::run(
            config.pool_limit,
            |name: &String| syncer.save_to_file(&dest_dir, name, None),
            &cli.export,
        )
    } else if !cli.compare.is_empty() {
        runner::run(
            config.pool_limit,
            |path: &PathBuf| syncer.compare(path),
            &cli.compare,
        )
    } else {
        runner::run(
            config.pool_limit,
            |path: &PathBuf| syncer.import(&config.import_rules, path),
            &cli.import_files,
        )
    };

    println!(
        "{}",
        sync::render_report(&results).context("failed to render results")?
    );
    Ok(())
}
