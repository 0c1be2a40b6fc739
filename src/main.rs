// Entrypoint for the CLI.
// - Parses flags, sets up logging, fills missing credentials interactively.
// - Hands off to the library entry points; all remote work lives there.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use shoppro_sync::catalog::FileNaming;
use shoppro_sync::encoding::UnmappablePolicy;
use shoppro_sync::watch::TemplateWatcher;
use shoppro_sync::{ui, Endpoints, SyncConfig, TemplateId};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Naming {
    /// {id}_{slug}.html
    Slug,
    /// {id}.html
    Bare,
}

#[derive(Parser, Debug)]
#[command(name = "shoppro-sync")]
#[command(about = "Sync shop-pro design templates with local files")]
#[command(version)]
#[command(group(ArgGroup::new("mode").required(true).args(["import", "export", "watch"])))]
struct Cli {
    /// Login ID
    #[arg(short = 'i', long = "id", env = "SHOPPRO_LOGIN_ID")]
    login_id: Option<String>,

    /// Login password (prompted without echo when omitted)
    #[arg(short, long)]
    password: Option<String>,

    /// Template UID (the active template is looked up when omitted)
    #[arg(short = 'u', long = "uid")]
    uid: Option<String>,

    /// Import templates from the admin into local files
    #[arg(long)]
    import: bool,

    /// Export local templates to the admin
    #[arg(long)]
    export: bool,

    /// Watch for local changes and export automatically
    #[arg(long)]
    watch: bool,

    /// Directory holding the template files
    #[arg(short = 'C', long, default_value = ".")]
    dir: PathBuf,

    /// Local file naming scheme
    #[arg(long, value_enum, default_value_t = Naming::Slug)]
    naming: Naming,

    /// Admin base URL (overrides SHOPPRO_ADMIN_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds (overrides SHOPPRO_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    /// Replace characters EUC-JP cannot encode with &#NNNN; instead of failing
    #[arg(long)]
    allow_char_refs: bool,

    /// Minimum seconds between watch-triggered uploads
    #[arg(long, default_value_t = 10)]
    watch_interval: u64,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> Result<SyncConfig> {
        let mut config = SyncConfig::from_env()?;
        if let Some(base) = &self.base_url {
            config.endpoints = Endpoints::new(base)?;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config.workdir = self.dir.clone();
        config.naming = match self.naming {
            Naming::Slug => FileNaming::SlugQualified,
            Naming::Bare => FileNaming::BareId,
        };
        if self.allow_char_refs {
            config.unmappable = UnmappablePolicy::NumericReference;
        }
        config.watch_interval = Duration::from_secs(self.watch_interval);
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q when set
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when the run finished but some resources failed.
fn run(cli: Cli) -> Result<bool> {
    if !cli.dir.is_dir() {
        bail!("{} is not a directory", cli.dir.display());
    }
    let config = cli.config()?;
    let credentials = ui::prompt_credentials(cli.login_id.clone(), cli.password.clone())?;

    let template_id = match &cli.uid {
        Some(uid) => TemplateId::new(uid.as_str()).context("Invalid --uid")?,
        None => ui::resolve_template_id(&config, &credentials)?,
    };

    if cli.watch {
        let watcher = TemplateWatcher::new();
        ui::stop_on_quit(watcher.stopper());
        watcher.run(&config.workdir, config.watch_interval, || {
            match shoppro_sync::upload_templates(&config, &credentials, &template_id) {
                Ok(report) => {
                    if let Err(e) = ui::print_report(&report, cli.json) {
                        error!("{:#}", e);
                    }
                }
                Err(e) => error!("Upload cycle failed: {}", e),
            }
        })?;
        return Ok(true);
    }

    let report = if cli.import {
        shoppro_sync::fetch_templates(&config, &credentials, &template_id).context("Import failed")?
    } else {
        shoppro_sync::upload_templates(&config, &credentials, &template_id).context("Export failed")?
    };
    ui::print_report(&report, cli.json)?;
    Ok(report.is_clean())
}
