// UI layer: terminal prompts, a spinner for the slow lookup, and run
// summaries. Everything here is for the binary; the engine never prompts.

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};

use crate::auth::Credentials;
use crate::config::SyncConfig;
use crate::report::RunReport;
use crate::watch::WatchStopper;
use crate::TemplateId;

/// Fill in whatever the flags did not provide. The password is read without echo.
pub fn prompt_credentials(login_id: Option<String>, password: Option<String>) -> Result<Credentials> {
    let login_id = match login_id {
        Some(id) => id,
        None => Input::<String>::new()
            .with_prompt("Please enter your Login ID")
            .interact_text()
            .context("Failed to read login id")?,
    };
    let password = match password {
        Some(pw) => pw,
        None => Password::new()
            .with_prompt("Please enter your Login Password")
            .interact()
            .context("Failed to read password")?,
    };
    Ok(Credentials::new(login_id, password))
}

/// Resolve the active template while showing a spinner.
pub fn resolve_template_id(config: &SyncConfig, credentials: &Credentials) -> Result<TemplateId> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("UID not provided. Fetching default template UID...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let resolved = crate::resolve_default_template_id(config, credentials);
    spinner.finish_and_clear();

    let id = resolved.context("Failed to resolve the default template")?;
    println!("Fetched UID: {}", id);
    Ok(id)
}

/// Print a run summary, as text or as JSON.
pub fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
        println!("{}", text);
    } else {
        print!("{}", report);
    }
    Ok(())
}

/// Stop the watch loop when the user types `q` or closes stdin.
pub fn stop_on_quit(stopper: WatchStopper) {
    println!("Watching for file changes... (type q and Enter to stop)");
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) if l.trim().eq_ignore_ascii_case("q") => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        stopper.stop();
    });
}
