mod addon;

use anyhow::{Context as _, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use xbmcext_core::{
    init_logging, AddonDirs, Config, HostCall, Invocation, LogStream, Plugin, RecordingHost,
    RequestState, APP_NAME,
};

#[derive(Debug, Parser)]
#[command(
    name = "xbmcext-demo",
    version,
    about = "Route a plugin:// invocation through the demo addon and print the host calls"
)]
struct Cli {
    /// Base URL of the addon, e.g. plugin://plugin.video.example
    base_url: String,
    /// Handle assigned by the host (may be negative)
    #[arg(allow_negative_numbers = true)]
    handle: String,
    /// Path and query suffix, e.g. /search?query=bad
    #[arg(default_value = "")]
    suffix: String,
    /// Config file override (defaults to xbmcext.toml in the addon profile)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn invocation(&self) -> Result<Invocation> {
        let args = [&self.base_url, &self.handle, &self.suffix];
        Invocation::from_args(args.iter().map(|arg| arg.as_str()))
            .context("invalid invocation arguments")
    }
}

fn demo_host(addon_id: &str) -> RecordingHost {
    RecordingHost::new()
        .with_info("id", addon_id)
        .with_string(addon::STR_TITLES, "Titles")
        .with_string(addon::STR_EVENTS, "Latest releases")
        .with_string(addon::STR_SEARCH, "Search")
}

fn addon_id(invocation: &Invocation) -> String {
    RequestState::from_invocation(invocation)
        .ok()
        .map(|state| state.authority().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| APP_NAME.to_string())
}

/// Stdout carries the JSON lines, so console logging moves to stderr.
fn demo_config(mut config: Config) -> Config {
    config.logging.stream = LogStream::Stderr;
    config
}

fn write_calls(out: &mut impl Write, calls: &[HostCall]) -> Result<()> {
    for call in calls {
        serde_json::to_writer(&mut *out, call)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let invocation = cli.invocation()?;
    let addon_id = addon_id(&invocation);

    let dirs = AddonDirs::discover(&addon_id)?;
    let config = demo_config(match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default(&dirs)?,
    });
    let _logging = init_logging(&config.logging, &dirs)?;

    let mut plugin = Plugin::with_config(&invocation, demo_host(&addon_id), &config.router)?;
    addon::register(&mut plugin)?;
    tracing::info!(
        routes = plugin.router().len(),
        handle = plugin.handle(),
        "Demo addon ready"
    );

    plugin.run()?;

    let calls = plugin.host_mut().take_calls();
    write_calls(&mut std::io::stdout().lock(), &calls)
}
