// lookout/src/main.rs
//
// Lookout: consent-gated browser extension tracking service.
//
// Usage:
//   lookout serve --db lookout.db --admin-key $KEY       # HTTP API
//   lookout hash --canvas-hash abc --color-depth 24 ...  # fingerprint digest
//   lookout features --db lookout.db set ExtensionTracking --enabled
//   lookout features --db lookout.db list
//   lookout forget <fingerprint-hash> --server http://127.0.0.1:8080

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lookout::api::{self, AppState};
use lookout::client::TrackingClient;
use lookout::config::{ClientConfig, ServerConfig};
use lookout::events::{BrowserFingerprint, FeatureSettings, EXTENSION_TRACKING};
use lookout::features::FeatureToggles;
use lookout::store::{EventStore, FeatureStore, MemoryStore, SqliteStore};
use lookout::tracking::TrackingService;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "lookout",
    about   = "Consent-gated browser extension tracking service",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, global = true, help = "JSON config file (server settings)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Print the digest of a fingerprint.
    Hash(HashArgs),
    /// Inspect or change feature toggles directly in the database.
    Features {
        #[arg(long, help = "SQLite database path")]
        db: PathBuf,
        #[command(subcommand)]
        action: FeatureAction,
    },
    /// Ask a running server to erase everything stored for a fingerprint.
    Forget {
        fingerprint_hash: String,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
    },
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, help = "Listen address, e.g. 0.0.0.0:8080")]
    bind: Option<String>,

    #[arg(long, help = "SQLite database path (in-memory store when omitted)")]
    db: Option<PathBuf>,

    #[arg(long, env = "LOOKOUT_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    #[arg(long, help = "Switch ExtensionTracking on at startup unless already configured")]
    enable_tracking: bool,
}

#[derive(Args)]
struct HashArgs {
    #[arg(long, default_value = "")]
    canvas_hash: String,
    #[arg(long, default_value = "")]
    webgl_renderer: String,
    #[arg(long, default_value = "", help = "e.g. 1920x1080")]
    screen_resolution: String,
    #[arg(long, default_value_t = 0)]
    color_depth: i32,
    #[arg(long, default_value = "", help = "IANA zone, e.g. Europe/Berlin")]
    timezone: String,
    #[arg(long, default_value = "")]
    language: String,
    #[arg(long, default_value = "")]
    platform: String,
    #[arg(long, default_value_t = 0)]
    hardware_concurrency: i32,
}

#[derive(Subcommand)]
enum FeatureAction {
    List,
    Get { name: String },
    #[command(group(ArgGroup::new("state").required(true).args(["enabled", "disabled"])))]
    Set {
        name: String,
        #[arg(long)]
        enabled: bool,
        #[arg(long)]
        disabled: bool,
        #[arg(long, help = "Why the feature is being disabled")]
        reason: Option<String>,
        #[arg(long, default_value = "cli")]
        by: String,
    },
}

// ── Commands ──────────────────────────────────────────────────────────────────

type Stores = (Arc<dyn EventStore>, Arc<dyn FeatureStore>);

// One backend serves both roles.
fn open_stores(db: Option<&Path>) -> Result<Stores> {
    match db {
        Some(path) => {
            let s = Arc::new(SqliteStore::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?);
            let events: Arc<dyn EventStore> = s.clone();
            let features: Arc<dyn FeatureStore> = s;
            Ok((events, features))
        }
        None => {
            warn!("no database configured, events are kept in memory only");
            let s = Arc::new(MemoryStore::new());
            let events: Arc<dyn EventStore> = s.clone();
            let features: Arc<dyn FeatureStore> = s;
            Ok((events, features))
        }
    }
}

async fn serve(cfg_path: Option<&Path>, args: ServeArgs) -> Result<()> {
    let mut cfg = match cfg_path {
        Some(p) => ServerConfig::load(p)?,
        None    => ServerConfig::default(),
    };
    if let Some(bind) = args.bind   { cfg.bind = bind; }
    if let Some(db)   = args.db     { cfg.database = Some(db); }
    if args.admin_key.is_some()     { cfg.admin_key = args.admin_key; }
    cfg.enable_tracking |= args.enable_tracking;

    let (events, features) = open_stores(cfg.database.as_deref())?;
    let toggles = FeatureToggles::new(features);
    if cfg.enable_tracking {
        toggles.seed(EXTENSION_TRACKING, true, "startup")?;
    }
    info!(
        tracking = toggles.is_enabled(EXTENSION_TRACKING),
        "feature {} state loaded", EXTENSION_TRACKING
    );
    if cfg.admin_key().is_none() {
        warn!("no admin key configured, admin routes will reject every request");
    }

    let state = AppState::new(TrackingService::new(events, toggles), cfg.admin_key());
    api::serve(state, &cfg).await
}

fn hash(args: HashArgs) {
    let fp = BrowserFingerprint {
        canvas_hash:          args.canvas_hash,
        webgl_renderer:       args.webgl_renderer,
        screen_resolution:    args.screen_resolution,
        color_depth:          args.color_depth,
        timezone:             args.timezone,
        language:             args.language,
        platform:             args.platform,
        hardware_concurrency: args.hardware_concurrency,
    };
    println!("{}", fp.hash());
}

fn features(db: &Path, action: FeatureAction) -> Result<()> {
    let (_, store) = open_stores(Some(db))?;
    let toggles    = FeatureToggles::new(store);
    match action {
        FeatureAction::List => {
            for s in toggles.list()? {
                print_feature(&s);
            }
        }
        FeatureAction::Get { name } => match toggles.get_settings(&name)? {
            Some(s) => print_feature(&s),
            None    => println!("{}: not configured (off)", name),
        },
        FeatureAction::Set { name, enabled, disabled: _, reason, by } => {
            let s = toggles.set_enabled(&name, enabled, &by, reason.as_deref())?;
            print_feature(&s);
        }
    }
    Ok(())
}

fn print_feature(s: &FeatureSettings) {
    let (color, state) = if s.is_enabled { ("\x1b[92m", "on ") } else { ("\x1b[91m", "off") };
    let reason = s.disabled_reason.as_deref().map(|r| format!("  \x1b[90m({})\x1b[0m", r)).unwrap_or_default();
    println!(
        "{}{}\x1b[0m  {:<24} by {} at {}{}",
        color, state, s.feature_name, s.last_modified_by,
        s.last_modified_at.format("%Y-%m-%d %H:%M:%S UTC"), reason
    );
}

async fn forget(fingerprint_hash: &str, server: String) -> Result<()> {
    let client = TrackingClient::new(&ClientConfig { base_url: server, ..Default::default() })?;
    let resp   = client.delete_my_data(fingerprint_hash).await?;
    println!("{} ({} record(s))", resp.message, resp.deleted_records);
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("lookout=info".parse()?))
        .compact().init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args)             => serve(cli.config.as_deref(), args).await,
        Command::Hash(args)              => { hash(args); Ok(()) }
        Command::Features { db, action } => features(&db, action),
        Command::Forget { fingerprint_hash, server } => {
            forget(&fingerprint_hash, server).await
        }
    }
}
