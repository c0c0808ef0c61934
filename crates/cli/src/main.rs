use clap::{Parser, Subcommand};
use lib::locator::MountPoint;
use lib::pipeline::{Event, Pipeline};
use lib::refresh::RefreshScheduler;
use lib::render::{IndicatorTone, RowView};
use lib::transport::{HttpRequest, HttpTransport, Interceptor, PageState, Transport};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Duration;

#[derive(Parser)]
#[command(name = "deskpin")]
#[command(about = "Deskpin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: DESKPIN_CONFIG_PATH or ~/.deskpin/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Watch a channel's pinned conversations and keep a sorted list on the
    /// terminal. Needs a desk session cookie (config api.cookie or DESKPIN_COOKIE).
    Watch {
        /// Channel id (the digits from /channels/<id> in the desk url)
        channel: String,

        /// Config file path (default: DESKPIN_CONFIG_PATH or ~/.deskpin/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Poll interval in seconds (default from config or 10)
        #[arg(long, short)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("deskpin {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Watch {
            channel,
            config,
            interval,
        }) => {
            if let Err(e) = run_watch(config, channel, interval).await {
                log::error!("watch failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let _dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", path.display());
    Ok(())
}

async fn run_watch(
    config_path: Option<std::path::PathBuf>,
    channel: String,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    if let Some(secs) = interval {
        config.refresh.interval_secs = secs;
    }
    let cookie = lib::config::resolve_cookie(&config);
    if cookie.is_none() {
        log::warn!("no session cookie configured; the desk API will likely reject fetches");
    }

    let page = Arc::new(PageState::new());
    let (tx, rx) = mpsc::channel::<Event>(64);

    let raw: Arc<dyn Transport> = Arc::new(HttpTransport::new(cookie));
    let interceptor = Interceptor::new(
        raw.clone(),
        page.clone(),
        config.api.page_limit,
        tx.clone(),
    );

    let mount: Arc<dyn MountPoint> = Arc::new(TerminalMount::default());
    let pipeline = Pipeline::with_mount(mount, &config, page.clone(), &tx);
    let pipeline_handle = tokio::spawn(pipeline.run(rx));

    // Seed through the interceptor: confirms the bookmark view, records the
    // channel id, widens the limit, and feeds the first payload.
    let base = config.api.base_url.trim_end_matches('/');
    let seed_url = format!("{}/channels/{}/user-chats/bookmark?limit=25", base, channel);
    let res = interceptor.execute(HttpRequest::get(seed_url)).await?;
    if !res.is_success() {
        anyhow::bail!("initial bookmark fetch failed with status {}", res.status);
    }

    let scheduler = Arc::new(RefreshScheduler::new(
        raw,
        page,
        base,
        config.api.page_limit,
        Duration::from_secs(config.refresh.interval_secs),
    ));
    let poll_handle = scheduler.clone().start(tx.clone());

    // Only the scheduler and interceptor hold senders now; the pipeline
    // drains until both are gone.
    drop(tx);

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    scheduler.stop();
    poll_handle.abort();
    drop(interceptor);
    let _ = pipeline_handle.await;
    Ok(())
}

/// Terminal mount: reprints the list whenever rows or the highlight change.
#[derive(Default)]
struct TerminalMount {
    state: Mutex<TerminalState>,
}

#[derive(Default)]
struct TerminalState {
    rows: Vec<RowView>,
    active: Option<String>,
}

impl TerminalMount {
    fn print(state: &TerminalState) {
        println!("── pinned conversations ({}) ──", state.rows.len());
        for row in &state.rows {
            let marker = if state.active.as_deref() == Some(row.chat_id.as_str()) {
                '>'
            } else {
                ' '
            };
            let dot = match row.tone {
                IndicatorTone::Customer => '●',
                IndicatorTone::Agent => '○',
            };
            let assignee = row.assignee.as_deref().unwrap_or("-");
            println!(
                "{} {} {:<24} {:<12} {:>10}  {}",
                marker, dot, row.name, assignee, row.age_label, row.excerpt
            );
        }
    }
}

impl MountPoint for TerminalMount {
    fn suppress_native(&self) {}

    fn set_rows(&self, rows: &[RowView]) {
        let mut state = self.state.lock().expect("terminal state lock");
        state.rows = rows.to_vec();
        Self::print(&state);
    }

    fn set_active(&self, chat_id: Option<&str>) {
        let mut state = self.state.lock().expect("terminal state lock");
        let active = chat_id.map(String::from);
        if state.active != active {
            state.active = active;
            Self::print(&state);
        }
    }
}
