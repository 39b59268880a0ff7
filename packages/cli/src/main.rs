use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use luawidget_cli::host::TerminalHost;
use luawidget_cli::{parse_arg, ReplCore, Result, Session, SessionError, Step};
use luawidget_kv_store::{InMemoryStore, JsonFileStore};
use luawidget_net::{FacadeConfig, FixtureSet, Mode, NetworkFacade};
use luawidget_runtime::{HostServices, RuntimeConfig};

/// luawidget - run launcher widget scripts off-device
#[derive(Parser, Debug)]
#[command(name = "luawidget")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Widget script to load
    script: PathBuf,

    /// JSON file of mock responses keyed by URL
    #[arg(long, env = "LUAWIDGET_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// Answer requests from fixtures (mock) or the network (real)
    #[arg(long, env = "LUAWIDGET_MODE", default_value = "mock")]
    mode: Mode,

    /// Run only this entry point after loading
    #[arg(long)]
    entry: Option<String>,

    /// JSON argument for --entry (repeatable)
    #[arg(long = "arg", requires = "entry")]
    args: Vec<String>,

    /// Invoke on_click with this index after on_resume
    #[arg(long)]
    click: Option<i64>,

    /// Invoke on_long_click with this index after on_resume
    #[arg(long)]
    long_click: Option<i64>,

    /// Answer the context menu with this 1-based index (0 cancels)
    #[arg(long)]
    menu: Option<i64>,

    /// Open a REPL instead of running the lifecycle once
    #[arg(short, long)]
    interactive: bool,

    /// Storage file (default: <data dir>/luawidget/storage.json)
    #[arg(long, env = "LUAWIDGET_STORAGE")]
    storage: Option<PathBuf>,

    /// Directory for the files capability (default: <data dir>/luawidget/files)
    #[arg(long)]
    files_dir: Option<PathBuf>,

    /// Minimum wait for network results after each entry point (longer
    /// while real requests are still within their timeout)
    #[arg(long, default_value_t = 5000)]
    settle_ms: u64,

    /// Simulated latency of mock responses
    #[arg(long, default_value_t = 50)]
    latency_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let services = services(&args)?;
    let config = RuntimeConfig {
        settle_timeout: Duration::from_millis(args.settle_ms),
    };
    let mut session = Session::open(&args.script, services, config)?;

    if args.interactive {
        let mut host = TerminalHost::new();
        ReplCore::new(session).run(&mut host)?;
        return Ok(());
    }

    if let Some(entry) = &args.entry {
        let values = args
            .args
            .iter()
            .map(|text| parse_arg(text))
            .collect::<Result<Vec<_>>>()?;
        print_step(&session.invoke(entry, &values));
    } else {
        for step in session.start() {
            print_step(&step);
        }
        if let Some(index) = args.click {
            print_step(&session.click(Some(index)));
        }
        if let Some(index) = args.long_click {
            print_step(&session.long_click(Some(index)));
        }
        if let Some(index) = args.menu {
            match session.select_menu(index) {
                Ok(step) => print_step(&step),
                Err(error @ (SessionError::NoMenu | SessionError::MenuIndex { .. })) => {
                    tracing::warn!(%error, "menu selection skipped");
                }
                Err(error) => return Err(error),
            }
        }
    }

    println!("{}", session.report());
    Ok(())
}

fn print_step(step: &Step) {
    println!("> {step}");
}

fn services(args: &Args) -> Result<HostServices> {
    let fixtures = match &args.fixtures {
        Some(path) => FixtureSet::load(path)?,
        None => FixtureSet::new(),
    };
    tracing::debug!(count = fixtures.len(), "fixtures loaded");

    let facade = NetworkFacade::new(
        FacadeConfig {
            mode: args.mode,
            mock_latency: Duration::from_millis(args.latency_ms),
            ..Default::default()
        },
        fixtures,
    );

    let data_dir = dirs::data_local_dir().map(|dir| dir.join("luawidget"));
    let services = match args.storage.clone().or_else(|| {
        data_dir.as_ref().map(|dir| dir.join("storage.json"))
    }) {
        Some(path) => HostServices::new(facade, JsonFileStore::open(path)?),
        None => {
            tracing::warn!("no data directory; storage will not persist");
            HostServices::new(facade, InMemoryStore::new())
        }
    };

    let files_dir = args
        .files_dir
        .clone()
        .or_else(|| data_dir.map(|dir| dir.join("files")));
    Ok(match files_dir {
        Some(dir) => services.with_files_root(dir),
        None => services,
    })
}
