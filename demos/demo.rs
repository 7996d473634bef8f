//! Demo application walking through the strategy catalog.
//!
//! Runs every increment strategy against the in-process transactional store
//! under both isolation levels and prints the lost-update report, optionally
//! followed by a showcase of the counter backends.
//!
//! Run with:
//! ```bash
//! cargo run --example demo --features demo -- --workers 10 --iterations 10000
//! ```

use clap::{Parser, ValueEnum};
use contesa::harness::{run_store, run_strategy, BenchConfig, BenchReport};
use contesa::report::{ReportStyle, ReportTable};
use contesa::retry::RetryPolicy;
use contesa::service::BackendRegistry;
use contesa::stores::BackendKind;
use contesa::strategies::Strategy;
use contesa::txn::{memory::MemStore, IsolationLevel, TransactionalStore};

/// Table style selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StyleChoice {
    Ascii,
    #[default]
    Rounded,
    Markdown,
}

impl From<StyleChoice> for ReportStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Ascii => ReportStyle::Ascii,
            StyleChoice::Rounded => ReportStyle::Rounded,
            StyleChoice::Markdown => ReportStyle::Markdown,
        }
    }
}

/// Lost-update demonstration across concurrency-control strategies.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of concurrent workers.
    #[arg(long, default_value_t = 10)]
    workers: u32,

    /// Increment attempts per worker.
    #[arg(long, default_value_t = 10_000)]
    iterations: u32,

    /// Run a single strategy by name instead of the full walkthrough
    /// (read-modify-write, atomic-update, select-for-update,
    /// optimistic-versioning).
    #[arg(long)]
    strategy: Option<String>,

    /// Retry recoverable conflicts instead of counting them as failures.
    #[arg(long)]
    enable_retry: bool,

    /// Also benchmark every counter backend.
    #[arg(long)]
    backends: bool,

    /// Table style for the report.
    #[arg(long, value_enum, default_value_t = StyleChoice::Rounded)]
    style: StyleChoice,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let store = MemStore::new();
    let mut reports: Vec<BenchReport> = Vec::new();
    let table = ReportTable::new().with_style(args.style.into());

    if let Some(name) = &args.strategy {
        let strategy: Strategy = name.parse().expect("unknown strategy name");
        let mut config = BenchConfig::new(args.workers, args.iterations);
        if args.enable_retry {
            config = config.with_retry(RetryPolicy::standard());
        }
        let report = run_strategy(&store, strategy, &config).unwrap();
        println!("{}", table.render(&[report]));
        return;
    }

    // 1. Lost updates: the naive baseline under read committed.
    store.set_isolation(IsolationLevel::ReadCommitted);
    let config = BenchConfig::new(args.workers, args.iterations);
    reports.push(run_strategy(&store, Strategy::ReadModifyWrite, &config).unwrap());

    // 2. The same staleness under serializable isolation: rejected loudly,
    //    converted back into success by the retry wrapper.
    store.set_isolation(IsolationLevel::Serializable);
    let config = BenchConfig::new(args.workers, args.iterations).with_retry(RetryPolicy::standard());
    reports.push(run_strategy(&store, Strategy::ReadModifyWrite, &config).unwrap());

    // 3-5. The correct strategies, back under read committed.
    store.set_isolation(IsolationLevel::ReadCommitted);
    let config = BenchConfig::new(args.workers, args.iterations);
    for strategy in [
        Strategy::AtomicUpdate,
        Strategy::SelectForUpdate,
        Strategy::OptimisticVersioning,
    ] {
        reports.push(run_strategy(&store, strategy, &config).unwrap());
    }

    println!("{}", table.render(&reports));

    if args.backends {
        let registry = BackendRegistry::new();
        let config = BenchConfig::new(args.workers, args.iterations);
        let mut backend_reports = Vec::new();
        for kind in BackendKind::ALL {
            let store = registry.store(kind).unwrap();
            backend_reports.push(run_store(store.as_ref(), kind.name(), &config).unwrap());
        }
        println!("{}", table.render(&backend_reports));
        registry.close_all().unwrap();
        // The file backend persisted its count next to the binary; this is
        // a demo, not a service, so clean it up.
        let _ = std::fs::remove_file("counter.txt");
    }
}
