use anyhow::Context;
use clap::Parser;
use rate_bench::application::shutdown::{
    listen_for_interrupts, spawn_interrupt_watchdog, spawn_timeout_watchdog,
};
use rate_bench::cli::{Backend, Cli};
use rate_bench::{ExitHook, Harness, InMemoryStore, ShutdownReason, WriteStore};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn build_store(cli: &Cli) -> anyhow::Result<Arc<dyn WriteStore>> {
    match cli.backend {
        Backend::Memory => Ok(Arc::new(InMemoryStore::new(cli.namespace()))),
        #[cfg(feature = "redis-store")]
        Backend::Redis => {
            use rate_bench::{RedisStore, RedisStoreConfig};

            let url = cli
                .cluster
                .as_deref()
                .context("--cluster is required for the redis backend")?;
            let config = RedisStoreConfig {
                namespace: cli.namespace(),
                request_timeout: (!cli.timeout.is_zero()).then_some(cli.timeout),
            };
            let store = RedisStore::connect(url, config)
                .await
                .with_context(|| format!("failed to connect to {}", url))?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = cli.to_config().context("invalid configuration")?;
    let store = build_store(&cli).await?;
    let harness = Harness::new(config.clone(), store)?;

    let exit: ExitHook = Arc::new(|_: ShutdownReason| std::process::exit(1));
    let interrupts = listen_for_interrupts().context("failed to install interrupt handler")?;
    spawn_interrupt_watchdog(harness.coordinator(), interrupts, Arc::clone(&exit));
    spawn_timeout_watchdog(harness.coordinator(), config.process_timeout, exit);

    println!("{}", config.banner());

    let summary = harness.run().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(())
}
