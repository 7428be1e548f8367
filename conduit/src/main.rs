#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use args::{Args, Command, ResolveArgs};
use clap::Parser;
use conduit_config::Config;
use conduit_llm::TranslationPipeline;
use conduit_routing::{Catalog, RequiredCapabilities, ResolutionQuery, Resolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    let _telemetry_guard = conduit_telemetry::init(config.telemetry.as_ref(), &args.log)?;

    tracing::debug!(config_path = %args.config.display(), "configuration loaded");

    match &args.command {
        Command::Check => check(&config),
        Command::Resolve(resolve_args) => resolve(&config, resolve_args).await,
        Command::Status => status(&config).await,
    }
}

/// Validate translators and print the catalog
fn check(config: &Config) -> anyhow::Result<()> {
    let pipeline = TranslationPipeline::from_config(&config.translators)?;
    let catalog = Catalog::from_config(config);

    println!("configuration ok");
    for backend in catalog.backends() {
        let offerings: Vec<_> = catalog.offerings().iter().filter(|o| &o.backend == backend).collect();
        let free = offerings.iter().filter(|o| o.free).count();
        println!("  {backend}: {} model(s), {free} free", offerings.len());

        for offering in offerings {
            println!(
                "    {} -> {} (cost {}, endpoints {})",
                offering.model,
                offering.upstream,
                offering.cost_per_unit,
                offering
                    .endpoints
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    println!("translators: {pipeline:?}");

    Ok(())
}

/// Dry-run a resolution against the configured state stores
async fn resolve(config: &Config, args: &ResolveArgs) -> anyhow::Result<()> {
    let health = conduit_state::create_health_store(config).await?;
    let quota = conduit_state::create_quota_store(config).await?;
    let resolver = Resolver::from_config(config, health, quota);

    let capabilities = RequiredCapabilities {
        streaming: args.stream,
        tools: args.tools,
        vision: args.vision,
        audio: args.audio,
    };
    let query = ResolutionQuery::new(&args.model, args.endpoint, capabilities)
        .tenant(args.tenant.as_deref())
        .prefer(args.prefer.as_deref());

    let result = resolver.resolve(&query).await?;

    println!("tier: {}", result.tier);
    for (rank, candidate) in result.candidates.iter().enumerate() {
        println!(
            "  {}. {} ({}) cost {}{}",
            rank + 1,
            candidate.backend,
            candidate.model,
            candidate.cost_per_unit,
            if candidate.free { " free" } else { "" }
        );
    }

    Ok(())
}

/// Print health and quota per provider
async fn status(config: &Config) -> anyhow::Result<()> {
    let health = conduit_state::create_health_store(config).await?;
    let quota = conduit_state::create_quota_store(config).await?;

    for backend in config.providers.keys() {
        let health = health.status(backend).await;
        let quota = quota.quota_status(backend).await;

        let state = if health.healthy { "healthy" } else { "cooling down" };
        let limit = quota.limit.map_or_else(|| "unlimited".to_owned(), |limit| limit.to_string());

        println!(
            "{backend}: {state}, {} consecutive failure(s), quota {}/{limit}, resets in {}s",
            health.consecutive_failures,
            quota.used,
            quota.reset_in.as_secs()
        );
        if let Some(reason) = &health.last_failure {
            println!("  last failure: {reason}");
        }
    }

    Ok(())
}
