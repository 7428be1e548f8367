use std::path::PathBuf;

use clap::{Parser, Subcommand};
use conduit_core::EndpointKind;

/// Conduit routing core
#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Inspect and dry-run the Conduit routing core")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Log filter directive (`tracing-subscriber` `EnvFilter` syntax)
    #[arg(long, default_value = "warn", env = "CONDUIT_LOG")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and validate the configuration, then summarize the catalog
    Check,

    /// Resolve a model without dispatching anything
    Resolve(ResolveArgs),

    /// Show health and quota for every provider
    Status,
}

#[derive(Debug, clap::Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct ResolveArgs {
    /// Model id, optionally qualified as `backend/model`
    #[arg(short, long)]
    pub model: String,

    /// Endpoint kind the request targets
    #[arg(short, long, default_value_t = EndpointKind::ChatCompletions)]
    pub endpoint: EndpointKind,

    /// Require streaming support
    #[arg(long)]
    pub stream: bool,

    /// Require tool calling
    #[arg(long)]
    pub tools: bool,

    /// Require image input
    #[arg(long)]
    pub vision: bool,

    /// Require audio input
    #[arg(long)]
    pub audio: bool,

    /// Apply this tenant's routing policy
    #[arg(long)]
    pub tenant: Option<String>,

    /// Prefer this backend
    #[arg(long)]
    pub prefer: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_resolve_flags() {
        let args = Args::try_parse_from([
            "conduit",
            "--config",
            "gw.toml",
            "resolve",
            "--model",
            "gpt-x",
            "--endpoint",
            "embeddings",
            "--tools",
            "--tenant",
            "acme",
        ])
        .unwrap();

        let Command::Resolve(resolve) = args.command else {
            panic!("expected resolve");
        };
        assert_eq!(resolve.model, "gpt-x");
        assert_eq!(resolve.endpoint, EndpointKind::Embeddings);
        assert!(resolve.tools);
        assert!(!resolve.stream);
        assert_eq!(resolve.tenant.as_deref(), Some("acme"));
    }
}
