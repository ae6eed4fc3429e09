use std::env;

use tenantgate_server::ServerBuilder;
use tenantgate_server::config::loader::load_config;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From TENANTGATE_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (tenantgate.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (TENANTGATE_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    // Initialize tracing early with the default level
    tenantgate_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = config_path.as_deref().unwrap_or(tenantgate_server::config::loader::DEFAULT_CONFIG_PATH),
        source = %source,
        "Configuration loaded"
    );

    tenantgate_server::observability::apply_logging_level(&cfg.logging.level);

    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .map_err(|e| anyhow::anyhow!("server initialization failed: {e}"))?;

    server.run().await
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: TENANTGATE_CONFIG
/// 3. Default: tenantgate.toml (optional)
fn resolve_config_path() -> (Option<String>, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (Some(path), ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("TENANTGATE_CONFIG")
        && !path.is_empty()
    {
        return (Some(path), ConfigSource::EnvironmentVariable);
    }

    (None, ConfigSource::Default)
}
