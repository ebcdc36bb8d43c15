use std::path::PathBuf;

use tracing::{info, warn};

use applyscout::apply::login;
use applyscout::{BotConfig, ChromeSession, Credentials, SearchRunner};

struct CliArgs {
    config: Option<PathBuf>,
    headless_override: bool,
    dry_run: bool,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1).peekable();
    let mut parsed = CliArgs {
        config: None,
        headless_override: false,
        dry_run: false,
    };
    while let Some(a) = args.next() {
        if a == "--config" {
            if let Some(v) = args.next() {
                parsed.config = Some(PathBuf::from(v));
            }
        } else if let Some(rest) = a.strip_prefix("--config=") {
            parsed.config = Some(PathBuf::from(rest));
        } else if a == "--headless" {
            parsed.headless_override = true;
        } else if a == "--dry-run" {
            parsed.dry_run = true;
        } else {
            warn!("ignoring unknown argument: {}", a);
        }
    }
    parsed
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = parse_args();
    let mut config = BotConfig::load(args.config.as_deref())?;
    if args.headless_override {
        config.headless = true;
    }

    info!(
        "apply-scout starting: {} positions x {} locations, budget {:?}",
        config.positions.len(),
        config.locations.len(),
        config.max_search_time
    );

    if args.dry_run {
        for p in &config.positions {
            for l in &config.locations {
                info!("would search {:?} in {:?}", p, l);
            }
        }
        info!("dry run — not launching a browser");
        return Ok(());
    }

    let session = ChromeSession::launch(config.headless, &config.screenshot_dir).await?;

    match Credentials::from_env() {
        Some(creds) => login::sign_in(&session, &creds).await?,
        None => warn!(
            "APPLY_SCOUT_USERNAME/APPLY_SCOUT_PASSWORD not set — relying on the \
             browser profile's existing session"
        ),
    }

    let mut runner = SearchRunner::new(&session, config)?;
    tokio::select! {
        result = runner.run() => {
            if let Err(e) = result {
                warn!("run ended with error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    session.close().await;
    Ok(())
}
