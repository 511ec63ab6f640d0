//! pixiv-mirror - CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use pixiv_mirror::{
    cache::Cache,
    cli::Args,
    config::{validate_config, Config, PipelineMode},
    drive::DriveClient,
    error::{exit_codes, Error, Result},
    history::History,
    mirror::Mirror,
    pixiv::PixivClient,
    select::select,
    transport::Transport,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(e: &Error) -> u8 {
    let code = match e {
        Error::Config(_)
        | Error::ConfigValidation { .. }
        | Error::MissingConfig(_)
        | Error::TomlParse(_) => exit_codes::CONFIG_ERROR,
        Error::Login(_) | Error::NotSupported(_) => exit_codes::LOGIN_ERROR,
        Error::Mirror(_) | Error::Digest(_) => exit_codes::PIPELINE_ERROR,
        _ => exit_codes::UNEXPECTED_ERROR,
    };
    code as u8
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    // Load configuration
    let config_path = args.config.clone();
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        tracing::warn!(
            "configuration file not found: {}, using defaults with CLI arguments",
            config_path.display()
        );
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    // Pixiv client (both pipelines read from it)
    let paced = config.transport_config();
    let mut pixiv_transport_config = PixivClient::transport_config();
    pixiv_transport_config.interval = paced.interval;
    pixiv_transport_config.timeout = paced.timeout;
    let pixiv = PixivClient::new(
        Transport::new(&pixiv_transport_config)?,
        config.retry_policy(),
    );

    if let Some(cookies) = &config.pixiv.cookies {
        if !pixiv.login_with_cookies(cookies).await {
            return Err(Error::Login("pixiv cookie login failed".into()));
        }
        tracing::info!("pixiv: session cookies attached");
    }

    let cache = Cache::new(&config.cache.dir)?;

    match config.pipeline {
        PipelineMode::Mirror => run_mirror(&config, &config_path, pixiv, cache).await,
        PipelineMode::Digest => run_digest(&config, pixiv, cache).await,
    }
}

/// Mirror pipeline: log in to the drive, mirror one ranking page, then
/// persist the rotated refresh token for the next run.
async fn run_mirror(
    config: &Config,
    config_path: &std::path::Path,
    pixiv: PixivClient,
    cache: Cache,
) -> Result<()> {
    if config.mirror.mode.needs_login() && config.pixiv.cookies.is_none() {
        tracing::warn!(
            "ranking mode {} needs pixiv cookies; expect an empty listing",
            config.mirror.mode
        );
    }

    let drive = DriveClient::with_api_base(
        Transport::new(&config.transport_config())?,
        config.retry_policy(),
        &config.drive.api_base,
    );
    if !drive.login(&config.drive.refresh_token).await {
        return Err(Error::Login("drive refresh-token login failed".into()));
    }
    tracing::info!("drive: logged in");

    let mirror = Mirror::new(drive, pixiv, cache, &config.mirror.root_dir);
    let ok = mirror
        .mirror_ranking(config.mirror.mode, config.mirror.date.as_deref())
        .await;

    // The server rotates the refresh token on every login; persist the
    // new one or the next run's login fails.
    persist_refresh_token(config, config_path, &mirror).await;

    if !ok {
        return Err(Error::Mirror("some illusts were not mirrored".into()));
    }
    Ok(())
}

async fn persist_refresh_token(config: &Config, config_path: &std::path::Path, mirror: &Mirror) {
    let Some(rotated) = mirror.drive().refresh_token().await else {
        return;
    };
    if rotated == config.drive.refresh_token {
        return;
    }
    let mut updated = config.clone();
    updated.drive.refresh_token = rotated;
    if let Err(e) = updated.save(config_path) {
        tracing::error!("could not persist rotated refresh token: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_failures_map_to_config_exit_code() {
        let toml_err = toml::from_str::<Config>("pipeline = [").unwrap_err();
        assert_eq!(exit_code(&Error::TomlParse(toml_err)), 1);
        assert_eq!(exit_code(&Error::Config("bad".into())), 1);
        assert_eq!(exit_code(&Error::MissingConfig("refresh_token".into())), 1);
    }

    #[test]
    fn other_errors_keep_their_exit_codes() {
        assert_eq!(exit_code(&Error::Login("denied".into())), 2);
        assert_eq!(exit_code(&Error::Mirror("partial".into())), 3);
        assert_eq!(
            exit_code(&Error::Io(std::io::Error::other("disk"))),
            4
        );
    }
}

/// Digest pipeline: select a candidate batch and record it into the
/// persistent history.
async fn run_digest(config: &Config, pixiv: PixivClient, cache: Cache) -> Result<()> {
    if config.select.mode.needs_login() && config.pixiv.cookies.is_none() {
        tracing::warn!(
            "ranking mode {} needs pixiv cookies; expect an empty listing",
            config.select.mode
        );
    }

    let mut history = History::load(&config.select.history_file)?;
    let opts = config.select_options(history.to_set());

    let candidates = select(&pixiv, &cache, &opts).await;
    if candidates.is_empty() {
        return Err(Error::Digest("no candidates selected".into()));
    }
    if candidates.len() < opts.quota {
        tracing::warn!(
            "selected {}/{} candidates before the source ran out",
            candidates.len(),
            opts.quota
        );
    }

    for candidate in &candidates {
        tracing::info!(
            "candidate: illust {} by {} ({}) at {}",
            candidate.illust_id,
            candidate.user_name,
            candidate.user_id,
            candidate.local_path.display()
        );
    }

    let ids: Vec<u64> = candidates.iter().map(|c| c.illust_id).collect();
    history.record(&ids);
    history.save(&config.select.history_file)?;
    tracing::info!(
        "recorded {} ids; history now holds {} across {} runs",
        ids.len(),
        history.len(),
        history.runs()
    );

    Ok(())
}
