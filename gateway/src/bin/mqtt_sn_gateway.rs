// Copyright (c) 2024 Hebo Gateway Contributors. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use deadpool_lapin::{Config as AmqpPoolConfig, Runtime};
use log::{error, info, warn};
use redis::aio::ConnectionManager;
use tokio::sync::watch;

use mqtt_sn_gateway::config::Config;
use mqtt_sn_gateway::dispatcher::Dispatcher;
use mqtt_sn_gateway::error::{Error, ErrorKind};
use mqtt_sn_gateway::forwarder::AmqpForwarder;
use mqtt_sn_gateway::stores::{RedisClientStore, RedisTopicStore};
use mqtt_sn_gateway::{logging, server};

/// MQTT-SN to AMQP protocol gateway.
#[derive(Parser, Debug)]
#[command(name = "mqtt_sn_gateway", version, about)]
struct Cli {
    /// Load environment variables from this .env-style file before reading
    /// MQTTSN_* variables.
    #[arg(long, value_name = "PATH")]
    env_file: Option<String>,

    /// Skip loading any .env file, even the default one in the current
    /// directory.
    #[arg(long)]
    no_env_files: bool,

    /// Overrides MQTTSN_HOST.
    #[arg(long)]
    host: Option<String>,

    /// Overrides MQTTSN_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Overrides MQTTSN_DEBUG.
    #[arg(long)]
    debug: bool,

    /// Overrides MQTTSN_JSON_LOGS.
    #[arg(long)]
    json_logs: bool,
}

fn load_env_files(cli: &Cli) {
    if cli.no_env_files {
        return;
    }
    if let Some(path) = &cli.env_file {
        if let Err(err) = dotenvy::from_path(path) {
            eprintln!("warning: failed to load env file {path}: {err}");
        }
    } else {
        let _ = dotenvy::dotenv();
    }
}

fn apply_cli_overrides(cli: &Cli, config: &mut Config) {
    if let Some(host) = &cli.host {
        config.general.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.general.port = port;
    }
    if cli.debug {
        config.log.debug = true;
    }
    if cli.json_logs {
        config.log.json_logs = true;
    }
}

/// `redis::Client::open` only accepts `redis`/`rediss`/`unix`/`redis+unix`
/// schemes, so a `valkey://` connection string needs rewriting before it
/// gets there. Valkey speaks the same wire protocol, just under its own
/// branded URL scheme.
fn normalize_valkey_url(raw: &str) -> String {
    match raw.strip_prefix("valkey://") {
        Some(rest) => format!("redis://{rest}"),
        None => raw.to_owned(),
    }
}

async fn build_dispatcher(config: &Config) -> Result<Arc<Dispatcher>, Error> {
    let redis_url = normalize_valkey_url(&config.valkey.connection_string);
    let redis_client = redis::Client::open(redis_url.as_str())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    let call_timeout = Duration::from_millis(config.valkey.call_timeout_ms);

    let client_store = Arc::new(RedisClientStore::new(
        redis_conn.clone(),
        config.general.use_port_number_in_client_store,
        call_timeout,
    ));
    let topic_store = Arc::new(RedisTopicStore::new(redis_conn, call_timeout));

    let amqp_pool_config = AmqpPoolConfig {
        url: Some(config.amqp.connection_string.clone()),
        ..AmqpPoolConfig::default()
    };
    let amqp_pool = amqp_pool_config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| Error::new(ErrorKind::ConfigError, &format!("invalid amqp pool config: {e}")))?;
    let forwarder = Arc::new(AmqpForwarder::new(amqp_pool, config.amqp.publish_exchange.clone()));
    if let Err(err) = forwarder.declare_exchange().await {
        warn!("could not declare amqp exchange {:?} at startup: {err}", config.amqp.publish_exchange);
    }

    Ok(Arc::new(Dispatcher::new(
        client_store,
        topic_store,
        forwarder,
        config.general.extend_store_ttl_on_publish,
    )))
}

async fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    load_env_files(&cli);

    let mut config = Config::from_env()?;
    apply_cli_overrides(&cli, &mut config);
    config.validate()?;

    logging::init(&config.log);
    info!("starting with config: {config:?}");
    if config.sentry_dsn.is_some() {
        warn!("MQTTSN_SENTRY_DSN is set but this build does not forward telemetry");
    }

    let dispatcher = build_dispatcher(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    server::run(&config.general, dispatcher, shutdown_rx).await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
