use clap::Parser;
use tracing_subscriber::EnvFilter;

use crypto_price_logger::config::Config;
use crypto_price_logger::cryptocompare::CryptoCompareClient;
use crypto_price_logger::orchestrator::Orchestrator;
use crypto_price_logger::sink::InfluxSink;

#[tokio::main(flavor = "current_thread")]
async fn main() -> crypto_price_logger::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    config.validate()?;
    tracing::info!("{}", config.banner());

    let sink = InfluxSink::builder(config.database.clone())
        .host(&config.host, config.port)
        .timeout(config.timeout())
        .connect()
        .await?;

    let client = CryptoCompareClient::builder()
        .app_name(config.app_name.clone())
        .maybe_api_key(config.api_key())
        .timeout(config.timeout())
        .build();

    let logger = Orchestrator::prepare(client, sink, &config.request()).await?;

    if config.historic {
        let report = logger.run_history(config.from_time_now()).await?;
        if report.aborted > 0 {
            tracing::warn!(aborted = report.aborted, "Some pairs have partial history");
        }
    } else {
        logger
            .run_live(config.mode(), config.interval(), config.single)
            .await?;
    }

    Ok(())
}
