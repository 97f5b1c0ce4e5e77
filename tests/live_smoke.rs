use crypto_price_logger::auth::ApiKey;
use crypto_price_logger::cryptocompare::{CryptoCompareClient, PriceApi, RequestDescriptor};
use crypto_price_logger::types::Exchange;

fn live_tests_enabled() -> bool {
    std::env::var("CRYPTO_LOGGER_LIVE_TESTS").ok().as_deref() == Some("1")
}

fn build_client() -> CryptoCompareClient {
    CryptoCompareClient::builder()
        .maybe_api_key(ApiKey::try_from_env())
        .build()
}

#[tokio::test]
#[ignore]
async fn live_price_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    if !live_tests_enabled() {
        return Ok(());
    }

    let client = build_client();
    let status = client.rate_limits().await?;
    assert!(status.calls_left.hour + status.calls_made.hour > 0);

    let request = RequestDescriptor::new(["BTC"], ["USD"], Exchange::Aggregate);
    let prices = client.multi_price(&request).await?;
    assert!(prices["BTC"]["USD"] > 0.0);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_exchange_table_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    if !live_tests_enabled() {
        return Ok(());
    }

    let table = build_client().exchanges().await?;
    assert!(!table.is_empty());

    Ok(())
}
