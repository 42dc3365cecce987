use anyhow::Result;
use nimbus_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    nimbus_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::info!(
        api = %config.weather.api_base_url,
        timeout_secs = config.weather.timeout_secs,
        "Configuration loaded"
    );

    if let Err(e) = nimbus_web::serve(config).await {
        tracing::error!("{}: {}", e.user_message(), e);
        return Err(e.into());
    }

    Ok(())
}
