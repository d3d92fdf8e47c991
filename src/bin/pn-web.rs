use anyhow::Result;
use petri_engine::config::EngineConfig;

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let path = std::env::var("PN_CONFIG").unwrap_or_else(|_| "pn.toml".to_string());
    let config = EngineConfig::load_from_file(&path)?;
    log::debug!("PN config from {}: {:?}", path, config);

    petri_engine::server::serve(config).await
}
