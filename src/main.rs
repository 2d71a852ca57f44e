use uvr_bridge::options::Options;
use uvr_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    let config = match ConfigWrapper::new(options.config_file.clone()) {
        Ok(config) => config,
        Err(err) => {
            let _ = uvr_bridge::init_logging("info");
            error!("Failed to load config {}: {:?}", options.config_file, err);
            std::process::exit(255);
        }
    };

    uvr_bridge::init_logging(&config.loglevel())?;
    config.log_summary();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        let _ = tx.send(());
    });

    if let Some(runtime) = options.runtime {
        info!("stopping after {}s", runtime);
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(runtime)).await;
            let _ = tx.send(());
        });
    }

    uvr_bridge::app(shutdown_rx, config).await
}
