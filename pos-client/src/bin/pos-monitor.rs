//! Headless terminal monitor
//!
//! Runs the pollers of one screen against the configured backend and logs
//! every notice until Ctrl-C. Usage: `pos-monitor [kitchen|cashier|delivery|pos]`.

use pos_client::logger::init_logger;
use pos_client::{
    CashierScreen, ClientConfig, ClientContext, ClientEvent, DeliveryScreen, KitchenScreen,
    PosScreen,
};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env();
    init_logger(&config)?;

    let screen = std::env::args().nth(1).unwrap_or_else(|| "kitchen".into());
    tracing::info!(screen = %screen, base_url = %config.base_url, "POS monitor starting");

    let ctx = ClientContext::new(config)?;
    let mut events = ctx.subscribe();

    let handles = match screen.as_str() {
        "kitchen" => KitchenScreen::new(ctx.clone()).start(),
        "cashier" => CashierScreen::new(ctx.clone()).start(),
        "delivery" => DeliveryScreen::new(ctx.clone()).start(),
        "pos" => {
            let pos = PosScreen::new(ctx.clone());
            pos.load_catalog().await;
            pos.start()
        }
        other => anyhow::bail!("unknown screen '{}'", other),
    };
    if handles.is_empty() {
        tracing::warn!("No session token; set POS_API_TOKEN");
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(ClientEvent::Notice(notice)) => {
                    tracing::info!(level = ?notice.level, "{}", notice.message);
                }
                Ok(ClientEvent::AuthRequired) => {
                    tracing::warn!("Authorization required, stopping");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped notices");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    for handle in handles {
        handle.stop().await;
    }
    Ok(())
}
