use std::{env, sync::Arc};

use anyhow::Result;
use single_stock::{config, logging, scheduler, QuoteWidget, Refresh};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let settings = config::App::get()?;
    let widget = Arc::new(QuoteWidget::from_settings(&settings)?);
    let mut sched = scheduler::start().await?;
    let mut refresh = widget.subscribe();

    logging::info_console(format!(
        "SingleStock 已啟動 {} via {}\r\nRust OS/Arch: {}/{}",
        settings.widget.stock_symbol,
        settings.proxy.endpoint(),
        env::consts::OS,
        env::consts::ARCH
    ));
    logging::info_console(widget.render().to_html());

    widget.start(&sched).await?;

    loop {
        tokio::select! {
            received = refresh.recv() => match received {
                // Updated always follows FirstData
                Ok(Refresh::FirstData) => continue,
                Ok(Refresh::Updated) | Err(RecvError::Lagged(_)) => {
                    logging::info_console(widget.render().to_html());
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    widget.stop(&sched).await?;
    sched.shutdown().await?;
    logging::info_console("SingleStock 已停止".to_string());

    Ok(())
}
