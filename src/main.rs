use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskgenius::client::TaskHttpClient;
use taskgenius::config::AppConfig;
use taskgenius::services::{BoardRefresher, ReminderScheduler, TaskBoardModel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "taskgenius=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    info!("using task API at {}", config.api_base_url);

    let api = Arc::new(TaskHttpClient::new(&config)?);
    let board = TaskBoardModel::new(api);
    let reminders = Arc::new(ReminderScheduler::new(config.reminder_policy(), |reminder| {
        info!("Task Reminder: {}", reminder.body());
    }));

    let mut notices = board.subscribe();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => warn!("{}", notice),
                Err(RecvError::Lagged(skipped)) => warn!("{} notices dropped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let refresher = BoardRefresher::new(board, reminders.clone(), config.refresh_interval);

    tokio::select! {
        _ = refresher.start() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutting down");
        }
    }

    reminders.dispose();
    Ok(())
}
