use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{info, instrument};

use stream_schedule::cache::Snapshot;
use stream_schedule::config::Config;
use stream_schedule::model::UNKNOWN;
use stream_schedule::refresh::Refresher;
use stream_schedule::{display, logging, renderer, video};

#[instrument(skip_all, fields(count = snapshot.records.len()))]
fn report(snapshot: &Snapshot, viewer_tz: Tz, player_base: &str) {
    let now = Utc::now();
    for record in snapshot.records.iter() {
        let embed = video::embed_url(&record.link, player_base);
        info!(
            line = %display::schedule_line(record, viewer_tz, now),
            title = %display::card_title(record, viewer_tz),
            summary = %display::summary(record),
            embed = embed.as_deref().unwrap_or(UNKNOWN),
            "Stream"
        );
    }
    if snapshot.records.is_empty() {
        info!("No streams available to display");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    logging::init(&config);
    info!(url = %config.schedule_url, log_file = %config.log_file.display(), "Starting stream schedule service");

    let viewer_tz = config.viewer_tz()?;
    let refresher = Arc::new(Refresher::from_config(&config, renderer::build(&config))?);
    let mut updates = refresher.cache().subscribe();
    let handle = refresher.clone().spawn();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                report(&snapshot, viewer_tz, &config.player_base_url);
            }
        }
    }

    handle.stop().await;
    Ok(())
}
