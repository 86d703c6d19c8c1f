//! Hourly driver: fetch → parse → merge → detail fetch → notify.

use std::time::Duration;

use discord_notify::Broadcaster;
use logger::{
    now_iso, CycleEvent, EventLogger, FetchErrorEvent, NotificationEvent, TournamentUpdatedEvent,
};
use tokio::sync::watch;
use tokio::time::{interval, sleep};
use tracing::{info, warn};
use turnier_scraper::{dates, detail_url, parse_index, parse_phases, TurnierClient, BASE_URL};

use crate::notifier;
use crate::registry::TournamentRegistry;

/// How often the index page is polled.
pub const SCHEDULE_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Lead time before a registration opens at which the reminder fires. Must
/// stay strictly larger than [`SCHEDULE_INTERVAL`], otherwise openings can
/// slip between two ticks.
pub const NOTIFICATION_OFFSET: Duration = Duration::from_secs(10 * 60 * 60);
/// Pause before each detail-page fetch; bounds load on the site to one
/// in-flight request with breathing room.
const DETAIL_FETCH_PAUSE: Duration = Duration::from_millis(500);

pub struct Scheduler {
    client: TurnierClient,
    registry: TournamentRegistry,
    broadcaster: Broadcaster,
    logger: EventLogger,
}

impl Scheduler {
    pub fn new(client: TurnierClient, broadcaster: Broadcaster, logger: EventLogger) -> Self {
        Self {
            client,
            registry: TournamentRegistry::default(),
            broadcaster,
            logger,
        }
    }

    /// Runs cycles until `shutdown` flips. The first cycle starts
    /// immediately, so a process launched inside a notification window still
    /// fires it. Shutdown is only observed between cycles, never inside one.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(SCHEDULE_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    info!("--- scrape cycle ---");
                    self.task().await;
                }
                _ = shutdown.changed() => {
                    info!("stopping scheduler");
                    break;
                }
            }
        }
    }

    async fn task(&mut self) {
        let html = match self.client.fetch_index().await {
            Ok(html) => html,
            Err(e) => {
                warn!("index fetch failed, skipping cycle: {e:#}");
                let _ = self.logger.log(&FetchErrorEvent {
                    ts: now_iso(),
                    event: "FETCH_ERROR",
                    url: BASE_URL.to_string(),
                    message: format!("{e:#}"),
                });
                return;
            }
        };

        let fetched = parse_index(&html);
        let fetched_count = fetched.len();
        let updated = self.registry.merge(fetched);
        info!(
            "merged {} fetched rows, {} new or changed, registry holds {}",
            fetched_count,
            updated.len(),
            self.registry.len()
        );

        self.fetch_details(&updated).await;
        let notifications = self.send_due().await;

        let _ = self.logger.log(&CycleEvent {
            ts: now_iso(),
            event: "CYCLE",
            fetched: fetched_count,
            updated: updated.len(),
            notifications,
        });
    }

    /// Serial detail fetches for updated tournaments that advertise a
    /// registration. The stored phase list is replaced wholesale on every
    /// fetch, so repeated fetches cannot accumulate duplicate phases.
    async fn fetch_details(&mut self, updated: &[String]) {
        for id in updated {
            let Some(tournament) = self.registry.get(id) else {
                continue;
            };
            if tournament.registration_start_date.is_none() {
                continue;
            }
            info!(
                "fetching details for {:?} (registration {:?})",
                tournament.title, tournament.registration_start_date
            );

            sleep(DETAIL_FETCH_PAUSE).await;
            match self.client.fetch_details(id).await {
                Ok(html) => {
                    let phases = parse_phases(&html);
                    if let Some(t) = self.registry.get_mut(id) {
                        t.phases = phases;
                        let _ = self.logger.log(&TournamentUpdatedEvent {
                            ts: now_iso(),
                            event: "TOURNAMENT_UPDATED",
                            id: t.id.clone(),
                            title: t.title.clone(),
                            changed: t.changed.to_rfc3339(),
                            registration_start: t.registration_start_date.map(|d| d.to_rfc3339()),
                            phases: t.phases.len(),
                        });
                    }
                }
                Err(e) => {
                    warn!("detail fetch for {id} failed: {e:#}");
                    let _ = self.logger.log(&FetchErrorEvent {
                        ts: now_iso(),
                        event: "FETCH_ERROR",
                        url: detail_url(id),
                        message: format!("{e:#}"),
                    });
                }
            }
        }
    }

    async fn send_due(&self) -> usize {
        let now = chrono::Utc::now().with_timezone(&dates::TIMEZONE);
        let due = notifier::due_notifications(&self.registry, now);
        for notification in &due {
            let channels = self.broadcaster.broadcast(&notification.message).await;
            info!(
                "reminder for {:?} ({:?}) sent to {channels} channel(s)",
                notification.title, notification.phase_title
            );
            let _ = self.logger.log(&NotificationEvent {
                ts: now_iso(),
                event: "NOTIFICATION_SENT",
                tournament_id: notification.tournament_id.clone(),
                title: notification.title.clone(),
                phase: notification.phase_title.clone(),
                opens_at: notification.opens_at.to_rfc3339(),
                channels,
            });
        }
        due.len()
    }
}
