//! Decides which registration openings fall into the current tick's window
//! and renders the reminder text.

use chrono::DateTime;
use chrono_tz::Tz;
use turnier_scraper::dates;
use turnier_scraper::Tournament;

use crate::registry::TournamentRegistry;
use crate::scheduler::{NOTIFICATION_OFFSET, SCHEDULE_INTERVAL};

/// One reminder that is due this tick, with the fields the audit log wants.
#[derive(Debug, Clone)]
pub struct DueNotification {
    pub tournament_id: String,
    pub title: String,
    pub phase_title: Option<String>,
    pub opens_at: DateTime<Tz>,
    pub message: String,
}

/// Walks the registry and collects every reminder whose opening falls into
/// the half-open window `[offset - interval, offset)` ahead of `now`.
/// Half-open keeps it at exactly one tick per opening: consecutive ticks
/// spaced by the interval tile the time axis without overlap or gap.
pub fn due_notifications(registry: &TournamentRegistry, now: DateTime<Tz>) -> Vec<DueNotification> {
    let mut due = Vec::new();
    for tournament in registry.iter() {
        let Some(opens_at) = tournament.registration_start_date else {
            continue;
        };

        if tournament.phases.is_empty() {
            if in_window(opens_at, now) {
                due.push(plain_notification(tournament, opens_at));
            }
            continue;
        }

        for phase in &tournament.phases {
            let Some(phase_opens) = phase.registration_start_date else {
                continue;
            };
            if in_window(phase_opens, now) {
                due.push(phase_notification(tournament, &phase.title, phase_opens));
            }
        }
    }
    due
}

fn in_window(opens_at: DateTime<Tz>, now: DateTime<Tz>) -> bool {
    let d = (opens_at - now).num_seconds();
    let offset = NOTIFICATION_OFFSET.as_secs() as i64;
    let interval = SCHEDULE_INTERVAL.as_secs() as i64;
    (offset - interval..offset).contains(&d)
}

fn phase_notification(t: &Tournament, phase_title: &str, opens_at: DateTime<Tz>) -> DueNotification {
    let message = format!(
        "⏰ Turnieranmeldung für \"**{}**\"\n{}\nöffnet **heute um {} Uhr**\n📍 {}\n🔗 {}",
        t.title,
        phase_title,
        dates::format_clock(&opens_at),
        t.location,
        t.link,
    );
    DueNotification {
        tournament_id: t.id.clone(),
        title: t.title.clone(),
        phase_title: Some(phase_title.to_string()),
        opens_at,
        message,
    }
}

fn plain_notification(t: &Tournament, opens_at: DateTime<Tz>) -> DueNotification {
    let message = format!(
        "⏰ Turnieranmeldung für:\n\"**{}**\"\nöffnet **heute um {} Uhr**\n🔗 {}",
        t.title,
        dates::format_clock(&opens_at),
        t.link,
    );
    DueNotification {
        tournament_id: t.id.clone(),
        title: t.title.clone(),
        phase_title: None,
        opens_at,
        message,
    }
}
