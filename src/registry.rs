//! In-memory tournament registry.
//!
//! Owned exclusively by the scheduler task. A tournament that disappears
//! from the index is kept — its window simply never comes up again — so the
//! map never shrinks while the process lives.

use std::collections::HashMap;

use tracing::debug;
use turnier_scraper::Tournament;

#[derive(Default)]
pub struct TournamentRegistry {
    entries: HashMap<String, Tournament>,
}

impl TournamentRegistry {
    /// Folds one fetch into the registry. A fetched record wins over a
    /// stored entry only when its `changed` marker is strictly later; the
    /// returned ids keep the order they appeared in `fetched`.
    pub fn merge(&mut self, fetched: Vec<Tournament>) -> Vec<String> {
        let mut updated = Vec::new();
        for tournament in fetched {
            if tournament.id.is_empty() {
                debug!("refusing tournament record without id ({:?})", tournament.title);
                continue;
            }
            match self.entries.get(&tournament.id) {
                Some(stored) if tournament.changed <= stored.changed => {}
                _ => {
                    updated.push(tournament.id.clone());
                    self.entries.insert(tournament.id.clone(), tournament);
                }
            }
        }
        updated
    }

    pub fn get(&self, id: &str) -> Option<&Tournament> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Tournament> {
        self.entries.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tournament> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;
    use turnier_scraper::dates::TIMEZONE;

    fn changed_at(h: u32, m: u32) -> DateTime<Tz> {
        TIMEZONE.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn tournament(id: &str, changed: DateTime<Tz>) -> Tournament {
        Tournament {
            id: id.to_string(),
            title: format!("Turnier {id}"),
            link: format!("index.php?p=events&sp=view&id={id}"),
            location: String::new(),
            tournament_date: None,
            registration_start_date: None,
            series: Vec::new(),
            changed,
            phases: Vec::new(),
        }
    }

    #[test]
    fn fresh_insert_reports_the_id() {
        let mut registry = TournamentRegistry::default();
        let updated = registry.merge(vec![tournament("42", changed_at(10, 0))]);
        assert_eq!(updated, vec!["42".to_string()]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn identical_refresh_is_a_noop() {
        let mut registry = TournamentRegistry::default();
        registry.merge(vec![tournament("42", changed_at(10, 0))]);
        let updated = registry.merge(vec![tournament("42", changed_at(10, 0))]);
        assert!(updated.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn strictly_newer_changed_replaces() {
        let mut registry = TournamentRegistry::default();
        registry.merge(vec![tournament("42", changed_at(10, 0))]);
        let updated = registry.merge(vec![tournament("42", changed_at(11, 0))]);
        assert_eq!(updated, vec!["42".to_string()]);
        assert_eq!(registry.get("42").unwrap().changed, changed_at(11, 0));
    }

    #[test]
    fn older_fetch_never_rolls_changed_back() {
        let mut registry = TournamentRegistry::default();
        registry.merge(vec![tournament("42", changed_at(10, 0))]);
        let updated = registry.merge(vec![tournament("42", changed_at(9, 0))]);
        assert!(updated.is_empty());
        assert_eq!(registry.get("42").unwrap().changed, changed_at(10, 0));
    }

    #[test]
    fn updated_ids_keep_fetch_order() {
        let mut registry = TournamentRegistry::default();
        let updated = registry.merge(vec![
            tournament("7", changed_at(10, 0)),
            tournament("3", changed_at(10, 0)),
            tournament("12", changed_at(10, 0)),
        ]);
        assert_eq!(updated, vec!["7".to_string(), "3".to_string(), "12".to_string()]);
    }

    #[test]
    fn records_without_id_are_refused() {
        let mut registry = TournamentRegistry::default();
        let updated = registry.merge(vec![tournament("", changed_at(10, 0))]);
        assert!(updated.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_never_shrinks_when_a_tournament_vanishes() {
        let mut registry = TournamentRegistry::default();
        registry.merge(vec![
            tournament("42", changed_at(10, 0)),
            tournament("43", changed_at(10, 0)),
        ]);
        // Next index fetch no longer lists 43.
        registry.merge(vec![tournament("42", changed_at(11, 0))]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("43").is_some());
    }
}
