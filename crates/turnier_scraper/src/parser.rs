//! HTML extraction for the tournament index and detail pages.
//!
//! Both tables are parsed positionally: the header row decides which field
//! each column feeds, so the site reordering its columns degrades to
//! "column ignored" instead of breaking the batch.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::dates;
use crate::{Phase, Tournament};

/// Index columns recognised by their German header label. Anything else is
/// treated as padding.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Location,
    TournamentDate,
    RegistrationStartDate,
    Changed,
    Series,
}

impl Field {
    fn from_header(label: &str) -> Option<Self> {
        match label {
            "Turnier" => Some(Self::Title),
            "Austragungsort" => Some(Self::Location),
            "Erster Turniertag" => Some(Self::TournamentDate),
            "Anmeldung öffnet" => Some(Self::RegistrationStartDate),
            "Letzte Änderung" => Some(Self::Changed),
            "Serie/n" => Some(Self::Series),
            _ => None,
        }
    }
}

/// Extracts all tournament summary rows from the index page. A page without
/// the `#list_tournaments` table yields an empty batch; a bad row is
/// skipped, never the whole batch.
pub fn parse_index(html: &str) -> Vec<Tournament> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("#list_tournaments").unwrap();
    let header_selector = Selector::parse("thead tr th").unwrap();
    let row_selector = Selector::parse("tbody tr").unwrap();

    let Some(table) = document.select(&table_selector).next() else {
        warn!("index page has no #list_tournaments table");
        return Vec::new();
    };

    let columns: Vec<Option<Field>> = table
        .select(&header_selector)
        .map(|th| Field::from_header(&cell_text(&th)))
        .collect();

    let mut result = Vec::new();
    for row in table.select(&row_selector) {
        match parse_row(&row, &columns) {
            Some(tournament) => result.push(tournament),
            None => debug!("skipping index row without tournament id"),
        }
    }
    result
}

fn parse_row(row: &ElementRef, columns: &[Option<Field>]) -> Option<Tournament> {
    let cell_selector = Selector::parse("td").unwrap();
    let anchor_selector = Selector::parse("a").unwrap();
    let span_selector = Selector::parse("span").unwrap();

    let mut t = Tournament {
        id: String::new(),
        title: String::new(),
        link: String::new(),
        location: String::new(),
        tournament_date: None,
        registration_start_date: None,
        series: Vec::new(),
        changed: dates::epoch(),
        phases: Vec::new(),
    };

    for (cell, field) in row.select(&cell_selector).zip(columns.iter()) {
        match field {
            Some(Field::Title) => {
                if let Some(anchor) = cell.select(&anchor_selector).next() {
                    t.title = cell_text(&anchor);
                    t.link = anchor.value().attr("href").unwrap_or_default().to_string();
                    t.id = id_from_link(&t.link).unwrap_or_default();
                }
            }
            Some(Field::Location) => t.location = cell_text(&cell),
            Some(Field::TournamentDate) => {
                t.tournament_date = dates::parse_date(&cell_text(&cell));
            }
            Some(Field::RegistrationStartDate) => {
                t.registration_start_date = dates::parse_date_time(&cell_text(&cell));
            }
            Some(Field::Changed) => {
                t.changed = dates::parse_date_time(&cell_text(&cell)).unwrap_or_else(dates::epoch);
            }
            Some(Field::Series) => {
                t.series = cell
                    .select(&span_selector)
                    .map(|span| cell_text(&span))
                    .filter(|tag| !tag.is_empty() && tag != "Info")
                    .take(4)
                    .collect();
            }
            None => {}
        }
    }

    if t.id.is_empty() {
        return None;
    }
    Some(t)
}

/// Extracts the registration phase rows from a detail page. Column mapping
/// works like the index table: `Phase` and `Anmeldung öffnet` feed the phase
/// fields, every other labelled column lands in `requirements`.
pub fn parse_phases(html: &str) -> Vec<Phase> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("#list_phases").unwrap();
    let header_selector = Selector::parse("thead tr th").unwrap();
    let row_selector = Selector::parse("tbody tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let Some(table) = document.select(&table_selector).next() else {
        debug!("detail page has no #list_phases table");
        return Vec::new();
    };

    let headers: Vec<String> = table
        .select(&header_selector)
        .map(|th| cell_text(&th))
        .collect();

    let mut result = Vec::new();
    for row in table.select(&row_selector) {
        let mut phase = Phase::default();
        for (cell, header) in row.select(&cell_selector).zip(headers.iter()) {
            let value = cell_text(&cell);
            match header.as_str() {
                "Phase" => phase.title = value,
                "Anmeldung öffnet" => {
                    phase.registration_start_date = dates::parse_date_time(&value);
                }
                "" => {}
                _ => {
                    if !value.is_empty() {
                        phase.requirements.insert(header.clone(), value);
                    }
                }
            }
        }
        result.push(phase);
    }
    result
}

fn cell_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// The `id` query parameter of a detail link, e.g.
/// `index.php?p=events&sp=view&id=2124` → `2124`.
fn id_from_link(link: &str) -> Option<String> {
    let (_, query) = link.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("id="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
