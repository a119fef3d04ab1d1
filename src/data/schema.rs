use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::data::model::{Dataset, RawTable, Row, Value, ValueKind};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Canonical field names
// ---------------------------------------------------------------------------

/// Canonical machine names for the known track-table fields. All queries and
/// façade parameters speak these names, whatever convention the upload used.
pub mod fields {
    pub const TRACK_ID: &str = "track_id";
    pub const ARTISTS: &str = "artists";
    pub const ALBUM_NAME: &str = "album_name";
    pub const TRACK_NAME: &str = "track_name";
    pub const POPULARITY: &str = "popularity";
    pub const DURATION_MS: &str = "duration_ms";
    pub const EXPLICIT: &str = "explicit";
    pub const DANCEABILITY: &str = "danceability";
    pub const ENERGY: &str = "energy";
    pub const KEY: &str = "key";
    pub const LOUDNESS: &str = "loudness";
    pub const MODE: &str = "mode";
    pub const SPEECHINESS: &str = "speechiness";
    pub const ACOUSTICNESS: &str = "acousticness";
    pub const INSTRUMENTALNESS: &str = "instrumentalness";
    pub const LIVENESS: &str = "liveness";
    pub const VALENCE: &str = "valence";
    pub const TEMPO: &str = "tempo";
    pub const TIME_SIGNATURE: &str = "time_signature";
    pub const TRACK_GENRE: &str = "track_genre";
}

/// Canonical machine name ↔ human-readable display label, one entry per
/// known field. Uploads may name their columns with either set.
const FIELD_LABELS: &[(&str, &str)] = &[
    (fields::TRACK_ID, "ID de la piste"),
    (fields::ARTISTS, "Artistes"),
    (fields::ALBUM_NAME, "Nom de l'album"),
    (fields::TRACK_NAME, "Nom de la piste"),
    (fields::POPULARITY, "Popularité"),
    (fields::DURATION_MS, "Durée (ms)"),
    (fields::EXPLICIT, "Explicite"),
    (fields::DANCEABILITY, "Danseabilité"),
    (fields::ENERGY, "Énergie"),
    (fields::KEY, "Clé"),
    (fields::LOUDNESS, "Sonie"),
    (fields::MODE, "Mode"),
    (fields::SPEECHINESS, "Parlabilité"),
    (fields::ACOUSTICNESS, "Acoustique"),
    (fields::INSTRUMENTALNESS, "Instrumentalité"),
    (fields::LIVENESS, "Vivacité"),
    (fields::VALENCE, "Valence"),
    (fields::TEMPO, "Tempo"),
    (fields::TIME_SIGNATURE, "Signature temporelle"),
    (fields::TRACK_GENRE, "Genre musical"),
];

/// Leftover positional index column a pandas-style CSV dump may carry.
/// It has no domain meaning and is dropped on sight.
const INDEX_ARTIFACT: &str = "Unnamed: 0";

// ---------------------------------------------------------------------------
// SchemaMap – bidirectional name lookup + normalization
// ---------------------------------------------------------------------------

/// Bidirectional column-name lookup built once from [`FIELD_LABELS`].
///
/// `to_canonical` accepts both naming conventions (machine names map to
/// themselves); `to_display` gives the presentation layer a label for each
/// canonical name.
#[derive(Debug, Clone)]
pub struct SchemaMap {
    to_canonical: BTreeMap<String, String>,
    to_display: BTreeMap<String, String>,
}

impl Default for SchemaMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaMap {
    pub fn new() -> Self {
        let mut to_canonical = BTreeMap::new();
        let mut to_display = BTreeMap::new();
        for (canonical, display) in FIELD_LABELS {
            to_canonical.insert(canonical.to_string(), canonical.to_string());
            to_canonical.insert(display.to_string(), canonical.to_string());
            to_display.insert(canonical.to_string(), display.to_string());
        }
        SchemaMap {
            to_canonical,
            to_display,
        }
    }

    /// Canonical name for a raw column header, if the header is recognized
    /// under either convention.
    pub fn canonical_of(&self, raw: &str) -> Option<&str> {
        self.to_canonical.get(raw).map(String::as_str)
    }

    /// Display label for a canonical field name.
    pub fn display_of(&self, canonical: &str) -> Option<&str> {
        self.to_display.get(canonical).map(String::as_str)
    }

    /// Map a raw ingested table onto the canonical schema.
    ///
    /// * Rejects empty tables (no rows or no columns).
    /// * Drops the index-artifact column.
    /// * Renames recognized headers to canonical names; unrecognized columns
    ///   pass through unchanged so unexpected extras survive.
    ///
    /// Missing *analytic* columns are not an error here; each query answers
    /// with an unavailable result when a column it needs is absent.
    pub fn normalize(&self, table: RawTable) -> Result<Dataset> {
        if table.n_columns() == 0 {
            return Err(Error::Schema("table has no columns".into()));
        }
        if table.n_rows() == 0 {
            return Err(Error::Schema("table has no rows".into()));
        }

        let n_rows = table.n_rows();
        let mut column_names: Vec<String> = Vec::new();
        let mut kinds: BTreeMap<String, ValueKind> = BTreeMap::new();
        let mut kept: Vec<(String, Vec<Value>)> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for column in table.columns {
            if column.name == INDEX_ARTIFACT {
                debug!("dropping index artifact column '{}'", column.name);
                continue;
            }
            let name = match self.canonical_of(&column.name) {
                Some(canonical) => canonical.to_string(),
                None => {
                    debug!("passing through unrecognized column '{}'", column.name);
                    column.name.clone()
                }
            };
            if !seen.insert(name.clone()) {
                warn!("duplicate column '{name}' after renaming; keeping the first");
                continue;
            }
            column_names.push(name.clone());
            kinds.insert(name.clone(), column.kind);
            kept.push((name, column.values));
        }

        if column_names.is_empty() {
            return Err(Error::Schema("table has no columns".into()));
        }

        let rows: Vec<Row> = (0..n_rows)
            .map(|r| {
                kept.iter()
                    .map(|(name, values)| (name.clone(), values[r].clone()))
                    .collect()
            })
            .collect();

        debug!(
            "normalized table: {} rows, {} columns ({} numeric)",
            rows.len(),
            column_names.len(),
            kinds.values().filter(|k| **k == ValueKind::Numeric).count()
        );
        Ok(Dataset::new(column_names, kinds, rows))
    }
}
