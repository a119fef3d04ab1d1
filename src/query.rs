//! Query façade: one stateless entry point per dashboard page.
//!
//! Every function takes the normalized [`Dataset`] plus an explicit
//! parameter struct and returns fresh result objects; there is no
//! process-wide state. Optional analytic columns degrade each affected view
//! to [`Availability::Unavailable`] with a human-facing reason, never to a
//! crash.

use std::num::NonZeroUsize;

use serde::Serialize;

use crate::analyze::aggregate::{grouped_mean, histogram, GroupedAggregate, Histogram};
use crate::analyze::correlate::{correlation_matrix, CorrelationMatrix};
use crate::analyze::rank::{extremes, rank_all, top_k, Ranking};
use crate::analyze::Availability;
use crate::data::model::{Dataset, Row, Value};
use crate::data::schema::fields;
use crate::error::Result;

/// Artists shown per genre when the caller does not choose a limit.
const DEFAULT_ARTIST_LIMIT: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("limit is nonzero"),
};

/// Bin count of the popularity distribution.
const POPULARITY_BINS: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(n) => n,
    None => panic!("bin count is nonzero"),
};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Parameters for the artists-by-genre view.
#[derive(Debug, Clone)]
pub struct GenreQuery {
    pub genre: String,
    pub limit: NonZeroUsize,
}

impl GenreQuery {
    pub fn new(genre: impl Into<String>) -> Self {
        GenreQuery {
            genre: genre.into(),
            limit: DEFAULT_ARTIST_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: NonZeroUsize) -> Self {
        self.limit = limit;
        self
    }
}

/// Optional album restriction for the per-artist view. `All` is the explicit
/// no-op the album selector's "all albums" entry maps to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum AlbumFilter {
    #[default]
    All,
    Album(String),
}

/// Parameters for the per-artist view. The artist string is one atomic
/// label: a cell naming several co-artists is matched whole, never split.
#[derive(Debug, Clone)]
pub struct ArtistQuery {
    pub artist: String,
    pub album: AlbumFilter,
}

impl ArtistQuery {
    pub fn new(artist: impl Into<String>) -> Self {
        ArtistQuery {
            artist: artist.into(),
            album: AlbumFilter::All,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = AlbumFilter::Album(album.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Everything the popularity-factors view displays. Each panel degrades
/// independently, so a table without genres still gets its histogram and
/// correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularityFactors {
    pub genre_popularity: Availability<GroupedAggregate>,
    pub popularity_distribution: Availability<Histogram>,
    pub correlations: Availability<CorrelationMatrix>,
}

/// Everything the per-artist view displays: the extreme tracks and the full
/// popularity ranking of the selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistTracks {
    pub artist: String,
    pub album: AlbumFilter,
    pub least_popular: Row,
    pub most_popular: Row,
    pub ranked: Vec<(Row, f64)>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// The popularity-factors view: mean popularity per genre, the popularity
/// distribution, and correlations between all numeric audio features.
pub fn popularity_factors(ds: &Dataset) -> PopularityFactors {
    PopularityFactors {
        genre_popularity: soften(grouped_mean(ds, fields::TRACK_GENRE, fields::POPULARITY)),
        popularity_distribution: soften(histogram(ds, fields::POPULARITY, POPULARITY_BINS)),
        correlations: correlation_matrix(ds),
    }
}

/// The artists-by-genre view: the most popular artists (by mean track
/// popularity) within the chosen genre.
pub fn top_artists_by_genre(ds: &Dataset, query: &GenreQuery) -> Availability<Ranking> {
    soften(top_k(
        ds,
        fields::TRACK_GENRE,
        &Value::String(query.genre.clone()),
        fields::ARTISTS,
        fields::POPULARITY,
        query.limit,
    ))
}

/// The per-artist view: least and most popular track plus the full ranking,
/// optionally restricted to one album.
pub fn artist_tracks(ds: &Dataset, query: &ArtistQuery) -> Availability<ArtistTracks> {
    for field in [
        fields::ARTISTS,
        fields::TRACK_NAME,
        fields::POPULARITY,
        fields::ALBUM_NAME,
    ] {
        if !ds.has_column(field) {
            return Availability::unavailable(format!(
                "column '{field}' is missing from the uploaded table"
            ));
        }
    }

    let artist = Value::String(query.artist.clone());
    let selected = match ds.filter_equals(fields::ARTISTS, &artist) {
        Ok(selected) => selected,
        Err(e) => return Availability::unavailable(e.to_string()),
    };
    let selected = match &query.album {
        AlbumFilter::All => selected,
        AlbumFilter::Album(name) => {
            let album = Value::String(name.clone());
            match selected.filter_equals(fields::ALBUM_NAME, &album) {
                Ok(selected) => selected,
                Err(e) => return Availability::unavailable(e.to_string()),
            }
        }
    };

    if selected.is_empty() {
        return Availability::unavailable("no tracks found for this artist and album");
    }

    let (least_popular, most_popular) = match extremes(&selected, fields::POPULARITY) {
        Ok(pair) => pair,
        Err(e) => return Availability::unavailable(e.to_string()),
    };
    let ranked = match rank_all(&selected, fields::TRACK_NAME, fields::POPULARITY) {
        Ok(ranked) => ranked,
        Err(e) => return Availability::unavailable(e.to_string()),
    };

    Availability::Available(ArtistTracks {
        artist: query.artist.clone(),
        album: query.album.clone(),
        least_popular,
        most_popular,
        ranked,
    })
}

/// Collapse hard field errors into the sentinel: at the façade the analytic
/// columns all come from the upload, so a missing or mistyped one is a
/// display-level warning, not a caller bug.
fn soften<T>(result: Result<Availability<T>>) -> Availability<T> {
    match result {
        Ok(availability) => availability,
        Err(e) => Availability::unavailable(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ValueKind;
    use std::collections::BTreeMap;

    fn track(genre: &str, artist: &str, album: &str, name: &str, pop: i64) -> Row {
        [
            ("track_genre".to_string(), Value::String(genre.to_string())),
            ("artists".to_string(), Value::String(artist.to_string())),
            ("album_name".to_string(), Value::String(album.to_string())),
            ("track_name".to_string(), Value::String(name.to_string())),
            ("popularity".to_string(), Value::Integer(pop)),
        ]
        .into_iter()
        .collect()
    }

    fn library() -> Dataset {
        let columns = vec![
            "track_genre".to_string(),
            "artists".to_string(),
            "album_name".to_string(),
            "track_name".to_string(),
            "popularity".to_string(),
        ];
        let kinds: BTreeMap<String, ValueKind> = columns
            .iter()
            .map(|c| {
                let kind = if c == "popularity" {
                    ValueKind::Numeric
                } else {
                    ValueKind::Text
                };
                (c.clone(), kind)
            })
            .collect();
        let rows = vec![
            track("pop", "A", "album1", "t1", 50),
            track("pop", "B", "album1", "t2", 70),
            track("rock", "C", "album2", "t3", 90),
            track("pop", "A", "album2", "t4", 30),
        ];
        Dataset::new(columns, kinds, rows)
    }

    #[test]
    fn popularity_factors_fills_every_panel() {
        let ds = library();
        let factors = popularity_factors(&ds);
        assert!(factors.genre_popularity.is_available());
        assert!(factors.popularity_distribution.is_available());
        assert!(factors.correlations.is_available());

        let genres = factors.genre_popularity.available().unwrap();
        assert_eq!(genres.entries[0].key, Value::String("rock".into()));
    }

    #[test]
    fn panels_degrade_independently() {
        let ds = library();
        let without_genre = ds
            .project(&["artists", "album_name", "track_name", "popularity"])
            .unwrap();
        let factors = popularity_factors(&without_genre);
        assert!(!factors.genre_popularity.is_available());
        assert!(factors.popularity_distribution.is_available());
        assert!(factors.correlations.is_available());
    }

    #[test]
    fn top_artists_defaults_to_ten() {
        let ds = library();
        let query = GenreQuery::new("pop");
        assert_eq!(query.limit.get(), 10);

        let ranking = top_artists_by_genre(&ds, &query).available().unwrap();
        let got: Vec<(String, f64)> = ranking
            .entries
            .iter()
            .map(|e| (e.key.to_string(), e.mean))
            .collect();
        assert_eq!(got, vec![("B".to_string(), 70.0), ("A".to_string(), 40.0)]);
    }

    #[test]
    fn all_albums_filter_is_a_no_op() {
        let ds = library();
        let unfiltered = artist_tracks(&ds, &ArtistQuery::new("A"))
            .available()
            .unwrap();
        assert_eq!(unfiltered.ranked.len(), 2);
        assert_eq!(
            unfiltered.most_popular["track_name"],
            Value::String("t1".into())
        );
        assert_eq!(
            unfiltered.least_popular["track_name"],
            Value::String("t4".into())
        );

        let filtered = artist_tracks(&ds, &ArtistQuery::new("A").with_album("album2"))
            .available()
            .unwrap();
        assert_eq!(filtered.ranked.len(), 1);
        assert_eq!(
            filtered.most_popular["track_name"],
            Value::String("t4".into())
        );
    }

    #[test]
    fn empty_selection_is_a_warning_not_an_error() {
        let ds = library();
        let missing_artist = artist_tracks(&ds, &ArtistQuery::new("Z"));
        assert!(!missing_artist.is_available());

        let missing_album = artist_tracks(&ds, &ArtistQuery::new("A").with_album("nope"));
        assert!(!missing_album.is_available());
    }

    #[test]
    fn missing_required_column_is_reported_with_its_name() {
        let ds = library();
        let no_albums = ds
            .project(&["track_genre", "artists", "track_name", "popularity"])
            .unwrap();
        match artist_tracks(&no_albums, &ArtistQuery::new("A")) {
            Availability::Unavailable { reason } => assert!(reason.contains("album_name")),
            Availability::Available(_) => panic!("expected unavailable"),
        }
    }

    #[test]
    fn co_artist_labels_stay_atomic() {
        let columns = vec![
            "track_genre".to_string(),
            "artists".to_string(),
            "album_name".to_string(),
            "track_name".to_string(),
            "popularity".to_string(),
        ];
        let kinds: BTreeMap<String, ValueKind> = columns
            .iter()
            .map(|c| {
                let kind = if c == "popularity" {
                    ValueKind::Numeric
                } else {
                    ValueKind::Text
                };
                (c.clone(), kind)
            })
            .collect();
        let rows = vec![
            track("pop", "A;B", "album1", "duet", 80),
            track("pop", "A", "album1", "solo", 60),
        ];
        let ds = Dataset::new(columns, kinds, rows);

        // "A" does not match the combined label.
        let solo = artist_tracks(&ds, &ArtistQuery::new("A")).available().unwrap();
        assert_eq!(solo.ranked.len(), 1);

        let duet = artist_tracks(&ds, &ArtistQuery::new("A;B")).available().unwrap();
        assert_eq!(duet.ranked.len(), 1);
        assert_eq!(duet.most_popular["track_name"], Value::String("duet".into()));
    }
}
