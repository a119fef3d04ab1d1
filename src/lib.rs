//! Tabular analytics engine behind a music-track statistics dashboard.
//!
//! A presentation layer uploads a CSV (or JSON/Parquet) of track metadata;
//! this crate turns it into the derived views the dashboard draws:
//!
//! ```text
//!  raw table (loader)
//!        │
//!        ▼
//!   schema normalizer ── canonical names, index artifact dropped
//!        │
//!        ▼
//!      Dataset ── immutable rows + cached column indices
//!        │
//!        ├── grouped means, histograms      (analyze::aggregate)
//!        ├── correlation matrix             (analyze::correlate)
//!        ├── top-K / extremes / full order  (analyze::rank)
//!        │
//!        ▼
//!      query façade ── one entry point per dashboard view
//! ```
//!
//! Everything past the loader is pure and synchronous: queries borrow the
//! dataset and return fresh result objects, so one dataset can serve
//! concurrent readers without locks. Missing *optional* columns never panic
//! or error; they come back as [`Availability::Unavailable`] with a reason
//! the dashboard can show as a warning.

pub mod analyze;
pub mod data;
pub mod error;
pub mod query;

pub use analyze::aggregate::{
    grouped_mean, histogram, GroupEntry, GroupedAggregate, Histogram, MeanAccumulator,
};
pub use analyze::correlate::{correlation_matrix, CorrelationMatrix};
pub use analyze::rank::{extremes, rank_all, top_k, Ranking};
pub use analyze::Availability;
pub use data::loader::load_file;
pub use data::model::{Dataset, RawColumn, RawTable, Row, Value, ValueKind};
pub use data::schema::{fields, SchemaMap};
pub use error::{Error, Result};
pub use query::{
    artist_tracks, popularity_factors, top_artists_by_genre, AlbumFilter, ArtistQuery,
    ArtistTracks, GenreQuery, PopularityFactors,
};
