//! Data layer: core types, ingestion, and schema normalization.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → RawTable (named, typed columns)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  schema   │  canonical names, drop index artifact → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset   │  Vec<Row>, column kinds, unique-value index
//!   └──────────┘
//! ```

pub mod loader;
pub mod model;
pub mod schema;
