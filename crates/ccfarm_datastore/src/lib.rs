//! # DataStore Module
//!
//! Persistence for the comedy content pipeline: the url keyed article score
//! cache (with time-to-live eviction), article briefs and generated scripts.
//!
//! Two backends are provided: [`PgDataStore`] on top of sqlx/Postgres with
//! embedded migrations, and [`MemoryDataStore`] for local runs and tests.

mod datastore;
mod domain;

pub use datastore::memory::MemoryDataStore;
pub use datastore::postgres::PgDataStore;
pub use datastore::{
    BriefStore, DataStore, ScoreStore, ScriptStore, DEFAULT_CACHE_DAYS,
    MAX_CACHE_DAYS,
};
pub use domain::{ArticleScore, Brief, CachedScore, NewScript, Script, ScoreError, MAX_SCORE};
