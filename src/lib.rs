pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod extract;
pub mod geocode;
pub mod lexicon;
pub mod location;
pub mod model;
pub mod normalize;
pub mod proximity;
pub mod store;
pub mod suggest;
pub mod usage;

pub use config::EngineConfig;
pub use engine::{EngineError, SearchEngine, SetupError};
pub use model::{
    ListingIntent, Property, SearchOutcome, SearchQuery, SortOrder, StructuredFilters,
};
pub use store::{InMemoryPropertyStore, PropertyStore};
