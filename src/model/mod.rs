//! Domain model shared across the pipeline.
//!
//! - [`types`]: listing entities and the enums they carry.
//! - [`filters`]: the structured filter set a query parses into.

pub mod filters;
pub mod types;

pub use filters::{LocationRef, ProximityFilter, StructuredFilters, TransitFilter};
pub use types::{
    CountFilter, GeocodeResult, GeocodeSource, ListingIntent, LocationCandidate, LocationSource,
    LotPosition, PlaceKind, Property, PropertyCondition, PropertyKind, SearchOutcome, SearchQuery,
    SortOrder, TransportKind, TravelMode,
};
