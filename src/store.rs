//! Property listing backend.
//!
//! The engine never owns listing storage; it talks to a [`PropertyStore`]
//! supplied at construction. The in-memory implementation here backs the
//! test suite and small deployments, and doubles as the reference for what
//! each filter field is supposed to mean to a real backend.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Property, StructuredFilters};

#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Filtered fetch plus a case-insensitive substring match of `text`
    /// against title, address, and city.
    async fn search_properties(
        &self,
        text: &str,
        filters: &StructuredFilters,
    ) -> Result<Vec<Property>>;

    /// Filtered fetch with no free-text component.
    async fn get_properties(&self, filters: &StructuredFilters) -> Result<Vec<Property>>;
}

/// Listing store over a plain vector, filtered on demand.
#[derive(Debug, Default)]
pub struct InMemoryPropertyStore {
    properties: Vec<Property>,
}

impl InMemoryPropertyStore {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    fn filtered(&self, filters: &StructuredFilters) -> Vec<Property> {
        self.properties
            .iter()
            .filter(|p| matches_filters(p, filters))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PropertyStore for InMemoryPropertyStore {
    async fn search_properties(
        &self,
        text: &str,
        filters: &StructuredFilters,
    ) -> Result<Vec<Property>> {
        let needle = text.trim().to_lowercase();
        Ok(self
            .filtered(filters)
            .into_iter()
            .filter(|p| needle.is_empty() || text_matches(p, &needle))
            .collect())
    }

    async fn get_properties(&self, filters: &StructuredFilters) -> Result<Vec<Property>> {
        Ok(self.filtered(filters))
    }
}

fn text_matches(property: &Property, needle: &str) -> bool {
    property.title.to_lowercase().contains(needle)
        || property.address.to_lowercase().contains(needle)
        || property.city.to_lowercase().contains(needle)
}

/// Whether one listing satisfies every populated filter slot.
///
/// The location name is matched as a substring over address, city, and area;
/// transit and proximity are deliberately NOT applied here, because the
/// proximity matcher owns those and feeds this store a location-free filter
/// set when it runs.
pub fn matches_filters(property: &Property, filters: &StructuredFilters) -> bool {
    if property.intent != filters.intent {
        return false;
    }
    if !filters.kinds.is_empty() && !filters.kinds.contains(&property.kind) {
        return false;
    }
    if filters.min_price.is_some_and(|min| property.price < min) {
        return false;
    }
    if filters.max_price.is_some_and(|max| property.price > max) {
        return false;
    }
    if let Some(wanted) = filters.bedrooms
        && !property.bedrooms.is_some_and(|n| wanted.matches(n))
    {
        return false;
    }
    if let Some(wanted) = filters.bathrooms
        && !property.bathrooms.is_some_and(|n| wanted.matches(n))
    {
        return false;
    }
    if let Some(min_sqft) = filters.min_square_feet
        && !property.square_feet.is_some_and(|sqft| sqft >= min_sqft)
    {
        return false;
    }
    if filters.min_roi.is_some() || filters.max_roi.is_some() {
        let Some(roi) = property.roi else {
            return false;
        };
        if filters.min_roi.is_some_and(|min| roi < min) {
            return false;
        }
        if filters.max_roi.is_some_and(|max| roi > max) {
            return false;
        }
    }
    if let Some(condition) = filters.condition
        && property.condition != Some(condition)
    {
        return false;
    }
    if let Some(lot) = filters.lot_position
        && property.lot_position != Some(lot)
    {
        return false;
    }
    if !filters.amenities.is_empty() {
        let have: Vec<String> = property
            .amenities
            .iter()
            .map(|a| a.to_lowercase())
            .collect();
        if !filters
            .amenities
            .iter()
            .all(|want| have.iter().any(|a| a == &want.to_lowercase()))
        {
            return false;
        }
    }
    if let Some(location) = &filters.location {
        let name = location.name.to_lowercase();
        let in_address = property.address.to_lowercase().contains(&name);
        let in_city = property.city.to_lowercase().contains(&name);
        let in_area = property
            .area
            .as_ref()
            .is_some_and(|area| area.to_lowercase().contains(&name));
        if !(in_address || in_city || in_area) {
            return false;
        }
    }
    true
}
