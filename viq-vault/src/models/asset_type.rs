//! Asset type catalog
//!
//! Fixed set of six asset categories a vault can represent.

use serde::Serialize;

/// Asset category offered on the details stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetType {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// All supported asset types, in display order
pub const ASSET_TYPES: [AssetType; 6] = [
    AssetType {
        id: "real-estate",
        name: "Real Estate",
        icon: "🏠",
        description: "Properties, land, buildings",
    },
    AssetType {
        id: "vehicle",
        name: "Vehicle",
        icon: "🚗",
        description: "Cars, motorcycles, boats",
    },
    AssetType {
        id: "art",
        name: "Art & Collectibles",
        icon: "🎨",
        description: "Artwork, antiques, collectibles",
    },
    AssetType {
        id: "precious-metals",
        name: "Precious Metals",
        icon: "💎",
        description: "Gold, silver, jewelry",
    },
    AssetType {
        id: "equipment",
        name: "Equipment",
        icon: "⚙️",
        description: "Industrial, medical equipment",
    },
    AssetType {
        id: "other",
        name: "Other",
        icon: "📦",
        description: "Other valuable assets",
    },
];

pub fn asset_type_by_id(id: &str) -> Option<&'static AssetType> {
    ASSET_TYPES.iter().find(|t| t.id == id)
}

pub fn is_known_asset_type(id: &str) -> bool {
    asset_type_by_id(id).is_some()
}

/// Display name for an id, "Unknown" when not in the catalog
pub fn asset_type_name(id: &str) -> &'static str {
    asset_type_by_id(id).map(|t| t.name).unwrap_or("Unknown")
}
