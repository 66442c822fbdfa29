// Wire models for the asset REST endpoints.
//
// Field names follow the backend's snake_case JSON. Optional fields are
// optional on the wire too; the backend omits rather than nulls them.

use serde::{Deserialize, Serialize};

/// Position of an asset in the library hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    File,
    Dir,
    Bundle,
    Bundled,
}

/// A tag attached to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub value: String,
}

/// A library asset: a file, a directory, or a bundle of files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub fs_kind: String,
    #[serde(default)]
    pub fs_name: String,
    #[serde(default)]
    pub extension: Option<String>,
    /// Semantic asset kind: `"model"`, `"image"`, `"slice"`, `"source"`, ...
    #[serde(default)]
    pub kind: Option<String>,
    pub node_kind: NodeKind,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One page of an asset listing.
///
/// Pages are 0-based. `total_pages` is only trustworthy on page 0; callers
/// that drain a listing read it from the first page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetPage {
    /// Some listings name this field `items`.
    #[serde(default, alias = "items")]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}
