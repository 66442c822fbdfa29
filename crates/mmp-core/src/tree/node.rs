// Tree node metadata derived from assets.

use serde::Serialize;

use mmp_api::{Asset, NodeKind};

/// Synthetic id of the top of the tree.
pub const ROOT_ID: &str = "__assets_root__";
pub const ROOT_NAME: &str = "Assets";

/// Display metadata for one node of the asset tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub is_folder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<NodeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl TreeNode {
    pub fn root() -> Self {
        Self {
            name: ROOT_NAME.to_owned(),
            is_folder: true,
            asset_id: None,
            kind: None,
            node_kind: Some(NodeKind::Root),
            extension: None,
        }
    }

    /// Stand-in for a node whose metadata has not been loaded.
    pub fn placeholder(id: &str) -> Self {
        Self {
            name: id.to_owned(),
            is_folder: true,
            asset_id: Some(id.to_owned()),
            kind: None,
            node_kind: None,
            extension: None,
        }
    }

    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            name: asset_label(asset),
            is_folder: asset.node_kind != NodeKind::File,
            asset_id: Some(asset.id.clone()),
            kind: asset.kind.clone(),
            node_kind: Some(asset.node_kind),
            extension: asset.extension.clone(),
        }
    }

    pub fn icon(&self, expanded: bool) -> NodeIcon {
        NodeIcon::classify(self, expanded)
    }
}

/// Display name: label, else the last path segment, else the id.
///
/// Files get their extension appended unless the name already ends with it
/// (case-insensitive).
pub fn asset_label(asset: &Asset) -> String {
    let base = asset
        .label
        .as_deref()
        .filter(|l| !l.is_empty())
        .or_else(|| {
            asset
                .path
                .as_deref()
                .and_then(|p| p.split('/').filter(|s| !s.is_empty()).next_back())
        })
        .unwrap_or(&asset.id);

    if asset.node_kind != NodeKind::File {
        return base.to_owned();
    }
    let Some(ext) = asset.extension.as_deref().filter(|e| !e.is_empty()) else {
        return base.to_owned();
    };

    let ext = if ext.starts_with('.') {
        ext.to_owned()
    } else {
        format!(".{ext}")
    };
    if base.to_lowercase().ends_with(&ext.to_lowercase()) {
        base.to_owned()
    } else {
        format!("{base}{ext}")
    }
}

/// Icon a tree row shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NodeIcon {
    Bundle,
    FolderOpen,
    Folder,
    Image,
    Model,
    Code,
    File,
}

impl NodeIcon {
    pub fn classify(node: &TreeNode, expanded: bool) -> Self {
        if node.node_kind == Some(NodeKind::Bundle) {
            return Self::Bundle;
        }
        if node.is_folder {
            return if expanded { Self::FolderOpen } else { Self::Folder };
        }
        match node.kind.as_deref() {
            Some("image") => Self::Image,
            Some("model") => Self::Model,
            Some("slice" | "source") => Self::Code,
            _ => Self::File,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(v: serde_json::Value) -> Asset {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn label_prefers_label_then_path_then_id() {
        let a = asset(json!({ "id": "a1", "label": "Benchy", "node_kind": "dir" }));
        assert_eq!(asset_label(&a), "Benchy");

        let a = asset(json!({ "id": "a1", "path": "lib/boats/hulls/", "node_kind": "dir" }));
        assert_eq!(asset_label(&a), "hulls");

        let a = asset(json!({ "id": "a1", "label": "", "path": "", "node_kind": "dir" }));
        assert_eq!(asset_label(&a), "a1");
    }

    #[test]
    fn file_label_gets_extension() {
        let a = asset(json!({ "id": "f", "label": "benchy", "extension": "stl", "node_kind": "file" }));
        assert_eq!(asset_label(&a), "benchy.stl");

        let a = asset(json!({ "id": "f", "label": "benchy", "extension": ".3mf", "node_kind": "file" }));
        assert_eq!(asset_label(&a), "benchy.3mf");
    }

    #[test]
    fn extension_not_doubled_case_insensitively() {
        let a = asset(json!({ "id": "f", "label": "Benchy.STL", "extension": "stl", "node_kind": "file" }));
        assert_eq!(asset_label(&a), "Benchy.STL");
    }

    #[test]
    fn folders_never_get_extension() {
        let a = asset(json!({ "id": "b", "label": "kit", "extension": "zip", "node_kind": "bundle" }));
        assert_eq!(asset_label(&a), "kit");
        assert!(TreeNode::from_asset(&a).is_folder);
    }

    #[test]
    fn icon_classification() {
        let bundle = TreeNode::from_asset(&asset(json!({ "id": "b", "node_kind": "bundle" })));
        assert_eq!(bundle.icon(true), NodeIcon::Bundle);

        let dir = TreeNode::from_asset(&asset(json!({ "id": "d", "node_kind": "dir" })));
        assert_eq!(dir.icon(false), NodeIcon::Folder);
        assert_eq!(dir.icon(true), NodeIcon::FolderOpen);

        let file = |kind: &str| {
            TreeNode::from_asset(&asset(json!({ "id": "f", "kind": kind, "node_kind": "file" })))
                .icon(false)
        };
        assert_eq!(file("image"), NodeIcon::Image);
        assert_eq!(file("model"), NodeIcon::Model);
        assert_eq!(file("slice"), NodeIcon::Code);
        assert_eq!(file("source"), NodeIcon::Code);
        assert_eq!(file("other"), NodeIcon::File);
    }

    #[test]
    fn placeholder_is_folder_named_by_id() {
        let node = TreeNode::placeholder("x9");
        assert_eq!(node.name, "x9");
        assert!(node.is_folder);
        assert_eq!(node.asset_id.as_deref(), Some("x9"));
    }
}
