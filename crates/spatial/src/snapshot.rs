use std::fmt;

use serde::{Deserialize, Serialize};

use foundation::bounds::GeoBounds;
use foundation::geo::GeoPoint;

use crate::feature::{FeatureKind, PointFeature};
use crate::rtree::{Entries, Node, PointRTree};

pub const SNAPSHOT_VERSION: &str = "1.0";

/// Serialized form of a [`PointRTree`], one file per collection.
///
/// The node layout mirrors the export format of the JavaScript rbush
/// library: nested nodes with `minX/minY/maxX/maxY`, a `height` counted
/// from 1 at the leaves, and a `leaf` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: String,
    pub name: String,
    pub feature_count: usize,
    /// blake3 hex digest of the canonical tree payload.
    pub content_hash: String,
    pub root: Option<SnapshotNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(rename = "minX")]
    pub min_x: f64,
    #[serde(rename = "minY")]
    pub min_y: f64,
    #[serde(rename = "maxX")]
    pub max_x: f64,
    #[serde(rename = "maxY")]
    pub max_y: f64,
    pub height: u32,
    pub leaf: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SnapshotNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SnapshotItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    UnsupportedVersion { found: String },
    HashMismatch,
    Corrupt(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::UnsupportedVersion { found } => {
                write!(f, "unsupported snapshot version {found:?} (expected {SNAPSHOT_VERSION:?})")
            }
            SnapshotError::HashMismatch => write!(f, "snapshot content hash mismatch"),
            SnapshotError::Corrupt(msg) => write!(f, "snapshot corrupt: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl IndexSnapshot {
    /// Export a built tree under a collection name.
    pub fn from_tree(tree: &PointRTree, name: impl Into<String>) -> IndexSnapshot {
        let root = tree.root.map(|idx| export_node(tree, idx));
        let content_hash = hash_root(root.as_ref());
        IndexSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            name: name.into(),
            feature_count: tree.len(),
            content_hash,
            root,
        }
    }
}

impl PointRTree {
    /// Rebuild a tree from a snapshot.
    ///
    /// The structure is validated and the content hash re-derived before
    /// anything is served; a corrupted snapshot never becomes an index.
    pub fn from_snapshot(snapshot: &IndexSnapshot) -> Result<PointRTree, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version.clone(),
            });
        }

        if let Some(root) = &snapshot.root {
            validate_node(root, None)?;
        }

        let item_count = snapshot.root.as_ref().map_or(0, count_items);
        if item_count != snapshot.feature_count {
            return Err(SnapshotError::Corrupt(format!(
                "feature_count is {} but the leaves hold {} items",
                snapshot.feature_count, item_count
            )));
        }

        if hash_root(snapshot.root.as_ref()) != snapshot.content_hash {
            return Err(SnapshotError::HashMismatch);
        }

        let mut tree = PointRTree {
            features: Vec::with_capacity(item_count),
            nodes: Vec::new(),
            root: None,
        };
        tree.root = snapshot
            .root
            .as_ref()
            .map(|root| import_node(&mut tree, root))
            .transpose()?;
        Ok(tree)
    }
}

fn export_node(tree: &PointRTree, idx: usize) -> SnapshotNode {
    let node = &tree.nodes[idx];
    let b = node.bounds;
    match &node.entries {
        Entries::Leaf { start, end } => SnapshotNode {
            min_x: b.min_lon,
            min_y: b.min_lat,
            max_x: b.max_lon,
            max_y: b.max_lat,
            height: 1,
            leaf: true,
            children: None,
            items: Some(
                tree.features[*start..*end]
                    .iter()
                    .map(|f| SnapshotItem {
                        id: f.id.clone(),
                        name: f.name.clone(),
                        kind: f.kind.as_str().to_string(),
                        lon: f.position.lon_deg,
                        lat: f.position.lat_deg,
                    })
                    .collect(),
            ),
        },
        Entries::Inner { children } => {
            let exported: Vec<SnapshotNode> =
                children.iter().map(|&c| export_node(tree, c)).collect();
            let height = exported.iter().map(|c| c.height).max().unwrap_or(0) + 1;
            SnapshotNode {
                min_x: b.min_lon,
                min_y: b.min_lat,
                max_x: b.max_lon,
                max_y: b.max_lat,
                height,
                leaf: false,
                children: Some(exported),
                items: None,
            }
        }
    }
}

fn import_node(tree: &mut PointRTree, node: &SnapshotNode) -> Result<usize, SnapshotError> {
    let bounds = GeoBounds::new(node.min_x, node.min_y, node.max_x, node.max_y);
    let entries = if node.leaf {
        let items = node.items.as_deref().unwrap_or(&[]);
        let start = tree.features.len();
        for item in items {
            let Some(kind) = FeatureKind::parse(&item.kind) else {
                return Err(SnapshotError::Corrupt(format!(
                    "unknown feature kind {:?}",
                    item.kind
                )));
            };
            tree.features.push(PointFeature::new(
                item.id.clone(),
                item.name.clone(),
                kind,
                GeoPoint::new(item.lon, item.lat),
            ));
        }
        Entries::Leaf {
            start,
            end: tree.features.len(),
        }
    } else {
        let children = node.children.as_deref().unwrap_or(&[]);
        let mut indices = Vec::with_capacity(children.len());
        for child in children {
            indices.push(import_node(tree, child)?);
        }
        Entries::Inner { children: indices }
    };

    let idx = tree.nodes.len();
    tree.nodes.push(Node { bounds, entries });
    Ok(idx)
}

fn validate_node(node: &SnapshotNode, parent: Option<&SnapshotNode>) -> Result<(), SnapshotError> {
    let finite = node.min_x.is_finite()
        && node.min_y.is_finite()
        && node.max_x.is_finite()
        && node.max_y.is_finite();
    if !finite {
        return Err(SnapshotError::Corrupt(
            "node rectangle has non-finite coordinates".to_string(),
        ));
    }
    if node.min_x > node.max_x || node.min_y > node.max_y {
        return Err(SnapshotError::Corrupt(
            "node rectangle is inverted".to_string(),
        ));
    }
    if let Some(parent) = parent
        && (node.min_x < parent.min_x
            || node.min_y < parent.min_y
            || node.max_x > parent.max_x
            || node.max_y > parent.max_y)
    {
        return Err(SnapshotError::Corrupt(
            "child rectangle escapes its parent".to_string(),
        ));
    }

    if node.leaf {
        if node.height != 1 {
            return Err(SnapshotError::Corrupt(format!(
                "leaf node has height {}",
                node.height
            )));
        }
        if node.children.is_some() {
            return Err(SnapshotError::Corrupt(
                "leaf node carries child nodes".to_string(),
            ));
        }
        let Some(items) = &node.items else {
            return Err(SnapshotError::Corrupt("leaf node has no items".to_string()));
        };
        for item in items {
            let p = GeoPoint::new(item.lon, item.lat);
            if !p.is_valid() {
                return Err(SnapshotError::Corrupt(format!(
                    "item {:?} has coordinates outside the geographic domain",
                    item.id
                )));
            }
            if item.lon < node.min_x
                || item.lon > node.max_x
                || item.lat < node.min_y
                || item.lat > node.max_y
            {
                return Err(SnapshotError::Corrupt(format!(
                    "item {:?} lies outside its leaf rectangle",
                    item.id
                )));
            }
            if FeatureKind::parse(&item.kind).is_none() {
                return Err(SnapshotError::Corrupt(format!(
                    "unknown feature kind {:?}",
                    item.kind
                )));
            }
        }
    } else {
        if node.items.is_some() {
            return Err(SnapshotError::Corrupt(
                "inner node carries leaf items".to_string(),
            ));
        }
        let Some(children) = &node.children else {
            return Err(SnapshotError::Corrupt(
                "inner node has no children".to_string(),
            ));
        };
        if children.is_empty() {
            return Err(SnapshotError::Corrupt(
                "inner node has an empty child list".to_string(),
            ));
        }
        for child in children {
            if child.height + 1 != node.height {
                return Err(SnapshotError::Corrupt(format!(
                    "node of height {} has a child of height {}",
                    node.height, child.height
                )));
            }
            validate_node(child, Some(node))?;
        }
    }
    Ok(())
}

fn count_items(node: &SnapshotNode) -> usize {
    if node.leaf {
        node.items.as_ref().map_or(0, Vec::len)
    } else {
        node.children
            .as_ref()
            .map_or(0, |c| c.iter().map(count_items).sum())
    }
}

/// Hash the canonical byte encoding of the tree payload.
///
/// Hand-fed rather than hashing a serialized string so the digest does
/// not depend on JSON field order or whitespace.
fn hash_root(root: Option<&SnapshotNode>) -> String {
    let mut hasher = blake3::Hasher::new();
    match root {
        Some(node) => hash_node(&mut hasher, node),
        None => {
            hasher.update(b"empty");
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn hash_node(hasher: &mut blake3::Hasher, node: &SnapshotNode) {
    for v in [node.min_x, node.min_y, node.max_x, node.max_y] {
        hasher.update(&v.to_bits().to_le_bytes());
    }
    hasher.update(&node.height.to_le_bytes());
    hasher.update(&[node.leaf as u8]);
    if let Some(items) = &node.items {
        hasher.update(&(items.len() as u64).to_le_bytes());
        for item in items {
            hash_str(hasher, &item.id);
            hash_str(hasher, &item.name);
            hash_str(hasher, &item.kind);
            hasher.update(&item.lon.to_bits().to_le_bytes());
            hasher.update(&item.lat.to_bits().to_le_bytes());
        }
    }
    if let Some(children) = &node.children {
        hasher.update(&(children.len() as u64).to_le_bytes());
        for child in children {
            hash_node(hasher, child);
        }
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
