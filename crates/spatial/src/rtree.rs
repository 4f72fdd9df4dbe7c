use std::fmt;

use foundation::bounds::GeoBounds;
use foundation::math::precision::stable_total_cmp_f64;

use crate::feature::PointFeature;

/// Maximum entries per node, leaf and inner alike.
pub(crate) const NODE_CAPACITY: usize = 9;

/// A feature rejected during bulk load.
///
/// The build never aborts; malformed inputs are skipped and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWarning {
    pub feature_id: String,
    pub reason: String,
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature {}: {}", self.feature_id, self.reason)
    }
}

/// A bulk-loaded point R-tree answering inclusive bounding-box queries.
///
/// Built once with sort-tile-recursive packing, then immutable; `&self`
/// queries are freely concurrent. Each point is stored as a degenerate
/// rectangle.
///
/// Ordering contract: `query` returns features in ascending internal slot
/// order, so repeated identical queries yield identical vectors.
#[derive(Debug, Clone)]
pub struct PointRTree {
    pub(crate) features: Vec<PointFeature>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) bounds: GeoBounds,
    pub(crate) entries: Entries,
}

#[derive(Debug, Clone)]
pub(crate) enum Entries {
    /// Feature slots `start..end` in the tree's feature vec.
    Leaf { start: usize, end: usize },
    Inner { children: Vec<usize> },
}

impl PointRTree {
    /// Bulk-load a tree from `features`.
    ///
    /// Features with non-finite or out-of-domain coordinates are excluded
    /// and reported as warnings, in input order.
    pub fn build(features: Vec<PointFeature>) -> (PointRTree, Vec<BuildWarning>) {
        let mut warnings = Vec::new();
        let mut valid: Vec<PointFeature> = Vec::with_capacity(features.len());
        for feature in features {
            let p = feature.position;
            if !p.lon_deg.is_finite() || !p.lat_deg.is_finite() {
                warnings.push(BuildWarning {
                    feature_id: feature.id,
                    reason: "non-finite coordinates".to_string(),
                });
            } else if !p.is_valid() {
                warnings.push(BuildWarning {
                    feature_id: feature.id,
                    reason: "coordinates outside the geographic domain".to_string(),
                });
            } else {
                valid.push(feature);
            }
        }

        (Self::pack(valid), warnings)
    }

    /// Sort-tile-recursive packing of pre-validated features.
    fn pack(mut features: Vec<PointFeature>) -> PointRTree {
        if features.is_empty() {
            return PointRTree {
                features,
                nodes: Vec::new(),
                root: None,
            };
        }

        // Tile along longitude first, then latitude within each slice.
        // The id tie-break makes the layout independent of input order.
        features.sort_by(|a, b| {
            stable_total_cmp_f64(a.position.lon_deg, b.position.lon_deg)
                .then_with(|| stable_total_cmp_f64(a.position.lat_deg, b.position.lat_deg))
                .then_with(|| a.id.cmp(&b.id))
        });

        let n = features.len();
        let leaf_count = n.div_ceil(NODE_CAPACITY);
        let slice_count = (leaf_count as f64).sqrt().ceil() as usize;
        let slice_len = n.div_ceil(slice_count);

        for slice in features.chunks_mut(slice_len) {
            slice.sort_by(|a, b| {
                stable_total_cmp_f64(a.position.lat_deg, b.position.lat_deg)
                    .then_with(|| stable_total_cmp_f64(a.position.lon_deg, b.position.lon_deg))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }

        let mut nodes: Vec<Node> = Vec::new();
        let mut level: Vec<usize> = Vec::with_capacity(leaf_count);

        // Leaves pack contiguous feature runs, never crossing a slice.
        let mut start = 0;
        while start < n {
            let slice_end = (start / slice_len + 1) * slice_len;
            let end = (start + NODE_CAPACITY).min(slice_end).min(n);
            let bounds = bounds_for_points(&features[start..end]);
            level.push(nodes.len());
            nodes.push(Node {
                bounds,
                entries: Entries::Leaf { start, end },
            });
            start = end;
        }

        // Pack upper levels in runs of capacity until one root remains.
        while level.len() > 1 {
            let mut parents = Vec::with_capacity(level.len().div_ceil(NODE_CAPACITY));
            for group in level.chunks(NODE_CAPACITY) {
                let mut bounds = nodes[group[0]].bounds;
                for &child in &group[1..] {
                    bounds = bounds.union(&nodes[child].bounds);
                }
                parents.push(nodes.len());
                nodes.push(Node {
                    bounds,
                    entries: Entries::Inner {
                        children: group.to_vec(),
                    },
                });
            }
            level = parents;
        }

        let root = Some(level[0]);
        PointRTree {
            features,
            nodes,
            root,
        }
    }

    /// Features whose position lies inside `query`, inclusive on all
    /// edges, in ascending slot order.
    pub fn query(&self, query: &GeoBounds) -> Vec<&PointFeature> {
        let Some(root) = self.root else {
            return Vec::new();
        };

        let mut slots: Vec<usize> = Vec::new();
        let mut stack: Vec<usize> = vec![root];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.intersects(query) {
                continue;
            }
            match &node.entries {
                Entries::Leaf { start, end } => {
                    for slot in *start..*end {
                        if query.contains(self.features[slot].position) {
                            slots.push(slot);
                        }
                    }
                }
                Entries::Inner { children } => {
                    stack.extend(children.iter().rev());
                }
            }
        }

        // Leaves cover disjoint slot ranges, so hits are already unique.
        slots.sort_unstable();
        slots.into_iter().map(|s| &self.features[s]).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[PointFeature] {
        &self.features
    }
}

fn bounds_for_points(features: &[PointFeature]) -> GeoBounds {
    let p = features[0].position;
    let mut b = GeoBounds::new(p.lon_deg, p.lat_deg, p.lon_deg, p.lat_deg);
    for feature in &features[1..] {
        let p = feature.position;
        b.min_lon = b.min_lon.min(p.lon_deg);
        b.min_lat = b.min_lat.min(p.lat_deg);
        b.max_lon = b.max_lon.max(p.lon_deg);
        b.max_lat = b.max_lat.max(p.lat_deg);
    }
    b
}
