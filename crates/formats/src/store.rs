use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use spatial::feature::FeatureKind;
use spatial::rtree::PointRTree;
use spatial::snapshot::{IndexSnapshot, SnapshotError};

use crate::collection::{CollectionError, ParsedCollection, parse_feature_collection};

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Collection(CollectionError),
    Snapshot(SnapshotError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            StoreError::Parse(err) => write!(f, "snapshot parse error: {err}"),
            StoreError::Collection(err) => write!(f, "collection error: {err}"),
            StoreError::Snapshot(err) => write!(f, "snapshot error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Read and parse a GeoJSON collection file.
pub fn load_collection(
    path: impl AsRef<Path>,
    kind: FeatureKind,
) -> Result<ParsedCollection, StoreError> {
    let path = path.as_ref();
    let payload = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_feature_collection(&payload, kind).map_err(StoreError::Collection)
}

/// Read a snapshot file without rebuilding the tree.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<IndexSnapshot, StoreError> {
    let path = path.as_ref();
    let payload = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&payload).map_err(StoreError::Parse)
}

/// Read a snapshot file and rebuild a query-ready index from it.
pub fn load_index(path: impl AsRef<Path>) -> Result<PointRTree, StoreError> {
    let snapshot = load_snapshot(path)?;
    PointRTree::from_snapshot(&snapshot).map_err(StoreError::Snapshot)
}

/// Serialize a snapshot to a JSON file.
pub fn save_snapshot(path: impl AsRef<Path>, snapshot: &IndexSnapshot) -> Result<(), StoreError> {
    let path = path.as_ref();
    let payload = serde_json::to_string(snapshot).map_err(StoreError::Parse)?;
    fs::write(path, payload).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{StoreError, load_collection, load_index, load_snapshot, save_snapshot};
    use foundation::bounds::GeoBounds;
    use foundation::geo::GeoPoint;
    use spatial::feature::{FeatureKind, PointFeature};
    use spatial::rtree::PointRTree;
    use spatial::snapshot::IndexSnapshot;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(label: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let id = format!("geo_store_{label}_{}", std::process::id());
        dir.push(id);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn saves_and_loads_snapshots() {
        let dir = temp_dir("snapshot");
        let features = vec![
            PointFeature::new("1", "Berlin", FeatureKind::City, GeoPoint::new(13.405, 52.52)),
            PointFeature::new("2", "Sydney", FeatureKind::City, GeoPoint::new(151.2, -33.9)),
        ];
        let (tree, _) = PointRTree::build(features);
        let snapshot = IndexSnapshot::from_tree(&tree, "cities");

        let path = dir.join("cities.json");
        save_snapshot(&path, &snapshot).expect("save snapshot");

        let loaded = load_snapshot(&path).expect("load snapshot");
        assert_eq!(loaded, snapshot);

        let index = load_index(&path).expect("load index");
        let hits = index.query(&GeoBounds::new(5.0, 45.0, 20.0, 60.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Berlin");
    }

    #[test]
    fn loads_collections_from_disk() {
        let dir = temp_dir("collection");
        let path = dir.join("cities.geojson");
        fs::write(
            &path,
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "id": "berlin",
                        "properties": { "name": "Berlin" },
                        "geometry": { "type": "Point", "coordinates": [13.405, 52.52] }
                    }
                ]
            }"#,
        )
        .expect("write collection");

        let parsed = load_collection(&path, FeatureKind::City).expect("load collection");
        assert_eq!(parsed.features.len(), 1);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn missing_files_surface_io_errors() {
        let dir = temp_dir("missing");
        let err = load_snapshot(dir.join("absent.json")).expect_err("expect io error");
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn garbage_snapshot_files_surface_parse_errors() {
        let dir = temp_dir("garbage");
        let path = dir.join("broken.json");
        fs::write(&path, "{\"version\":").expect("write garbage");
        let err = load_snapshot(&path).expect_err("expect parse error");
        assert!(matches!(err, StoreError::Parse(_)));
    }
}
