use foundation::math::projection::ProjectionConfig;
use spatial::feature::PointFeature;
use spatial::rtree::PointRTree;

use crate::camera::Viewport;
use crate::visible::{ViewportError, visible_regions};

/// Everything a viewport shows, split by marker kind.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleFeatures<'a> {
    pub countries: Vec<&'a PointFeature>,
    pub cities: Vec<&'a PointFeature>,
}

/// Resolve the features visible in `viewport` against two indices.
///
/// Pure composition: compute the visible regions, range-query each index
/// per region, concatenate. Regions are disjoint, so no dedup is needed
/// and the result order stays deterministic. Called on every pan, zoom
/// and resize; holds no state between calls.
pub fn visible_features<'a>(
    viewport: &Viewport,
    config: &ProjectionConfig,
    countries: &'a PointRTree,
    cities: &'a PointRTree,
) -> Result<VisibleFeatures<'a>, ViewportError> {
    let regions = visible_regions(viewport, config)?;
    let mut out = VisibleFeatures {
        countries: Vec::new(),
        cities: Vec::new(),
    };
    for region in &regions {
        out.countries.extend(countries.query(region));
        out.cities.extend(cities.query(region));
    }
    Ok(out)
}
