use foundation::geo::GeoPoint;

/// What a labeled point stands for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Country,
    City,
}

impl FeatureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::Country => "country",
            FeatureKind::City => "city",
        }
    }

    pub fn parse(s: &str) -> Option<FeatureKind> {
        match s {
            "country" => Some(FeatureKind::Country),
            "city" => Some(FeatureKind::City),
            _ => None,
        }
    }
}

/// A labeled point marker. Immutable once an index owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub id: String,
    pub name: String,
    pub kind: FeatureKind,
    pub position: GeoPoint,
}

impl PointFeature {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: FeatureKind,
        position: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position,
        }
    }
}
