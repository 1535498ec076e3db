use geo::{BoundingRect, LineString, MultiPolygon, Polygon};
use rstar::{AABB, RTreeObject};

/// Load-order index of a feature inside the [`GeometryStore`](crate::geometry::GeometryStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryId(pub usize);

/// The only geometry shapes a country may have. Anything else is rejected by
/// the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum CountryGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl CountryGeometry {
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon<f64>> {
        let slice: &[Polygon<f64>] = match self {
            CountryGeometry::Polygon(polygon) => std::slice::from_ref(polygon),
            CountryGeometry::MultiPolygon(multi) => &multi.0,
        };
        slice.iter()
    }

    pub fn rings(&self) -> impl Iterator<Item = &LineString<f64>> {
        self.polygons()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CountryGeometry::Polygon(_) => "Polygon",
            CountryGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryFeature {
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    pub name: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub geometry: CountryGeometry,
}

impl CountryFeature {
    pub fn bounds(&self) -> Option<AABB<[f64; 2]>> {
        let rect = match &self.geometry {
            CountryGeometry::Polygon(polygon) => polygon.bounding_rect(),
            CountryGeometry::MultiPolygon(multi) => multi.bounding_rect(),
        }?;
        Some(AABB::from_corners(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        ))
    }
}

/// Bounding box entry of the store's spatial index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedBounds {
    pub id: CountryId,
    pub envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}
