use std::collections::HashMap;

use bevy::prelude::*;
use geo::{LineString, Polygon};
use rstar::{AABB, RTree};

use crate::types::{CountryFeature, CountryId, GeoCoord, IndexedBounds};

use super::centroid_of;

/// Owns every loaded country feature. Other parts of the globe refer to
/// features through [`CountryId`] handles.
#[derive(Resource, Default)]
pub struct GeometryStore {
    features: Vec<CountryFeature>,
    centroids: Vec<Option<GeoCoord>>,
    by_code: HashMap<String, CountryId>,
    index: RTree<IndexedBounds>,
}

impl GeometryStore {
    pub fn new(features: Vec<CountryFeature>) -> Self {
        let mut by_code = HashMap::with_capacity(features.len());
        let mut bounds = Vec::with_capacity(features.len());
        let mut centroids = Vec::with_capacity(features.len());

        for (i, feature) in features.iter().enumerate() {
            let id = CountryId(i);
            if !feature.code.is_empty() {
                // Duplicate codes keep the first feature in load order.
                by_code.entry(feature.code.clone()).or_insert(id);
            }
            if let Some(envelope) = feature.bounds() {
                bounds.push(IndexedBounds { id, envelope });
            }
            let centroid = centroid_of(feature);
            if centroid.is_none() {
                warn!("No centroid for {} ({})", feature.name, feature.code);
            }
            centroids.push(centroid);
        }

        Self {
            features,
            centroids,
            by_code,
            index: RTree::bulk_load(bounds),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: CountryId) -> Option<&CountryFeature> {
        self.features.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CountryId, &CountryFeature)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, feature)| (CountryId(i), feature))
    }

    pub fn centroid(&self, id: CountryId) -> Option<GeoCoord> {
        self.centroids.get(id.0).copied().flatten()
    }

    pub fn find_by_code(&self, code: &str) -> Option<CountryId> {
        self.by_code.get(code).copied()
    }

    /// First feature, in load order, whose boundary contains `coord`.
    ///
    /// Points on shared borders or inside overlapping shapes resolve to
    /// whichever feature appears first in the source file.
    pub fn find_by_coordinate(&self, coord: GeoCoord) -> Option<CountryId> {
        let point = coord.to_lon_lat();
        self.index
            .locate_in_envelope_intersecting(&AABB::from_point(point))
            .map(|entry| entry.id)
            .filter(|id| {
                self.get(*id)
                    .is_some_and(|feature| feature_contains(feature, point))
            })
            .min()
    }
}

pub fn feature_contains(feature: &CountryFeature, point: [f64; 2]) -> bool {
    feature
        .geometry
        .polygons()
        .any(|polygon| polygon_contains(polygon, point))
}

pub fn polygon_contains(polygon: &Polygon<f64>, point: [f64; 2]) -> bool {
    if !ring_contains(polygon.exterior(), point) {
        return false;
    }
    !polygon
        .interiors()
        .iter()
        .any(|hole| ring_contains(hole, point))
}

/// Ray casting: counts crossings of a horizontal ray from `point` with the ring.
pub fn ring_contains(ring: &LineString<f64>, point: [f64; 2]) -> bool {
    let [x, y] = point;
    let coords = &ring.0;
    let n = coords.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (coords[i].x, coords[i].y);
        let (xj, yj) = (coords[j].x, coords[j].y);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
