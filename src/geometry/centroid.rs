use geo::{LineString, Polygon};

use crate::types::{CountryFeature, CountryGeometry, GeoCoord};

/// Signed planar area of a ring in raw coordinate units (shoelace formula).
pub fn ring_signed_area(ring: &LineString<f64>) -> f64 {
    let coords = &ring.0;
    let n = coords.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = coords[i];
        let b = coords[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

pub fn ring_area(ring: &LineString<f64>) -> f64 {
    ring_signed_area(ring).abs()
}

/// Arithmetic mean of a ring's distinct vertices. The closing vertex of a
/// closed ring is not counted twice.
pub fn ring_vertex_mean(ring: &LineString<f64>) -> Option<GeoCoord> {
    let mut coords = ring.0.as_slice();
    if coords.len() > 1 && ring.is_closed() {
        coords = &coords[..coords.len() - 1];
    }
    if coords.is_empty() {
        return None;
    }
    let n = coords.len() as f64;
    let (sum_x, sum_y) = coords
        .iter()
        .fold((0.0, 0.0), |(x, y), c| (x + c.x, y + c.y));
    Some(GeoCoord::new(sum_y / n, sum_x / n))
}

/// The sub-polygon with the largest outer ring. Ties keep the first one.
pub fn dominant_polygon<'a>(
    polygons: impl IntoIterator<Item = &'a Polygon<f64>>,
) -> Option<&'a Polygon<f64>> {
    let mut best: Option<(&Polygon<f64>, f64)> = None;
    for polygon in polygons {
        let area = ring_area(polygon.exterior());
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((polygon, area)),
        }
    }
    best.map(|(polygon, _)| polygon)
}

/// Representative coordinate of a country, used for arc endpoints and camera
/// framing. Multi-part countries use their largest landmass so the point does
/// not drift into small overseas territories.
pub fn centroid_of(feature: &CountryFeature) -> Option<GeoCoord> {
    match &feature.geometry {
        CountryGeometry::Polygon(polygon) => ring_vertex_mean(polygon.exterior()),
        CountryGeometry::MultiPolygon(multi) => {
            dominant_polygon(&multi.0).and_then(|polygon| ring_vertex_mean(polygon.exterior()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, polygon};

    fn feature(geometry: CountryGeometry) -> CountryFeature {
        CountryFeature {
            code: "TS".into(),
            name: "Test".into(),
            properties: Default::default(),
            geometry,
        }
    }

    fn square(cx: f64, cy: f64, half: f64) -> Polygon<f64> {
        polygon![
            (x: cx - half, y: cy - half),
            (x: cx + half, y: cy - half),
            (x: cx + half, y: cy + half),
            (x: cx - half, y: cy + half),
        ]
    }

    #[test]
    fn unit_square_centroid_is_its_centre() {
        let sq = feature(CountryGeometry::Polygon(square(0.0, 0.0, 1.0)));
        let centroid = centroid_of(&sq).unwrap();
        assert_eq!(centroid, GeoCoord::new(0.0, 0.0));
    }

    #[test]
    fn shoelace_area_of_square() {
        let sq = square(0.0, 0.0, 1.0);
        assert_eq!(ring_area(sq.exterior()), 4.0);
        // Counter-clockwise ring is positive.
        assert!(ring_signed_area(sq.exterior()) > 0.0);
    }

    #[test]
    fn open_and_closed_rings_have_same_area() {
        let open = LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 3.0), (0.0, 3.0)]);
        let mut closed = open.clone();
        closed.close();
        assert_eq!(ring_area(&open), 6.0);
        assert_eq!(ring_area(&closed), 6.0);
    }

    #[test]
    fn multipolygon_uses_largest_part_in_any_order() {
        let big = square(20.0, 10.0, 5.0);
        let small = square(-60.0, -20.0, 0.5);
        let expected = GeoCoord::new(10.0, 20.0);

        let forward = MultiPolygon(vec![big.clone(), small.clone()]);
        let backward = MultiPolygon(vec![small, big]);

        let forward = feature(CountryGeometry::MultiPolygon(forward));
        let backward = feature(CountryGeometry::MultiPolygon(backward));
        assert_eq!(centroid_of(&forward), Some(expected));
        assert_eq!(centroid_of(&backward), Some(expected));
    }

    #[test]
    fn equal_parts_keep_the_first() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(30.0, 30.0, 1.0);
        let multi = MultiPolygon(vec![a, b]);
        assert_eq!(
            centroid_of(&feature(CountryGeometry::MultiPolygon(multi))),
            Some(GeoCoord::new(0.0, 0.0))
        );
    }

    #[test]
    fn empty_ring_has_no_centroid() {
        let empty = Polygon::new(LineString::new(vec![]), vec![]);
        assert_eq!(centroid_of(&feature(CountryGeometry::Polygon(empty))), None);
    }
}
