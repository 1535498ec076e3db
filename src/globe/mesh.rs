use std::collections::HashMap;

use bevy::{
    prelude::*,
    render::{
        mesh::{Indices, PrimitiveTopology},
        render_asset::RenderAssetUsages,
    },
};
use geo::{LineString, Polygon};
use lyon::{
    math::point,
    path::Path,
    tessellation::{
        BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
    },
};

use crate::{
    error::{GlobeError, GlobeResult},
    types::{CountryFeature, GeoCoord},
};

/// Longest edge, in degrees, a triangle may keep before it is split. Keeps
/// flat triangles from cutting through the sphere.
pub const MAX_EDGE_DEGREES: f32 = 2.0;
const MAX_REFINE_DEPTH: u32 = 8;
/// Borders sit just above the fill so they do not z-fight.
const BORDER_LIFT: f32 = 1.001;

#[derive(Debug, Default, Clone)]
pub struct PlanarMesh {
    pub vertices: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

pub struct CountryMeshes {
    pub fill: Mesh,
    pub border: Mesh,
}

/// Ring vertices with the closing duplicate dropped and long edges split.
pub fn densify_ring(ring: &LineString<f64>, max_edge: f32) -> Vec<[f32; 2]> {
    let mut coords: Vec<[f32; 2]> = ring.0.iter().map(|c| [c.x as f32, c.y as f32]).collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    let n = coords.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let a = Vec2::from(coords[i]);
        let b = Vec2::from(coords[(i + 1) % n]);
        out.push(a.to_array());
        let steps = (a.distance(b) / max_edge).ceil() as usize;
        for s in 1..steps {
            out.push(a.lerp(b, s as f32 / steps as f32).to_array());
        }
    }
    out
}

/// Fill tessellation of a polygon in lon/lat. Holes are cut out by the
/// even-odd rule.
pub fn tessellate_polygon(polygon: &Polygon<f64>, max_edge: f32) -> Result<PlanarMesh, String> {
    let mut builder = Path::builder();
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let points = densify_ring(ring, max_edge);
        let Some((first, rest)) = points.split_first() else {
            continue;
        };
        if rest.len() < 2 {
            continue;
        }
        builder.begin(point(first[0], first[1]));
        for p in rest {
            builder.line_to(point(p[0], p[1]));
        }
        builder.end(true);
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::default().with_fill_rule(FillRule::EvenOdd),
            &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| {
                vertex.position().to_array()
            }),
        )
        .map_err(|err| format!("{err:?}"))?;

    Ok(PlanarMesh {
        vertices: buffers.vertices,
        indices: buffers.indices,
    })
}

/// Splits triangles into four until no edge is longer than `max_edge`.
/// Midpoints are shared between neighbours.
pub fn refine(mesh: &mut PlanarMesh, max_edge: f32) {
    let max_sq = max_edge * max_edge;
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();

    for _ in 0..MAX_REFINE_DEPTH {
        let mut next = Vec::with_capacity(mesh.indices.len());
        let mut split_any = false;

        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]];
            let long = [(a, b), (b, c), (c, a)].iter().any(|&(i, j)| {
                Vec2::from(mesh.vertices[i as usize]).distance_squared(Vec2::from(mesh.vertices[j as usize]))
                    > max_sq
            });
            if !long {
                next.extend([a, b, c]);
                continue;
            }
            split_any = true;
            let mut mid = |i: u32, j: u32| {
                let key = (i.min(j), i.max(j));
                *midpoints.entry(key).or_insert_with(|| {
                    let m = (Vec2::from(mesh.vertices[i as usize])
                        + Vec2::from(mesh.vertices[j as usize]))
                        * 0.5;
                    mesh.vertices.push(m.to_array());
                    (mesh.vertices.len() - 1) as u32
                })
            };
            let (ab, bc, ca) = (mid(a, b), mid(b, c), mid(c, a));
            next.extend([a, ab, ca, ab, b, bc, ca, bc, c, ab, bc, ca]);
        }

        mesh.indices = next;
        if !split_any {
            break;
        }
    }
}

fn project(lon_lat: [f32; 2], radius: f32) -> Vec3 {
    GeoCoord::new(lon_lat[1] as f64, lon_lat[0] as f64).to_render_space(radius)
}

pub fn sphere_mesh(planar: &PlanarMesh, radius: f32) -> Mesh {
    let positions: Vec<[f32; 3]> = planar
        .vertices
        .iter()
        .map(|v| project(*v, radius).to_array())
        .collect();
    let normals: Vec<[f32; 3]> = positions
        .iter()
        .map(|p| Vec3::from(*p).normalize_or_zero().to_array())
        .collect();

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(planar.indices.clone()))
}

pub fn border_mesh(feature: &CountryFeature, radius: f32, max_edge: f32) -> Mesh {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    for ring in feature.geometry.rings() {
        let points = densify_ring(ring, max_edge);
        let n = points.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            positions.push(project(points[i], radius * BORDER_LIFT).to_array());
            positions.push(project(points[(i + 1) % n], radius * BORDER_LIFT).to_array());
        }
    }
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
}

pub fn build_country_meshes(feature: &CountryFeature, radius: f32) -> GlobeResult<CountryMeshes> {
    let mut planar = PlanarMesh::default();
    for polygon in feature.geometry.polygons() {
        let mut part = tessellate_polygon(polygon, MAX_EDGE_DEGREES).map_err(|reason| {
            GlobeError::Tessellation {
                code: feature.code.clone(),
                reason,
            }
        })?;
        refine(&mut part, MAX_EDGE_DEGREES);
        let offset = planar.vertices.len() as u32;
        planar.vertices.extend(part.vertices);
        planar.indices.extend(part.indices.into_iter().map(|i| i + offset));
    }
    Ok(CountryMeshes {
        fill: sphere_mesh(&planar, radius),
        border: border_mesh(feature, radius, MAX_EDGE_DEGREES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn area(mesh: &PlanarMesh) -> f32 {
        mesh.indices
            .chunks_exact(3)
            .map(|tri| {
                let [a, b, c] = [0, 1, 2].map(|k| Vec2::from(mesh.vertices[tri[k] as usize]));
                (b - a).perp_dot(c - a).abs() / 2.0
            })
            .sum()
    }

    fn square(half: f64) -> Polygon<f64> {
        polygon![
            (x: -half, y: -half),
            (x: half, y: -half),
            (x: half, y: half),
            (x: -half, y: half),
            (x: -half, y: -half),
        ]
    }

    #[test]
    fn densify_splits_long_edges() {
        let ring = square(5.0).exterior().clone();
        let points = densify_ring(&ring, 2.0);
        // Each 10 degree side becomes 5 segments.
        assert_eq!(points.len(), 20);
        assert_ne!(points.first(), points.last());
    }

    #[test]
    fn square_tessellates_to_its_area() {
        let mesh = tessellate_polygon(&square(1.0), MAX_EDGE_DEGREES).unwrap();
        assert!(mesh.indices.len() >= 6);
        assert!((area(&mesh) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn holes_are_cut_out() {
        let with_hole = Polygon::new(
            square(1.0).exterior().clone(),
            vec![square(0.5).exterior().clone()],
        );
        let mesh = tessellate_polygon(&with_hole, MAX_EDGE_DEGREES).unwrap();
        assert!((area(&mesh) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn refine_bounds_edge_length_and_keeps_area() {
        let mut mesh = tessellate_polygon(&square(10.0), 100.0).unwrap();
        refine(&mut mesh, 2.0);
        assert!((area(&mesh) - 400.0).abs() < 1e-2);
        for tri in mesh.indices.chunks_exact(3) {
            for (i, j) in [(0, 1), (1, 2), (2, 0)] {
                let a = Vec2::from(mesh.vertices[tri[i] as usize]);
                let b = Vec2::from(mesh.vertices[tri[j] as usize]);
                assert!(a.distance(b) <= 2.0 + 1e-4);
            }
        }
    }

    #[test]
    fn sphere_mesh_sits_on_the_radius() {
        let mesh = tessellate_polygon(&square(3.0), MAX_EDGE_DEGREES).unwrap();
        let sphere = sphere_mesh(&mesh, 100.0);
        let Some(bevy::render::mesh::VertexAttributeValues::Float32x3(positions)) =
            sphere.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("missing positions");
        };
        assert!(!positions.is_empty());
        for p in positions {
            assert!((Vec3::from(*p).length() - 100.0).abs() < 1e-3);
        }
    }
}
