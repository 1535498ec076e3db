use std::f32::consts::{PI, TAU};

use bevy::{
    prelude::*,
    render::{
        mesh::{Indices, PrimitiveTopology},
        render_asset::RenderAssetUsages,
    },
};

use crate::{
    settings::{GlobeConfig, srgba},
    types::GeoCoord,
};

use super::{ArcSet, GlobeArc};

const ARC_SEGMENTS: usize = 64;
const TUBE_SIDES: usize = 6;

#[derive(Component)]
pub struct ArcMarker;

#[derive(Resource)]
pub struct ArcMaterial(pub Handle<StandardMaterial>);

pub fn setup_arc_material(
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GlobeConfig>,
) {
    let handle = materials.add(StandardMaterial {
        base_color: srgba(config.look.arc),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    commands.insert_resource(ArcMaterial(handle));
}

pub fn great_circle_point(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let angle = from.angle_between(to);
    if angle < 1e-4 {
        return from.lerp(to, t).normalize_or_zero();
    }
    let sin = angle.sin();
    (from * ((1.0 - t) * angle).sin() + to * (t * angle).sin()) / sin
}

/// Centre line of an arc, lifted off the surface by `altitude * radius` at
/// its midpoint and touching down at both ends.
pub fn arc_path(start: GeoCoord, end: GeoCoord, altitude: f32, radius: f32, segments: usize) -> Vec<Vec3> {
    let from = start.to_render_space(1.0);
    let to = end.to_render_space(1.0);
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let height = radius * (1.0 + altitude * (PI * t).sin());
            great_circle_point(from, to, t) * height
        })
        .collect()
}

pub fn tube_mesh(path: &[Vec3], thickness: f32, sides: usize) -> Mesh {
    let sides = sides.max(3);
    let half = thickness * 0.5;
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(path.len() * sides);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(path.len() * sides);
    let mut indices: Vec<u32> = Vec::new();

    for (i, point) in path.iter().enumerate() {
        let prev = path[i.saturating_sub(1)];
        let next = path[(i + 1).min(path.len() - 1)];
        let tangent = (next - prev).normalize_or(Vec3::X);
        // Radial direction keeps the ring orientation stable along the arc.
        let mut side = tangent.cross(point.normalize_or(Vec3::Y));
        if side.length_squared() < 1e-8 {
            side = tangent.any_orthonormal_vector();
        }
        let side = side.normalize();
        let up = side.cross(tangent).normalize();

        for s in 0..sides {
            let angle = s as f32 / sides as f32 * TAU;
            let normal = side * angle.cos() + up * angle.sin();
            positions.push((*point + normal * half).to_array());
            normals.push(normal.to_array());
        }
    }

    for ring in 0..path.len().saturating_sub(1) {
        let a = (ring * sides) as u32;
        let b = ((ring + 1) * sides) as u32;
        for s in 0..sides as u32 {
            let n = (s + 1) % sides as u32;
            indices.extend([a + s, b + s, a + n, a + n, b + s, b + n]);
        }
    }

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(indices))
}

pub fn arc_mesh(arc: &GlobeArc, radius: f32) -> Mesh {
    let path = arc_path(arc.start, arc.end, arc.altitude, radius, ARC_SEGMENTS);
    tube_mesh(&path, arc.stroke_width, TUBE_SIDES)
}

pub fn respawn_arcs(
    mut commands: Commands,
    arc_set: Res<ArcSet>,
    arcs_query: Query<Entity, With<ArcMarker>>,
    material: Res<ArcMaterial>,
    config: Res<GlobeConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !arc_set.is_changed() {
        return;
    }
    for entity in arcs_query.iter() {
        commands.entity(entity).despawn();
    }

    let batch: Vec<(Mesh3d, MeshMaterial3d<StandardMaterial>, ArcMarker)> = arc_set
        .arcs()
        .iter()
        .map(|arc| {
            (
                Mesh3d(meshes.add(arc_mesh(arc, config.globe_radius))),
                MeshMaterial3d(material.0.clone()),
                ArcMarker,
            )
        })
        .collect();
    if !batch.is_empty() {
        debug!("Drawing {} arcs", batch.len());
    }
    commands.spawn_batch(batch);
}
