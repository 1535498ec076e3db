use std::{f32::consts::FRAC_PI_2, time::Duration};

use bevy::{
    input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit},
    prelude::*,
};

use crate::{
    EguiBlockInputState,
    animation::{AnimationSlot, Easing, Interpolate, Tween},
    geometry::{GeometryStore, GlobeLoadState},
    globe::GlobeSet,
    selection::CountrySelected,
    settings::{CameraConfig, GlobeConfig},
    types::GeoCoord,
};

/// Pitch stays this far short of the poles.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.05;
/// Radians of orbit per pixel of drag at `rotate_speed = 1`.
const RADIANS_PER_PIXEL: f32 = 0.005;
const PIXELS_PER_LINE: f32 = 100.0;

pub struct CameraSystemPlugin;

impl Plugin for CameraSystemPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera)
            .add_systems(OnExit(GlobeLoadState::Loading), start_intro)
            .add_systems(
                Update,
                handle_orbit_input
                    .in_set(GlobeSet::Input)
                    .run_if(not(in_state(GlobeLoadState::Loading))),
            )
            .add_systems(
                Update,
                (focus_on_selection, animate_camera, apply_orbit)
                    .chain()
                    .in_set(GlobeSet::Camera),
            );
    }
}

/// Damped orbit around the globe centre. Angles are radians; yaw 0 looks at
/// longitude 0 from +Z.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub velocity: Vec2,
}

impl OrbitCamera {
    pub fn new(distance: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance,
            velocity: Vec2::ZERO,
        }
    }

    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.distance * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// Drag moves the globe with the pointer, so the camera turns the other way.
    pub fn push(&mut self, drag: Vec2, rotate_speed: f32) {
        let scale = RADIANS_PER_PIXEL * rotate_speed * (self.distance / 250.0).max(0.2);
        self.velocity += Vec2::new(-drag.x, drag.y) * scale;
    }

    pub fn zoom(&mut self, lines: f32, config: &CameraConfig) {
        self.distance *= 1.0 - lines * 0.1 * config.zoom_speed;
        self.distance = self.distance.clamp(config.min_distance, config.max_distance);
    }

    /// Applies velocity for one frame and decays it. The decay is scaled so
    /// it feels the same at any frame rate.
    pub fn step(&mut self, dt: f32, config: &CameraConfig) {
        self.yaw += self.velocity.x;
        self.pitch = (self.pitch + self.velocity.y).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let keep = (1.0 - config.damping.clamp(0.0, 1.0)).powf(dt * 60.0);
        self.velocity *= keep;
        if self.velocity.length_squared() < 1e-10 {
            self.velocity = Vec2::ZERO;
        }
    }

    pub fn sync_from_position(&mut self, position: Vec3) {
        self.distance = position.length();
        if self.distance <= f32::EPSILON {
            return;
        }
        self.pitch = (position.y / self.distance)
            .clamp(-1.0, 1.0)
            .asin()
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = position.x.atan2(position.z);
        self.velocity = Vec2::ZERO;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPosition {
    pub direction: Vec3,
    pub distance: f32,
}

impl OrbitPosition {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            direction: translation.normalize_or(Vec3::Z),
            distance: translation.length(),
        }
    }

    pub fn translation(&self) -> Vec3 {
        self.direction * self.distance
    }
}

impl Interpolate for OrbitPosition {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        let arc = Quat::from_rotation_arc(self.direction, to.direction);
        Self {
            direction: (Quat::IDENTITY.slerp(arc, t) * self.direction).normalize_or(to.direction),
            distance: self.distance.interpolate(&to.distance, t),
        }
    }
}

/// In-flight scripted move. Orbit input is ignored while it is active.
#[derive(Component, Default)]
pub struct CameraAnimation(pub AnimationSlot<OrbitPosition>);

/// Where the camera goes to frame a country: above its centroid, nudged by
/// the configured latitude offset.
pub fn focus_position(centroid: GeoCoord, config: &CameraConfig) -> OrbitPosition {
    let aim = centroid.with_lat_offset(config.focus_latitude_offset);
    OrbitPosition {
        direction: aim.to_render_space(1.0),
        distance: config.focus_distance,
    }
}

fn setup_camera(mut commands: Commands, config: Res<GlobeConfig>) {
    let camera = &config.camera;
    let orbit = OrbitCamera::new(camera.intro_start_distance);
    commands
        .spawn((
            Camera3d::default(),
            Projection::Perspective(PerspectiveProjection {
                fov: camera.fov_degrees.to_radians(),
                far: camera.intro_start_distance * 4.0,
                ..default()
            }),
            Transform::from_translation(orbit.position()).looking_at(Vec3::ZERO, Vec3::Y),
            orbit,
            CameraAnimation::default(),
        ))
        .with_child((
            DirectionalLight {
                illuminance: config.look.sun_illuminance,
                ..default()
            },
            Transform::default(),
        ));
}

fn start_intro(mut query: Query<(&Transform, &mut CameraAnimation)>, config: Res<GlobeConfig>) {
    let camera = &config.camera;
    for (transform, mut animation) in &mut query {
        let from = OrbitPosition::from_translation(transform.translation);
        let to = OrbitPosition {
            direction: from.direction,
            distance: camera.start_distance,
        };
        animation.0.start(Tween::new(
            from,
            to,
            Duration::from_secs_f32(camera.intro_duration_secs.max(0.0)),
            Easing::CubicOut,
        ));
    }
}

fn handle_orbit_input(
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    scroll: Res<AccumulatedMouseScroll>,
    block: Res<EguiBlockInputState>,
    config: Res<GlobeConfig>,
    mut query: Query<(&mut OrbitCamera, &CameraAnimation)>,
) {
    if block.block_input {
        return;
    }
    let lines = match scroll.unit {
        MouseScrollUnit::Line => scroll.delta.y,
        MouseScrollUnit::Pixel => scroll.delta.y / PIXELS_PER_LINE,
    };
    for (mut orbit, animation) in &mut query {
        if animation.0.is_active() {
            continue;
        }
        if buttons.pressed(MouseButton::Left) && motion.delta != Vec2::ZERO {
            orbit.push(motion.delta, config.camera.rotate_speed);
        }
        if lines != 0.0 {
            orbit.zoom(lines, &config.camera);
        }
    }
}

fn focus_on_selection(
    mut selections: EventReader<CountrySelected>,
    store: Res<GeometryStore>,
    config: Res<GlobeConfig>,
    mut query: Query<(&Transform, &mut CameraAnimation)>,
) {
    let Some(selected) = selections.read().last() else {
        return;
    };
    let Some(centroid) = store.centroid(selected.id) else {
        warn!("Cannot frame {}: no centroid", selected.code);
        return;
    };
    let target = focus_position(centroid, &config.camera);
    for (transform, mut animation) in &mut query {
        animation.0.start(Tween::new(
            OrbitPosition::from_translation(transform.translation),
            target,
            Duration::from_secs_f32(config.camera.focus_duration_secs.max(0.0)),
            Easing::CubicInOut,
        ));
    }
}

fn animate_camera(
    time: Res<Time>,
    mut query: Query<(&mut Transform, &mut OrbitCamera, &mut CameraAnimation)>,
) {
    for (mut transform, mut orbit, mut animation) in &mut query {
        let Some(step) = animation.0.tick(time.delta()) else {
            continue;
        };
        *transform = Transform::from_translation(step.value.translation()).looking_at(Vec3::ZERO, Vec3::Y);
        if step.finished {
            orbit.sync_from_position(transform.translation);
        }
    }
}

fn apply_orbit(
    time: Res<Time>,
    config: Res<GlobeConfig>,
    mut query: Query<(&mut Transform, &mut OrbitCamera, &CameraAnimation)>,
) {
    for (mut transform, mut orbit, animation) in &mut query {
        if animation.0.is_active() {
            continue;
        }
        orbit.step(time.delta_secs(), &config.camera);
        let position = orbit.position();
        if transform.translation != position {
            *transform = Transform::from_translation(position).looking_at(Vec3::ZERO, Vec3::Y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn orbit_starts_over_longitude_zero() {
        let orbit = OrbitCamera::new(250.0);
        assert!(approx(orbit.position(), GeoCoord::new(0.0, 0.0).to_render_space(250.0)));
    }

    #[test]
    fn sync_recovers_angles() {
        let mut orbit = OrbitCamera::new(200.0);
        orbit.yaw = 1.2;
        orbit.pitch = -0.4;
        let position = orbit.position();

        let mut synced = OrbitCamera::new(1.0);
        synced.velocity = Vec2::ONE;
        synced.sync_from_position(position);
        assert!((synced.yaw - 1.2).abs() < 1e-4);
        assert!((synced.pitch + 0.4).abs() < 1e-4);
        assert!((synced.distance - 200.0).abs() < 1e-3);
        assert_eq!(synced.velocity, Vec2::ZERO);
    }

    #[test]
    fn zoom_stays_in_bounds() {
        let config = CameraConfig::default();
        let mut orbit = OrbitCamera::new(config.start_distance);
        for _ in 0..100 {
            orbit.zoom(3.0, &config);
        }
        assert_eq!(orbit.distance, config.min_distance);
        for _ in 0..100 {
            orbit.zoom(-3.0, &config);
        }
        assert_eq!(orbit.distance, config.max_distance);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let config = CameraConfig::default();
        let mut orbit = OrbitCamera::new(250.0);
        orbit.velocity = Vec2::new(0.0, 10.0);
        orbit.step(1.0 / 60.0, &config);
        assert_eq!(orbit.pitch, PITCH_LIMIT);
        assert!(orbit.position().y < orbit.distance);
    }

    #[test]
    fn damping_decays_velocity() {
        let config = CameraConfig::default();
        let mut orbit = OrbitCamera::new(250.0);
        orbit.push(Vec2::new(40.0, 0.0), config.rotate_speed);
        let initial = orbit.velocity.length();
        assert!(initial > 0.0);
        orbit.step(1.0 / 60.0, &config);
        let after_one = orbit.velocity.length();
        assert!((after_one - initial * 0.95).abs() < 1e-5);

        // Two half-length frames decay as much as one full frame.
        let mut halves = OrbitCamera::new(250.0);
        halves.push(Vec2::new(40.0, 0.0), config.rotate_speed);
        halves.step(1.0 / 120.0, &config);
        halves.step(1.0 / 120.0, &config);
        assert!((halves.velocity.length() - after_one).abs() < 1e-5);
    }

    #[test]
    fn focus_lands_south_of_the_centroid() {
        let config = CameraConfig::default();
        let target = focus_position(GeoCoord::new(51.25, 10.5), &config);
        assert_eq!(target.distance, config.focus_distance);
        let aimed = GeoCoord::from_cartesian(target.direction.as_dvec3()).unwrap();
        assert!((aimed.lat - 43.25).abs() < 1e-3);
        assert!((aimed.long - 10.5).abs() < 1e-3);
    }

    #[test]
    fn orbit_position_travels_the_great_circle() {
        let from = OrbitPosition { direction: Vec3::Z, distance: 900.0 };
        let to = OrbitPosition { direction: Vec3::X, distance: 250.0 };
        let mid = from.interpolate(&to, 0.5);
        assert!((mid.direction.length() - 1.0).abs() < 1e-5);
        assert!(approx(mid.direction, Vec3::new(1.0, 0.0, 1.0).normalize()));
        assert_eq!(mid.distance, 575.0);
        assert!(approx(from.interpolate(&to, 1.0).direction, Vec3::X));
    }
}
