use bevy::{math::DVec3, prelude::*, window::PrimaryWindow};

use crate::{
    EguiBlockInputState,
    camera::OrbitCamera,
    geometry::{GeometryStore, GlobeLoadState},
    globe::GlobeSet,
    selection::{
        CountrySelected, GlobePicker, PointerEvent, SelectionChanged, SelectionMachine,
        SelectionRequest, handle_selection_requests, publish_change,
    },
    settings::GlobeConfig,
    types::{GeoCoord, ray_sphere_intersection},
};

pub struct InteractionSystemPlugin;

impl Plugin for InteractionSystemPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SelectionChanged>()
            .add_event::<CountrySelected>()
            .add_event::<SelectionRequest>()
            .add_systems(Startup, setup_selection_machine)
            .add_systems(
                Update,
                (handle_mouse, handle_selection_requests)
                    .chain()
                    .in_set(GlobeSet::Selection)
                    .run_if(not(in_state(GlobeLoadState::Loading))),
            );
    }
}

/// Hit-tests against the globe sphere as seen through a Bevy camera.
pub struct CameraPicker<'a> {
    pub camera: &'a Camera,
    pub transform: &'a GlobalTransform,
    pub radius: f32,
}

impl GlobePicker for CameraPicker<'_> {
    fn pick(&self, screen: Vec2) -> Option<GeoCoord> {
        let ray = self.camera.viewport_to_world(self.transform, screen).ok()?;
        let hit = ray_sphere_intersection(
            ray.origin.as_dvec3(),
            ray.direction.as_vec3().as_dvec3(),
            DVec3::ZERO,
            self.radius as f64,
        )?;
        GeoCoord::from_cartesian(hit)
    }
}

fn setup_selection_machine(mut commands: Commands, config: Res<GlobeConfig>) {
    commands.insert_resource(SelectionMachine::new(config.drag_threshold_px));
}

/// Turns this frame's mouse state into pointer events for the selection
/// machine. Release is always followed by a click at the same position.
fn handle_mouse(
    buttons: Res<ButtonInput<MouseButton>>,
    q_windows: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    block: Res<EguiBlockInputState>,
    config: Res<GlobeConfig>,
    store: Res<GeometryStore>,
    mut machine: ResMut<SelectionMachine>,
    mut last_cursor: Local<Option<Vec2>>,
    mut changed: EventWriter<SelectionChanged>,
    mut selected: EventWriter<CountrySelected>,
) {
    let Ok(window) = q_windows.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };
    let Some(position) = window.cursor_position() else {
        *last_cursor = None;
        return;
    };
    let moved = last_cursor.is_some_and(|last| last != position);
    *last_cursor = Some(position);

    if block.block_input {
        return;
    }

    let picker = CameraPicker {
        camera,
        transform: camera_transform,
        radius: config.globe_radius,
    };

    let mut events = Vec::with_capacity(3);
    if buttons.just_pressed(MouseButton::Left) {
        events.push(PointerEvent::Down(position));
    }
    if moved {
        events.push(PointerEvent::Move {
            position,
            primary_held: buttons.pressed(MouseButton::Left) && !buttons.just_pressed(MouseButton::Left),
        });
    }
    if buttons.just_released(MouseButton::Left) {
        events.push(PointerEvent::Up(position));
        events.push(PointerEvent::Click(position));
    }

    for event in events {
        if let Some(change) = machine.handle_pointer(event, &picker, &store) {
            publish_change(change, &store, &mut changed, &mut selected);
        }
    }
}
