use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task};
use bevy_tasks::futures_lite::future;
use crossbeam_channel::{Receiver, TryRecvError, bounded};

use crate::{
    error::GlobeResult,
    globe::GlobeSet,
    settings::GlobeConfig,
    types::CountryFeature,
};

use super::{GeometryStore, load_countries};

/// Lifecycle of the one-off boundary load. Input and animations only run once
/// this has left `Loading`.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlobeLoadState {
    #[default]
    Loading,
    Ready,
    Failed,
}

#[derive(Resource, Deref)]
pub struct GeometryReceiver(Receiver<GlobeResult<Vec<CountryFeature>>>);

#[derive(Component)]
struct LoadTask(Task<()>);

pub fn start_geometry_load(mut commands: Commands, config: Res<GlobeConfig>) {
    let source = config.geometry_source.clone();
    let keys = config.property_keys.clone();
    let (tx, rx) = bounded(1);

    info!("Loading country boundaries from {source}");
    let task = IoTaskPool::get().spawn(async move {
        let _ = tx.send(load_countries(&source, &keys));
    });

    commands.spawn(LoadTask(task));
    commands.insert_resource(GeometryReceiver(rx));
}

pub fn read_geometry_receiver(
    mut commands: Commands,
    receiver: Option<Res<GeometryReceiver>>,
    mut next_state: ResMut<NextState<GlobeLoadState>>,
) {
    let Some(receiver) = receiver else {
        return;
    };
    match receiver.try_recv() {
        Err(TryRecvError::Empty) => return,
        Err(TryRecvError::Disconnected) => {
            error!("Boundary loader exited without a result");
            next_state.set(GlobeLoadState::Failed);
        }
        Ok(Ok(features)) => {
            info!("Loaded {} countries", features.len());
            commands.insert_resource(GeometryStore::new(features));
            next_state.set(GlobeLoadState::Ready);
        }
        Ok(Err(err)) => {
            // No retry: the globe stays up without country shapes.
            error!("Failed to load country boundaries: {err}");
            next_state.set(GlobeLoadState::Failed);
        }
    }
    commands.remove_resource::<GeometryReceiver>();
}

fn cleanup_tasks(mut commands: Commands, mut tasks: Query<(Entity, &mut LoadTask)>) {
    for (entity, mut task) in tasks.iter_mut() {
        if future::block_on(future::poll_once(&mut task.0)).is_some() {
            commands.entity(entity).despawn();
        }
    }
}

pub struct GeometryPlugin;

impl Plugin for GeometryPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GlobeLoadState>()
            .init_resource::<GeometryStore>()
            .add_systems(Startup, start_geometry_load)
            .add_systems(
                Update,
                read_geometry_receiver
                    .in_set(GlobeSet::Load)
                    .run_if(in_state(GlobeLoadState::Loading)),
            )
            .add_systems(Update, cleanup_tasks);
    }
}

#[cfg(test)]
mod tests {
    use bevy::state::app::StatesPlugin;
    use crossbeam_channel::Sender;

    use super::*;
    use crate::error::GlobeError;
    use crate::geometry::{PropertyKeys, parse_countries};
    use crate::geometry::loader::tests::EUROPE;

    type Loaded = GlobeResult<Vec<CountryFeature>>;

    fn loading_app() -> (App, Sender<Loaded>) {
        let (tx, rx) = bounded(1);
        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .init_state::<GlobeLoadState>()
            .init_resource::<GeometryStore>()
            .insert_resource(GeometryReceiver(rx))
            .add_systems(Update, read_geometry_receiver);
        (app, tx)
    }

    fn load_state(app: &App) -> GlobeLoadState {
        app.world().resource::<State<GlobeLoadState>>().get().clone()
    }

    #[test]
    fn waits_while_the_loader_is_running() {
        let (mut app, _tx) = loading_app();
        app.update();
        app.update();
        assert_eq!(load_state(&app), GlobeLoadState::Loading);
        assert!(app.world().contains_resource::<GeometryReceiver>());
    }

    #[test]
    fn loaded_features_fill_the_store() {
        let (mut app, tx) = loading_app();
        let features = parse_countries(EUROPE, &PropertyKeys::default()).unwrap();
        let count = features.len();
        tx.send(Ok(features)).unwrap();

        app.update();
        app.update();

        assert_eq!(load_state(&app), GlobeLoadState::Ready);
        let store = app.world().resource::<GeometryStore>();
        assert_eq!(store.len(), count);
        assert!(store.find_by_code("DE").is_some());
        assert!(!app.world().contains_resource::<GeometryReceiver>());
    }

    #[test]
    fn load_error_fails_with_an_empty_store() {
        let (mut app, tx) = loading_app();
        tx.send(Err(GlobeError::NotFeatureCollection)).unwrap();

        app.update();
        app.update();

        assert_eq!(load_state(&app), GlobeLoadState::Failed);
        assert!(app.world().resource::<GeometryStore>().is_empty());
        assert!(!app.world().contains_resource::<GeometryReceiver>());
    }

    #[test]
    fn vanished_loader_fails() {
        let (mut app, tx) = loading_app();
        drop(tx);

        app.update();
        app.update();

        assert_eq!(load_state(&app), GlobeLoadState::Failed);
        assert!(app.world().resource::<GeometryStore>().is_empty());
        assert!(!app.world().contains_resource::<GeometryReceiver>());
    }
}
