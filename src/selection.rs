//! Country selection driven by pointer input or by outside requests.
//!
//! [`SelectionMachine`] is the only writer of the current selection. Every
//! transition is published as a [`SelectionChanged`] value, and successful
//! selections additionally as [`CountrySelected`] for whoever hosts the globe.

use bevy::prelude::*;

use crate::{
    geometry::GeometryStore,
    types::{CountryId, GeoCoord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected(CountryId),
}

impl SelectionState {
    pub fn selected(&self) -> Option<CountryId> {
        match self {
            SelectionState::Idle => None,
            SelectionState::Selected(id) => Some(*id),
        }
    }
}

/// Pointer input in logical window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Vec2),
    Move { position: Vec2, primary_held: bool },
    Up(Vec2),
    Click(Vec2),
}

pub trait GlobePicker {
    fn pick(&self, screen: Vec2) -> Option<GeoCoord>;
}

/// Press/move/release bookkeeping used to tell orbit drags from clicks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragGesture {
    pub origin: Option<Vec2>,
    pub dragging: bool,
}

/// Fired on every selection transition, carrying the new state.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChanged {
    pub previous: SelectionState,
    pub current: SelectionState,
}

/// Outward notification, once per successful selection. Never sent on
/// deselection.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct CountrySelected {
    pub id: CountryId,
    pub code: String,
}

/// Request from the hosting UI. Requests apply in the order they were sent.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRequest {
    Select(CountryId),
    Deselect,
}

#[derive(Resource, Debug, Clone)]
pub struct SelectionMachine {
    state: SelectionState,
    drag: DragGesture,
    drag_threshold: f32,
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl SelectionMachine {
    pub fn new(drag_threshold: f32) -> Self {
        Self {
            state: SelectionState::Idle,
            drag: DragGesture::default(),
            drag_threshold,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn drag(&self) -> DragGesture {
        self.drag
    }

    /// Feeds one pointer event through the machine. Returns the transition
    /// it caused, if any.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        picker: &impl GlobePicker,
        store: &GeometryStore,
    ) -> Option<SelectionChanged> {
        match event {
            PointerEvent::Down(position) => {
                self.drag.origin = Some(position);
                None
            }
            PointerEvent::Move { primary_held, .. } => {
                if primary_held {
                    self.drag.dragging = true;
                }
                None
            }
            PointerEvent::Up(position) => {
                // A release without a seen press keeps whatever drag state it had.
                let within = self
                    .drag
                    .origin
                    .is_some_and(|origin| origin.distance(position) <= self.drag_threshold);
                if within {
                    self.drag.dragging = false;
                }
                self.drag.origin = None;
                None
            }
            PointerEvent::Click(position) => {
                if self.drag.dragging {
                    self.drag.dragging = false;
                    return None;
                }
                let coord = picker.pick(position)?;
                let id = store.find_by_coordinate(coord)?;
                if self.state == SelectionState::Selected(id) {
                    self.transition(SelectionState::Idle)
                } else {
                    self.transition(SelectionState::Selected(id))
                }
            }
        }
    }

    /// Programmatic selection. Selecting the current country again is a no-op.
    pub fn select(&mut self, id: CountryId) -> Option<SelectionChanged> {
        if self.state == SelectionState::Selected(id) {
            return None;
        }
        self.transition(SelectionState::Selected(id))
    }

    pub fn deselect(&mut self) -> Option<SelectionChanged> {
        if self.state == SelectionState::Idle {
            return None;
        }
        self.transition(SelectionState::Idle)
    }

    fn transition(&mut self, next: SelectionState) -> Option<SelectionChanged> {
        let previous = self.state;
        self.state = next;
        Some(SelectionChanged {
            previous,
            current: next,
        })
    }
}

/// Publishes a transition: the state change always, the outward notification
/// only for a new selection.
pub fn publish_change(
    change: SelectionChanged,
    store: &GeometryStore,
    changed: &mut EventWriter<SelectionChanged>,
    selected: &mut EventWriter<CountrySelected>,
) {
    changed.write(change);
    if let SelectionState::Selected(id) = change.current {
        let code = store
            .get(id)
            .map(|feature| feature.code.clone())
            .unwrap_or_default();
        info!("Selected country {code}");
        selected.write(CountrySelected { id, code });
    } else {
        info!("Selection cleared");
    }
}

pub fn handle_selection_requests(
    mut machine: ResMut<SelectionMachine>,
    store: Res<GeometryStore>,
    mut requests: EventReader<SelectionRequest>,
    mut changed: EventWriter<SelectionChanged>,
    mut selected: EventWriter<CountrySelected>,
) {
    for request in requests.read() {
        let change = match *request {
            SelectionRequest::Select(id) if store.get(id).is_none() => {
                warn!("Ignoring selection of unknown country {id:?}");
                None
            }
            SelectionRequest::Select(id) => machine.select(id),
            SelectionRequest::Deselect => machine.deselect(),
        };
        if let Some(change) = change {
            publish_change(change, &store, &mut changed, &mut selected);
        }
    }
}
