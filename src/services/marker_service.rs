use std::collections::HashMap;

use crate::models::{Location, MapMarker, MapViewport, Memory};

// Below these deltas a pushed viewport is considered an echo of what the
// widget already shows and is suppressed.
pub const COORD_EPSILON: f64 = 1e-4;
pub const ZOOM_EPSILON: f64 = 0.1;

// The rendering widget is a passive view; the reconciler is the only code
// path allowed to touch marker handles.
pub trait MapWidget {
    fn add_marker(&mut self, id: &str, latitude: f64, longitude: f64, selected: bool);
    fn remove_marker(&mut self, id: &str);
    fn set_marker_selected(&mut self, id: &str, selected: bool);
    fn set_view(&mut self, viewport: &MapViewport);
}

// Diffs the visible memory list against the rendered marker set. Surviving
// handles are restyled in place, never recreated, so marker identity (and
// any widget-side animation state) is preserved across passes.
#[derive(Default)]
pub struct MarkerReconciler {
    markers: HashMap<String, MapMarker>,
    widget_viewport: Option<MapViewport>,
}

impl MarkerReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    // Postcondition: the marker key set equals the visible memory id set.
    pub fn reconcile(
        &mut self,
        visible: &[Memory],
        selected_id: Option<&str>,
        widget: &mut dyn MapWidget,
    ) {
        let stale: Vec<String> = self
            .markers
            .keys()
            .filter(|id| !visible.iter().any(|m| &m.id == *id))
            .cloned()
            .collect();
        for id in stale {
            self.markers.remove(&id);
            widget.remove_marker(&id);
        }

        for memory in visible {
            let selected = selected_id == Some(memory.id.as_str());
            match self.markers.get_mut(&memory.id) {
                Some(marker) => {
                    if marker.selected != selected {
                        marker.selected = selected;
                        widget.set_marker_selected(&memory.id, selected);
                    }
                }
                None => {
                    self.markers.insert(
                        memory.id.clone(),
                        MapMarker {
                            latitude: memory.location.latitude,
                            longitude: memory.location.longitude,
                            selected,
                        },
                    );
                    widget.add_marker(
                        &memory.id,
                        memory.location.latitude,
                        memory.location.longitude,
                        selected,
                    );
                }
            }
        }
    }

    // A click is reported upward for the creation flow; markers stay as
    // they are.
    pub fn map_clicked(&self, latitude: f64, longitude: f64) -> Location {
        Location::from_coordinates(latitude, longitude)
    }

    // The widget told us where it moved; that viewport becomes authoritative
    // upstream, and is remembered so it is never echoed back.
    pub fn widget_moved(&mut self, viewport: MapViewport) -> MapViewport {
        self.widget_viewport = Some(viewport);
        viewport
    }

    pub fn apply_viewport(&mut self, viewport: &MapViewport, widget: &mut dyn MapWidget) {
        if let Some(known) = self.widget_viewport {
            let unchanged = (known.latitude - viewport.latitude).abs() <= COORD_EPSILON
                && (known.longitude - viewport.longitude).abs() <= COORD_EPSILON
                && (known.zoom - viewport.zoom).abs() <= ZOOM_EPSILON;
            if unchanged {
                return;
            }
        }
        self.widget_viewport = Some(*viewport);
        widget.set_view(viewport);
    }

    pub fn markers(&self) -> &HashMap<String, MapMarker> {
        &self.markers
    }
}
