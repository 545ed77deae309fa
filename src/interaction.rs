//! Pointer interaction state machine.
//!
//! Pointer positions arrive in screen pixels relative to the canvas element
//! and are converted to normalized image space through the view transform.
//! Drawing and handle drags only touch history when the gesture ends.

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch};
use crate::editor::EditorState;
use crate::geometry::{BoxGeometry, Handle, Point, hit_test_handle};

/// Current pointer interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    /// Rubber-banding a new box from `anchor` to `current`.
    Drawing { anchor: Point, current: Point },
    /// Dragging a handle of the selected box; `last` is the previous pointer position.
    Dragging { handle: Handle, last: Point },
}

impl Interaction {
    /// The box being drawn, if any.
    pub fn preview_box(&self) -> Option<BoxGeometry> {
        match self {
            Interaction::Drawing { anchor, current } => Some(BoxGeometry::from_corners(*anchor, *current)),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }
}

/// A pointer event in canvas-element pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    /// Positive `delta_y` scrolls down (zoom out).
    Wheel { delta_y: f64 },
}

/// What a pointer event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing visible changed.
    None,
    /// Selection, preview or view changed; redraw.
    Redraw,
    /// A new box was added (history pushed).
    Created(AnnotationId),
    /// A drag finished on this box (history pushed).
    Edited(AnnotationId),
}

/// Feed one pointer event through the state machine.
pub fn handle_pointer(state: &mut EditorState, event: PointerEvent) -> Transition {
    // A zero-sized canvas cannot map pointer positions.
    if state.image.is_none() || !state.canvas.is_valid() {
        return Transition::None;
    }

    match event {
        PointerEvent::Down { x, y } => {
            let p = state.pointer_to_normalized(x, y);
            pointer_down(state, p)
        }
        PointerEvent::Move { x, y } => {
            let p = state.pointer_to_normalized(x, y);
            pointer_move(state, p)
        }
        PointerEvent::Up { x, y } => {
            let p = state.pointer_to_normalized(x, y);
            pointer_up(state, p)
        }
        PointerEvent::Wheel { delta_y } => {
            state.wheel(delta_y);
            log::debug!("🔍 Zoom {}%", state.transform.zoom_percent());
            Transition::Redraw
        }
    }
}

fn pointer_down(state: &mut EditorState, p: Point) -> Transition {
    // A handle of the selected box takes priority over everything else.
    if let Some(selected) = state.selected_annotation() {
        if let Some(handle) = hit_test_handle(p, &selected.geometry, state.settings.handle_radius) {
            log::debug!("✋ Drag {} on annotation {}", handle.name(), selected.id);
            state.interaction = Interaction::Dragging { handle, last: p };
            return Transition::None;
        }
    }

    if let Some(id) = state.store.hit_test(p) {
        state.selected = Some(id);
        state.interaction = Interaction::Idle;
        return Transition::Redraw;
    }

    state.selected = None;
    state.interaction = Interaction::Drawing { anchor: p, current: p };
    Transition::Redraw
}

fn pointer_move(state: &mut EditorState, p: Point) -> Transition {
    match state.interaction {
        Interaction::Idle => Transition::None,
        Interaction::Drawing { anchor, .. } => {
            state.interaction = Interaction::Drawing { anchor, current: p };
            Transition::Redraw
        }
        Interaction::Dragging { handle, last } => {
            let Some(selected) = state.selected_annotation() else {
                state.interaction = Interaction::Idle;
                return Transition::None;
            };
            let (id, geometry) = (selected.id, selected.geometry);
            let moved = geometry.apply_handle_drag(handle, p.x - last.x, p.y - last.y, state.settings.min_box_size);
            state.store.update(id, AnnotationPatch::geometry(moved));
            state.interaction = Interaction::Dragging { handle, last: p };
            Transition::Redraw
        }
    }
}

fn pointer_up(state: &mut EditorState, p: Point) -> Transition {
    let interaction = std::mem::take(&mut state.interaction);
    match interaction {
        Interaction::Idle => Transition::None,
        Interaction::Dragging { .. } => {
            state.commit_history();
            match state.selected {
                Some(id) => Transition::Edited(id),
                None => Transition::Redraw,
            }
        }
        Interaction::Drawing { anchor, .. } => {
            let geometry = BoxGeometry::from_corners(anchor, p);
            if !geometry.meets_min_size(state.settings.min_box_size) {
                log::debug!("Discarded box below minimum size");
                return Transition::Redraw;
            }
            let Some(class_id) = state.current_class else {
                log::debug!("Discarded box: no class selected");
                return Transition::Redraw;
            };
            let id = state.apply_mutation(|store| {
                let id = store.allocate_id();
                store.add(Annotation::manual(id, class_id, geometry));
                id
            });
            log::debug!("➕ Created annotation {} (class {})", id, class_id);
            Transition::Created(id)
        }
    }
}

/// CSS cursor for a hover position (canvas-element pixels).
pub fn cursor_hint(state: &EditorState, x: f64, y: f64) -> &'static str {
    match state.interaction {
        Interaction::Drawing { .. } => "crosshair",
        Interaction::Dragging { handle, .. } => handle.cursor(),
        Interaction::Idle => {
            let p = state.pointer_to_normalized(x, y);
            match state.selected_annotation() {
                Some(selected) => hit_test_handle(p, &selected.geometry, state.settings.handle_radius)
                    .map_or("default", |handle| handle.cursor()),
                None if state.store.hit_test(p).is_some() => "pointer",
                None => "crosshair",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::LabelClass;
    use crate::editor::LoadedImage;
    use crate::geometry::CanvasSize;
    use crate::zoom_math::Transform;

    /// A 1000x500 canvas so normalized coordinates are easy to read.
    fn state() -> EditorState {
        let mut state = EditorState::default();
        state.set_classes(vec![LabelClass::new(7, "car", "#00f")]);
        state.load(LoadedImage::placeholder(1, "img.png", 1000, 500), Vec::new());
        state.canvas = CanvasSize::new(1000.0, 500.0);
        state
    }

    fn px(state: &EditorState, nx: f64, ny: f64) -> (f64, f64) {
        (nx * state.canvas.width, ny * state.canvas.height)
    }

    fn gesture(state: &mut EditorState, from: (f64, f64), to: (f64, f64)) -> Transition {
        let (fx, fy) = px(state, from.0, from.1);
        let (tx, ty) = px(state, to.0, to.1);
        handle_pointer(state, PointerEvent::Down { x: fx, y: fy });
        handle_pointer(state, PointerEvent::Move { x: tx, y: ty });
        handle_pointer(state, PointerEvent::Up { x: tx, y: ty })
    }

    #[test]
    fn test_draw_creates_annotation() {
        let mut state = state();
        let transition = gesture(&mut state, (0.4, 0.4), (0.6, 0.6));
        let Transition::Created(id) = transition else {
            panic!("expected a new box, got {:?}", transition);
        };
        let ann = state.store.get(id).expect("created");
        assert_eq!(ann.class_id, 7);
        assert_eq!(ann.confidence, 1.0);
        assert!(!ann.is_predicted);
        assert!((ann.geometry.x_center - 0.5).abs() < 1e-9);
        assert!((ann.geometry.width - 0.2).abs() < 1e-9);
        assert_eq!(state.history.undo_count(), 1);
        assert!(state.interaction.is_idle());
    }

    #[test]
    fn test_small_gesture_is_discarded() {
        let mut state = state();
        assert_eq!(gesture(&mut state, (0.4, 0.4), (0.405, 0.6)), Transition::Redraw);
        assert_eq!(gesture(&mut state, (0.4, 0.4), (0.6, 0.41)), Transition::Redraw);
        assert!(state.store.is_empty());
        assert!(!state.history.can_undo());
    }

    #[test]
    fn test_no_class_discards_box() {
        let mut state = state();
        state.set_classes(Vec::new());
        gesture(&mut state, (0.1, 0.1), (0.5, 0.5));
        assert!(state.store.is_empty());
    }

    #[test]
    fn test_preview_follows_pointer() {
        let mut state = state();
        let (x, y) = px(&state, 0.2, 0.2);
        handle_pointer(&mut state, PointerEvent::Down { x, y });
        let (x, y) = px(&state, 0.1, 0.4);
        handle_pointer(&mut state, PointerEvent::Move { x, y });
        let preview = state.interaction.preview_box().expect("drawing");
        assert!((preview.x_center - 0.15).abs() < 1e-9);
        assert!((preview.height - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_click_selects_topmost() {
        let mut state = state();
        gesture(&mut state, (0.3, 0.3), (0.5, 0.5));
        // Anchored outside the first box so the gesture draws instead of selecting.
        let Transition::Created(top) = gesture(&mut state, (0.6, 0.6), (0.4, 0.4)) else {
            panic!("expected a new box");
        };
        let (x, y) = px(&state, 0.45, 0.45);
        assert_eq!(handle_pointer(&mut state, PointerEvent::Down { x, y }), Transition::Redraw);
        handle_pointer(&mut state, PointerEvent::Up { x, y });
        assert_eq!(state.selected, Some(top));
        assert_eq!(state.store.len(), 2);
    }

    #[test]
    fn test_click_empty_space_deselects() {
        let mut state = state();
        let Transition::Created(id) = gesture(&mut state, (0.4, 0.4), (0.6, 0.6)) else {
            panic!("expected a new box");
        };
        state.select(id);
        let (x, y) = px(&state, 0.9, 0.1);
        handle_pointer(&mut state, PointerEvent::Down { x, y });
        assert_eq!(state.selected, None);
        assert!(matches!(state.interaction, Interaction::Drawing { .. }));
    }

    #[test]
    fn test_drag_se_handle_pushes_one_snapshot() {
        let mut state = state();
        let Transition::Created(id) = gesture(&mut state, (0.4, 0.4), (0.6, 0.6)) else {
            panic!("expected a new box");
        };
        state.select(id);
        let before = state.history.len();

        let (x, y) = px(&state, 0.6, 0.6);
        assert_eq!(handle_pointer(&mut state, PointerEvent::Down { x, y }), Transition::None);
        for step in 1..=4 {
            let (x, y) = px(&state, 0.6 + 0.025 * f64::from(step), 0.6);
            handle_pointer(&mut state, PointerEvent::Move { x, y });
        }
        assert_eq!(state.history.len(), before, "moves do not touch history");
        let (x, y) = px(&state, 0.7, 0.6);
        assert_eq!(handle_pointer(&mut state, PointerEvent::Up { x, y }), Transition::Edited(id));
        assert_eq!(state.history.len(), before + 1);

        let g = state.store.get(id).expect("exists").geometry;
        assert!((g.width - 0.3).abs() < 1e-9);
        assert!((g.x_center - 0.55).abs() < 1e-9);
        assert!((g.left() - 0.4).abs() < 1e-9);
        assert!((g.top() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_resize_past_opposite_edge_stays_selectable() {
        let mut state = state();
        let Transition::Created(id) = gesture(&mut state, (0.4, 0.4), (0.6, 0.6)) else {
            panic!("expected a new box");
        };
        state.select(id);
        gesture(&mut state, (0.6, 0.6), (0.3, 0.3));

        let g = state.store.get(id).expect("exists").geometry;
        assert!(g.width > 0.0 && g.height > 0.0);
        assert!((g.left() - 0.4).abs() < 1e-9);
        assert!((g.top() - 0.4).abs() < 1e-9);
        let saved = state.store.to_save_request();
        assert!(saved.annotations.iter().all(|b| b.width > 0.0 && b.height > 0.0));

        state.deselect();
        let c = g.center();
        let (x, y) = px(&state, c.x, c.y);
        handle_pointer(&mut state, PointerEvent::Down { x, y });
        handle_pointer(&mut state, PointerEvent::Up { x, y });
        assert_eq!(state.selected, Some(id));
    }

    #[test]
    fn test_move_drag_can_leave_image() {
        let mut state = state();
        let Transition::Created(id) = gesture(&mut state, (0.8, 0.8), (0.9, 0.9)) else {
            panic!("expected a new box");
        };
        state.select(id);
        let (x, y) = px(&state, 0.85, 0.85);
        handle_pointer(&mut state, PointerEvent::Down { x, y });
        let (x, y) = px(&state, 1.05, 0.85);
        handle_pointer(&mut state, PointerEvent::Move { x, y });
        handle_pointer(&mut state, PointerEvent::Up { x, y });
        let g = state.store.get(id).expect("exists").geometry;
        assert!(g.right() > 1.0);
    }

    #[test]
    fn test_wheel_zooms_without_history() {
        let mut state = state();
        assert_eq!(handle_pointer(&mut state, PointerEvent::Wheel { delta_y: -1.0 }), Transition::Redraw);
        assert!((state.transform.zoom - 1.1).abs() < 1e-9);
        assert!(!state.history.can_undo());
    }

    #[test]
    fn test_draw_under_zoom_maps_through_transform() {
        let mut state = state();
        state.transform = Transform::new(2.0, 0.0, 0.0);
        // Screen (400,200)-(600,400) at 2x is canvas (200,100)-(300,200).
        handle_pointer(&mut state, PointerEvent::Down { x: 400.0, y: 200.0 });
        handle_pointer(&mut state, PointerEvent::Move { x: 600.0, y: 400.0 });
        let Transition::Created(id) = handle_pointer(&mut state, PointerEvent::Up { x: 600.0, y: 400.0 }) else {
            panic!("expected a new box");
        };
        let g = state.store.get(id).expect("exists").geometry;
        assert!((g.left() - 0.2).abs() < 1e-9);
        assert!((g.width - 0.1).abs() < 1e-9);
        assert!((g.top() - 0.2).abs() < 1e-9);
        assert!((g.height - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_events_ignored_without_image() {
        let mut state = EditorState::default();
        assert_eq!(handle_pointer(&mut state, PointerEvent::Down { x: 1.0, y: 1.0 }), Transition::None);
        assert!(state.interaction.is_idle());
    }

    #[test]
    fn test_events_ignored_on_empty_canvas() {
        let mut state = state();
        state.canvas = CanvasSize::new(0.0, 0.0);
        assert_eq!(handle_pointer(&mut state, PointerEvent::Down { x: 1.0, y: 1.0 }), Transition::None);
        assert!(state.interaction.is_idle());
        assert!(state.store.is_empty());
    }

    #[test]
    fn test_cursor_hints() {
        let mut state = state();
        let (x, y) = px(&state, 0.1, 0.1);
        assert_eq!(cursor_hint(&state, x, y), "crosshair");

        let Transition::Created(id) = gesture(&mut state, (0.4, 0.4), (0.6, 0.6)) else {
            panic!("expected a new box");
        };
        let (x, y) = px(&state, 0.5, 0.5);
        assert_eq!(cursor_hint(&state, x, y), "pointer");

        state.select(id);
        assert_eq!(cursor_hint(&state, x, y), "move");
        let (x, y) = px(&state, 0.4, 0.4);
        assert_eq!(cursor_hint(&state, x, y), "nw-resize");
        let (x, y) = px(&state, 0.1, 0.1);
        assert_eq!(cursor_hint(&state, x, y), "default");
    }
}
