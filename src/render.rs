//! Render pipeline: editor state in, draw commands out.
//!
//! [`render`] is a pure function of [`EditorState`]. The resulting
//! [`Frame`] is backend-agnostic; a web canvas, a GPU front end or a test
//! can replay the commands in order.

use boxlab_api::ImageId;
use serde::Serialize;

use crate::color_utils::{Rgba, class_color};
use crate::constants::draw;
use crate::editor::EditorState;
use crate::geometry::{Handle, ScreenRect, to_screen};

/// One drawing primitive, in screen pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Clear the whole canvas.
    Clear { width: f64, height: f64 },
    /// Draw the loaded image scaled into `rect`.
    Image { image_id: ImageId, rect: ScreenRect },
    StrokeRect {
        rect: ScreenRect,
        color: Rgba,
        line_width: f64,
        dashed: bool,
    },
    FillRect { rect: ScreenRect, color: Rgba },
    /// Text anchored at its left baseline.
    Text {
        x: f64,
        y: f64,
        text: String,
        color: Rgba,
        font_size: f64,
    },
}

/// Everything needed to paint one frame, plus status-bar values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub commands: Vec<DrawCommand>,
    pub annotation_count: usize,
    pub zoom_percent: u32,
}

impl Frame {
    fn empty(zoom_percent: u32) -> Self {
        Self {
            commands: Vec::new(),
            annotation_count: 0,
            zoom_percent,
        }
    }
}

/// Build the frame for the current state.
///
/// Annotations whose class is unknown are skipped. Without a loaded image
/// the frame is empty.
pub fn render(state: &EditorState) -> Frame {
    let zoom_percent = state.transform.zoom_percent();
    let Some(image) = &state.image else {
        return Frame::empty(zoom_percent);
    };

    let canvas = state.canvas;
    let transform = state.transform;
    let mut commands = vec![
        DrawCommand::Clear {
            width: canvas.width,
            height: canvas.height,
        },
        DrawCommand::Image {
            image_id: image.id,
            rect: transform.apply_rect(&ScreenRect::new(0.0, 0.0, canvas.width, canvas.height)),
        },
    ];

    for annotation in state.store.list() {
        let Some(class) = state.class(annotation.class_id) else {
            continue;
        };
        let color = class_color(&class.color);
        let selected = state.selected == Some(annotation.id);
        let rect = transform.apply_rect(&to_screen(&annotation.geometry, canvas));

        commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            line_width: if selected {
                draw::STROKE_SELECTED
            } else {
                draw::STROKE
            },
            dashed: false,
        });
        push_label(&mut commands, &rect, &class.name, color);

        if selected {
            for handle in Handle::resize_handles() {
                let p = annotation.geometry.handle_position(handle);
                let (x, y) = transform.apply(p.x * canvas.width, p.y * canvas.height);
                commands.push(DrawCommand::FillRect {
                    rect: ScreenRect::centered_square(x, y, draw::HANDLE_SIZE),
                    color,
                });
            }
        }
    }

    if let Some(preview) = state.interaction.preview_box() {
        let color = state
            .current_class
            .and_then(|id| state.class(id))
            .map_or(Rgba::DEFAULT_RED, |class| class_color(&class.color));
        commands.push(DrawCommand::StrokeRect {
            rect: transform.apply_rect(&to_screen(&preview, canvas)),
            color,
            line_width: draw::STROKE,
            dashed: true,
        });
    }

    Frame {
        commands,
        annotation_count: state.store.len(),
        zoom_percent,
    }
}

/// Filled chip with the class name, sitting on the box's top edge.
fn push_label(commands: &mut Vec<DrawCommand>, rect: &ScreenRect, name: &str, color: Rgba) {
    let text_width = name.chars().count() as f64 * draw::LABEL_CHAR_WIDTH;
    commands.push(DrawCommand::FillRect {
        rect: ScreenRect::new(
            rect.x,
            rect.y - draw::LABEL_HEIGHT,
            text_width + 2.0 * draw::LABEL_PADDING,
            draw::LABEL_HEIGHT,
        ),
        color,
    });
    commands.push(DrawCommand::Text {
        x: rect.x + draw::LABEL_PADDING,
        y: rect.y - draw::LABEL_BASELINE,
        text: name.to_string(),
        color: Rgba::WHITE,
        font_size: draw::LABEL_FONT_SIZE,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, LabelClass};
    use crate::editor::LoadedImage;
    use crate::geometry::{BoxGeometry, CanvasSize, Point};
    use crate::interaction::Interaction;
    use crate::zoom_math::Transform;

    fn state() -> EditorState {
        let mut state = EditorState::default();
        state.set_classes(vec![LabelClass::new(1, "cat", "#00ff00")]);
        state.load(
            LoadedImage::placeholder(9, "x.png", 1000, 500),
            vec![
                Annotation::manual(1, 1, BoxGeometry::new(0.5, 0.5, 0.25, 0.25)),
                // Class 2 does not exist: skipped.
                Annotation::manual(2, 2, BoxGeometry::new(0.2, 0.2, 0.1, 0.1)),
            ],
        );
        state.canvas = CanvasSize::new(1000.0, 500.0);
        state
    }

    fn strokes(frame: &Frame) -> Vec<&DrawCommand> {
        frame
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokeRect { .. }))
            .collect()
    }

    #[test]
    fn test_empty_without_image() {
        let frame = render(&EditorState::default());
        assert!(frame.commands.is_empty());
        assert_eq!(frame.annotation_count, 0);
        assert_eq!(frame.zoom_percent, 100);
    }

    #[test]
    fn test_unknown_class_is_skipped() {
        let frame = render(&state());
        assert_eq!(strokes(&frame).len(), 1);
        // The count still reflects the store.
        assert_eq!(frame.annotation_count, 2);
    }

    #[test]
    fn test_box_stroke_and_label() {
        let frame = render(&state());
        assert_eq!(frame.commands[0], DrawCommand::Clear { width: 1000.0, height: 500.0 });
        assert_eq!(
            frame.commands[2],
            DrawCommand::StrokeRect {
                rect: ScreenRect::new(375.0, 187.5, 250.0, 125.0),
                color: Rgba::rgb(0, 255, 0),
                line_width: 2.0,
                dashed: false,
            }
        );
        assert_eq!(
            frame.commands[3],
            DrawCommand::FillRect {
                rect: ScreenRect::new(375.0, 163.5, 36.0, 24.0),
                color: Rgba::rgb(0, 255, 0),
            }
        );
        let DrawCommand::Text { x, y, text, .. } = &frame.commands[4] else {
            panic!("expected label text");
        };
        assert_eq!((*x, *y, text.as_str()), (381.0, 181.5, "cat"));
    }

    #[test]
    fn test_selected_box_has_handles() {
        let mut state = state();
        state.select(1);
        let frame = render(&state);
        let handles = frame
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillRect { rect, .. } if rect.w == 8.0 && rect.h == 8.0))
            .count();
        assert_eq!(handles, 8);
        let stroke = strokes(&frame)[0];
        let DrawCommand::StrokeRect { line_width, .. } = stroke else {
            unreachable!();
        };
        assert_eq!(*line_width, 3.0);
    }

    #[test]
    fn test_preview_is_dashed() {
        let mut state = state();
        state.interaction = Interaction::Drawing {
            anchor: Point::new(0.125, 0.125),
            current: Point::new(0.375, 0.25),
        };
        let frame = render(&state);
        let last = frame.commands.last().expect("preview");
        assert_eq!(
            *last,
            DrawCommand::StrokeRect {
                rect: ScreenRect::new(125.0, 62.5, 250.0, 62.5),
                color: Rgba::rgb(0, 255, 0),
                line_width: 2.0,
                dashed: true,
            }
        );
    }

    #[test]
    fn test_zoom_scales_image_and_boxes() {
        let mut state = state();
        state.transform = Transform::new(2.0, 0.0, 0.0);
        let frame = render(&state);
        assert_eq!(frame.zoom_percent, 200);
        assert_eq!(
            frame.commands[1],
            DrawCommand::Image {
                image_id: 9,
                rect: ScreenRect::new(0.0, 0.0, 2000.0, 1000.0),
            }
        );
        let stroke = strokes(&frame)[0];
        let DrawCommand::StrokeRect { rect, .. } = stroke else {
            unreachable!();
        };
        assert_eq!(*rect, ScreenRect::new(750.0, 375.0, 500.0, 250.0));
    }

    #[test]
    fn test_frame_serializes_with_op_tags() {
        let value = serde_json::to_value(render(&state())).expect("serialize");
        assert_eq!(value["commands"][0]["op"], "clear");
        assert_eq!(value["commands"][2]["op"], "stroke_rect");
    }
}
