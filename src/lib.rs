//! boxlab - bounding-box annotation editor core
//!
//! The editing model behind an image annotation canvas: normalized box
//! geometry, an undoable annotation store, the pointer state machine, a
//! backend-agnostic render pipeline, ML label assist and the session that
//! loads and saves images through the annotation backend.

pub mod annotation;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod keybindings;
pub mod label_assist;
pub mod render;
pub mod session;
pub mod undo;
pub mod zoom_math;

pub use annotation::{Annotation, AnnotationId, AnnotationPatch, AnnotationStore, LabelClass};
pub use config::AppConfig;
pub use editor::{Direction, EditorSettings, EditorState, KeyOutcome, LoadedImage};
pub use error::SessionError;
pub use geometry::{BoxGeometry, CanvasSize, Handle, Point};
pub use interaction::{Interaction, PointerEvent, Transition};
pub use keybindings::{EditorAction, Key, KeyBindings, KeyEvent};
pub use label_assist::{AssistConfig, AssistMode, LabelAssist, ModelCatalogue, ModelSelection};
pub use render::{DrawCommand, Frame};
pub use session::{ImageFilter, Notice, NoticeLevel, Session};
