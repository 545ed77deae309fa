//! Customizable keybindings for the editor.
//!
//! Bindings are stored as strings in the config file (`"Ctrl+z"`, `"Delete"`,
//! `"1"`) and resolved to [`EditorAction`]s at key-press time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum number of classes that can have hotkeys (1-9 keys).
pub const MAX_CLASS_HOTKEYS: usize = 9;

// ============================================================================
// Key Events
// ============================================================================

/// A key identifier, independent of any windowing library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    /// Letters compare case-insensitively (Shift+Z still undoes).
    fn normalized(self) -> Self {
        match self {
            Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
            other => other,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Enter => write!(f, "Enter"),
            Key::Escape => write!(f, "Escape"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Tab => write!(f, "Tab"),
            Key::Space => write!(f, "Space"),
            Key::ArrowUp => write!(f, "ArrowUp"),
            Key::ArrowDown => write!(f, "ArrowDown"),
            Key::ArrowLeft => write!(f, "ArrowLeft"),
            Key::ArrowRight => write!(f, "ArrowRight"),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Backspace" => Key::Backspace,
            "Delete" | "Del" => Key::Delete,
            "Tab" => Key::Tab,
            "Space" => Key::Space,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(format!("unknown key '{}'", s)),
                }
            }
        };
        Ok(key.normalized())
    }
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Where keyboard focus was when the key was pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusTarget {
    #[default]
    Canvas,
    /// A text field; editor shortcuts are suppressed.
    TextInput,
    /// A dropdown; editor shortcuts are suppressed.
    Select,
}

/// A key press as delivered by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub focus: FocusTarget,
}

impl KeyEvent {
    /// A plain key press on the canvas.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
            focus: FocusTarget::Canvas,
        }
    }

    /// The same key with Ctrl held.
    pub fn ctrl(key: Key) -> Self {
        Self {
            modifiers: Modifiers {
                ctrl: true,
                ..Default::default()
            },
            ..Self::new(key)
        }
    }

    pub fn with_focus(self, focus: FocusTarget) -> Self {
        Self { focus, ..self }
    }
}

// ============================================================================
// Bindings
// ============================================================================

/// A key plus the Ctrl requirement, written as `"Ctrl+z"` or `"Delete"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyChord {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        Self {
            key: key.normalized(),
            ctrl: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key: key.normalized(),
            ctrl: true,
        }
    }

    /// Whether a key event triggers this chord.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key.normalized() && self.ctrl == event.modifiers.ctrl
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+{}", self.key)
        } else {
            write!(f, "{}", self.key)
        }
    }
}

impl FromStr for KeyChord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // "Ctrl++" binds the plus key.
        match s.split_once('+') {
            Some((modifier, key)) if !key.is_empty() => {
                if !modifier.eq_ignore_ascii_case("ctrl") {
                    return Err(format!("unsupported modifier '{}'", modifier));
                }
                Ok(Self::ctrl(key.parse()?))
            }
            _ => Ok(Self::plain(s.parse()?)),
        }
    }
}

impl TryFrom<String> for KeyChord {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyChord> for String {
    fn from(chord: KeyChord) -> Self {
        chord.to_string()
    }
}

/// Something the keyboard can ask the editor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    DeleteSelected,
    Deselect,
    /// Select the class at this 0-based index (and reassign the selection).
    SelectClass(usize),
    PreviousImage,
    NextImage,
    Undo,
    Redo,
    Save,
}

/// Keybinding configuration for the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub delete: Vec<KeyChord>,
    pub deselect: Vec<KeyChord>,
    pub previous_image: Vec<KeyChord>,
    pub next_image: Vec<KeyChord>,
    pub undo: Vec<KeyChord>,
    pub redo: Vec<KeyChord>,
    pub save: Vec<KeyChord>,
    /// Hotkeys for class selection; position is the class index
    pub class_hotkeys: Vec<KeyChord>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            delete: vec![KeyChord::plain(Key::Delete), KeyChord::plain(Key::Backspace)],
            deselect: vec![KeyChord::plain(Key::Escape)],
            previous_image: vec![KeyChord::plain(Key::ArrowLeft)],
            next_image: vec![KeyChord::plain(Key::ArrowRight)],
            undo: vec![KeyChord::ctrl(Key::Char('z'))],
            redo: vec![KeyChord::ctrl(Key::Char('y'))],
            save: vec![KeyChord::ctrl(Key::Char('s'))],
            class_hotkeys: ('1'..='9').map(|c| KeyChord::plain(Key::Char(c))).collect(),
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a key press. Returns None when focus is in a form control or
    /// nothing is bound to the key.
    pub fn action_for(&self, event: &KeyEvent) -> Option<EditorAction> {
        if event.focus != FocusTarget::Canvas {
            return None;
        }

        let hit = |chords: &[KeyChord]| chords.iter().any(|c| c.matches(event));
        if hit(&self.delete) {
            Some(EditorAction::DeleteSelected)
        } else if hit(&self.deselect) {
            Some(EditorAction::Deselect)
        } else if hit(&self.undo) {
            Some(EditorAction::Undo)
        } else if hit(&self.redo) {
            Some(EditorAction::Redo)
        } else if hit(&self.save) {
            Some(EditorAction::Save)
        } else if hit(&self.previous_image) {
            Some(EditorAction::PreviousImage)
        } else if hit(&self.next_image) {
            Some(EditorAction::NextImage)
        } else {
            self.class_index_for_key(event).map(EditorAction::SelectClass)
        }
    }

    /// Get the class index (0-based) that corresponds to a key press, if any.
    pub fn class_index_for_key(&self, event: &KeyEvent) -> Option<usize> {
        self.class_hotkeys
            .iter()
            .take(MAX_CLASS_HOTKEYS)
            .position(|chord| chord.matches(event))
    }
}
