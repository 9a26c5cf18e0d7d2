//! Interaction events.
//!
//! Events are platform-independent. Whatever hosts the UI translates its
//! native pointer, keyboard and touch events into [`InputEvent`] values and
//! hands them to the [`InputRouter`](super::InputRouter).

use std::fmt;

// ============================================================================
// Key
// ============================================================================

/// Keys the interaction layer distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Focus navigation; never suppressed by the overlay
    Tab,
    /// Activates the focused control
    Enter,
    /// Activates the focused control
    Space,
    /// Escape
    Escape,
    /// Printable character
    Char(char),
    /// Any other named key
    Other(String),
}

impl Key {
    /// Returns true if the key activates the focused control.
    pub fn activates(&self) -> bool {
        matches!(self, Key::Enter | Key::Space)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Tab => write!(f, "Tab"),
            Key::Enter => write!(f, "Enter"),
            Key::Space => write!(f, "Space"),
            Key::Escape => write!(f, "Escape"),
            Key::Char(c) => write!(f, "{}", c),
            Key::Other(name) => write!(f, "{}", name),
        }
    }
}

// ============================================================================
// InputEvent
// ============================================================================

/// Category of an interaction event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Mouse or pen press / click
    Pointer,
    /// Key press
    Key(Key),
    /// Touch start
    Touch,
}

/// A user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    /// What happened
    pub kind: InputKind,
    /// Id of the element the event is aimed at (focused element for keys)
    pub target: Option<String>,
}

impl InputEvent {
    /// Pointer press with no particular target.
    pub fn pointer() -> Self {
        Self {
            kind: InputKind::Pointer,
            target: None,
        }
    }

    /// Key press with no focused element.
    pub fn key(key: Key) -> Self {
        Self {
            kind: InputKind::Key(key),
            target: None,
        }
    }

    /// Touch start with no particular target.
    pub fn touch() -> Self {
        Self {
            kind: InputKind::Touch,
            target: None,
        }
    }

    /// Aims the event at the element `target`.
    #[must_use]
    pub fn on(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Returns true for a Tab key press.
    pub fn is_tab(&self) -> bool {
        matches!(self.kind, InputKind::Key(Key::Tab))
    }

    /// Returns true if the event is aimed at `target`.
    pub fn targets(&self, target: &str) -> bool {
        self.target.as_deref() == Some(target)
    }

    /// Returns true if the event would activate the element it targets.
    pub fn is_activation(&self) -> bool {
        match &self.kind {
            InputKind::Pointer | InputKind::Touch => true,
            InputKind::Key(key) => key.activates(),
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InputKind::Pointer => write!(f, "pointer")?,
            InputKind::Key(key) => write!(f, "key:{}", key)?,
            InputKind::Touch => write!(f, "touch")?,
        }
        if let Some(target) = &self.target {
            write!(f, "@{}", target)?;
        }
        Ok(())
    }
}

// ============================================================================
// Capture stage
// ============================================================================

/// What a capture observer decided about an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Deliver to the next observer and the page handlers
    Continue,
    /// Discard the event
    Suppress,
}

/// Observer that sees every event before the page handlers do.
pub trait CaptureObserver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Inspects (and possibly reacts to) an event.
    fn capture(&self, event: &InputEvent) -> Disposition;
}

// ============================================================================
// Tests
// ============================================================================
