//! Window-system-independent input: key identifiers, queued events, held
//! keys, and the cursor capture state machine.

use std::collections::HashSet;

use glam::Vec2;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    /// Letter keys, always upper case.
    Character(char),
    Function(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Left,
    Right,
    Up,
    Down,
    Escape,
}

/// Input delivered by the window system, queued until the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(KeyCode),
    KeyReleased(KeyCode),
    /// Cursor position in physical pixels, origin top-left.
    CursorMoved(Vec2),
    /// Raw pointer motion, unaffected by cursor grabs or window edges.
    MouseMotion(Vec2),
    /// Vertical scroll in lines; positive away from the user.
    Scrolled(f32),
    CloseRequested,
}

/// Currently held keys.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn pressed(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keys.iter().copied()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

/// How the OS cursor should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Hidden and grabbed; movement steers the camera.
    Locked,
    /// Visible and free for the overlay.
    Free,
}

/// Turns cursor input into look deltas across grab and release cycles.
///
/// A free cursor is followed through absolute positions. A grabbed cursor
/// is pinned or clamped by the window system, so it is followed through
/// raw motion instead and absolute positions are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CursorTracker {
    /// Free; `last` is the previous position, if one was seen since release.
    Uncaptured { last: Option<Vec2> },
    /// Grabbed, no motion seen since the grab.
    FirstSample,
    Tracking,
}

impl Default for CursorTracker {
    fn default() -> Self {
        Self::Uncaptured { last: None }
    }
}

impl CursorTracker {
    pub fn capture(&mut self) {
        *self = Self::FirstSample;
    }

    pub fn release(&mut self) {
        *self = Self::Uncaptured { last: None };
    }

    pub fn is_captured(&self) -> bool {
        !matches!(self, Self::Uncaptured { .. })
    }

    /// Feeds one absolute cursor position; returns the movement since the
    /// previous one while the cursor is free.
    ///
    /// The first position after a release only seeds the tracker, so the
    /// jump from wherever the cursor reappears is never reported.
    pub fn sample(&mut self, position: Vec2) -> Option<Vec2> {
        match *self {
            Self::Uncaptured { last } => {
                *self = Self::Uncaptured {
                    last: Some(position),
                };
                last.map(|last| position - last)
            }
            Self::FirstSample | Self::Tracking => None,
        }
    }

    /// Feeds one raw motion delta; returns it while the cursor is grabbed.
    ///
    /// The first motion after a grab is dropped, since it can include the
    /// warp to the grab point.
    pub fn motion(&mut self, delta: Vec2) -> Option<Vec2> {
        match *self {
            Self::Uncaptured { .. } => None,
            Self::FirstSample => {
                *self = Self::Tracking;
                None
            }
            Self::Tracking => Some(delta),
        }
    }
}
