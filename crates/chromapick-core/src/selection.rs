//! Selection state shared between the resolver and the visible scene pass.

use crate::pick::ObjectHandle;

/// Sentinel used by [`SelectionState::as_sentinel`] when nothing is selected.
pub const NO_SELECTION: i32 = -1;

/// The currently selected object, if any.
///
/// Written only by pick resolution (or an explicit reset); read by the scene
/// renderer to draw the selected object with its highlighted variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<ObjectHandle>,
}

impl SelectionState {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the selected handle.
    pub fn selected(&self) -> Option<ObjectHandle> {
        self.selected
    }

    /// Replaces the selection. Passing `None` clears it.
    pub fn set(&mut self, handle: Option<ObjectHandle>) {
        self.selected = handle;
    }

    /// Selects `handle`.
    pub fn select(&mut self, handle: ObjectHandle) {
        self.selected = Some(handle);
    }

    /// Clears the selection.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Returns whether `handle` is the selected object.
    pub fn is_selected(&self, handle: ObjectHandle) -> bool {
        self.selected == Some(handle)
    }

    /// Returns the selection as a signed index, [`NO_SELECTION`] when empty.
    pub fn as_sentinel(&self) -> i32 {
        self.selected
            .and_then(|h| i32::try_from(h.0).ok())
            .unwrap_or(NO_SELECTION)
    }
}
