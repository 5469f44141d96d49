//! Host services the tick depends on

use std::collections::HashMap;

use glam::Vec3;

use crate::voxel::WorldId;

/// Engine-side queries made once per tick.
pub trait TerrainHost {
    /// World position of the node at `path`, if it exists
    fn viewer_position(&self, path: &str) -> Option<Vec3>;

    /// Whether the host is editing rather than running the scene
    fn is_editor(&self) -> bool {
        false
    }
}

/// Lifecycle events forwarded from the host to every resident block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    EnterWorld(WorldId),
    ExitWorld,
    VisibilityChanged(bool),
}

/// Host with a fixed table of named viewer positions
#[derive(Clone, Debug, Default)]
pub struct StaticViewers {
    viewers: HashMap<String, Vec3>,
    editor: bool,
}

impl StaticViewers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with a single viewer
    pub fn single(path: impl Into<String>, position: Vec3) -> Self {
        let mut host = Self::new();
        host.set(path, position);
        host
    }

    pub fn set(&mut self, path: impl Into<String>, position: Vec3) {
        self.viewers.insert(path.into(), position);
    }

    pub fn remove(&mut self, path: &str) {
        self.viewers.remove(path);
    }

    pub fn set_editor(&mut self, editor: bool) {
        self.editor = editor;
    }
}

impl TerrainHost for StaticViewers {
    fn viewer_position(&self, path: &str) -> Option<Vec3> {
        self.viewers.get(path).copied()
    }

    fn is_editor(&self) -> bool {
        self.editor
    }
}
