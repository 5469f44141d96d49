//! A resident block and its rendering handle

use serde::{Deserialize, Serialize};

use crate::core::BlockPos;

use super::buffer::VoxelBuffer;
use super::mesh::Mesh;

/// Identifier of the render world a block instance is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldId(pub u64);

/// Rendering object owned by a block: current mesh, world membership, visibility.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockInstance {
    mesh: Option<Mesh>,
    world: Option<WorldId>,
    visible: bool,
}

impl BlockInstance {
    pub fn new() -> Self {
        Self {
            mesh: None,
            world: None,
            visible: true,
        }
    }

    /// Install or clear the mesh
    pub fn set_mesh(&mut self, mesh: Option<Mesh>) {
        self.mesh = mesh;
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn enter_world(&mut self, world: WorldId) {
        self.world = Some(world);
    }

    pub fn exit_world(&mut self) {
        self.world = None;
    }

    pub fn world(&self) -> Option<WorldId> {
        self.world
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Default for BlockInstance {
    fn default() -> Self {
        Self::new()
    }
}

/// Voxel data of one block plus its rendering handle
#[derive(Clone, Debug)]
pub struct VoxelBlock {
    pub position: BlockPos,
    pub voxels: VoxelBuffer,
    pub instance: BlockInstance,
    /// Revision of the newest mesh result allowed to land on this block
    pub(crate) mesh_revision: u64,
}

impl VoxelBlock {
    pub fn new(position: BlockPos, voxels: VoxelBuffer) -> Self {
        Self {
            position,
            voxels,
            instance: BlockInstance::new(),
            mesh_revision: 0,
        }
    }

    /// Revision of the newest mesh result allowed to land on this block
    pub fn mesh_revision(&self) -> u64 {
        self.mesh_revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    #[test]
    fn test_instance_lifecycle() {
        let mut inst = BlockInstance::new();
        assert!(inst.is_visible());
        assert!(!inst.has_mesh());
        assert_eq!(inst.world(), None);

        inst.enter_world(WorldId(3));
        assert_eq!(inst.world(), Some(WorldId(3)));
        inst.set_visible(false);
        assert!(!inst.is_visible());
        inst.set_mesh(Some(Mesh::new()));
        assert!(inst.has_mesh());
        inst.set_mesh(None);
        assert!(!inst.has_mesh());
        inst.exit_world();
        assert_eq!(inst.world(), None);
    }

    #[test]
    fn test_new_block() {
        let block = VoxelBlock::new(IVec3::new(1, -2, 3), VoxelBuffer::cube(16));
        assert_eq!(block.position, IVec3::new(1, -2, 3));
        assert_eq!(block.mesh_revision(), 0);
        assert!(block.voxels.is_air());
    }
}
