//! Voxel type registry consulted by meshers

use serde::{Deserialize, Serialize};

use super::buffer::AIR;
use super::mesh::MAX_MATERIALS;

/// Properties of one voxel type id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelType {
    pub name: String,
    /// Material slot (0..MAX_MATERIALS) the type's faces are emitted into
    pub material_slot: u8,
    /// Transparent types never hide neighboring faces
    #[serde(default)]
    pub transparent: bool,
}

impl VoxelType {
    pub fn opaque(name: impl Into<String>, material_slot: u8) -> Self {
        Self {
            name: name.into(),
            material_slot,
            transparent: false,
        }
    }

    pub fn transparent(name: impl Into<String>, material_slot: u8) -> Self {
        Self {
            name: name.into(),
            material_slot,
            transparent: true,
        }
    }
}

/// Lookup table from voxel type id (the TYPE channel value) to its properties.
///
/// Id 0 is always air. Ids without an entry are treated like air.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LibraryFile")]
pub struct VoxelLibrary {
    types: Vec<VoxelType>,
}

/// On-disk shape; loaded types go through [`VoxelLibrary::add_type`]
#[derive(Deserialize)]
struct LibraryFile {
    types: Vec<VoxelType>,
}

impl From<LibraryFile> for VoxelLibrary {
    fn from(file: LibraryFile) -> Self {
        let mut lib = Self { types: Vec::with_capacity(file.types.len()) };
        for ty in file.types {
            lib.add_type(ty);
        }
        lib
    }
}

impl VoxelLibrary {
    /// Library holding only air
    pub fn new() -> Self {
        Self {
            types: vec![VoxelType::transparent("air", 0)],
        }
    }

    /// Air, stone, dirt, grass and water mapped to material slots 0..4
    pub fn terrain_default() -> Self {
        let mut lib = Self::new();
        lib.add_type(VoxelType::opaque("stone", 0));
        lib.add_type(VoxelType::opaque("dirt", 1));
        lib.add_type(VoxelType::opaque("grass", 2));
        lib.add_type(VoxelType::transparent("water", 3));
        lib
    }

    /// Register a type, returning its id. Slots past the last material are clamped.
    pub fn add_type(&mut self, mut ty: VoxelType) -> u8 {
        ty.material_slot = ty.material_slot.min(MAX_MATERIALS as u8 - 1);
        let id = self.types.len().min(u8::MAX as usize) as u8;
        if (id as usize) < self.types.len() {
            log::warn!("Voxel library full, replacing type {id} with '{}'", ty.name);
            self.types[id as usize] = ty;
        } else {
            self.types.push(ty);
        }
        id
    }

    pub fn get(&self, id: u8) -> Option<&VoxelType> {
        self.types.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether a voxel of this id is visible at all
    pub fn is_solid(&self, id: u8) -> bool {
        id != AIR && self.get(id).is_some()
    }

    /// Whether faces behind this id should be emitted
    pub fn is_transparent(&self, id: u8) -> bool {
        !self.is_solid(id) || self.get(id).is_some_and(|t| t.transparent)
    }

    pub fn material_slot(&self, id: u8) -> Option<usize> {
        self.is_solid(id)
            .then(|| self.get(id).map(|t| t.material_slot as usize))
            .flatten()
    }
}

impl Default for VoxelLibrary {
    fn default() -> Self {
        Self::terrain_default()
    }
}
