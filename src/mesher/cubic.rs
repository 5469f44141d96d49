//! Blocky face-culling mesher

use std::sync::Arc;

use glam::{IVec3, Vec3};

use super::{Mesher, MesherOutput, PADDING_MAX, PADDING_MIN};
use crate::voxel::{channel, SurfaceArrays, VoxelBuffer, VoxelLibrary, MAX_MATERIALS};

/// Face direction, unit corners in winding order
struct Face {
    dir: IVec3,
    corners: [Vec3; 4],
}

const FACES: [Face; 6] = [
    Face {
        dir: IVec3::X,
        corners: [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ],
    },
    Face {
        dir: IVec3::NEG_X,
        corners: [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
    },
    Face {
        dir: IVec3::Y,
        corners: [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 0.0),
        ],
    },
    Face {
        dir: IVec3::NEG_Y,
        corners: [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
    },
    Face {
        dir: IVec3::Z,
        corners: [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
    },
    Face {
        dir: IVec3::NEG_Z,
        corners: [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ],
    },
];

/// Emits one quad per voxel face that borders a transparent neighbor.
///
/// Faces go into the model surface of the voxel type's material slot. Faces
/// between two voxels of the same transparent type are culled.
#[derive(Clone, Debug)]
pub struct CubicMesher {
    library: Arc<VoxelLibrary>,
}

impl CubicMesher {
    pub fn new(library: Arc<VoxelLibrary>) -> Self {
        Self { library }
    }
}

impl Mesher for CubicMesher {
    fn build(&self, padded: &VoxelBuffer) -> MesherOutput {
        let mut out = MesherOutput {
            model_surfaces: vec![SurfaceArrays::default(); MAX_MATERIALS],
            smooth_surfaces: Vec::new(),
        };
        if padded.is_air() {
            return out;
        }

        let lo = PADDING_MIN as i32;
        let hi = padded.size().as_ivec3() - IVec3::splat(PADDING_MAX as i32);
        for z in lo..hi.z {
            for y in lo..hi.y {
                for x in lo..hi.x {
                    let p = IVec3::new(x, y, z);
                    let v = padded.get_voxel(p, channel::TYPE);
                    let Some(slot) = self.library.material_slot(v) else {
                        continue;
                    };
                    let local = (p - IVec3::splat(lo)).as_vec3();
                    for face in &FACES {
                        let n = padded.get_voxel(p + face.dir, channel::TYPE);
                        if n == v || !self.library.is_transparent(n) {
                            continue;
                        }
                        out.model_surfaces[slot]
                            .push_quad(face.corners.map(|c| c + local), face.dir.as_vec3());
                    }
                }
            }
        }
        out
    }
}
