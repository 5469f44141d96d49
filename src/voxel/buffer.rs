//! Multi-channel voxel storage for a single block or padded mesher input
//!
//! Every channel is either a single uniform value or a dense byte array.
//! Freshly created buffers are uniform zero on all channels, so a block
//! made only of air costs a few bytes.

use glam::{IVec3, UVec3};

/// Number of channels carried by every buffer
pub const MAX_CHANNELS: usize = 3;

/// Channel indices
pub mod channel {
    /// Voxel type id (0 is air)
    pub const TYPE: usize = 0;
    /// Signed-distance / density sample used by smooth meshers
    pub const ISOLEVEL: usize = 1;
    /// Free-form per-voxel data
    pub const DATA: usize = 2;

    /// Bit mask selecting a channel in copy operations
    pub const fn mask(channel: usize) -> u8 {
        1 << channel
    }

    /// TYPE and ISOLEVEL, the channels handed to meshers
    pub const MESHING_MASK: u8 = mask(TYPE) | mask(ISOLEVEL);
    /// All channels
    pub const ALL_MASK: u8 = (1 << super::MAX_CHANNELS) - 1;
}

/// Voxel type value meaning "empty"
pub const AIR: u8 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
enum ChannelData {
    Uniform(u8),
    Dense(Box<[u8]>),
}

impl ChannelData {
    fn get(&self, index: usize) -> u8 {
        match self {
            ChannelData::Uniform(v) => *v,
            ChannelData::Dense(data) => data[index],
        }
    }
}

/// Dense-or-uniform 3D byte grid with [`MAX_CHANNELS`] channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelBuffer {
    size: UVec3,
    channels: [ChannelData; MAX_CHANNELS],
}

impl VoxelBuffer {
    /// Create a buffer of the given size, all channels uniform zero
    pub fn new(size: UVec3) -> Self {
        Self {
            size,
            channels: std::array::from_fn(|_| ChannelData::Uniform(0)),
        }
    }

    /// Cubic buffer with `edge` voxels per axis
    pub fn cube(edge: u32) -> Self {
        Self::new(UVec3::splat(edge))
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Number of voxels per channel
    pub fn volume(&self) -> usize {
        self.size.x as usize * self.size.y as usize * self.size.z as usize
    }

    /// Whether `pos` lies inside the buffer
    pub fn contains(&self, pos: IVec3) -> bool {
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(self.size.as_ivec3()).all()
    }

    #[inline]
    fn index(&self, pos: IVec3) -> usize {
        let (x, y, z) = (pos.x as usize, pos.y as usize, pos.z as usize);
        (z * self.size.y as usize + y) * self.size.x as usize + x
    }

    /// Read a voxel. Out-of-range positions and channels read as zero.
    pub fn get_voxel(&self, pos: IVec3, channel: usize) -> u8 {
        if channel >= MAX_CHANNELS || !self.contains(pos) {
            return 0;
        }
        self.channels[channel].get(self.index(pos))
    }

    /// Write a voxel, returning `false` when the position or channel is out of range.
    ///
    /// A uniform channel is expanded to dense storage on the first differing write.
    pub fn set_voxel(&mut self, pos: IVec3, channel: usize, value: u8) -> bool {
        if channel >= MAX_CHANNELS || !self.contains(pos) {
            return false;
        }
        let index = self.index(pos);
        let volume = self.volume();
        let data = &mut self.channels[channel];
        match data {
            ChannelData::Uniform(v) if *v == value => {}
            ChannelData::Uniform(v) => {
                let mut dense = vec![*v; volume].into_boxed_slice();
                dense[index] = value;
                *data = ChannelData::Dense(dense);
            }
            ChannelData::Dense(dense) => dense[index] = value,
        }
        true
    }

    /// Set every voxel of a channel to `value`
    pub fn fill(&mut self, value: u8, channel: usize) {
        if channel < MAX_CHANNELS {
            self.channels[channel] = ChannelData::Uniform(value);
        }
    }

    /// Fill the half-open box `[min, max)` of a channel, clipped to the buffer
    pub fn fill_area(&mut self, value: u8, min: IVec3, max: IVec3, channel: usize) {
        let min = min.max(IVec3::ZERO);
        let max = max.min(self.size.as_ivec3());
        if channel >= MAX_CHANNELS || min.cmpge(max).any() {
            return;
        }
        if min == IVec3::ZERO && max == self.size.as_ivec3() {
            self.fill(value, channel);
            return;
        }
        for z in min.z..max.z {
            for y in min.y..max.y {
                for x in min.x..max.x {
                    self.set_voxel(IVec3::new(x, y, z), channel, value);
                }
            }
        }
    }

    /// Alias of [`fill`](Self::fill) that documents intent at call sites
    pub fn clear_channel(&mut self, channel: usize, value: u8) {
        self.fill(value, channel);
    }

    /// Whether every voxel of the channel holds the same value
    pub fn is_uniform(&self, channel: usize) -> bool {
        self.uniform_value(channel).is_some()
    }

    /// The shared value of a channel if it is uniform
    pub fn uniform_value(&self, channel: usize) -> Option<u8> {
        match self.channels.get(channel)? {
            ChannelData::Uniform(v) => Some(*v),
            ChannelData::Dense(data) => {
                let first = *data.first()?;
                data.iter().all(|&v| v == first).then_some(first)
            }
        }
    }

    /// Whether the type channel is entirely air
    pub fn is_air(&self) -> bool {
        self.uniform_value(channel::TYPE) == Some(AIR)
    }

    /// Collapse dense channels that turned out uniform
    pub fn compress_uniform_channels(&mut self) {
        for ch in 0..MAX_CHANNELS {
            if let (ChannelData::Dense(_), Some(v)) = (&self.channels[ch], self.uniform_value(ch)) {
                self.channels[ch] = ChannelData::Uniform(v);
            }
        }
    }

    /// Copy the half-open box `[src_min, src_max)` of `src` into this buffer at
    /// `dst_min`, for every channel selected by `channel_mask`.
    ///
    /// The box is clipped against both buffers.
    pub fn copy_from(
        &mut self,
        src: &VoxelBuffer,
        src_min: IVec3,
        src_max: IVec3,
        dst_min: IVec3,
        channel_mask: u8,
    ) {
        // Clip source box against both extents
        let mut lo = src_min.max(IVec3::ZERO);
        let mut hi = src_max.min(src.size.as_ivec3());
        let offset = dst_min - src_min;
        lo = lo.max(-offset);
        hi = hi.min(self.size.as_ivec3() - offset);
        if lo.cmpge(hi).any() {
            return;
        }

        for ch in 0..MAX_CHANNELS {
            if channel_mask & channel::mask(ch) == 0 {
                continue;
            }
            if let ChannelData::Uniform(v) = src.channels[ch] {
                self.fill_area(v, lo + offset, hi + offset, ch);
                continue;
            }
            for z in lo.z..hi.z {
                for y in lo.y..hi.y {
                    for x in lo.x..hi.x {
                        let p = IVec3::new(x, y, z);
                        let v = src.channels[ch].get(src.index(p));
                        self.set_voxel(p + offset, ch, v);
                    }
                }
            }
        }
    }

    /// Approximate heap + inline size in bytes
    pub fn memory_usage(&self) -> usize {
        let dense: usize = self
            .channels
            .iter()
            .map(|c| match c {
                ChannelData::Uniform(_) => 0,
                ChannelData::Dense(d) => d.len(),
            })
            .sum();
        std::mem::size_of::<Self>() + dense
    }
}
