use super::{Asset, AssetId};

/// Mesh attributes are kept as separate arrays since that is the layout the
/// per-partition attribute buffers and their texel views want.
pub struct LoadedMesh {
    pub id: AssetId,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl LoadedMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl Asset for LoadedMesh {
    fn id(&self) -> AssetId {
        self.id
    }
}
