use std::sync::Arc;

use crate::transform::Transform;

use super::{LoadedMaterial, LoadedMesh};

pub struct LoadedPrimitive {
    pub material: Arc<LoadedMaterial>,
    pub mesh: Arc<LoadedMesh>,
}

/// A named piece of scene geometry together with every placement of it.
pub struct LoadedModel {
    pub name: String,
    pub instances: Vec<Transform>,
    pub primitives: Vec<LoadedPrimitive>,
}
