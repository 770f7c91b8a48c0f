use std::ops::Range;
use std::sync::Arc;

use crate::error::{RendererError, RendererResult};
use crate::loader::{Assets, LoadedMaterial, LoadedScene};
use crate::transform::Transform;

/// One group of meshes of a model that share a material. Partitions are the
/// unit the attribute buffers and bottom level structures are built for.
pub struct PartitionPlan {
    pub model_index: usize,
    pub material: Arc<LoadedMaterial>,
    /// Indices into the model's primitive list, in primitive order.
    pub primitive_indices: Vec<usize>,
}

/// One placed copy of one partition. The custom index doubles as the record's
/// position in the instance list and as the slot every parallel descriptor
/// array reserves for this instance; reordering anything here breaks the
/// correlation the closest hit shader relies on.
pub struct InstanceRecord {
    pub partition_index: usize,
    pub transform: Transform,
    pub custom_index: u32,
}

/// The complete, immutable ingestion plan: which partitions exist, which
/// instances reference them and how everything is indexed. All counting
/// contracts of the renderer are properties of this type and of nothing else.
pub struct ScenePlan {
    pub partitions: Vec<PartitionPlan>,
    pub instances: Vec<InstanceRecord>,
    /// Per partition: the contiguous range of instance slots derived from it.
    pub partition_instance_ranges: Vec<Range<usize>>,
    /// Per model: name and the range of instance slots belonging to it.
    pub model_instance_ranges: Vec<(String, Range<usize>)>,
}

impl ScenePlan {
    /// Walks the models in input order. Within a model, partitions are formed
    /// in first-seen material order; within a partition, one instance record
    /// is created per placement, so every partition owns a contiguous block
    /// of instance slots.
    pub fn new(
        scene: &LoadedScene,
        materials: &Assets<LoadedMaterial>,
    ) -> RendererResult<ScenePlan> {
        let mut partitions = Vec::new();
        let mut instances: Vec<InstanceRecord> = Vec::new();
        let mut partition_instance_ranges = Vec::new();
        let mut model_instance_ranges = Vec::new();

        for (model_index, model) in scene.models.iter().enumerate() {
            let model_start = instances.len();

            for (primitive_index, primitive) in model.primitives.iter().enumerate() {
                if !materials.assets.contains_key(&primitive.material.id()) {
                    return Err(RendererError::Configuration(format!(
                        "model {:?} references an unresolved material",
                        model.name
                    )));
                }

                // Meshes with the same material fold into the existing
                // partition of this model, everything else opens a new one.
                let existing = partitions.iter().position(|p: &PartitionPlan| {
                    p.model_index == model_index && p.material.id() == primitive.material.id()
                });
                let partition = match existing {
                    Some(index) => index,
                    None => {
                        partitions.push(PartitionPlan {
                            model_index,
                            material: primitive.material.clone(),
                            primitive_indices: Vec::new(),
                        });
                        partitions.len() - 1
                    }
                };
                partitions[partition].primitive_indices.push(primitive_index);
            }

            // Partitions of this model occupy a tail of the partition list.
            let model_partitions =
                (0..partitions.len()).filter(|&p| partitions[p].model_index == model_index);

            for partition_index in model_partitions {
                let partition_start = instances.len();
                for placement in model.instances.iter() {
                    let custom_index = instances.len() as u32;
                    instances.push(InstanceRecord {
                        partition_index,
                        transform: placement.clone(),
                        custom_index,
                    });
                }
                partition_instance_ranges.push(partition_start..instances.len());
            }

            model_instance_ranges.push((model.name.clone(), model_start..instances.len()));
        }

        Ok(ScenePlan {
            partitions,
            instances,
            partition_instance_ranges,
            model_instance_ranges,
        })
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn material_count(&self) -> usize {
        self.partitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{
        AssetId, AssetIdGenerator, LoadedMesh, LoadedModel, LoadedPrimitive,
    };
    use ultraviolet::Vec3;

    fn test_material(id: AssetId) -> Arc<LoadedMaterial> {
        Arc::new(LoadedMaterial {
            id,
            base_color: Vec3::one(),
            base_color_texture: None,
            roughness_factor: 1.0,
            metallic_factor: 0.0,
            emissivity: Vec3::zero(),
        })
    }

    fn test_mesh(id: AssetId) -> Arc<LoadedMesh> {
        Arc::new(LoadedMesh {
            id,
            positions: vec![[0.0; 3]; 3],
            normals: vec![[0.0, 1.0, 0.0]; 3],
            uvs: vec![[0.0; 2]; 3],
            indices: vec![0, 1, 2],
        })
    }

    struct TestScene {
        scene: LoadedScene,
        materials: Assets<LoadedMaterial>,
        ids: AssetIdGenerator,
    }

    impl TestScene {
        fn new() -> Self {
            Self {
                scene: LoadedScene::new(),
                materials: Assets::new(),
                ids: AssetIdGenerator::new(),
            }
        }

        /// A model with `material_count` distinct materials (one mesh each)
        /// and `placements` instances.
        fn add_model(&mut self, name: &str, material_count: usize, placements: usize) {
            let primitives = (0..material_count)
                .map(|_| {
                    let material = test_material(self.ids.next());
                    self.materials.insert(material.clone());
                    LoadedPrimitive {
                        material,
                        mesh: test_mesh(self.ids.next()),
                    }
                })
                .collect();
            self.scene.models.push(LoadedModel {
                name: name.to_string(),
                instances: vec![Transform::default(); placements],
                primitives,
            });
        }
    }

    #[test]
    fn two_model_scenario_counts() {
        // Model A: 3 distinct materials, 2 placements. Model B: 1 material,
        // 1 placement. Expected: 4 partitions, 3*2 + 1*1 = 7 instances.
        let mut test = TestScene::new();
        test.add_model("a", 3, 2);
        test.add_model("b", 1, 1);

        let plan = ScenePlan::new(&test.scene, &test.materials).unwrap();

        assert_eq!(plan.partitions.len(), 4);
        assert_eq!(plan.instance_count(), 7);
        assert_eq!(plan.material_count(), 4);
        assert_eq!(plan.partition_instance_ranges.len(), 4);
    }

    #[test]
    fn custom_indices_are_dense_and_in_creation_order() {
        let mut test = TestScene::new();
        test.add_model("a", 2, 3);
        test.add_model("b", 2, 2);

        let plan = ScenePlan::new(&test.scene, &test.materials).unwrap();

        for (slot, instance) in plan.instances.iter().enumerate() {
            assert_eq!(instance.custom_index as usize, slot);
        }
    }

    #[test]
    fn partition_instances_fall_in_their_recorded_range() {
        let mut test = TestScene::new();
        test.add_model("a", 3, 2);
        test.add_model("b", 1, 4);

        let plan = ScenePlan::new(&test.scene, &test.materials).unwrap();

        for (partition_index, range) in plan.partition_instance_ranges.iter().enumerate() {
            let members: Vec<usize> = plan
                .instances
                .iter()
                .filter(|i| i.partition_index == partition_index)
                .map(|i| i.custom_index as usize)
                .collect();
            assert_eq!(members, range.clone().collect::<Vec<usize>>());
        }
    }

    #[test]
    fn model_ranges_are_contiguous_and_cover_all_instances() {
        let mut test = TestScene::new();
        test.add_model("a", 2, 2);
        test.add_model("b", 3, 1);
        test.add_model("c", 1, 5);

        let plan = ScenePlan::new(&test.scene, &test.materials).unwrap();

        let mut next_start = 0;
        for (_, range) in plan.model_instance_ranges.iter() {
            assert_eq!(range.start, next_start);
            next_start = range.end;
        }
        assert_eq!(next_start, plan.instance_count());
        assert_eq!(plan.model_instance_ranges[0].0, "a");
    }

    #[test]
    fn meshes_with_the_same_material_share_a_partition() {
        let mut test = TestScene::new();
        let material = test_material(test.ids.next());
        test.materials.insert(material.clone());
        test.scene.models.push(LoadedModel {
            name: "shared".to_string(),
            instances: vec![Transform::default()],
            primitives: vec![
                LoadedPrimitive {
                    material: material.clone(),
                    mesh: test_mesh(test.ids.next()),
                },
                LoadedPrimitive {
                    material,
                    mesh: test_mesh(test.ids.next()),
                },
            ],
        });

        let plan = ScenePlan::new(&test.scene, &test.materials).unwrap();

        assert_eq!(plan.partitions.len(), 1);
        assert_eq!(plan.partitions[0].primitive_indices, vec![0, 1]);
        assert_eq!(plan.instance_count(), 1);
    }

    #[test]
    fn material_slots_follow_partition_creation_order() {
        let mut test = TestScene::new();
        test.add_model("a", 2, 1);
        test.add_model("b", 1, 1);

        let plan = ScenePlan::new(&test.scene, &test.materials).unwrap();

        let slot_materials: Vec<_> = plan.partitions.iter().map(|p| p.material.id()).collect();
        // The same order an atlas built from the plan will use.
        assert_eq!(slot_materials.len(), 3);
        assert_eq!(plan.partitions[0].model_index, 0);
        assert_eq!(plan.partitions[2].model_index, 1);
    }

    #[test]
    fn unresolved_material_is_a_configuration_error() {
        let mut test = TestScene::new();
        // Material is never registered with the asset storage.
        let material = test_material(test.ids.next());
        test.scene.models.push(LoadedModel {
            name: "broken".to_string(),
            instances: vec![Transform::default()],
            primitives: vec![LoadedPrimitive {
                material,
                mesh: test_mesh(test.ids.next()),
            }],
        });

        let result = ScenePlan::new(&test.scene, &test.materials);
        assert!(matches!(result, Err(RendererError::Configuration(_))));
    }

    #[test]
    fn empty_scene_produces_an_empty_plan() {
        let test = TestScene::new();
        let plan = ScenePlan::new(&test.scene, &test.materials).unwrap();
        assert_eq!(plan.instance_count(), 0);
        assert_eq!(plan.material_count(), 0);
    }
}
