use super::LoadedModel;

pub struct LoadedScene {
    pub models: Vec<LoadedModel>,
}

impl LoadedScene {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    pub fn instance_count(&self) -> usize {
        self.models.iter().map(|model| model.instances.len()).sum()
    }
}
