use std::path::PathBuf;
use std::time::SystemTime;

use ash::vk;

/// External happenings the renderer reacts to. Instead of callbacks firing at
/// arbitrary points, events are queued and drained exactly once per frame
/// boundary, with target rebuilds ordered before pipeline rebuilds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererEvent {
    TargetResized(vk::Extent2D),
    ShadersChanged,
}

#[derive(Default)]
pub struct EventQueue {
    resize: Option<vk::Extent2D>,
    shaders_changed: bool,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate events collapse; only the newest extent survives.
    pub fn push(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::TargetResized(extent) => self.resize = Some(extent),
            RendererEvent::ShadersChanged => self.shaders_changed = true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resize.is_none() && !self.shaders_changed
    }

    pub fn drain(&mut self) -> Vec<RendererEvent> {
        let mut events = Vec::new();
        if let Some(extent) = self.resize.take() {
            events.push(RendererEvent::TargetResized(extent));
        }
        if std::mem::take(&mut self.shaders_changed) {
            events.push(RendererEvent::ShadersChanged);
        }
        events
    }
}

/// Polls the override directory for recompiled shader binaries. Deliberately
/// mtime based, one stat per file per frame is cheap and needs no platform
/// file watcher.
pub struct ShaderWatcher {
    dir: PathBuf,
    last_seen: Option<SystemTime>,
}

impl ShaderWatcher {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            last_seen: None,
        }
    }

    pub fn poll(&mut self) -> bool {
        let newest = Self::newest_spv_mtime(&self.dir);
        match (self.last_seen, newest) {
            (None, newest) => {
                self.last_seen = newest;
                false
            }
            (Some(previous), Some(newest)) if newest > previous => {
                self.last_seen = Some(newest);
                true
            }
            _ => false,
        }
    }

    fn newest_spv_mtime(dir: &PathBuf) -> Option<SystemTime> {
        let entries = std::fs::read_dir(dir).ok()?;
        entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "spv") {
                    entry.metadata().ok()?.modified().ok()
                } else {
                    None
                }
            })
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_resizes_collapse_to_the_newest_extent() {
        let mut queue = EventQueue::new();
        queue.push(RendererEvent::TargetResized(vk::Extent2D {
            width: 100,
            height: 100,
        }));
        queue.push(RendererEvent::TargetResized(vk::Extent2D {
            width: 200,
            height: 150,
        }));

        let events = queue.drain();
        assert_eq!(
            events,
            vec![RendererEvent::TargetResized(vk::Extent2D {
                width: 200,
                height: 150,
            })]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn target_rebuild_is_ordered_before_pipeline_rebuild() {
        let mut queue = EventQueue::new();
        queue.push(RendererEvent::ShadersChanged);
        queue.push(RendererEvent::TargetResized(vk::Extent2D {
            width: 64,
            height: 64,
        }));

        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RendererEvent::TargetResized(_)));
        assert_eq!(events[1], RendererEvent::ShadersChanged);
    }

    #[test]
    fn draining_twice_yields_nothing_new() {
        let mut queue = EventQueue::new();
        queue.push(RendererEvent::ShadersChanged);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.drain().is_empty());
    }
}
