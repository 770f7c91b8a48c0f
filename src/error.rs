use ash::vk;
use thiserror::Error;

/// Errors surfaced by scene ingestion, pipeline assembly and the frame loop.
///
/// Configuration errors are detected before the first frame and abort startup.
/// Runtime errors are fatal for the session as well, there is no per-frame
/// retry, but they carry the failed Vulkan result where one exists.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("{operation} failed: {result}")]
    Vulkan {
        operation: &'static str,
        result: vk::Result,
    },
}

impl RendererError {
    pub fn vulkan(operation: &'static str) -> impl FnOnce(vk::Result) -> RendererError {
        move |result| RendererError::Vulkan { operation, result }
    }
}

pub type RendererResult<T> = Result<T, RendererError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulkan_error_names_the_operation() {
        let error = RendererError::vulkan("queue submit")(vk::Result::ERROR_DEVICE_LOST);
        assert_eq!(
            error.to_string(),
            "queue submit failed: ERROR_DEVICE_LOST"
        );
    }
}
