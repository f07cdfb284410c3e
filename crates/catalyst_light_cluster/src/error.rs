//! Central error type for light cluster preparation.

use crate::light::{LightType, LightTypeExtent};

#[derive(thiserror::Error, Debug)]
pub enum ClusterError {
    /// A light whose type/extent pair has no GPU representation.
    #[error("unsupported light configuration: {light_type:?} light with {extent:?} extent")]
    UnsupportedLight {
        light_type: LightType,
        extent: LightTypeExtent,
    },

    #[error("compute shader '{shader}' has no kernel named '{kernel}'")]
    MissingKernel { shader: String, kernel: &'static str },

    #[error("invalid light cluster settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClusterResult<T> = Result<T, ClusterError>;
