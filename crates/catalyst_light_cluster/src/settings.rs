use std::{fs, path::Path};

use log::warn;

use crate::error::ClusterResult;

pub const DEFAULT_CAMERA_CLUSTER_RANGE: f32 = 10.0;
pub const MIN_CAMERA_CLUSTER_RANGE: f32 = 0.001;
pub const MAX_CAMERA_CLUSTER_RANGE: f32 = 50.0;

pub const DEFAULT_MAX_LIGHTS_PER_CELL: u32 = 10;
pub const MAX_LIGHTS_PER_CELL_LIMIT: u32 = 24;

/// Raw settings as they appear on disk. Every field is optional.
#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct LightClusterExtras {
    pub camera_cluster_range: Option<f32>,
    pub max_num_lights_per_cell: Option<u32>,
}

/// Light cluster configuration for one ray-tracing environment.
#[derive(Clone, Debug, PartialEq)]
pub struct LightClusterSettings {
    /// Half-extent of the cluster around the camera, in world units.
    pub camera_cluster_range: f32,
    /// Light indices stored per cell before the cell saturates.
    pub max_num_lights_per_cell: u32,
}

impl Default for LightClusterSettings {
    fn default() -> Self {
        Self {
            camera_cluster_range: DEFAULT_CAMERA_CLUSTER_RANGE,
            max_num_lights_per_cell: DEFAULT_MAX_LIGHTS_PER_CELL,
        }
    }
}

impl From<LightClusterExtras> for LightClusterSettings {
    fn from(extras: LightClusterExtras) -> Self {
        Self {
            camera_cluster_range: extras
                .camera_cluster_range
                .unwrap_or(DEFAULT_CAMERA_CLUSTER_RANGE),
            max_num_lights_per_cell: extras
                .max_num_lights_per_cell
                .unwrap_or(DEFAULT_MAX_LIGHTS_PER_CELL),
        }
        .clamped()
    }
}

impl LightClusterSettings {
    pub fn from_json_str(json: &str) -> ClusterResult<Self> {
        let extras: LightClusterExtras = serde_json::from_str(json)?;
        Ok(extras.into())
    }

    pub fn load(path: impl AsRef<Path>) -> ClusterResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Clamps both values into the ranges the cluster kernels support.
    pub fn clamped(self) -> Self {
        let range = if self.camera_cluster_range.is_nan() {
            DEFAULT_CAMERA_CLUSTER_RANGE
        } else {
            self.camera_cluster_range
                .clamp(MIN_CAMERA_CLUSTER_RANGE, MAX_CAMERA_CLUSTER_RANGE)
        };
        if range != self.camera_cluster_range {
            warn!(
                "camera_cluster_range {} out of range, using {}",
                self.camera_cluster_range, range
            );
        }

        let per_cell = self.max_num_lights_per_cell.min(MAX_LIGHTS_PER_CELL_LIMIT);
        if per_cell != self.max_num_lights_per_cell {
            warn!(
                "max_num_lights_per_cell {} out of range, using {}",
                self.max_num_lights_per_cell, per_cell
            );
        }

        Self {
            camera_cluster_range: range,
            max_num_lights_per_cell: per_cell,
        }
    }
}
