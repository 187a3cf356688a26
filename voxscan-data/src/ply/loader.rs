//! PLY file loading functions

use crate::error::LoadError;
use crate::ply::PlyVertex;
use crate::types::PointSet;
use glam::Vec3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

// PLY file structure
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(default, rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

/// Load vertices from a PLY file (ASCII or binary).
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_vertices_from_ply(path: impl AsRef<Path>) -> Result<Vec<PlyVertex>, LoadError> {
    let path = path.as_ref();
    debug!("Loading PLY vertices from: {}", path.display());
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        LoadError::Ply(e.to_string())
    })?;

    info!("PLY file parsed: {} vertices", ply_data.vertex.len());

    fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
        prop.and_then(|v| match v {
            JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
            _ => None,
        })
    }

    fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
        prop.and_then(|v| match v {
            JsonValue::Number(n) => n.as_u64().map(|u| u.min(255) as u8),
            _ => None,
        })
    }

    let mut vertices = Vec::with_capacity(ply_data.vertex.len());

    for (index, vertex) in ply_data.vertex.iter().enumerate() {
        let x = get_f32(vertex.get("x"))
            .ok_or(LoadError::MissingProperty { property: "x", index })?;
        let y = get_f32(vertex.get("y"))
            .ok_or(LoadError::MissingProperty { property: "y", index })?;
        let z = get_f32(vertex.get("z"))
            .ok_or(LoadError::MissingProperty { property: "z", index })?;

        let color = match (
            get_u8(vertex.get("red")),
            get_u8(vertex.get("green")),
            get_u8(vertex.get("blue")),
        ) {
            (Some(r), Some(g), Some(b)) => Some(Vec3::new(
                r as f32 / 255.0,
                g as f32 / 255.0,
                b as f32 / 255.0,
            )),
            _ => None,
        };

        vertices.push(PlyVertex {
            position: Vec3::new(x, y, z),
            color,
        });
    }

    debug!("Loaded {} vertices from PLY file", vertices.len());
    Ok(vertices)
}

/// Load only vertex positions from a PLY file.
pub fn load_points_from_ply(path: impl AsRef<Path>) -> Result<PointSet, LoadError> {
    Ok(load_vertices_from_ply(path)?
        .into_iter()
        .map(|v| v.position)
        .collect())
}
