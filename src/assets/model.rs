//! OBJ model loading
//!
//! Loads triangulated, single-index geometry with `tobj`. Normals missing from
//! the file are rebuilt by averaging face normals, and MTL diffuse colours are
//! kept so the renderer can build one material per model material.

use std::path::Path;

use super::{AssetError, AssetResult};

/// One mesh of a loaded model
#[derive(Debug, Clone)]
pub struct ModelMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    /// Index into [`ModelData::materials`]
    pub material: Option<usize>,
}

/// Material description read from an MTL file
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMaterial {
    pub name: String,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
}

impl Default for ModelMaterial {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.0, 0.0, 0.0],
            shininess: 30.0,
            opacity: 1.0,
        }
    }
}

/// A complete model: meshes plus the materials they reference
#[derive(Debug, Clone)]
pub struct ModelData {
    pub name: String,
    pub meshes: Vec<ModelMesh>,
    pub materials: Vec<ModelMaterial>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }
}

/// Loads an OBJ file (and its MTL library, when present)
pub fn load_obj(path: impl AsRef<Path>) -> AssetResult<ModelData> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| AssetError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = materials.unwrap_or_else(|err| {
        log::warn!("No usable MTL for {:?} ({}), using default materials", path, err);
        Vec::new()
    });

    let materials: Vec<ModelMaterial> = materials
        .iter()
        .enumerate()
        .map(|(i, mtl)| ModelMaterial {
            name: if mtl.name.is_empty() {
                format!("material_{}", i)
            } else {
                mtl.name.clone()
            },
            diffuse: mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]),
            specular: mtl.specular.unwrap_or([0.0, 0.0, 0.0]),
            shininess: mtl.shininess.unwrap_or(30.0),
            opacity: mtl.dissolve.unwrap_or(1.0).clamp(0.0, 1.0),
        })
        .collect();

    let mut meshes = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        if mesh.indices.is_empty() {
            continue;
        }

        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();

        let normals = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        } else {
            calculate_vertex_normals(&positions, &mesh.indices)
        };

        let uvs = if mesh.texcoords.len() / 2 == positions.len() {
            mesh.texcoords
                .chunks_exact(2)
                .map(|t| [t[0], 1.0 - t[1]])
                .collect()
        } else {
            vec![[0.0, 0.0]; positions.len()]
        };

        meshes.push(ModelMesh {
            name: model.name.clone(),
            positions,
            normals,
            uvs,
            indices: mesh.indices.clone(),
            material: mesh.material_id.filter(|&id| id < materials.len()),
        });
    }

    if meshes.is_empty() {
        return Err(AssetError::EmptyModel(path.to_path_buf()));
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("model"));

    let data = ModelData {
        name,
        meshes,
        materials,
    };
    log::info!(
        "Loaded model {:?}: {} meshes, {} triangles",
        path,
        data.meshes.len(),
        data.triangle_count()
    );
    Ok(data)
}

/// Smooth normals: every vertex gets the normalised sum of its faces' normals
pub fn calculate_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    use cgmath::{InnerSpace, Vector3, Zero};

    let mut sums = vec![Vector3::<f32>::zero(); positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let v0 = Vector3::from(positions[i0]);
        let v1 = Vector3::from(positions[i1]);
        let v2 = Vector3::from(positions[i2]);

        // Unnormalised cross product weights each face by its area.
        let face_normal = (v1 - v0).cross(v2 - v0);
        sums[i0] += face_normal;
        sums[i1] += face_normal;
        sums[i2] += face_normal;
    }

    sums.into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("earthview_model_test");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_obj_with_materials_and_generated_normals() {
        let dir = fixture_dir();
        std::fs::write(
            dir.join("panel.mtl"),
            "newmtl Panel\nKd 0.2 0.4 0.6\nd 0.5\nNs 64\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("panel.obj"),
            "mtllib panel.mtl\no Body\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nusemtl Panel\nf 1 2 3 4\n",
        )
        .unwrap();

        let model = load_obj(dir.join("panel.obj")).unwrap();
        assert_eq!(model.name, "panel");
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 2);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        for n in &mesh.normals {
            assert!((n[2] - 1.0).abs() < 1e-5, "quad in XY faces +Z, got {:?}", n);
        }

        assert_eq!(mesh.material, Some(0));
        let material = &model.materials[0];
        assert_eq!(material.name, "Panel");
        assert_eq!(material.diffuse, [0.2, 0.4, 0.6]);
        assert_eq!(material.opacity, 0.5);
        assert_eq!(material.shininess, 64.0);
    }

    #[test]
    fn obj_without_faces_is_empty() {
        let dir = fixture_dir();
        std::fs::write(dir.join("points.obj"), "v 0 0 0\nv 1 0 0\n").unwrap();

        let err = load_obj(dir.join("points.obj")).unwrap_err();
        assert!(matches!(err, AssetError::EmptyModel(_)));
    }

    #[test]
    fn missing_model_is_not_found() {
        let err = load_obj(fixture_dir().join("Satellite_missing.obj")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[test]
    fn shared_vertices_average_face_normals() {
        // Two faces of a unit cube corner meeting along the x axis
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let indices = [0, 1, 2, 0, 3, 1];
        let normals = calculate_vertex_normals(&positions, &indices);

        // Vertex 0 and 1 sit on both faces (+Z and +Y)
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((normals[0][1] - expected).abs() < 1e-5);
        assert!((normals[0][2] - expected).abs() < 1e-5);
        // Vertex 2 only touches the +Z face
        assert_eq!(normals[2], [0.0, 0.0, 1.0]);
    }
}
