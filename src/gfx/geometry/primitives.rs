//! # Primitive Shape Generation

use super::GeometryData;
use std::f32::consts::PI;

/// Generate a UV sphere
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `width_segments` - Segments around the equator (min 3)
/// * `height_segments` - Segments from pole to pole (min 2)
///
/// Y is up. Longitude zero sits on -X so an equirectangular map wraps the
/// way Earth textures expect; the seam column is duplicated so UVs run 0..1.
/// The single-triangle fans at the poles skip their degenerate halves.
pub fn generate_sphere(radius: f32, width_segments: u32, height_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let width_segs = width_segments.max(3);
    let height_segs = height_segments.max(2);

    let mut grid: Vec<Vec<u32>> = Vec::with_capacity(height_segs as usize + 1);

    for iy in 0..=height_segs {
        let v = iy as f32 / height_segs as f32;
        let theta = v * PI;

        // Centre the pole vertex UV over its fan
        let u_offset = if iy == 0 {
            0.5 / width_segs as f32
        } else if iy == height_segs {
            -0.5 / width_segs as f32
        } else {
            0.0
        };

        let mut row = Vec::with_capacity(width_segs as usize + 1);
        for ix in 0..=width_segs {
            let u = ix as f32 / width_segs as f32;
            let phi = u * 2.0 * PI;

            let normal = [-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin()];

            row.push(data.vertices.len() as u32);
            data.vertices
                .push([normal[0] * radius, normal[1] * radius, normal[2] * radius]);
            data.normals.push(normal);
            data.tex_coords.push([u + u_offset, v]);
        }
        grid.push(row);
    }

    for iy in 0..height_segs as usize {
        for ix in 0..width_segs as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];

            if iy != 0 {
                data.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segs as usize - 1 {
                data.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    #[test]
    fn test_sphere_counts() {
        let sphere = generate_sphere(1.0, 8, 6);
        assert_eq!(sphere.vertex_count(), 9 * 7);
        assert_eq!(sphere.normals.len(), sphere.vertex_count());
        assert_eq!(sphere.tex_coords.len(), sphere.vertex_count());
        // Pole rows contribute one triangle per segment, inner rows two
        assert_eq!(sphere.triangle_count(), 2 * 8 * (6 - 1));
    }

    #[test]
    fn test_sphere_radius_and_normals() {
        let sphere = generate_sphere(2.02, 16, 12);
        for (p, n) in sphere.vertices.iter().zip(&sphere.normals) {
            let p = Vector3::from(*p);
            let n = Vector3::from(*n);
            assert!((p.magnitude() - 2.02).abs() < 1e-4);
            assert!((n.magnitude() - 1.0).abs() < 1e-4);
            assert!((p / 2.02 - n).magnitude() < 1e-4);
        }
    }

    #[test]
    fn test_sphere_winding_faces_outward() {
        let sphere = generate_sphere(1.0, 12, 9);
        for tri in sphere.indices.chunks_exact(3) {
            let p0 = Vector3::from(sphere.vertices[tri[0] as usize]);
            let p1 = Vector3::from(sphere.vertices[tri[1] as usize]);
            let p2 = Vector3::from(sphere.vertices[tri[2] as usize]);
            let normal = (p1 - p0).cross(p2 - p0);
            let centroid = (p0 + p1 + p2) / 3.0;
            assert!(normal.magnitude() > 0.0, "degenerate triangle {:?}", tri);
            assert!(normal.dot(centroid) > 0.0, "inward triangle {:?}", tri);
        }
    }

    #[test]
    fn test_sphere_uv_layout() {
        let sphere = generate_sphere(1.0, 4, 2);
        // North pole row sits at the top of the texture
        assert_eq!(sphere.tex_coords[0][1], 0.0);
        assert!((sphere.vertices[0][1] - 1.0).abs() < 1e-6);
        // Equator seam: first and last column share a position but not a u
        let equator = 5;
        assert_eq!(sphere.tex_coords[equator], [0.0, 0.5]);
        assert_eq!(sphere.tex_coords[equator + 4], [1.0, 0.5]);
        let a = Vector3::from(sphere.vertices[equator]);
        let b = Vector3::from(sphere.vertices[equator + 4]);
        assert!((a - b).magnitude() < 1e-5);
        // Longitude zero on -X
        assert!((a.x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_minimum_segments_are_enforced() {
        let sphere = generate_sphere(1.0, 0, 0);
        assert_eq!(sphere.vertex_count(), 4 * 3);
        assert_eq!(sphere.triangle_count(), 2 * 3 * 1);
    }
}
