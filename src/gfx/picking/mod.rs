//! # Object Picking System
//!
//! Mouse ray-casting against scene objects.
//!
//! 1. **Mouse to Ray**: pixel coordinates become normalised device
//!    coordinates (`x = cx / w * 2 - 1`, `y = -(cy / h) * 2 + 1`) and are
//!    unprojected through the camera's view-projection matrix.
//! 2. **Ray-Object Intersection**: the ray is moved into each object's local
//!    space, culled against every mesh's bounding box, then tested against
//!    the mesh triangles.
//! 3. **Selection**: the closest hit wins.
//!
//! ```no_run
//! use earthview::gfx::picking::ObjectPicker;
//! # fn demo(camera: &earthview::gfx::camera::OrbitCamera, scene: &earthview::gfx::scene::Scene) {
//! let picker = ObjectPicker::new((1200.0, 800.0));
//! let ray = picker.screen_to_ray((600.0, 400.0), camera);
//! if let Some(hit) = picker.pick_object(&ray, scene) {
//!     println!("Hit object {} at {:.2}", hit.object_index, hit.distance);
//! }
//! # }
//! ```

use cgmath::{ElementWise, InnerSpace, Matrix4, SquareMatrix, Transform, Vector3, Vector4, Zero};

use crate::gfx::{
    camera::{camera_utils::Camera, orbit_camera::OrbitCamera},
    scene::{object::Object, Scene},
};

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    /// Unit length in world space; may be scaled after [`Ray::transformed`]
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Create a new ray, normalising `direction`
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// The same ray expressed through `matrix`
    ///
    /// The direction is not renormalised, so `t` values measured against the
    /// transformed ray are the world-space distances of the original one.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        let origin = matrix.transform_point(cgmath::Point3::new(
            self.origin.x,
            self.origin.y,
            self.origin.z,
        ));
        Self {
            origin: Vector3::new(origin.x, origin.y, origin.z),
            direction: matrix.transform_vector(self.direction),
        }
    }

    /// Möller–Trumbore ray/triangle test, both faces count
    ///
    /// Returns the ray parameter of the hit.
    pub fn intersect_triangle(&self, triangle: &[Vector3<f32>; 3]) -> Option<f32> {
        const EPSILON: f32 = 1e-9;
        let [v0, v1, v2] = *triangle;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl AABB {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box around `points`; a zero box when there are none
    pub fn from_points(points: impl IntoIterator<Item = Vector3<f32>>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        points.fold(Self::new(first, first), |aabb, p| Self {
            min: Vector3::new(aabb.min.x.min(p.x), aabb.min.y.min(p.y), aabb.min.z.min(p.z)),
            max: Vector3::new(aabb.max.x.max(p.x), aabb.max.y.max(p.y), aabb.max.z.max(p.z)),
        })
    }

    /// Slab test; returns the entry distance (or exit distance when the
    /// origin is inside)
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vector3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );

        let t_min = (self.min - ray.origin).mul_element_wise(inv_dir);
        let t_max = (self.max - ray.origin).mul_element_wise(inv_dir);

        let t_near = t_min.x.min(t_max.x).max(t_min.y.min(t_max.y)).max(t_min.z.min(t_max.z));
        let t_far = t_min.x.max(t_max.x).min(t_min.y.max(t_max.y)).min(t_min.z.max(t_max.z));

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }
}

/// Result of an object picking operation
#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    pub object_index: usize,
    pub mesh_index: usize,
    /// Distance from the ray origin to the hit
    pub distance: f32,
    /// World space intersection point
    pub intersection_point: Vector3<f32>,
}

/// Object picker for 3D mouse selection
#[derive(Debug, Clone, Copy)]
pub struct ObjectPicker {
    viewport: (f32, f32),
}

impl ObjectPicker {
    pub fn new(viewport: (f32, f32)) -> Self {
        Self { viewport }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width.max(1.0), height.max(1.0));
    }

    /// Pixel position to normalised device coordinates
    pub fn to_ndc(&self, screen_pos: (f32, f32)) -> (f32, f32) {
        let (width, height) = self.viewport;
        (
            screen_pos.0 / width * 2.0 - 1.0,
            -(screen_pos.1 / height) * 2.0 + 1.0,
        )
    }

    /// Convert screen coordinates to a world-space ray
    pub fn screen_to_ray(&self, screen_pos: (f32, f32), camera: &OrbitCamera) -> Ray {
        let (ndc_x, ndc_y) = self.to_ndc(screen_pos);

        // wgpu clip space: depth runs 0 (near) to 1 (far)
        let inv_view_proj = camera
            .build_view_projection_matrix()
            .invert()
            .unwrap_or_else(Matrix4::identity);
        let unproject = |z: f32| {
            let p = inv_view_proj * Vector4::new(ndc_x, ndc_y, z, 1.0);
            Vector3::new(p.x / p.w, p.y / p.w, p.z / p.w)
        };

        let near = unproject(0.0);
        let far = unproject(1.0);
        Ray::new(near, far - near)
    }

    /// Nearest hit on any mesh of `object`
    pub fn intersect_object(&self, ray: &Ray, object: &Object) -> Option<PickResult> {
        intersect_object(ray, object)
    }

    /// Nearest hit across the whole scene
    pub fn pick_object(&self, ray: &Ray, scene: &Scene) -> Option<PickResult> {
        scene
            .objects
            .iter()
            .enumerate()
            .filter_map(|(index, object)| {
                self.intersect_object(ray, object).map(|hit| PickResult {
                    object_index: index,
                    ..hit
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Nearest hit of `ray` on any mesh of `object`
///
/// The ray is tested in the object's local space; invisible objects never
/// report a hit. `object_index` of the result is always 0.
pub fn intersect_object(ray: &Ray, object: &Object) -> Option<PickResult> {
    if !object.visible {
        return None;
    }

    let local = ray.transformed(&object.inverse_model_matrix());
    let mut closest: Option<(usize, f32)> = None;

    for (mesh_index, mesh) in object.meshes.iter().enumerate() {
        let Some(entry) = mesh.bounds().intersect_ray(&local) else {
            continue;
        };
        if closest.is_some_and(|(_, best)| entry > best) {
            continue;
        }

        for triangle in mesh.triangles() {
            if let Some(t) = local.intersect_triangle(&triangle) {
                if closest.map_or(true, |(_, best)| t < best) {
                    closest = Some((mesh_index, t));
                }
            }
        }
    }

    closest.map(|(mesh_index, distance)| PickResult {
        object_index: 0,
        mesh_index,
        distance,
        intersection_point: ray.point_at(distance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::gfx::geometry::generate_sphere;
    use crate::gfx::scene::object::Mesh;

    fn sphere(name: &str, radius: f32, position: Vector3<f32>) -> Object {
        Object::new(name, vec![Mesh::from_geometry(&generate_sphere(radius, 16, 12))])
            .with_position(position)
    }

    #[test]
    fn test_aabb_creation() {
        let aabb = AABB::from_points([
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(-1.0, -1.0, -1.0),
        ]);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = AABB::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(4.0));

        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());
    }

    #[test]
    fn triangle_hit_from_either_side() {
        let triangle = [
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let front = Ray::new(Vector3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
        let back = Ray::new(Vector3::new(0.0, 0.0, -2.0), Vector3::new(0.0, 0.0, 1.0));
        let beside = Ray::new(Vector3::new(2.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0));

        assert!((front.intersect_triangle(&triangle).unwrap() - 3.0).abs() < 1e-6);
        assert!((back.intersect_triangle(&triangle).unwrap() - 2.0).abs() < 1e-6);
        assert!(beside.intersect_triangle(&triangle).is_none());
    }

    #[test]
    fn ndc_conversion_matches_screen_corners() {
        let picker = ObjectPicker::new((800.0, 600.0));
        assert_eq!(picker.to_ndc((0.0, 0.0)), (-1.0, 1.0));
        assert_eq!(picker.to_ndc((800.0, 600.0)), (1.0, -1.0));
        assert_eq!(picker.to_ndc((400.0, 300.0)), (0.0, 0.0));
    }

    #[test]
    fn centre_ray_looks_down_negative_z() {
        let camera = OrbitCamera::from_config(&CameraConfig::default(), 800.0 / 600.0);
        let picker = ObjectPicker::new((800.0, 600.0));
        let ray = picker.screen_to_ray((400.0, 300.0), &camera);

        assert!((ray.direction - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);
        // starts on the near plane in front of the eye
        assert!((ray.origin.z - 4.9).abs() < 1e-3);
    }

    #[test]
    fn object_hit_distance_is_in_world_units() {
        // scaled sphere of world radius 0.5 at x = 3
        let object = Object::new(
            "Buoy",
            vec![Mesh::from_geometry(&generate_sphere(10.0, 32, 24))],
        )
        .with_position(Vector3::new(3.0, 0.0, 0.0))
        .with_scale(0.05);
        let picker = ObjectPicker::new((1.0, 1.0));
        let ray = Ray::new(Vector3::new(3.01, 0.013, 10.0), Vector3::new(0.0, 0.0, -1.0));

        let hit = picker.intersect_object(&ray, &object).unwrap();
        assert!((hit.distance - 9.5).abs() < 0.01);
        assert!((hit.intersection_point.z - 0.5).abs() < 0.01);
    }

    #[test]
    fn invisible_objects_are_ignored() {
        let mut object = sphere("Moon", 0.27, Vector3::new(3.0, 0.0, 0.0));
        let picker = ObjectPicker::new((1.0, 1.0));
        let ray = Ray::new(Vector3::new(3.01, 0.02, 5.0), Vector3::new(0.0, 0.0, -1.0));

        assert!(picker.intersect_object(&ray, &object).is_some());
        object.visible = false;
        assert!(picker.intersect_object(&ray, &object).is_none());
    }

    #[test]
    fn nearest_object_wins() {
        let mut scene = Scene::default();
        scene.add_object(sphere("Far", 1.0, Vector3::new(0.0, 0.0, -5.0)));
        scene.add_object(sphere("Near", 1.0, Vector3::new(0.0, 0.0, 0.0)));
        let picker = ObjectPicker::new((1.0, 1.0));
        let ray = Ray::new(Vector3::new(0.013, 0.021, 10.0), Vector3::new(0.0, 0.0, -1.0));

        let hit = picker.pick_object(&ray, &scene).unwrap();
        assert_eq!(scene.objects[hit.object_index].name, "Near");
        assert!((hit.distance - 9.0).abs() < 0.05);
    }
}
