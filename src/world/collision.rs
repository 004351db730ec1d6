use glam::{DMat3, DVec3};

use crate::world::body::RigidBody;
use crate::world::shape::Shape;

/// Narrow-phase result for one overlapping pair. The normal points from the
/// first body toward the second and is always unit length.
#[derive(Debug, Clone, Copy)]
pub struct ContactGeom {
    pub normal: DVec3,
    pub depth: f64,
}

/// Seam for the collision backend. The built-in [`AnalyticBackend`] covers
/// the shipped primitives; an external engine can be slotted in behind the
/// same interface.
pub trait CollisionBackend {
    /// Contact between two bodies, or `None` when their shapes do not
    /// overlap.
    fn contact(&self, a: &RigidBody, b: &RigidBody) -> Option<ContactGeom>;
}

/// Closed-form primitive tests for sphere, box, and plane shapes.
#[derive(Default)]
pub struct AnalyticBackend;

impl CollisionBackend for AnalyticBackend {
    fn contact(&self, a: &RigidBody, b: &RigidBody) -> Option<ContactGeom> {
        match (a.shape.as_ref(), b.shape.as_ref()) {
            (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
                sphere_sphere(a.position, *ra, b.position, *rb)
            }
            (Shape::Sphere { radius }, Shape::Plane { normal }) => {
                sphere_plane(a.position, *radius, b, *normal).map(ContactGeom::flipped)
            }
            (Shape::Plane { normal }, Shape::Sphere { radius }) => {
                sphere_plane(b.position, *radius, a, *normal)
            }
            (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
                sphere_box(a.position, *radius, b, *half_extents).map(ContactGeom::flipped)
            }
            (Shape::Box { half_extents }, Shape::Sphere { radius }) => {
                sphere_box(b.position, *radius, a, *half_extents)
            }
            (Shape::Box { half_extents }, Shape::Plane { normal }) => {
                box_plane(a, *half_extents, b, *normal).map(ContactGeom::flipped)
            }
            (Shape::Plane { normal }, Shape::Box { half_extents }) => {
                box_plane(b, *half_extents, a, *normal)
            }
            (Shape::Box { .. }, Shape::Box { .. }) => box_box(a, b),
            (Shape::Plane { .. }, Shape::Plane { .. }) => None,
        }
    }
}

impl ContactGeom {
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            depth: self.depth,
        }
    }
}

/// Degenerate normals are replaced instead of raised; +Y is an arbitrary
/// but stable fallback for exactly coincident centers.
fn safe_normal(v: DVec3) -> DVec3 {
    let len = v.length();
    if len > 1e-9 {
        v / len
    } else {
        DVec3::Y
    }
}

fn plane_normal(plane: &RigidBody, local_normal: DVec3) -> DVec3 {
    safe_normal(plane.orientation * local_normal)
}

fn sphere_sphere(pa: DVec3, ra: f64, pb: DVec3, rb: f64) -> Option<ContactGeom> {
    let delta = pb - pa;
    let dist = delta.length();
    if dist >= ra + rb {
        return None;
    }
    Some(ContactGeom {
        normal: safe_normal(delta),
        depth: ra + rb - dist,
    })
}

/// Normal points from the plane toward the sphere.
fn sphere_plane(
    center: DVec3,
    radius: f64,
    plane: &RigidBody,
    local_normal: DVec3,
) -> Option<ContactGeom> {
    let n = plane_normal(plane, local_normal);
    let signed = (center - plane.position).dot(n);
    if signed >= radius {
        return None;
    }
    Some(ContactGeom {
        normal: n,
        depth: radius - signed,
    })
}

/// Normal points from the box toward the sphere.
fn sphere_box(
    center: DVec3,
    radius: f64,
    cuboid: &RigidBody,
    half_extents: DVec3,
) -> Option<ContactGeom> {
    let local = cuboid.orientation.inverse() * (center - cuboid.position);
    let clamped = local.clamp(-half_extents, half_extents);
    let delta = local - clamped;
    let dist = delta.length();
    if dist > 1e-9 {
        // Center outside the box.
        if dist >= radius {
            return None;
        }
        Some(ContactGeom {
            normal: safe_normal(cuboid.orientation * delta),
            depth: radius - dist,
        })
    } else {
        // Center inside: push out along the face of least penetration.
        let gaps = half_extents - local.abs();
        let (axis, gap) = [(DVec3::X, gaps.x), (DVec3::Y, gaps.y), (DVec3::Z, gaps.z)]
            .into_iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        let local_dir = axis * local.dot(axis).signum();
        Some(ContactGeom {
            normal: safe_normal(cuboid.orientation * local_dir),
            depth: radius + gap,
        })
    }
}

/// Normal points from the plane toward the box. Depth is the deepest corner
/// penetration.
fn box_plane(
    cuboid: &RigidBody,
    half_extents: DVec3,
    plane: &RigidBody,
    local_normal: DVec3,
) -> Option<ContactGeom> {
    let n = plane_normal(plane, local_normal);
    let rot = DMat3::from_quat(cuboid.orientation);
    // Projection radius of the oriented box onto the plane normal.
    let reach = half_extents.x * rot.col(0).dot(n).abs()
        + half_extents.y * rot.col(1).dot(n).abs()
        + half_extents.z * rot.col(2).dot(n).abs();
    let signed = (cuboid.position - plane.position).dot(n);
    if signed - reach >= 0.0 {
        return None;
    }
    Some(ContactGeom {
        normal: n,
        depth: reach - signed,
    })
}

/// Box-box contact from world-space bounds: the normal lies along the axis
/// of least overlap. An approximation for strongly rotated boxes, but exact
/// for the axis-aligned stacks the engine targets.
fn box_box(a: &RigidBody, b: &RigidBody) -> Option<ContactGeom> {
    let bounds_a = a.aabb()?;
    let bounds_b = b.aabb()?;
    if !bounds_a.intersects(&bounds_b) {
        return None;
    }
    let overlap = bounds_a.overlap(&bounds_b);
    let (axis, depth) = [
        (DVec3::X, overlap.x),
        (DVec3::Y, overlap.y),
        (DVec3::Z, overlap.z),
    ]
    .into_iter()
    .min_by(|a, b| a.1.total_cmp(&b.1))?;
    if depth <= 0.0 {
        return None;
    }
    let toward_b = bounds_b.center() - bounds_a.center();
    let sign = if toward_b.dot(axis) >= 0.0 { 1.0 } else { -1.0 };
    Some(ContactGeom {
        normal: axis * sign,
        depth,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::DQuat;

    use super::*;
    use crate::world::body::{BodyDesc, BodyStore};
    use crate::world::material::MaterialRegistry;

    fn body(shape: Shape, position: DVec3, mass: f64) -> RigidBody {
        let mut registry = MaterialRegistry::new();
        let material = registry.register("test").unwrap();
        let mut store = BodyStore::new();
        let handle = store
            .add_body(
                BodyDesc::new(Arc::new(shape), material)
                    .with_position(position)
                    .with_mass(mass),
            )
            .unwrap();
        store.get(handle).unwrap().clone()
    }

    #[test]
    fn test_sphere_sphere_overlap() {
        let backend = AnalyticBackend;
        let a = body(Shape::sphere(1.0), DVec3::ZERO, 1.0);
        let b = body(Shape::sphere(1.0), DVec3::new(1.5, 0.0, 0.0), 1.0);
        let geom = backend.contact(&a, &b).unwrap();
        assert_eq!(geom.normal, DVec3::X);
        assert!((geom.depth - 0.5).abs() < 1e-12);

        let far = body(Shape::sphere(1.0), DVec3::new(3.0, 0.0, 0.0), 1.0);
        assert!(backend.contact(&a, &far).is_none());
    }

    #[test]
    fn test_sphere_plane_normal_points_at_sphere() {
        let backend = AnalyticBackend;
        let plane = body(Shape::ground_plane(), DVec3::ZERO, 0.0);
        let sphere = body(Shape::sphere(1.0), DVec3::new(0.0, 0.5, 0.0), 1.0);
        let geom = backend.contact(&plane, &sphere).unwrap();
        assert_eq!(geom.normal, DVec3::Y);
        assert!((geom.depth - 0.5).abs() < 1e-12);

        // Swapped argument order flips the normal.
        let geom = backend.contact(&sphere, &plane).unwrap();
        assert_eq!(geom.normal, -DVec3::Y);
    }

    #[test]
    fn test_coincident_spheres_get_stable_fallback_normal() {
        let backend = AnalyticBackend;
        let a = body(Shape::sphere(1.0), DVec3::ZERO, 1.0);
        let b = body(Shape::sphere(1.0), DVec3::ZERO, 1.0);
        let geom = backend.contact(&a, &b).unwrap();
        assert_eq!(geom.normal, DVec3::Y);
    }

    #[test]
    fn test_sphere_box_face_contact() {
        let backend = AnalyticBackend;
        let cuboid = body(Shape::cuboid(DVec3::splat(1.0)), DVec3::ZERO, 0.0);
        let sphere = body(Shape::sphere(0.5), DVec3::new(0.0, 1.3, 0.0), 1.0);
        let geom = backend.contact(&cuboid, &sphere).unwrap();
        assert!((geom.normal - DVec3::Y).length() < 1e-9);
        assert!((geom.depth - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_tilted_box_on_plane() {
        let backend = AnalyticBackend;
        let plane = body(Shape::ground_plane(), DVec3::ZERO, 0.0);
        let mut cuboid = body(
            Shape::cuboid(DVec3::splat(0.5)),
            DVec3::new(0.0, 0.6, 0.0),
            1.0,
        );
        // Upright box at 0.6 clears the plane by 0.1.
        assert!(backend.contact(&plane, &cuboid).is_none());
        // Rotating 45 degrees drops a corner through it.
        cuboid.orientation = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4);
        let geom = backend.contact(&plane, &cuboid).unwrap();
        assert_eq!(geom.normal, DVec3::Y);
        assert!(geom.depth > 0.0);
    }

    #[test]
    fn test_box_box_least_overlap_axis() {
        let backend = AnalyticBackend;
        let a = body(Shape::cuboid(DVec3::splat(0.5)), DVec3::ZERO, 1.0);
        let b = body(
            Shape::cuboid(DVec3::splat(0.5)),
            DVec3::new(0.0, 0.9, 0.0),
            1.0,
        );
        let geom = backend.contact(&a, &b).unwrap();
        assert_eq!(geom.normal, DVec3::Y);
        assert!((geom.depth - 0.1).abs() < 1e-12);
    }
}
