use glam::{DMat3, DQuat, DVec3};

/// Collision geometry primitive. Immutable once created; bodies using the
/// same geometry share one instance behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Sphere { radius: f64 },
    Box { half_extents: DVec3 },
    /// Infinite plane through the body's position. The normal is given in
    /// local space and rotated by the body's orientation.
    Plane { normal: DVec3 },
}

impl Shape {
    pub fn sphere(radius: f64) -> Self {
        Shape::Sphere { radius }
    }

    pub fn cuboid(half_extents: DVec3) -> Self {
        Shape::Box { half_extents }
    }

    /// Plane facing +Y in local space, the usual ground orientation.
    pub fn ground_plane() -> Self {
        Shape::Plane { normal: DVec3::Y }
    }

    /// World-space bounding box, or `None` for unbounded shapes.
    pub fn aabb(&self, position: DVec3, orientation: DQuat) -> Option<Aabb> {
        match self {
            Shape::Sphere { radius } => Some(Aabb {
                min: position - DVec3::splat(*radius),
                max: position + DVec3::splat(*radius),
            }),
            Shape::Box { half_extents } => {
                // Conservative extents of the oriented box: |R| * h.
                let rot = DMat3::from_quat(orientation);
                let ext = DVec3::new(
                    rot.row(0).abs().dot(*half_extents),
                    rot.row(1).abs().dot(*half_extents),
                    rot.row(2).abs().dot(*half_extents),
                );
                Some(Aabb {
                    min: position - ext,
                    max: position + ext,
                })
            }
            Shape::Plane { .. } => None,
        }
    }
}

/// Axis-aligned bounding box used for broad-phase pruning.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn overlap(&self, other: &Aabb) -> DVec3 {
        DVec3::new(
            (self.max.x.min(other.max.x) - self.min.x.max(other.min.x)).max(0.0),
            (self.max.y.min(other.max.y) - self.min.y.max(other.min.y)).max(0.0),
            (self.max.z.min(other.max.z) - self.min.z.max(other.min.z)).max(0.0),
        )
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_aabb() {
        let shape = Shape::sphere(2.0);
        let aabb = shape.aabb(DVec3::new(1.0, 0.0, 0.0), DQuat::IDENTITY).unwrap();
        assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, -2.0));
        assert_eq!(aabb.max, DVec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_rotated_box_aabb_grows() {
        let shape = Shape::cuboid(DVec3::splat(0.5));
        let upright = shape.aabb(DVec3::ZERO, DQuat::IDENTITY).unwrap();
        let tilted = shape
            .aabb(DVec3::ZERO, DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4))
            .unwrap();
        assert!(tilted.max.x > upright.max.x);
        assert!((upright.max.x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_plane_is_unbounded() {
        assert!(Shape::ground_plane().aabb(DVec3::ZERO, DQuat::IDENTITY).is_none());
    }

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb { min: DVec3::ZERO, max: DVec3::ONE };
        let b = Aabb { min: DVec3::splat(0.5), max: DVec3::splat(1.5) };
        let c = Aabb { min: DVec3::splat(2.0), max: DVec3::splat(3.0) };
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
