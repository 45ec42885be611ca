/// Ray/plane primitives and screen-space unprojection
use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};

/// Smallest homogeneous `w` magnitude the perspective divide will accept.
/// Values closer to zero are clamped (sign preserved) so unprojection near
/// the horizon produces large-but-finite points instead of Inf/NaN.
pub const MIN_HOMOGENEOUS_W: f32 = 1e-4;

/// Pixel dimensions of the render target, used for pixel <-> NDC mapping.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Map a pixel coordinate to normalized device coordinates.
    ///
    /// Screen Y grows downward while NDC Y grows upward, so Y is flipped.
    pub fn pixel_to_ndc(&self, pixel: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(
            (pixel.x / self.width) * 2.0 - 1.0,
            1.0 - (pixel.y / self.height) * 2.0,
        )
    }

    /// Map an NDC coordinate back to pixels (inverse of [`pixel_to_ndc`]).
    ///
    /// [`pixel_to_ndc`]: Viewport::pixel_to_ndc
    pub fn ndc_to_pixel(&self, ndc: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        )
    }
}

/// Transform a point through a projective matrix, guarding the divide.
///
/// The computed `w` is clamped to [`MIN_HOMOGENEOUS_W`] with its sign kept,
/// because ray generation and marker projection divide by it every frame
/// and must never emit non-finite coordinates.
pub fn transform_point_projective(matrix: &Matrix4<f32>, point: Point3<f32>) -> Point3<f32> {
    let h: Vector4<f32> = matrix * point.to_homogeneous();
    let mut w = h.w;
    if w.abs() < MIN_HOMOGENEOUS_W {
        w = MIN_HOMOGENEOUS_W.copysign(if w == 0.0 { 1.0 } else { w });
    }
    Point3::new(h.x / w, h.y / w, h.z / w)
}

/// A half-line with a normalized direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub dir: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, dir: Vector3<f32>) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    /// Build the camera ray passing through a pixel.
    ///
    /// Unprojects the pixel at NDC depths 0 (near) and 1 (far) through the
    /// inverse view-projection matrix; the ray starts at the near point and
    /// points at the far one. Returns `None` when the view-projection
    /// matrix is not invertible (degenerate camera), which callers treat as
    /// a missed pick rather than an error.
    pub fn from_camera(
        viewport: &Viewport,
        view_proj: &Matrix4<f32>,
        pixel: Vector2<f32>,
    ) -> Option<Self> {
        let inverse = view_proj.try_inverse()?;
        let ndc = viewport.pixel_to_ndc(pixel);
        let near = transform_point_projective(&inverse, Point3::new(ndc.x, ndc.y, 0.0));
        let far = transform_point_projective(&inverse, Point3::new(ndc.x, ndc.y, 1.0));
        Some(Self::new(near, far - near))
    }

    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.dir * t
    }

    /// Project a point onto the ray's carrier line, origin-relative.
    pub fn project_point(&self, point: Point3<f32>) -> Point3<f32> {
        let t = (point - self.origin).dot(&self.dir);
        self.point_at(t)
    }

    /// True when the ray passes within `radius` of `center`.
    ///
    /// Markers are picked as spheres, so this is the whole hit test.
    pub fn hits_sphere(&self, center: Point3<f32>, radius: f32) -> bool {
        let closest = self.project_point(center);
        (center - closest).norm() <= radius
    }
}

/// A plane in normal/offset form: `dot(n, p) + d = 0`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub d: f32,
}

impl Plane {
    pub fn from_normal_and_point(normal: Vector3<f32>, point: Point3<f32>) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            d: -point.coords.dot(&normal),
        }
    }

    /// Build the drag-projection plane for an axis handle.
    ///
    /// The plane contains the axis origin; its normal is perpendicular to
    /// the axis and lies in the span of the axis and the to-camera vector
    /// (tangent = axis x to_camera, normal = tangent x axis). That keeps
    /// the plane as camera-facing as the axis constraint allows.
    ///
    /// Precondition: the camera-to-origin vector must not be parallel to
    /// the axis. Looking straight down the drag axis degenerates the double
    /// cross product and the resulting drag is unstable; that configuration
    /// is intentionally not special-cased.
    pub fn around_axis_toward(axis: &Ray, camera_pos: Point3<f32>) -> Self {
        let to_camera = camera_pos - axis.origin;
        let tangent = axis.dir.cross(&to_camera);
        let normal = tangent.cross(&axis.dir);
        Self::from_normal_and_point(normal, axis.origin)
    }

    /// Intersect a ray with the plane: `t = -(d + dot(o, n)) / dot(dir, n)`.
    ///
    /// Precondition: the ray is not parallel to the plane. Callers
    /// constructing planes via [`Plane::around_axis_toward`] satisfy this
    /// by construction; a parallel ray yields a non-finite point.
    pub fn intersect_ray(&self, ray: &Ray) -> Point3<f32> {
        let t = -(self.d + ray.origin.coords.dot(&self.normal)) / ray.dir.dot(&self.normal);
        ray.point_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;

    #[test]
    fn test_pixel_ndc_roundtrip() {
        let viewport = Viewport::new(800.0, 600.0);
        let center = viewport.pixel_to_ndc(Vector2::new(400.0, 300.0));
        assert!(center.norm() < 1e-6);

        // Screen top-left maps to NDC (-1, +1): the Y flip.
        let corner = viewport.pixel_to_ndc(Vector2::new(0.0, 0.0));
        assert!((corner - Vector2::new(-1.0, 1.0)).norm() < 1e-6);

        let pixel = Vector2::new(123.0, 456.0);
        let back = viewport.ndc_to_pixel(viewport.pixel_to_ndc(pixel));
        assert!((back - pixel).norm() < 1e-4);
    }

    #[test]
    fn test_projective_transform_clamps_w() {
        // A matrix that maps every point to w = 0 must still yield finite
        // output through the sign-preserving clamp.
        let mut m = Matrix4::identity();
        m[(3, 3)] = 0.0;
        let p = transform_point_projective(&m, Point3::new(1.0, 2.0, 3.0));
        assert!(p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        assert!((p.x - 1.0 / MIN_HOMOGENEOUS_W).abs() < 1.0);
    }

    #[test]
    fn test_ray_from_degenerate_matrix() {
        let viewport = Viewport::new(640.0, 480.0);
        let singular = Matrix4::zeros();
        assert!(Ray::from_camera(&viewport, &singular, Vector2::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn test_plane_intersection_through_known_point() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let plane = Plane::from_normal_and_point(Vector3::new(0.0, 1.0, 0.0), p);
        // A ray aimed straight at P must intersect the plane at P.
        let origin = Point3::new(1.0, 10.0, 3.0);
        let ray = Ray::new(origin, p - origin);
        let hit = plane.intersect_ray(&ray);
        assert!((hit - p).norm() < 1e-4);
    }

    #[test]
    fn test_axis_plane_contains_origin_and_faces_camera() {
        let axis = Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let camera = Point3::new(0.0, 1.0, 5.0);
        let plane = Plane::around_axis_toward(&axis, camera);

        // Axis origin lies on the plane.
        assert!((plane.normal.dot(&axis.origin.coords) + plane.d).abs() < 1e-5);
        // Normal is perpendicular to the axis direction.
        assert!(plane.normal.dot(&axis.dir).abs() < 1e-5);
        // Normal points along the camera direction for this configuration.
        assert!(plane.normal.dot(&Vector3::new(0.0, 0.0, 1.0)).abs() > 0.99);
    }

    #[test]
    fn test_project_point_onto_ray() {
        let ray = Ray::new(Point3::origin(), Vector3::new(1.0, 0.0, 0.0));
        let projected = ray.project_point(Point3::new(3.0, 4.0, -2.0));
        assert!((projected - Point3::new(3.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_sphere_hit() {
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0));
        assert!(ray.hits_sphere(Point3::new(0.3, 0.0, -10.0), 0.5));
        assert!(!ray.hits_sphere(Point3::new(1.0, 0.0, -10.0), 0.5));
    }
}
