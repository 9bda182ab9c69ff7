use crate::app::{OrbitCamera, Vec3};

const NEAR_PLANE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Perspective projection for one frame, derived from the orbit camera.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    eye: Vec3,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    focal_px: f32,
    viewport: Viewport,
}

impl Projection {
    pub fn from_camera(camera: &OrbitCamera, viewport: Viewport) -> Self {
        let eye = camera.eye();
        let forward = (camera.target - eye).normalize();
        let mut right = forward.cross(Vec3::UP).normalize();
        if right == Vec3::ZERO {
            right = Vec3::new(1.0, 0.0, 0.0);
        }
        let up = right.cross(forward);
        let half_fov = camera.fov_degrees.to_radians() * 0.5;
        let focal_px = viewport.height as f32 * 0.5 / half_fov.tan().max(f32::EPSILON);
        Self {
            eye,
            right,
            up,
            forward,
            focal_px,
            viewport,
        }
    }

    fn to_camera_space(&self, world: Vec3) -> Vec3 {
        let relative = world - self.eye;
        Vec3::new(
            relative.dot(self.right),
            relative.dot(self.up),
            relative.dot(self.forward),
        )
    }

    fn camera_to_screen(&self, camera_space: Vec3) -> (i32, i32) {
        let scale = self.focal_px / camera_space.z;
        let x = self.viewport.width as f32 * 0.5 + camera_space.x * scale;
        let y = self.viewport.height as f32 * 0.5 - camera_space.y * scale;
        (
            x.clamp(-1.0e6, 1.0e6).round() as i32,
            y.clamp(-1.0e6, 1.0e6).round() as i32,
        )
    }

    /// Screen position of a world point, or `None` when it is behind the near plane.
    pub fn project(&self, world: Vec3) -> Option<(i32, i32)> {
        let camera_space = self.to_camera_space(world);
        if camera_space.z < NEAR_PLANE || !camera_space.is_finite() {
            return None;
        }
        Some(self.camera_to_screen(camera_space))
    }

    /// Projects a segment, clipping it against the near plane.
    pub fn project_segment(&self, a: Vec3, b: Vec3) -> Option<((i32, i32), (i32, i32))> {
        let mut ca = self.to_camera_space(a);
        let mut cb = self.to_camera_space(b);
        if !(ca.is_finite() && cb.is_finite()) {
            return None;
        }
        if ca.z < NEAR_PLANE && cb.z < NEAR_PLANE {
            return None;
        }
        if ca.z < NEAR_PLANE {
            ca = clip_to_near(cb, ca);
        } else if cb.z < NEAR_PLANE {
            cb = clip_to_near(ca, cb);
        }
        Some((self.camera_to_screen(ca), self.camera_to_screen(cb)))
    }

    /// Pixels per world unit at the given point, for sizing markers.
    pub fn scale_at(&self, world: Vec3) -> Option<f32> {
        let camera_space = self.to_camera_space(world);
        (camera_space.z >= NEAR_PLANE).then(|| self.focal_px / camera_space.z)
    }
}

fn clip_to_near(inside: Vec3, outside: Vec3) -> Vec3 {
    let t = (inside.z - NEAR_PLANE) / (inside.z - outside.z);
    inside + (outside - inside) * t
}
