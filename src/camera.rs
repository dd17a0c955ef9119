use glam::{Mat4, Vec3};

/// Degrees the camera orbits per pixel of mouse drag.
pub const ORBIT_DEGREES_PER_PIXEL: f32 = 0.25;
/// Distance change per notch of the mouse wheel.
pub const ZOOM_PER_NOTCH: f32 = -0.5;

#[derive(Clone, Copy, Debug)]
pub struct CameraDesc {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub center: Vec3,
    pub distance: f32,
    pub min_dist: f32,
    pub max_dist: f32,
    pub latitude: f32,
    pub longitude: f32,
    pub min_lat: f32,
    pub max_lat: f32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        CameraDesc {
            fov: 60.0,
            near: 0.01,
            far: 100.0,
            center: Vec3::ZERO,
            distance: 2.5,
            min_dist: 2.0,
            max_dist: 1000.0,
            latitude: 0.0,
            longitude: 0.0,
            min_lat: -85.0,
            max_lat: 85.0,
        }
    }
}

/// A camera circling `center` at `distance`, positioned by latitude and
/// longitude in degrees.
pub struct Camera {
    desc: CameraDesc,
    pub eye_pos: Vec3,
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
}

impl Camera {
    pub fn new(desc: CameraDesc) -> Camera {
        let mut camera = Camera {
            desc: CameraDesc {
                distance: desc.distance.clamp(desc.min_dist, desc.max_dist),
                latitude: desc.latitude.clamp(desc.min_lat, desc.max_lat),
                ..desc
            },
            eye_pos: Vec3::ZERO,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
        };
        camera.update(1, 1);
        camera
    }

    pub fn distance(&self) -> f32 {
        self.desc.distance
    }

    pub fn latitude(&self) -> f32 {
        self.desc.latitude
    }

    pub fn longitude(&self) -> f32 {
        self.desc.longitude
    }

    pub fn orbit(&mut self, dx_deg: f32, dy_deg: f32) {
        let desc = &mut self.desc;
        desc.longitude = (desc.longitude - dx_deg).rem_euclid(360.0);
        desc.latitude = (desc.latitude + dy_deg).clamp(desc.min_lat, desc.max_lat);
    }

    pub fn zoom(&mut self, d: f32) {
        let desc = &mut self.desc;
        desc.distance = (desc.distance + d).clamp(desc.min_dist, desc.max_dist);
    }

    /// Recomputes the matrices for a framebuffer of the given size.
    pub fn update(&mut self, width: u32, height: u32) {
        let desc = &self.desc;
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        self.proj = Mat4::perspective_rh_gl(desc.fov.to_radians(), aspect, desc.near, desc.far);
        let (lat, lng) = (desc.latitude.to_radians(), desc.longitude.to_radians());
        self.eye_pos = desc.center
            + desc.distance * Vec3::new(lat.cos() * lng.sin(), lat.sin(), lat.cos() * lng.cos());
        self.view = Mat4::look_at_rh(self.eye_pos, desc.center, Vec3::Y);
        self.view_proj = self.proj * self.view;
    }
}
