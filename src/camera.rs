pub mod camera_controller;
pub mod freecam_controller;

use ultraviolet::{Mat4, Rotor3, Vec3};

use self::camera_controller::CameraController;

#[derive(Debug)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Rotor3,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: Vec3::zero(),
            orientation: Rotor3::identity(),
        }
    }

    /// Transform from camera space into the world, which is what the ray
    /// generation shader wants (it shoots rays out of the camera).
    pub fn camera_to_world(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * self.orientation.into_matrix().into_homogeneous()
    }

    pub fn update_camera(&mut self, controller: &impl CameraController) {
        self.position = controller.position();
        self.orientation = controller.orientation();
    }

    pub fn forward() -> Vec3 {
        -Vec3::unit_z()
    }

    pub fn right() -> Vec3 {
        Vec3::unit_x()
    }

    pub fn up() -> Vec3 {
        Vec3::unit_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_to_world_moves_the_origin_to_the_camera_position() {
        let mut camera = Camera::new();
        camera.position = Vec3::new(1.0, 2.0, 3.0);

        let origin = camera.camera_to_world() * ultraviolet::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin.x, 1.0);
        assert_eq!(origin.y, 2.0);
        assert_eq!(origin.z, 3.0);
    }
}
