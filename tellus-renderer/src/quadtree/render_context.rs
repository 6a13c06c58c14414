use bevy::math::DVec3;
use tellus_scene::{Cartographic, CullingVolume, EllipsoidalOccluder, Fog};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneMode {
    #[default]
    SCENE3D,
    COLUMBUS_VIEW,
    SCENE2D,
}

/// Everything the per-frame hooks need to know about the world outside the
/// surface: one immutable snapshot, rebuilt by the host each frame. Keeping
/// it a value (rather than ambient globals) leaves the door open to frame
/// pipelining.
#[derive(Clone, Debug)]
pub struct FrameState {
    pub frame_number: u32,
    pub camera_position_wc: DVec3,
    pub camera_position_cartographic: Cartographic,
    pub camera_direction_wc: DVec3,
    pub camera_is_perspective: bool,
    pub culling_volume: CullingVolume,
    pub occluder: EllipsoidalOccluder,
    pub fog: Fog,
    pub terrain_exaggeration: f64,
    pub mode: SceneMode,
}

impl FrameState {
    /// A frame looking straight down at the given cartographic position.
    /// Handy default for tests and headless updates.
    pub fn looking_down_at(
        cartographic: &Cartographic,
        frame_number: u32,
    ) -> Self {
        let ellipsoid = tellus_scene::Ellipsoid::WGS84;
        let position = ellipsoid.cartographic_to_cartesian(cartographic);
        let down = -ellipsoid.geodetic_surface_normal(position);
        let mut occluder = EllipsoidalOccluder::new(&ellipsoid);
        occluder.set_camera_position(position);
        Self {
            frame_number,
            camera_position_wc: position,
            camera_position_cartographic: *cartographic,
            camera_direction_wc: down,
            camera_is_perspective: true,
            culling_volume: CullingVolume::new(None),
            occluder,
            fog: Fog::for_camera_height(cartographic.height),
            terrain_exaggeration: 1.0,
            mode: SceneMode::SCENE3D,
        }
    }
}
