//! The spiral scene: identical triangle-strip spirals arranged in a ring.

use std::f32::consts::TAU;

use chromapick_core::{DrawSpec, ObjectHandle, PrimitiveKind};
use glam::{Mat4, Vec3};

/// Number of spirals in the default scene.
pub const SPIRAL_COUNT: u32 = 10;

/// Steps along one spiral; each step emits an inner and an outer vertex.
pub const SPIRAL_STEPS: u32 = 100;

/// Vertices of one spiral strip.
pub const SPIRAL_VERTEX_COUNT: u32 = SPIRAL_STEPS * 2;

/// A ring of spirals sharing one triangle-strip geometry.
///
/// Every object draws the same vertex range; only its model matrix differs.
#[derive(Debug, Clone)]
pub struct SpiralScene {
    object_count: u32,
    positions: Vec<Vec3>,
    normal_colors: Vec<Vec3>,
    selected_colors: Vec<Vec3>,
}

impl SpiralScene {
    /// Builds a ring of `object_count` spirals.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(object_count: u32) -> Self {
        let capacity = SPIRAL_VERTEX_COUNT as usize;
        let mut positions = Vec::with_capacity(capacity);
        let mut normal_colors = Vec::with_capacity(capacity);
        let mut selected_colors = Vec::with_capacity(capacity);

        for step in 0..SPIRAL_STEPS {
            let ratio = step as f32 / SPIRAL_STEPS as f32;
            let angle = 21.0 * ratio;
            let (s, c) = angle.sin_cos();
            let outer = 0.5 - 0.3 * ratio;
            let inner = 0.3 - 0.3 * ratio;
            let altitude = ratio - 0.5;

            positions.push(Vec3::new(inner * c, inner * s, altitude + 0.05));
            positions.push(Vec3::new(outer * c, outer * s, altitude));

            let normal = Vec3::new(1.0 - ratio, 0.2, ratio);
            let selected = Vec3::new(1.0 - ratio, 0.8, ratio / 2.0);
            normal_colors.extend([normal, normal]);
            selected_colors.extend([selected, selected]);
        }

        Self {
            object_count,
            positions,
            normal_colors,
            selected_colors,
        }
    }

    pub fn object_count(&self) -> u32 {
        self.object_count
    }

    /// Object-space positions of the shared strip.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normal_colors(&self) -> &[Vec3] {
        &self.normal_colors
    }

    pub fn selected_colors(&self) -> &[Vec3] {
        &self.selected_colors
    }

    /// The draw call every spiral uses.
    pub fn draw_spec(&self) -> DrawSpec {
        DrawSpec::new(PrimitiveKind::TriangleStrip, 0, SPIRAL_VERTEX_COUNT)
    }

    /// One draw call per object, indexed by handle.
    pub fn draw_specs(&self) -> Vec<DrawSpec> {
        vec![self.draw_spec(); self.object_count as usize]
    }

    /// Model matrix of `handle`: a unit-radius offset around the Z axis.
    #[allow(clippy::cast_precision_loss)]
    pub fn model(&self, handle: ObjectHandle) -> Mat4 {
        let theta = TAU * handle.0 as f32 / self.object_count.max(1) as f32;
        Mat4::from_translation(Vec3::new(theta.cos(), theta.sin(), 0.0))
    }
}

impl Default for SpiralScene {
    fn default() -> Self {
        Self::new(SPIRAL_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromapick_core::{
        PickOptions, PickRequest, PickResolver, SoftwareTarget, TransformCache,
    };
    use chromapick_render::Camera;
    use proptest::prelude::*;

    const WIDTH: u32 = 1200;
    const HEIGHT: u32 = 800;

    #[test]
    fn test_strip_layout() {
        let scene = SpiralScene::default();
        assert_eq!(scene.positions().len(), 200);
        assert_eq!(scene.normal_colors().len(), 200);
        assert_eq!(scene.selected_colors().len(), 200);
        assert_eq!(scene.draw_specs().len(), 10);

        // First step: inner radius 0.3 raised by 0.05, outer radius 0.5.
        assert!((scene.positions()[0] - Vec3::new(0.3, 0.0, -0.45)).length() < 1e-6);
        assert!((scene.positions()[1] - Vec3::new(0.5, 0.0, -0.5)).length() < 1e-6);
        assert_eq!(scene.normal_colors()[0], Vec3::new(1.0, 0.2, 0.0));
        assert_eq!(scene.selected_colors()[1], Vec3::new(1.0, 0.8, 0.0));
    }

    #[test]
    fn test_objects_ring_the_origin() {
        let scene = SpiralScene::default();
        assert!((scene.model(ObjectHandle(0)).w_axis.truncate() - Vec3::X).length() < 1e-6);
        let opposite = scene.model(ObjectHandle(5)).w_axis.truncate();
        assert!((opposite - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    fn project_to_window(view_proj: Mat4, p: Vec3) -> (i64, i64) {
        let clip = view_proj * p.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x + 1.0) * 0.5 * WIDTH as f32;
        let y = (1.0 - ndc.y) * 0.5 * HEIGHT as f32;
        (x.floor() as i64, y.floor() as i64)
    }

    #[test]
    fn test_spirals_are_pickable_in_software() {
        let scene = SpiralScene::default();
        let camera = Camera::for_viewport(WIDTH, HEIGHT);
        let mut target = SoftwareTarget::new(WIDTH, HEIGHT);
        target.set_vertices(scene.positions().to_vec());

        let mut resolver = PickResolver::new(
            PickOptions::with_object_count(scene.object_count()),
            scene.draw_spec(),
        )
        .unwrap();
        let mut transforms = TransformCache::new();
        transforms.update(camera.view_projection_matrix(), scene.object_count(), |h| {
            scene.model(h)
        });

        // The window corner is sky: no spiral reaches it.
        let picked = resolver
            .resolve_pick(&mut target, PickRequest::new(0, 0), &transforms)
            .unwrap();
        assert_eq!(picked, None);

        // High on each spiral nothing else lies between the strip and the eye.
        let step = 90;
        let local = (scene.positions()[2 * step] + scene.positions()[2 * step + 1]) * 0.5;
        for i in 0..scene.object_count() {
            let handle = ObjectHandle(i);
            let world = scene.model(handle).transform_point3(local);
            let (x, y) = project_to_window(camera.view_projection_matrix(), world);
            let picked = resolver
                .resolve_pick(&mut target, PickRequest::new(x, y), &transforms)
                .unwrap();
            assert_eq!(picked, Some(handle), "window pixel ({x}, {y})");
            assert!(resolver.selection().is_selected(handle));
        }
    }

    proptest! {
        #[test]
        fn prop_ring_places_objects_on_unit_circle(count in 1u32..64) {
            let scene = SpiralScene::new(count);
            prop_assert_eq!(scene.draw_specs().len(), count as usize);
            for i in 0..count {
                let offset = scene.model(ObjectHandle(i)).w_axis.truncate();
                prop_assert!((offset.length() - 1.0).abs() < 1e-5);
                prop_assert!(offset.z.abs() < f32::EPSILON);
            }
        }
    }
}
