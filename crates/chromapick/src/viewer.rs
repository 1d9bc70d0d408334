//! Headless viewer: visible pass, identity pass and selection in one place.

use std::path::Path;

use chromapick_core::{
    ObjectHandle, PickOptions, PickRequest, PickResolver, Result, SelectionState, TransformCache,
};
use chromapick_render::{save_image, Camera, CaptureOptions, RenderEngine};
use pollster::FutureExt;

use crate::scene::SpiralScene;

/// Default viewport width.
pub const DEFAULT_WIDTH: u32 = 1200;

/// Default viewport height.
pub const DEFAULT_HEIGHT: u32 = 800;

/// Renders a [`SpiralScene`] offscreen and resolves picks against it.
///
/// Each frame computes the transforms once; the visible pass and the
/// identity pass both draw from that cache.
pub struct Viewer {
    engine: RenderEngine,
    camera: Camera,
    scene: SpiralScene,
    resolver: PickResolver,
    transforms: TransformCache,
}

impl Viewer {
    /// Creates a viewer over the default ten-spiral scene.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let scene = SpiralScene::default();
        let options = PickOptions::with_object_count(scene.object_count());
        Self::with_scene(width, height, scene, options)
    }

    /// Creates a viewer over `scene` with explicit pick options.
    ///
    /// `options.object_count` is replaced by the scene's object count.
    pub fn with_scene(
        width: u32,
        height: u32,
        scene: SpiralScene,
        mut options: PickOptions,
    ) -> Result<Self> {
        options.object_count = scene.object_count();
        let resolver = PickResolver::new(options, scene.draw_spec())?;

        let mut engine = RenderEngine::new_headless(width, height).block_on()?;
        engine.set_vertices(scene.positions())?;
        engine.set_vertex_colors(scene.normal_colors(), scene.selected_colors())?;
        log::info!(
            "viewer ready: {} objects, {width}x{height}",
            scene.object_count()
        );

        let mut viewer = Self {
            engine,
            camera: Camera::for_viewport(width, height),
            scene,
            resolver,
            transforms: TransformCache::new(),
        };
        viewer.render_frame()?;
        Ok(viewer)
    }

    /// Recomputes this frame's transforms and draws the visible pass.
    pub fn render_frame(&mut self) -> Result<()> {
        let scene = &self.scene;
        self.transforms.update(
            self.camera.view_projection_matrix(),
            scene.object_count(),
            |handle| scene.model(handle),
        );
        self.engine.render_scene(
            &self.transforms,
            &scene.draw_specs(),
            self.resolver.selection(),
        )?;
        Ok(())
    }

    /// Picks the object under window pixel `(x, y)` (top-left origin) and
    /// redraws the visible frame with the new selection.
    pub fn pick(&mut self, x: i64, y: i64) -> Result<Option<ObjectHandle>> {
        self.pick_request(PickRequest::new(x, y))
    }

    /// Picks at a floating-point cursor position.
    pub fn pick_cursor(&mut self, x: f64, y: f64) -> Result<Option<ObjectHandle>> {
        self.pick_request(PickRequest::from_cursor(x, y))
    }

    fn pick_request(&mut self, request: PickRequest) -> Result<Option<ObjectHandle>> {
        let picked = self
            .resolver
            .resolve_pick(&mut self.engine, request, &self.transforms)?;
        match picked {
            Some(handle) => log::info!("selected spiral {handle}"),
            None => log::info!("selection cleared"),
        }
        self.render_frame()?;
        Ok(picked)
    }

    /// Resizes the viewport and redraws.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.engine.resize(width, height)?;
        self.camera = Camera::for_viewport(width, height);
        self.render_frame()
    }

    /// Clears the selection and redraws.
    pub fn clear_selection(&mut self) -> Result<()> {
        self.resolver.reset();
        self.render_frame()
    }

    pub fn selection(&self) -> &SelectionState {
        self.resolver.selection()
    }

    pub fn scene(&self) -> &SpiralScene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn transforms(&self) -> &TransformCache {
        &self.transforms
    }

    /// Returns `(width, height)` of the viewport.
    pub fn size(&self) -> (u32, u32) {
        (self.engine.width, self.engine.height)
    }

    /// Reads the visible frame as RGBA rows, top row first.
    pub fn frame_pixels(&self) -> Result<Vec<u8>> {
        Ok(self.engine.read_scene_buffer()?)
    }

    /// Reads the identity buffer of the last pick as RGBA rows, top row first.
    pub fn pick_buffer_pixels(&self) -> Result<Vec<u8>> {
        Ok(self.engine.read_pick_buffer()?)
    }

    /// Saves the visible frame as an image.
    pub fn save_frame(&self, path: impl AsRef<Path>) -> Result<()> {
        let (width, height) = self.size();
        let data = self.frame_pixels()?;
        save_image(path, &data, width, height, &CaptureOptions::default())?;
        Ok(())
    }

    /// Saves the identity buffer of the last pick as an opaque image.
    pub fn save_pick_buffer(&self, path: impl AsRef<Path>) -> Result<()> {
        let (width, height) = self.size();
        let data = self.pick_buffer_pixels()?;
        save_image(path, &data, width, height, &CaptureOptions { opaque: true })?;
        Ok(())
    }
}
