//! Pick resolution: identity pass, single-pixel readback and decode.

use crate::backend::{DrawSpec, IdentityRenderer, PickBackend};
use crate::error::{PickError, Result};
use crate::options::PickOptions;
use crate::pick::{decode_checked, encode, ObjectHandle};
use crate::request::PickRequest;
use crate::selection::SelectionState;
use crate::transform::TransformCache;

/// Depth value the identity pass clears to (the far plane).
pub const CLEAR_DEPTH: f32 = 1.0;

/// Resolves cursor positions to object handles by colour picking.
///
/// Owns the selection state. Each object is drawn with its own [`DrawSpec`],
/// which must be the draw call the visible pass issues for that object.
#[derive(Debug, Clone)]
pub struct PickResolver {
    options: PickOptions,
    draws: Vec<DrawSpec>,
    selection: SelectionState,
}

impl PickResolver {
    /// Creates a resolver where every object uses the same draw call.
    pub fn new(options: PickOptions, draw: DrawSpec) -> Result<Self> {
        options.validate()?;
        let draws = vec![draw; options.object_count as usize];
        Ok(Self {
            options,
            draws,
            selection: SelectionState::new(),
        })
    }

    /// Returns the resolver options.
    pub fn options(&self) -> &PickOptions {
        &self.options
    }

    /// Returns the number of selectable objects.
    pub fn object_count(&self) -> u32 {
        self.options.object_count
    }

    /// Returns the current selection state.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Returns the selected handle, if any.
    pub fn selected(&self) -> Option<ObjectHandle> {
        self.selection.selected()
    }

    /// Clears the selection.
    pub fn reset(&mut self) {
        self.selection.clear();
    }

    /// Overrides the draw call of one object.
    pub fn set_draw(&mut self, handle: ObjectHandle, draw: DrawSpec) -> Result<()> {
        let object_count = self.object_count();
        let slot = self
            .draws
            .get_mut(handle.index())
            .ok_or_else(|| PickError::configuration(format!(
                "cannot set draw for {handle}: scene has {object_count} objects"
            )))?;
        *slot = draw;
        Ok(())
    }

    /// Changes the number of selectable objects.
    ///
    /// Objects added by growing the scene are drawn with `draw`; existing
    /// objects keep theirs. A selection that no longer names a live object
    /// is cleared.
    pub fn set_object_count(&mut self, object_count: u32, draw: DrawSpec) -> Result<()> {
        let options = PickOptions {
            object_count,
            ..self.options.clone()
        };
        options.validate()?;
        self.draws.resize(object_count as usize, draw);
        self.options = options;

        if self.selected().is_some_and(|h| h.0 >= object_count) {
            log::debug!("selection cleared: object count is now {object_count}");
            self.selection.clear();
        }
        Ok(())
    }

    /// Renders every object with its identity colour and waits for completion.
    ///
    /// Transforms are taken from `transforms`, the same cache the visible
    /// pass drew from this frame. The pass is never presented.
    pub fn render_identity_pass<R: IdentityRenderer + ?Sized>(
        &self,
        renderer: &mut R,
        transforms: &TransformCache,
    ) -> Result<()> {
        let object_count = self.object_count();
        let per_object = (0..object_count)
            .map(|i| {
                let handle = ObjectHandle(i);
                transforms.get(handle).map(|t| (handle, t)).ok_or_else(|| {
                    PickError::configuration(format!(
                        "no transform for {handle} in frame {}",
                        transforms.frame()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        renderer.clear(self.options.background_color, CLEAR_DEPTH)?;
        renderer.bind_flat_color_shader()?;
        for (handle, transform) in per_object {
            renderer.set_transform(transform)?;
            renderer.set_color(encode(handle))?;
            renderer.draw(self.draws[handle.index()])?;
        }
        renderer.finish()
    }

    /// Resolves `request` to the object under the cursor and stores the
    /// result as the new selection.
    ///
    /// Out-of-range coordinates and colours that decode to no live object
    /// resolve to `Ok(None)`. Backend and configuration failures propagate and
    /// leave the selection untouched.
    pub fn resolve_pick<B: PickBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        request: PickRequest,
        transforms: &TransformCache,
    ) -> Result<Option<ObjectHandle>> {
        log::debug!("resolving pick at ({}, {})", request.x, request.y);

        let (width, height) = backend.framebuffer_size();
        let (x, y) = match request.to_framebuffer(width, height, self.options.out_of_bounds) {
            Ok(coords) => coords,
            Err(err) if err.is_recoverable() => {
                log::debug!("pick rejected: {err}");
                self.selection.clear();
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        self.render_identity_pass(backend, transforms)?;
        let pixel = backend.read_pixel(x, y)?;
        if self.options.log_pixels {
            log::debug!("sampled pixel ({x}, {y}) = {:?}", pixel.to_array());
        }

        let picked = match decode_checked(pixel, self.object_count(), self.options.background_color)
        {
            Ok(picked) => picked,
            Err(err) if err.is_recoverable() => {
                log::warn!("pick discarded: {err}");
                None
            }
            Err(err) => return Err(err),
        };

        self.selection.set(picked);
        log::debug!("selection = {}", self.selection.as_sentinel());
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FramebufferReader, PrimitiveKind};
    use crate::pick::IdentityColor;
    use glam::Mat4;

    #[derive(Debug, PartialEq)]
    enum Call {
        Clear(IdentityColor),
        Bind,
        Transform(Mat4),
        Color(IdentityColor),
        Draw(DrawSpec),
        Finish,
        Read(u32, u32),
    }

    /// Records calls and returns a fixed pixel.
    struct Recorder {
        calls: Vec<Call>,
        pixel: IdentityColor,
        size: (u32, u32),
    }

    impl Recorder {
        fn new(pixel: IdentityColor) -> Self {
            Self {
                calls: Vec::new(),
                pixel,
                size: (1200, 800),
            }
        }
    }

    impl IdentityRenderer for Recorder {
        fn clear(&mut self, color: IdentityColor, _depth: f32) -> Result<()> {
            self.calls.push(Call::Clear(color));
            Ok(())
        }
        fn bind_flat_color_shader(&mut self) -> Result<()> {
            self.calls.push(Call::Bind);
            Ok(())
        }
        fn set_transform(&mut self, transform: Mat4) -> Result<()> {
            self.calls.push(Call::Transform(transform));
            Ok(())
        }
        fn set_color(&mut self, color: IdentityColor) -> Result<()> {
            self.calls.push(Call::Color(color));
            Ok(())
        }
        fn draw(&mut self, spec: DrawSpec) -> Result<()> {
            self.calls.push(Call::Draw(spec));
            Ok(())
        }
        fn finish(&mut self) -> Result<()> {
            self.calls.push(Call::Finish);
            Ok(())
        }
    }

    impl FramebufferReader for Recorder {
        fn framebuffer_size(&self) -> (u32, u32) {
            self.size
        }
        fn read_pixel(&mut self, x: u32, y: u32) -> Result<IdentityColor> {
            self.calls.push(Call::Read(x, y));
            Ok(self.pixel)
        }
    }

    fn spiral_draw() -> DrawSpec {
        DrawSpec::new(PrimitiveKind::TriangleStrip, 0, 200)
    }

    fn transforms(n: u32) -> TransformCache {
        let mut cache = TransformCache::new();
        cache.update(Mat4::IDENTITY, n, |h| {
            Mat4::from_translation(glam::Vec3::new(h.0 as f32, 0.0, 0.0))
        });
        cache
    }

    #[test]
    fn test_identity_pass_call_sequence() {
        let resolver = PickResolver::new(PickOptions::with_object_count(2), spiral_draw()).unwrap();
        let cache = transforms(2);
        let mut rec = Recorder::new(IdentityColor::default());
        resolver.render_identity_pass(&mut rec, &cache).unwrap();

        assert_eq!(
            rec.calls,
            vec![
                Call::Clear(crate::pick::BACKGROUND_COLOR),
                Call::Bind,
                Call::Transform(cache.get(ObjectHandle(0)).unwrap()),
                Call::Color(encode(ObjectHandle(0))),
                Call::Draw(spiral_draw()),
                Call::Transform(cache.get(ObjectHandle(1)).unwrap()),
                Call::Color(encode(ObjectHandle(1))),
                Call::Draw(spiral_draw()),
                Call::Finish,
            ]
        );
    }

    #[test]
    fn test_read_happens_after_finish_at_flipped_row() {
        let mut resolver =
            PickResolver::new(PickOptions::default(), spiral_draw()).unwrap();
        let mut rec = Recorder::new(encode(ObjectHandle(7)));
        let picked = resolver
            .resolve_pick(&mut rec, PickRequest::new(100, 100), &transforms(10))
            .unwrap();

        assert_eq!(picked, Some(ObjectHandle(7)));
        assert_eq!(resolver.selection().as_sentinel(), 7);
        let n = rec.calls.len();
        assert_eq!(rec.calls[n - 2], Call::Finish);
        assert_eq!(rec.calls[n - 1], Call::Read(100, 699));
    }

    #[test]
    fn test_out_of_range_skips_rendering() {
        let mut resolver = PickResolver::new(PickOptions::default(), spiral_draw()).unwrap();
        let mut rec = Recorder::new(encode(ObjectHandle(1)));
        resolver
            .resolve_pick(&mut rec, PickRequest::new(0, 0), &transforms(10))
            .unwrap();
        assert_eq!(resolver.selected(), Some(ObjectHandle(1)));

        let before = rec.calls.len();
        let picked = resolver
            .resolve_pick(&mut rec, PickRequest::new(1200, 5), &transforms(10))
            .unwrap();
        assert_eq!(picked, None);
        assert_eq!(resolver.selected(), None);
        assert_eq!(rec.calls.len(), before, "rejected pick must not render or read");
    }

    #[test]
    fn test_decode_mismatch_resolves_to_none() {
        let mut resolver = PickResolver::new(PickOptions::default(), spiral_draw()).unwrap();
        let mut rec = Recorder::new(encode(ObjectHandle(10)));
        let picked = resolver
            .resolve_pick(&mut rec, PickRequest::new(5, 5), &transforms(10))
            .unwrap();
        assert_eq!(picked, None);
        assert_eq!(resolver.selection().as_sentinel(), -1);
    }

    #[test]
    fn test_missing_transform_is_configuration_error() {
        let mut resolver = PickResolver::new(PickOptions::default(), spiral_draw()).unwrap();
        resolver.selection.select(ObjectHandle(2));
        let mut rec = Recorder::new(encode(ObjectHandle(1)));
        let err = resolver
            .resolve_pick(&mut rec, PickRequest::new(5, 5), &transforms(3))
            .unwrap_err();
        assert!(matches!(err, PickError::Configuration { .. }));
        assert!(rec.calls.is_empty(), "nothing may be drawn on a bad frame");
        assert_eq!(resolver.selected(), Some(ObjectHandle(2)));
    }

    #[test]
    fn test_shrinking_scene_drops_stale_selection() {
        let mut resolver = PickResolver::new(PickOptions::default(), spiral_draw()).unwrap();
        resolver.selection.select(ObjectHandle(8));
        resolver.set_object_count(12, spiral_draw()).unwrap();
        assert_eq!(resolver.selected(), Some(ObjectHandle(8)));
        resolver.set_object_count(5, spiral_draw()).unwrap();
        assert_eq!(resolver.selected(), None);
        assert!(resolver.set_draw(ObjectHandle(5), spiral_draw()).is_err());
        assert!(resolver.set_draw(ObjectHandle(4), spiral_draw()).is_ok());
    }

    #[test]
    fn test_grown_objects_use_the_given_draw() {
        let mut resolver =
            PickResolver::new(PickOptions::with_object_count(2), spiral_draw()).unwrap();
        let extra = DrawSpec::new(PrimitiveKind::Triangles, 200, 6);
        resolver.set_object_count(4, extra).unwrap();

        let mut rec = Recorder::new(encode(ObjectHandle(3)));
        resolver
            .render_identity_pass(&mut rec, &transforms(4))
            .unwrap();
        let draws: Vec<DrawSpec> = rec
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw(spec) => Some(*spec),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![spiral_draw(), spiral_draw(), extra, extra]);
    }
}
