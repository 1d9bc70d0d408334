//! Per-frame object transforms shared by the visible and identity passes.

use glam::Mat4;

use crate::pick::ObjectHandle;

/// Object transforms computed once per frame.
///
/// Each entry is the full clip-space transform (`view_proj * model`) of one
/// object. The visible pass and the identity pass both read their per-draw
/// matrix from here, so the two passes always agree on where an object is.
#[derive(Debug, Clone, Default)]
pub struct TransformCache {
    view_proj: Mat4,
    transforms: Vec<Option<Mat4>>,
    frame: u64,
}

impl TransformCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame with the given camera matrix and object count.
    ///
    /// Every transform of the previous frame is discarded.
    pub fn begin_frame(&mut self, view_proj: Mat4, object_count: usize) {
        self.view_proj = view_proj;
        self.transforms.clear();
        self.transforms.resize(object_count, None);
        self.frame += 1;
    }

    /// Records the model matrix of `handle` for the current frame.
    ///
    /// Handles outside the frame's object count are ignored.
    pub fn set(&mut self, handle: ObjectHandle, model: Mat4) {
        if let Some(slot) = self.transforms.get_mut(handle.index()) {
            *slot = Some(self.view_proj * model);
        } else {
            log::warn!("ignoring transform for {handle}: frame has {} objects", self.transforms.len());
        }
    }

    /// Starts a frame and fills it from `model_of`, one call per object.
    pub fn update(
        &mut self,
        view_proj: Mat4,
        object_count: u32,
        mut model_of: impl FnMut(ObjectHandle) -> Mat4,
    ) {
        self.begin_frame(view_proj, object_count as usize);
        for i in 0..object_count {
            let handle = ObjectHandle(i);
            self.set(handle, model_of(handle));
        }
    }

    /// Returns the clip-space transform of `handle`, if set this frame.
    pub fn get(&self, handle: ObjectHandle) -> Option<Mat4> {
        self.transforms.get(handle.index()).copied().flatten()
    }

    /// Returns the camera matrix of the current frame.
    pub fn view_proj(&self) -> Mat4 {
        self.view_proj
    }

    /// Returns the number of objects of the current frame.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns whether the current frame has no objects.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Returns the frame counter, incremented by every `begin_frame`.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_transforms_are_premultiplied() {
        let view_proj = Mat4::from_scale(Vec3::splat(2.0));
        let mut cache = TransformCache::new();
        cache.update(view_proj, 3, |h| {
            Mat4::from_translation(Vec3::new(h.0 as f32, 0.0, 0.0))
        });

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.frame(), 1);
        let t = cache.get(ObjectHandle(2)).unwrap();
        assert_eq!(t.transform_point3(Vec3::ZERO), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_new_frame_discards_old_values() {
        let mut cache = TransformCache::new();
        cache.update(Mat4::IDENTITY, 2, |_| Mat4::IDENTITY);
        cache.begin_frame(Mat4::IDENTITY, 2);
        assert_eq!(cache.frame(), 2);
        assert!(cache.get(ObjectHandle(0)).is_none());

        cache.set(ObjectHandle(5), Mat4::IDENTITY);
        assert!(cache.get(ObjectHandle(5)).is_none());
    }
}
