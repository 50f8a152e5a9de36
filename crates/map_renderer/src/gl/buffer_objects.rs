//! Buffer object tracker
//!
//! Layer renderers keep their tile geometry in long-lived GPU buffers. Instead
//! of generating and deleting names every time a tile comes and goes, released
//! buffers are kept in a free list and handed out again. The tracker also
//! knows how many bytes the free list holds, so it can give storage back to
//! the driver when memory runs out.

use super::{BufferId, BufferTarget, BufferUsage, GlBinding};

/// Buffer names generated up front on context creation
pub const BUFFER_OBJECT_WORKING_SET: usize = 200;

/// Retained bytes in released buffers above which storage is shed
pub const BUFFER_CACHE_LIMIT_BYTES: usize = 16 * (1 << 20);

/// A GPU buffer owned by a layer renderer until released
#[derive(Debug, PartialEq, Eq)]
pub struct BufferObject {
    id: BufferId,
    target: Option<BufferTarget>,
    size: usize,
}

impl BufferObject {
    /// GPU name of this buffer
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Bytes of storage currently allocated on the GPU
    pub fn size(&self) -> usize {
        self.size
    }

    /// Target the buffer was last uploaded through
    pub fn target(&self) -> Option<BufferTarget> {
        self.target
    }

    /// Bind this buffer to its target
    pub fn bind(&self, gl: &mut dyn GlBinding, target: BufferTarget) {
        gl.bind_buffer(target, Some(self.id));
    }
}

/// Pool of reusable GPU buffer objects
#[derive(Debug)]
pub struct BufferObjectTracker {
    free: Vec<BufferObject>,
    retained_bytes: usize,
    limit_bytes: usize,
    in_use: usize,
}

impl Default for BufferObjectTracker {
    fn default() -> Self {
        Self::new(BUFFER_CACHE_LIMIT_BYTES)
    }
}

impl BufferObjectTracker {
    /// Create an empty tracker
    pub fn new(limit_bytes: usize) -> Self {
        Self {
            free: Vec::new(),
            retained_bytes: 0,
            limit_bytes,
            in_use: 0,
        }
    }

    /// Drop all tracked names and pre-generate a fresh working set
    ///
    /// Names from a previous context are meaningless in a new one, so they
    /// are forgotten without being deleted.
    pub fn init(&mut self, gl: &mut dyn GlBinding, working_set: usize) {
        self.free.clear();
        self.retained_bytes = 0;
        self.in_use = 0;

        self.free.extend(gl.gen_buffers(working_set).into_iter().map(|id| BufferObject {
            id,
            target: None,
            size: 0,
        }));
        log::debug!("buffer objects initialized with {working_set} names");
    }

    /// Hand out a buffer for data of `size` bytes
    ///
    /// Prefers a released buffer that already has enough storage, then any
    /// released buffer, then a newly generated name.
    pub fn get(&mut self, gl: &mut dyn GlBinding, target: BufferTarget, size: usize) -> BufferObject {
        self.in_use += 1;

        let fitting = self
            .free
            .iter()
            .position(|bo| bo.size >= size && bo.target.map_or(true, |t| t == target))
            .or_else(|| self.free.iter().rposition(|bo| bo.size == 0))
            .or_else(|| self.free.len().checked_sub(1));

        if let Some(index) = fitting {
            let bo = self.free.swap_remove(index);
            self.retained_bytes -= bo.size;
            return bo;
        }

        let id = gl.gen_buffers(1)[0];
        BufferObject { id, target: None, size: 0 }
    }

    /// Upload `data` into `bo`, binding it to `target` first
    pub fn upload(
        &mut self,
        gl: &mut dyn GlBinding,
        bo: &mut BufferObject,
        target: BufferTarget,
        data: &[u8],
        usage: BufferUsage,
    ) {
        gl.bind_buffer(target, Some(bo.id));
        gl.buffer_data(target, data, usage);
        bo.target = Some(target);
        bo.size = data.len();
    }

    /// Return a buffer to the free list, keeping its storage for reuse
    pub fn release(&mut self, bo: BufferObject) {
        self.in_use = self.in_use.saturating_sub(1);
        self.retained_bytes += bo.size;
        self.free.push(bo);
    }

    /// Shed retained storage when over the limit, or unconditionally if `force`
    ///
    /// Returns the number of buffers whose storage was deleted. The names
    /// themselves are regenerated lazily by [`Self::get`].
    pub fn check_usage(&mut self, gl: &mut dyn GlBinding, force: bool) -> usize {
        if !force && self.retained_bytes <= self.limit_bytes {
            return 0;
        }

        let (sized, empty): (Vec<_>, Vec<_>) = self.free.drain(..).partition(|bo| bo.size > 0);
        self.free = empty;

        if sized.is_empty() {
            return 0;
        }

        let ids: Vec<BufferId> = sized.iter().map(BufferObject::id).collect();
        gl.delete_buffers(&ids);
        log::info!(
            "freed {} retained buffer objects ({} bytes)",
            ids.len(),
            self.retained_bytes
        );
        self.retained_bytes = 0;
        ids.len()
    }

    /// Bytes held by released buffers
    pub fn retained_bytes(&self) -> usize {
        self.retained_bytes
    }

    /// Released buffers waiting for reuse
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Buffers currently handed out
    pub fn in_use_count(&self) -> usize {
        self.in_use
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::RecordingGl;

    #[test]
    fn test_init_generates_working_set() {
        let mut gl = RecordingGl::new();
        let mut tracker = BufferObjectTracker::default();
        tracker.init(&mut gl, 200);

        assert_eq!(tracker.free_count(), 200);
        assert_eq!(gl.generated_buffer_count(), 200);
    }

    #[test]
    fn test_get_reuses_large_enough_buffer() {
        let mut gl = RecordingGl::new();
        let mut tracker = BufferObjectTracker::default();
        tracker.init(&mut gl, 2);

        let mut bo = tracker.get(&mut gl, BufferTarget::Array, 64);
        tracker.upload(&mut gl, &mut bo, BufferTarget::Array, &[0; 64], BufferUsage::StaticDraw);
        let id = bo.id();
        tracker.release(bo);
        assert_eq!(tracker.retained_bytes(), 64);

        let again = tracker.get(&mut gl, BufferTarget::Array, 32);
        assert_eq!(again.id(), id);
        assert_eq!(tracker.retained_bytes(), 0);
        assert_eq!(gl.generated_buffer_count(), 2);
    }

    #[test]
    fn test_get_generates_when_empty() {
        let mut gl = RecordingGl::new();
        let mut tracker = BufferObjectTracker::default();

        let bo = tracker.get(&mut gl, BufferTarget::ElementArray, 16);
        assert_eq!(bo.size(), 0);
        assert_eq!(gl.generated_buffer_count(), 1);
        assert_eq!(tracker.in_use_count(), 1);
    }

    #[test]
    fn test_forced_check_frees_retained_storage() {
        let mut gl = RecordingGl::new();
        let mut tracker = BufferObjectTracker::new(1 << 20);
        tracker.init(&mut gl, 3);

        let mut bo = tracker.get(&mut gl, BufferTarget::Array, 128);
        tracker.upload(&mut gl, &mut bo, BufferTarget::Array, &[1; 128], BufferUsage::StaticDraw);
        tracker.release(bo);

        // under the limit: nothing happens unless forced
        assert_eq!(tracker.check_usage(&mut gl, false), 0);
        assert_eq!(tracker.check_usage(&mut gl, true), 1);
        assert_eq!(tracker.retained_bytes(), 0);
        assert_eq!(tracker.free_count(), 2);
        assert_eq!(gl.live_buffer_count(), 2);
    }

    #[test]
    fn test_limit_triggers_unforced_shrink() {
        let mut gl = RecordingGl::new();
        let mut tracker = BufferObjectTracker::new(100);

        let mut bo = tracker.get(&mut gl, BufferTarget::Array, 256);
        tracker.upload(&mut gl, &mut bo, BufferTarget::Array, &[0; 256], BufferUsage::DynamicDraw);
        tracker.release(bo);

        assert_eq!(tracker.check_usage(&mut gl, false), 1);
    }
}
