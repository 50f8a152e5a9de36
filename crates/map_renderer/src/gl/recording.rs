//! Headless GPU binding
//!
//! `RecordingGl` executes nothing on a GPU. It logs every call in order, keeps
//! the bytes uploaded into each buffer and replays queued errors, which makes
//! it the binding of choice for tests and for running the renderer without a
//! display.

use std::collections::{HashMap, VecDeque};

use super::{
    AttribType, BlendFactor, BufferId, BufferTarget, BufferUsage, Capability, ClearMask, Face,
    GlBinding, GlError, ProgramId, TextureId, Winding,
};

/// One recorded binding call
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum GlCall {
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(ClearMask),
    DepthMask(bool),
    StencilMask(u32),
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    Scissor { x: i32, y: i32, width: i32, height: i32 },
    Enable(Capability),
    Disable(Capability),
    BlendFunc(BlendFactor, BlendFactor),
    CullFace(Face),
    FrontFace(Winding),
    GenBuffers(Vec<BufferId>),
    DeleteBuffers(Vec<BufferId>),
    BindBuffer(BufferTarget, Option<BufferId>),
    BufferData { target: BufferTarget, id: Option<BufferId>, len: usize, usage: BufferUsage },
    VertexAttribPointer { location: u32, components: i32, ty: AttribType, normalized: bool, stride: i32, offset: usize },
    BindTexture2d(Option<TextureId>),
    UseProgram(Option<ProgramId>),
}

/// Recording implementation of [`GlBinding`]
#[derive(Debug, Default)]
pub struct RecordingGl {
    calls: Vec<GlCall>,
    next_buffer: u32,
    live_buffers: HashMap<BufferId, Vec<u8>>,
    bound_array: Option<BufferId>,
    bound_elements: Option<BufferId>,
    pending_errors: VecDeque<GlError>,
}

impl RecordingGl {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far, oldest first
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Drain the recorded calls
    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    /// Queue an error for the next [`GlBinding::get_error`]
    pub fn push_error(&mut self, error: GlError) {
        self.pending_errors.push_back(error);
    }

    /// Bytes last uploaded into a live buffer
    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.live_buffers.get(&id).map(Vec::as_slice)
    }

    /// Number of buffer names generated over the recorder's lifetime
    pub fn generated_buffer_count(&self) -> usize {
        self.next_buffer as usize
    }

    /// Number of buffer names currently alive
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }

    /// Buffer currently bound to `target`
    pub fn bound_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Array => self.bound_array,
            BufferTarget::ElementArray => self.bound_elements,
        }
    }

    fn record(&mut self, call: GlCall) {
        log::trace!("gl: {call:?}");
        self.calls.push(call);
    }
}

impl GlBinding for RecordingGl {
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor([r, g, b, a]));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record(GlCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, value: i32) {
        self.record(GlCall::ClearStencil(value));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.record(GlCall::Clear(mask));
    }

    fn depth_mask(&mut self, write: bool) {
        self.record(GlCall::DepthMask(write));
    }

    fn stencil_mask(&mut self, mask: u32) {
        self.record(GlCall::StencilMask(mask));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport { x, y, width, height });
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Scissor { x, y, width, height });
    }

    fn enable(&mut self, cap: Capability) {
        self.record(GlCall::Enable(cap));
    }

    fn disable(&mut self, cap: Capability) {
        self.record(GlCall::Disable(cap));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record(GlCall::BlendFunc(src, dst));
    }

    fn cull_face(&mut self, face: Face) {
        self.record(GlCall::CullFace(face));
    }

    fn front_face(&mut self, winding: Winding) {
        self.record(GlCall::FrontFace(winding));
    }

    fn gen_buffers(&mut self, count: usize) -> Vec<BufferId> {
        let ids: Vec<BufferId> = (0..count)
            .map(|_| {
                self.next_buffer += 1;
                BufferId(self.next_buffer)
            })
            .collect();
        for id in &ids {
            self.live_buffers.insert(*id, Vec::new());
        }
        self.record(GlCall::GenBuffers(ids.clone()));
        ids
    }

    fn delete_buffers(&mut self, ids: &[BufferId]) {
        for id in ids {
            self.live_buffers.remove(id);
            if self.bound_array == Some(*id) {
                self.bound_array = None;
            }
            if self.bound_elements == Some(*id) {
                self.bound_elements = None;
            }
        }
        self.record(GlCall::DeleteBuffers(ids.to_vec()));
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        match target {
            BufferTarget::Array => self.bound_array = id,
            BufferTarget::ElementArray => self.bound_elements = id,
        }
        self.record(GlCall::BindBuffer(target, id));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let id = self.bound_buffer(target);
        match id.and_then(|id| self.live_buffers.get_mut(&id)) {
            Some(storage) => {
                storage.clear();
                storage.extend_from_slice(data);
            }
            None => self.pending_errors.push_back(GlError::InvalidOperation),
        }
        self.record(GlCall::BufferData { target, id, len: data.len(), usage });
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: i32,
        ty: AttribType,
        normalized: bool,
        stride: i32,
        offset: usize,
    ) {
        self.record(GlCall::VertexAttribPointer { location, components, ty, normalized, stride, offset });
    }

    fn bind_texture_2d(&mut self, texture: Option<TextureId>) {
        self.record(GlCall::BindTexture2d(texture));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.record(GlCall::UseProgram(program));
    }

    fn get_error(&mut self) -> Option<GlError> {
        self.pending_errors.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_lands_in_bound_buffer() {
        let mut gl = RecordingGl::new();
        let ids = gl.gen_buffers(2);

        gl.bind_buffer(BufferTarget::Array, Some(ids[1]));
        gl.buffer_data(BufferTarget::Array, &[1, 2, 3], BufferUsage::StaticDraw);

        assert_eq!(gl.buffer_contents(ids[1]), Some(&[1u8, 2, 3][..]));
        assert_eq!(gl.buffer_contents(ids[0]), Some(&[][..]));
        assert_eq!(gl.get_error(), None);
    }

    #[test]
    fn test_upload_without_binding_queues_error() {
        let mut gl = RecordingGl::new();
        gl.buffer_data(BufferTarget::ElementArray, &[0; 4], BufferUsage::StaticDraw);

        assert_eq!(gl.get_error(), Some(GlError::InvalidOperation));
        assert_eq!(gl.get_error(), None);
    }

    #[test]
    fn test_delete_unbinds() {
        let mut gl = RecordingGl::new();
        let ids = gl.gen_buffers(1);
        gl.bind_buffer(BufferTarget::ElementArray, Some(ids[0]));
        gl.delete_buffers(&ids);

        assert_eq!(gl.bound_buffer(BufferTarget::ElementArray), None);
        assert_eq!(gl.live_buffer_count(), 0);
        assert_eq!(gl.generated_buffer_count(), 1);
    }
}
