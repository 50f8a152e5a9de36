//! Transient scratch buffer pool
//!
//! Layer renderers stage vertex and index data in CPU memory before handing
//! it to the GPU. Allocating that memory every frame is wasteful, so scratch
//! buffers are pooled: an item is leased for one upload, and every item leased
//! during a frame goes back to the free list when the frame ends.
//!
//! # One lease per upload
//!
//! Some driver/binding combinations do not finish copying the source memory
//! when the upload call returns. Writing the next upload into the same memory
//! in the same frame then corrupts the first one. The pool therefore never
//! hands out an item twice between two [`TransientBufferPool::release_all`]
//! calls, and a [`BufferLease`] cannot be used once the frame that issued it
//! has ended.

use slotmap::{new_key_type, SlotMap};

use super::{RenderError, RenderResult};
use crate::gl::{BufferTarget, BufferUsage, GlBinding};

/// Smallest size a scratch buffer grows to, in bytes
pub const MIN_SCRATCH_BYTES: usize = 1 << 15;

new_key_type! {
    /// Slot of a scratch item inside its pool
    pub struct ScratchKey;
}

/// Growable native memory block with typed views
///
/// The storage is word-aligned so the same bytes can be viewed as `i16`,
/// `f32` or `i32` without copying. A write cursor tracks how much of it the
/// current lease has filled.
#[derive(Debug, Default)]
pub struct BufferItem {
    storage: Vec<u32>,
    cursor: usize,
}

impl BufferItem {
    /// Capacity of the backing storage in bytes
    pub fn capacity_bytes(&self) -> usize {
        self.storage.len() * 4
    }

    /// Bytes written since the last [`Self::clear`]
    pub fn len_bytes(&self) -> usize {
        self.cursor
    }

    /// Rewind the write cursor, keeping the storage
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Replace the storage with a larger block of at least `min_bytes`
    ///
    /// Previous contents are not preserved.
    fn grow(&mut self, min_bytes: usize, floor: usize) {
        let bytes = min_bytes.max(floor);
        log::debug!("grow scratch buffer {} -> {} bytes", self.capacity_bytes(), bytes);
        self.storage = vec![0; bytes.div_ceil(4)];
        self.cursor = 0;
    }

    /// Append plain data at the cursor
    pub fn put<T: bytemuck::Pod>(&mut self, data: &[T]) -> RenderResult<()> {
        let src: &[u8] = bytemuck::cast_slice(data);
        let end = self.cursor + src.len();
        if end > self.capacity_bytes() {
            return Err(RenderError::BufferOverflow {
                requested: end,
                capacity: self.capacity_bytes(),
            });
        }
        let start = self.cursor;
        self.bytes_mut()[start..end].copy_from_slice(src);
        self.cursor = end;
        Ok(())
    }

    /// Bytes written since the last [`Self::clear`], ready for upload
    pub fn contents(&self) -> &[u8] {
        &self.bytes()[..self.cursor]
    }

    /// Whole storage as bytes
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.storage)
    }

    /// Whole storage as mutable bytes
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.storage)
    }

    /// Whole storage as 16-bit integers
    pub fn shorts_mut(&mut self) -> &mut [i16] {
        bytemuck::cast_slice_mut(&mut self.storage)
    }

    /// Whole storage as 32-bit floats
    pub fn floats_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(&mut self.storage)
    }

    /// Whole storage as 32-bit integers
    pub fn ints_mut(&mut self) -> &mut [i32] {
        bytemuck::cast_slice_mut(&mut self.storage)
    }
}

/// Single-use claim on a scratch item for the current frame
///
/// Neither `Clone` nor `Copy`: one lease, one upload.
#[derive(Debug, PartialEq, Eq)]
pub struct BufferLease {
    key: ScratchKey,
    epoch: u64,
}

impl BufferLease {
    /// Pool epoch the lease was issued in
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Free list plus "used this frame" list of scratch items
#[derive(Debug)]
pub struct TransientBufferPool {
    items: SlotMap<ScratchKey, BufferItem>,
    free: Vec<ScratchKey>,
    used: Vec<ScratchKey>,
    epoch: u64,
    min_grow_bytes: usize,
}

impl Default for TransientBufferPool {
    fn default() -> Self {
        Self::new(MIN_SCRATCH_BYTES)
    }
}

impl TransientBufferPool {
    /// Create an empty pool whose items grow to at least `min_grow_bytes`
    pub fn new(min_grow_bytes: usize) -> Self {
        Self {
            items: SlotMap::with_key(),
            free: Vec::new(),
            used: Vec::new(),
            epoch: 0,
            min_grow_bytes: min_grow_bytes.max(4),
        }
    }

    /// Lease an item with at least `min_bytes` of storage
    pub fn acquire(&mut self, min_bytes: usize) -> BufferLease {
        let key = match self.free.pop() {
            Some(key) => key,
            None => self.items.insert(BufferItem::default()),
        };

        let item = &mut self.items[key];
        if item.capacity_bytes() < min_bytes {
            item.grow(min_bytes, self.min_grow_bytes);
        }
        item.clear();

        self.used.push(key);
        BufferLease { key, epoch: self.epoch }
    }

    /// Lease an item for `count` 16-bit values
    pub fn acquire_shorts(&mut self, count: usize) -> BufferLease {
        self.acquire(count * 2)
    }

    /// Lease an item for `count` 32-bit floats
    pub fn acquire_floats(&mut self, count: usize) -> BufferLease {
        self.acquire(count * 4)
    }

    /// Lease an item for `count` 32-bit integers
    pub fn acquire_ints(&mut self, count: usize) -> BufferLease {
        self.acquire(count * 4)
    }

    /// Access a leased item
    pub fn item(&self, lease: &BufferLease) -> RenderResult<&BufferItem> {
        self.check(lease)?;
        self.items.get(lease.key).ok_or(RenderError::StaleLease {
            lease_epoch: lease.epoch,
            pool_epoch: self.epoch,
        })
    }

    /// Mutable access to a leased item
    pub fn item_mut(&mut self, lease: &BufferLease) -> RenderResult<&mut BufferItem> {
        self.check(lease)?;
        let pool_epoch = self.epoch;
        self.items.get_mut(lease.key).ok_or(RenderError::StaleLease {
            lease_epoch: lease.epoch,
            pool_epoch,
        })
    }

    /// Upload what was written into a leased item, consuming the lease
    pub fn upload(
        &self,
        gl: &mut dyn GlBinding,
        lease: BufferLease,
        target: BufferTarget,
        usage: BufferUsage,
    ) -> RenderResult<()> {
        let item = self.item(&lease)?;
        gl.buffer_data(target, item.contents(), usage);
        Ok(())
    }

    /// Return every item leased this frame to the free list
    ///
    /// Contents are left as they are. Outstanding leases become stale.
    pub fn release_all(&mut self) {
        self.free.append(&mut self.used);
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Items leased since the last release
    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Items ready to be leased
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Items owned by the pool
    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    /// Current epoch, bumped by every release
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn check(&self, lease: &BufferLease) -> RenderResult<()> {
        if lease.epoch == self.epoch {
            Ok(())
        } else {
            Err(RenderError::StaleLease {
                lease_epoch: lease.epoch,
                pool_epoch: self.epoch,
            })
        }
    }
}
