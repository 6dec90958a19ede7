use std::sync::Arc;

use crate::index::{BufferIndex, BufferViewIndex};

/// Byte range inside one of the asset's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferView {
    pub index: BufferViewIndex,
    pub buffer: BufferIndex,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// `None` when the elements are tightly packed.
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
}

/// Capability used by the loader to turn raw buffer bytes into whatever the
/// renderer consumes, such as a GPU buffer.
///
/// The loader calls [`BufferAllocator::allocate`] once per buffer, in
/// document order, after the bytes have been read and validated.
pub trait BufferAllocator {
    type Buffer;

    fn allocate(&mut self, index: BufferIndex, data: &[u8]) -> Self::Buffer;
}

/// Keeps buffers in host memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMemory;

impl BufferAllocator for HostMemory {
    type Buffer = Arc<[u8]>;

    fn allocate(&mut self, _index: BufferIndex, data: &[u8]) -> Self::Buffer {
        Arc::from(data)
    }
}
