//! Host-side mirrors of GPU resources.
//!
//! Nothing in here talks to a graphics API. Resources are identified by
//! handles, and every allocation, upload and release is recorded as a
//! [`RenderCommand`] for whichever backend executes the queue.

use std::{marker::PhantomData, mem};

use bytemuck::Pod;
use log::info;
use uuid::Uuid;

use crate::{
    commands::{CommandQueue, RenderCommand},
    error::{ClusterError, ClusterResult},
};

/// Identity of one buffer allocation. A reallocated buffer gets a new id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub id: Uuid,
    pub count: usize,
    pub stride: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    pub id: Uuid,
}

impl TextureHandle {
    /// Built-in 1x1 white texture every backend provides.
    pub const WHITE: TextureHandle = TextureHandle {
        id: Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001),
    };

    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle {
    pub id: Uuid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KernelId(pub u32);

/// A compiled compute shader and the kernels it exports.
#[derive(Clone, Debug)]
pub struct ComputeShader {
    pub handle: ShaderHandle,
    pub name: String,
    pub kernels: Vec<String>,
}

impl ComputeShader {
    pub fn new(name: impl Into<String>, kernels: &[&str]) -> Self {
        Self {
            handle: ShaderHandle { id: Uuid::new_v4() },
            name: name.into(),
            kernels: kernels.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn find_kernel(&self, kernel: &'static str) -> ClusterResult<KernelId> {
        self.kernels
            .iter()
            .position(|k| k == kernel)
            .map(|index| KernelId(index as u32))
            .ok_or_else(|| ClusterError::MissingKernel {
                shader: self.name.clone(),
                kernel,
            })
    }
}

/// A typed structured buffer whose element count is tracked on the host.
///
/// The buffer never holds fewer than one element: a count of one is the
/// "nothing valid this frame" sentinel consumers are expected to handle.
#[derive(Debug)]
pub struct GpuBuffer<T> {
    label: &'static str,
    handle: BufferHandle,
    marker: PhantomData<T>,
}

impl<T: Pod> GpuBuffer<T> {
    pub fn new(queue: &mut CommandQueue, label: &'static str, count: usize) -> Self {
        let handle = Self::allocate(queue, label, count);
        Self {
            label,
            handle,
            marker: PhantomData,
        }
    }

    fn allocate(queue: &mut CommandQueue, label: &'static str, count: usize) -> BufferHandle {
        let handle = BufferHandle {
            id: Uuid::new_v4(),
            count: count.max(1),
            stride: mem::size_of::<T>(),
        };
        queue.push(RenderCommand::AllocateBuffer { label, buffer: handle });
        handle
    }

    /// Reallocates when `count` differs from the current element count.
    ///
    /// Returns `true` when a new allocation was made. Any binding of the old
    /// handle is stale after that and has to be redone.
    pub fn ensure_capacity(&mut self, queue: &mut CommandQueue, count: usize) -> bool {
        let count = count.max(1);
        if count == self.handle.count {
            return false;
        }

        info!(
            "Resizing '{}' from {} to {} elements",
            self.label, self.handle.count, count
        );
        queue.push(RenderCommand::ReleaseBuffer {
            buffer: self.handle,
        });
        self.handle = Self::allocate(queue, self.label, count);
        true
    }

    /// Records an upload of `data` into the start of the buffer.
    pub fn upload(&self, queue: &mut CommandQueue, data: &[T]) {
        debug_assert!(data.len() <= self.handle.count);
        queue.push(RenderCommand::UploadBuffer {
            buffer: self.handle,
            data: bytemuck::cast_slice(data).to_vec(),
        });
    }

    pub fn release(self, queue: &mut CommandQueue) {
        queue.push(RenderCommand::ReleaseBuffer {
            buffer: self.handle,
        });
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn count(&self) -> usize {
        self.handle.count
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// Reinterprets an integer as a float the way shader constants expect it.
pub fn as_float(value: u32) -> f32 {
    f32::from_bits(value)
}
