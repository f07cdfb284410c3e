//! Typed command stream recorded during light cluster preparation.
//!
//! The cluster only ever appends to a [`CommandQueue`]. A backend drains it
//! with a [`CommandExecutor`] after the frame's preparation returns, in the
//! order the commands were recorded.

use glam::{Vec3, Vec4};

use crate::gpu::{BufferHandle, KernelId, ShaderHandle, TextureHandle};

#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    AllocateBuffer {
        label: &'static str,
        buffer: BufferHandle,
    },
    ReleaseBuffer {
        buffer: BufferHandle,
    },
    UploadBuffer {
        buffer: BufferHandle,
        data: Vec<u8>,
    },
    AllocateTexture {
        label: &'static str,
        texture: TextureHandle,
    },
    ReleaseTexture {
        texture: TextureHandle,
    },
    BeginSample {
        name: &'static str,
    },
    EndSample {
        name: &'static str,
    },
    SetComputeVector {
        shader: ShaderHandle,
        name: &'static str,
        value: Vec4,
    },
    SetComputeFloat {
        shader: ShaderHandle,
        name: &'static str,
        value: f32,
    },
    SetComputeBuffer {
        shader: ShaderHandle,
        kernel: KernelId,
        name: &'static str,
        buffer: BufferHandle,
    },
    SetComputeTexture {
        shader: ShaderHandle,
        kernel: KernelId,
        name: &'static str,
        texture: TextureHandle,
    },
    Dispatch {
        shader: ShaderHandle,
        kernel: KernelId,
        groups: [u32; 3],
    },
    SetGlobalBuffer {
        name: &'static str,
        buffer: BufferHandle,
    },
    SetGlobalVector {
        name: &'static str,
        value: Vec4,
    },
    SetGlobalInt {
        name: &'static str,
        value: i32,
    },
}

/// Consumes recorded commands, typically by translating them into API calls.
pub trait CommandExecutor {
    fn execute(&mut self, command: RenderCommand);
}

/// Collects commands, for inspection in tools and tests.
impl CommandExecutor for Vec<RenderCommand> {
    fn execute(&mut self, command: RenderCommand) {
        self.push(command);
    }
}

#[derive(Default, Debug)]
pub struct CommandQueue {
    commands: Vec<RenderCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Hands every recorded command to `executor`, oldest first, and empties
    /// the queue.
    pub fn submit(&mut self, executor: &mut impl CommandExecutor) {
        for command in self.commands.drain(..) {
            executor.execute(command);
        }
    }

    pub fn begin_sample(&mut self, name: &'static str) {
        self.push(RenderCommand::BeginSample { name });
    }

    pub fn end_sample(&mut self, name: &'static str) {
        self.push(RenderCommand::EndSample { name });
    }

    pub fn set_compute_vector(&mut self, shader: ShaderHandle, name: &'static str, value: Vec3) {
        self.push(RenderCommand::SetComputeVector {
            shader,
            name,
            value: value.extend(0.0),
        });
    }

    pub fn set_compute_float(&mut self, shader: ShaderHandle, name: &'static str, value: f32) {
        self.push(RenderCommand::SetComputeFloat {
            shader,
            name,
            value,
        });
    }

    pub fn set_compute_buffer(
        &mut self,
        shader: ShaderHandle,
        kernel: KernelId,
        name: &'static str,
        buffer: BufferHandle,
    ) {
        self.push(RenderCommand::SetComputeBuffer {
            shader,
            kernel,
            name,
            buffer,
        });
    }

    pub fn set_compute_texture(
        &mut self,
        shader: ShaderHandle,
        kernel: KernelId,
        name: &'static str,
        texture: TextureHandle,
    ) {
        self.push(RenderCommand::SetComputeTexture {
            shader,
            kernel,
            name,
            texture,
        });
    }

    pub fn dispatch(&mut self, shader: ShaderHandle, kernel: KernelId, groups: [u32; 3]) {
        self.push(RenderCommand::Dispatch {
            shader,
            kernel,
            groups,
        });
    }

    pub fn set_global_buffer(&mut self, name: &'static str, buffer: BufferHandle) {
        self.push(RenderCommand::SetGlobalBuffer { name, buffer });
    }

    pub fn set_global_vector(&mut self, name: &'static str, value: Vec3) {
        self.push(RenderCommand::SetGlobalVector {
            name,
            value: value.extend(0.0),
        });
    }

    pub fn set_global_int(&mut self, name: &'static str, value: i32) {
        self.push(RenderCommand::SetGlobalInt { name, value });
    }
}
