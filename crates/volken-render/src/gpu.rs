use wgpu::util::DeviceExt;

use crate::uniforms::CloudUniforms;

/// GPU buffer holding one [`CloudUniforms`] block, rewritten each frame.
pub struct UniformBlock {
    buffer: wgpu::Buffer,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device) -> Self {
        let initial: CloudUniforms = bytemuck::Zeroable::zeroed();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cloud-uniforms"),
            contents: bytemuck::bytes_of(&initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self { buffer }
    }

    /// Upload this frame's parameters.
    pub fn write(&self, queue: &wgpu::Queue, uniforms: &CloudUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}

#[cfg(all(test, feature = "gpu_tests"))]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_block_matches_struct_size() {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(
            instance.request_adapter(&wgpu::RequestAdapterOptions::default()),
        )
        .expect("no GPU adapter");
        let (device, queue) = pollster::block_on(
            adapter.request_device(&wgpu::DeviceDescriptor::default(), None),
        )
        .expect("device");

        let block = UniformBlock::new(&device);
        assert_eq!(
            block.buffer().size(),
            std::mem::size_of::<CloudUniforms>() as u64
        );
        let zeroed: CloudUniforms = bytemuck::Zeroable::zeroed();
        block.write(&queue, &zeroed);
        device.poll(wgpu::Maintain::Wait);
    }
}
