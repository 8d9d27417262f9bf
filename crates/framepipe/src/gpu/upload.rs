use crate::frame::Bitmap;

/// Input texture holding one frame for the duration of a single draw
pub(crate) struct FrameUpload {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl FrameUpload {
    /// Creates a sampleable texture of the bitmap's size, copies its pixels in and binds it for the swirl program
    ///
    /// # Arguments
    /// * `device` - Device owning the texture
    /// * `queue` - Queue the pixel copy is scheduled on
    /// * `layout` - Bind group layout of the swirl pipeline
    /// * `sampler` - Sampler bound at binding 0
    /// * `bitmap` - Tightly packed RGBA8 pixels
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout, sampler: &wgpu::Sampler, bitmap: &Bitmap) -> Self {
        let size = wgpu::Extent3d {
            width: bitmap.width,
            height: bitmap.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bitmap.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bitmap.bytes_per_row()),
                rows_per_image: Some(bitmap.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        });

        Self { texture, bind_group }
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Frees the texture immediately instead of waiting for the last handle to drop
    pub(crate) fn destroy(self) {
        self.texture.destroy();
    }
}
