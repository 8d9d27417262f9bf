//! Swirl render pipeline and full-frame quad geometry

use wgpu::util::DeviceExt;

/// Swirl program, minified at build time
const SWIRL_SHADER: &str = include_str!(concat!(env!("OUT_DIR"), "/swirl.min.wgsl"));

/// Pixel format of the render surface and of every frame read back from it
pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Background color for pixels the quad does not cover
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Vertex data for the full-frame quad
///
/// Position is in clip space, `uv` in texture space with the origin at the top-left.
#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub struct Vertex {
    /// Clip-space position (x, y, z)
    pub position: [f32; 3],
    /// Texture coordinates (u, v)
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    /// Vertex buffer layout matching the swirl program's `VertexInput`
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: Self::ATTRIBUTES,
        array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
    };
}

const _: () = assert!(std::mem::size_of::<Vertex>() == 20);

/// Number of vertices drawn per frame
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Two triangles covering the whole render target
pub const QUAD_VERTICES: [Vertex; QUAD_VERTEX_COUNT as usize] = [
    Vertex {
        position: [-1.0, 1.0, 0.0], // Top-left
        uv: [0.0, 0.0],
    },
    Vertex {
        position: [-1.0, -1.0, 0.0], // Bottom-left
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [1.0, 1.0, 0.0], // Top-right
        uv: [1.0, 0.0],
    },
    Vertex {
        position: [-1.0, -1.0, 0.0], // Bottom-left
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [1.0, -1.0, 0.0], // Bottom-right
        uv: [1.0, 1.0],
    },
    Vertex {
        position: [1.0, 1.0, 0.0], // Top-right
        uv: [1.0, 0.0],
    },
];

/// Compiled swirl program plus the quad it is drawn with
pub(crate) struct SwirlPipeline {
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
}

impl SwirlPipeline {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Swirl shader"),
            source: wgpu::ShaderSource::Wgsl(SWIRL_SHADER.into()),
        });

        // The bind group layout is derived from the program: binding 0 is the sampler, binding 1 the frame texture
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Swirl pipeline"),
            layout: None,
            cache: None,
            vertex: wgpu::VertexState {
                module: &shader_module,
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
                entry_point: Some("vs_main"),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                targets: &[Some(wgpu::ColorTargetState {
                    format: SURFACE_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
                entry_point: Some("fs_main"),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            depth_stencil: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad vertex buffer"),
            usage: wgpu::BufferUsages::VERTEX,
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
        });

        Self { render_pipeline, vertex_buffer }
    }

    /// Layout the per-frame bind group must match
    pub(crate) fn bind_group_layout(&self) -> wgpu::BindGroupLayout {
        self.render_pipeline.get_bind_group_layout(0)
    }

    /// Records one full-surface swirl pass
    ///
    /// # Arguments
    /// * `encoder` - Encoder the pass is recorded into
    /// * `target` - View of the render surface
    /// * `frame_bind_group` - Sampler and input frame texture
    /// * `width`, `height` - Surface size in pixels; the viewport spans all of it
    pub(crate) fn encode(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, frame_bind_group: &wgpu::BindGroup, width: u32, height: u32) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Swirl pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });

        pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(0, frame_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
    }

    pub(crate) fn destroy(self) {
        self.vertex_buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space_with_top_left_uv_origin() {
        for vertex in QUAD_VERTICES {
            let [x, y, _] = vertex.position;
            assert_eq!(vertex.uv, [(x + 1.0) / 2.0, (1.0 - y) / 2.0]);
        }
        assert_eq!(Vertex::LAYOUT.array_stride, 20);
    }

    #[test]
    fn embedded_program_exposes_both_entry_points() {
        assert!(SWIRL_SHADER.contains("vs_main"));
        assert!(SWIRL_SHADER.contains("fs_main"));
    }
}
