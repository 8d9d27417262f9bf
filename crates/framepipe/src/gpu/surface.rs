//! Offscreen render target tracking
//!
//! The swirl program draws into a render-target texture owned by the stage. The texture is
//! sized to the current frame and only recreated when a frame arrives at a different size.

use super::pipeline::SURFACE_FORMAT;

/// Size bookkeeping for the render target, independent of any device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceState {
    size: Option<(u32, u32)>,
    reconfigurations: u64,
}

impl SurfaceState {
    /// Creates a state with no configured size
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently configured size, if any frame has been seen
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Number of times the surface had to be (re)configured
    pub fn reconfigurations(&self) -> u64 {
        self.reconfigurations
    }

    /// Records the size of the incoming frame
    ///
    /// # Returns
    /// `true` when the surface must be reconfigured before drawing
    pub fn resize_if_needed(&mut self, width: u32, height: u32) -> bool {
        if self.size == Some((width, height)) {
            return false;
        }

        self.size = Some((width, height));
        self.reconfigurations += 1;
        true
    }
}

/// Render-target texture matched to the most recent frame size
pub(crate) struct OffscreenSurface {
    state: SurfaceState,
    texture: Option<wgpu::Texture>,
}

impl OffscreenSurface {
    pub(crate) fn new() -> Self {
        Self {
            state: SurfaceState::new(),
            texture: None,
        }
    }

    pub(crate) fn state(&self) -> &SurfaceState {
        &self.state
    }

    /// Returns a render target of exactly `width`x`height`, recreating it if the size changed
    pub(crate) fn configure_for(&mut self, device: &wgpu::Device, width: u32, height: u32) -> &wgpu::Texture {
        if self.state.resize_if_needed(width, height) {
            tracing::debug!(width, height, reconfigurations = self.state.reconfigurations(), "configuring render surface");
            if let Some(previous) = self.texture.take() {
                previous.destroy();
            }
        }

        self.texture.get_or_insert_with(|| create_render_target(device, width, height))
    }

    pub(crate) fn destroy(&mut self) {
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
    }
}

fn create_render_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Render Surface"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_FORMAT,
        // Drawn into by the swirl pass, then copied out for readback
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_configures_once() {
        let mut state = SurfaceState::new();
        let configured: Vec<bool> = (0..3).map(|_| state.resize_if_needed(640, 480)).collect();

        assert_eq!(configured, [true, false, false]);
        assert_eq!(state.reconfigurations(), 1);
        assert_eq!(state.size(), Some((640, 480)));
    }

    #[test]
    fn size_change_reconfigures() {
        let mut state = SurfaceState::new();
        assert!(state.resize_if_needed(640, 480));
        assert!(state.resize_if_needed(320, 240));
        assert!(!state.resize_if_needed(320, 240));
        assert!(state.resize_if_needed(640, 480));

        assert_eq!(state.reconfigurations(), 3);
    }
}
