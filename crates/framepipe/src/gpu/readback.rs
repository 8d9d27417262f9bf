//! Copying the rendered surface back into a CPU frame

use crate::{Frame, error::RenderError, frame::BYTES_PER_PIXEL};
use std::time::Duration;

/// Staging buffer sized for one surface copy
///
/// Rows in the buffer are padded to `wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`; the padding is stripped when the frame is built.
pub(crate) struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
}

impl ReadbackBuffer {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let padded_bytes_per_row = padded_bytes_per_row(width);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: readback_size(width, height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_bytes_per_row,
        }
    }

    /// Records a copy of the whole `texture` into this buffer
    pub(crate) fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder, texture: &wgpu::Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Waits for the submitted copy and turns the buffer contents into a new frame
    ///
    /// Must be called after the encoder holding [`Self::encode_copy`] was submitted. The blocking device poll runs
    /// on tokio's blocking pool so the calling task only suspends.
    ///
    /// # Arguments
    /// * `device` - Device the copy was submitted on
    /// * `timestamp` - Timestamp carried over from the input frame
    pub(crate) async fn into_frame(self, device: &wgpu::Device, timestamp: Duration) -> Result<Frame, RenderError> {
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        self.buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only disappears if the awaiting task was cancelled
            let _ = sender.send(result);
        });

        let poll_device = device.clone();
        tokio::task::spawn_blocking(move || poll_device.poll(wgpu::PollType::Wait)).await??;
        receiver.receive().await.ok_or(RenderError::Cancelled)??;

        let pixels = {
            let mapped = self.buffer.slice(..).get_mapped_range();
            unpad_rows(&mapped, self.width, self.height, self.padded_bytes_per_row)
        };
        self.buffer.unmap();
        self.buffer.destroy();

        Ok(Frame::new(timestamp, self.width, self.height, pixels)?)
    }
}

/// Row pitch of a `width`-pixel RGBA8 row rounded up to the copy alignment
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    (width * BYTES_PER_PIXEL).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Size in bytes of the staging buffer for a `width`x`height` surface
pub(crate) fn readback_size(width: u32, height: u32) -> u64 {
    padded_bytes_per_row(width) as u64 * height as u64
}

/// Strips per-row padding from a copied surface
fn unpad_rows(padded: &[u8], width: u32, height: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let row_bytes = (width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in padded.chunks_exact(padded_bytes_per_row as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(640), 2560);
    }

    #[test]
    fn unpadding_keeps_only_pixel_bytes() {
        let pitch = padded_bytes_per_row(3);
        let mut padded = vec![0xff; (pitch * 2) as usize];
        for (row, chunk) in padded.chunks_exact_mut(pitch as usize).enumerate() {
            for (i, byte) in chunk[..12].iter_mut().enumerate() {
                *byte = (row * 12 + i) as u8;
            }
        }

        let pixels = unpad_rows(&padded, 3, 2, pitch);
        assert_eq!(pixels, (0..24).collect::<Vec<u8>>());
    }
}
