use ab_core::config::SampleFilter;
use ab_core::error::CoreError;
use ab_core::frame::{FrameBuffer, SampleGrid};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

/// Réduit une frame décodée à la grille fixe W×H.
///
/// Wraps `fast_image_resize` and keeps its scratch buffers between ticks, so
/// steady-state sampling only allocates the returned `SampleGrid`.
///
/// # Example
/// ```
/// use ab_ascii::sampler::Sampler;
/// use ab_core::config::SampleFilter;
/// use ab_core::frame::FrameBuffer;
///
/// let mut sampler = Sampler::new(SampleFilter::Area);
/// let grid = sampler.sample(&FrameBuffer::new(640, 360), 120, 50).unwrap();
/// assert_eq!((grid.width(), grid.height()), (120, 50));
/// ```
pub struct Sampler {
    inner: Resizer,
    options: ResizeOptions,
    /// Owned copy of the source (the resizer wants `&mut` on its input).
    src_buf: Vec<u8>,
    /// Destination pixels at grid resolution.
    dst: FrameBuffer,
}

impl Sampler {
    /// Create a sampler using the given resampling filter.
    #[must_use]
    pub fn new(filter: SampleFilter) -> Self {
        let alg = match filter {
            SampleFilter::Nearest => ResizeAlg::Nearest,
            SampleFilter::Area => ResizeAlg::Convolution(FilterType::Box),
        };
        Self {
            inner: Resizer::new(),
            options: ResizeOptions::new().resize_alg(alg),
            src_buf: Vec::new(),
            dst: FrameBuffer::new(0, 0),
        }
    }

    /// Sample `frame` to exactly `width × height` RGB triples.
    ///
    /// Transparent pixels are composited over black. Deterministic for a
    /// given frame and filter.
    ///
    /// # Errors
    /// - `CoreError::InvalidFrame` if the frame has zero width/height or a
    ///   truncated buffer.
    /// - `CoreError::InvalidDimensions` if `width` or `height` is zero.
    pub fn sample(
        &mut self,
        frame: &FrameBuffer,
        width: u16,
        height: u16,
    ) -> Result<SampleGrid, CoreError> {
        if frame.is_degenerate() {
            return Err(CoreError::InvalidFrame {
                width: frame.width,
                height: frame.height,
            });
        }
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }

        let (dw, dh) = (u32::from(width), u32::from(height));
        if self.dst.width != dw || self.dst.height != dh {
            self.dst = FrameBuffer::new(dw, dh);
        }

        if frame.width == dw && frame.height == dh {
            let len = self.dst.data.len();
            self.dst.data.copy_from_slice(&frame.data[..len]);
        } else {
            self.resize_into_dst(frame)?;
        }

        let pixels = self
            .dst
            .data
            .chunks_exact(4)
            .map(|px| {
                let a = u16::from(px[3]);
                let over_black = |c: u8| ((u16::from(c) * a + 127) / 255) as u8;
                (over_black(px[0]), over_black(px[1]), over_black(px[2]))
            })
            .collect();

        SampleGrid::from_pixels(width, height, pixels).ok_or(CoreError::InvalidDimensions {
            width: dw,
            height: dh,
        })
    }

    fn resize_into_dst(&mut self, frame: &FrameBuffer) -> Result<(), CoreError> {
        let invalid = || CoreError::InvalidFrame {
            width: frame.width,
            height: frame.height,
        };
        let src_len = frame.width as usize * frame.height as usize * 4;

        // Copie forcée par l'API fast_image_resize (source en &mut)
        self.src_buf.clear();
        self.src_buf.extend_from_slice(&frame.data[..src_len]);

        let src_image = Image::from_slice_u8(
            frame.width,
            frame.height,
            &mut self.src_buf,
            PixelType::U8x4,
        )
        .map_err(|_| invalid())?;

        let mut dst_image = Image::from_slice_u8(
            self.dst.width,
            self.dst.height,
            &mut self.dst.data,
            PixelType::U8x4,
        )
        .map_err(|_| invalid())?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .map_err(|e| {
                log::debug!("sampler: resize failed: {e}");
                invalid()
            })
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(SampleFilter::default())
    }
}
