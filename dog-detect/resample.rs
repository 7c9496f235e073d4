use dog_core::Image;

/// Power-of-two resampling used to align DoG levels that straddle an octave
/// boundary. Implementations must be pure: same input, same output.
pub trait Resampler: Send + Sync {
    /// Halve both dimensions (`floor(w/2) x floor(h/2)`)
    fn downsample(&self, img: &Image) -> Image;

    /// Double both dimensions, adding one extra column/row when requested so
    /// an odd-sized finer level can be matched exactly
    fn upsample(&self, img: &Image, pad_one_width: bool, pad_one_height: bool) -> Image;
}

/// 2x2 box downsampling and centre-aligned bilinear upsampling
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearResampler;

impl Resampler for BilinearResampler {
    fn downsample(&self, img: &Image) -> Image {
        let dst_w = img.width / 2;
        let dst_h = img.height / 2;
        let w = img.width;
        let mut data = Vec::with_capacity(dst_w * dst_h);

        for j in 0..dst_h {
            let row0 = 2 * j * w;
            let row1 = row0 + w;
            for i in 0..dst_w {
                let x = 2 * i;
                let sum = img.data[row0 + x] + img.data[row0 + x + 1] + img.data[row1 + x] + img.data[row1 + x + 1];
                data.push(sum * 0.25);
            }
        }

        Image::new(dst_w, dst_h, data)
    }

    fn upsample(&self, img: &Image, pad_one_width: bool, pad_one_height: bool) -> Image {
        let dst_w = img.width * 2 + usize::from(pad_one_width);
        let dst_h = img.height * 2 + usize::from(pad_one_height);
        let mut data = Vec::with_capacity(dst_w * dst_h);

        for j in 0..dst_h {
            let (y0, y1, fy) = source_taps(j, img.height);
            for i in 0..dst_w {
                let (x0, x1, fx) = source_taps(i, img.width);
                let p00 = img.data[y0 * img.width + x0];
                let p10 = img.data[y0 * img.width + x1];
                let p01 = img.data[y1 * img.width + x0];
                let p11 = img.data[y1 * img.width + x1];

                let top = p00 * (1.0 - fx) + p10 * fx;
                let bottom = p01 * (1.0 - fx) + p11 * fx;
                data.push(top * (1.0 - fy) + bottom * fy);
            }
        }

        Image::new(dst_w, dst_h, data)
    }
}

/// Source taps and fractional weight for destination index `d` at 2x
/// magnification: pixel centres map as `s = 0.5 * d - 0.25`, clamped.
#[inline]
fn source_taps(d: usize, src_len: usize) -> (usize, usize, f32) {
    let s = 0.5 * d as f32 - 0.25;
    let s0 = s.floor();
    let frac = s - s0;
    let last = src_len as isize - 1;
    let i0 = (s0 as isize).clamp(0, last) as usize;
    let i1 = (s0 as isize + 1).clamp(0, last) as usize;
    (i0, i1, frac)
}
