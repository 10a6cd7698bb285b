use crate::error::Error;
use ndarray::{Array2, ArrayView2};
use num_traits::ToPrimitive;
use opencv::{
    core::{Mat, Scalar, Size, CV_32F},
    prelude::*,
};

const CLIP_MAX: f64 = 1.0;
const CUTOFF: f64 = 0.0099;

/// Build the Gaussian center prior fed to the network next to the image.
///
/// Values above 1 are clipped and values below the cutoff are zeroed, so the
/// prior has bounded support around `(center_x, center_y)`.
pub(crate) fn gaussian(
    height: usize,
    width: usize,
    (center_x, center_y): (f64, f64),
    sigma: f64,
) -> Array2<f32> {
    let denominator = 2.0 * sigma * sigma;
    Array2::from_shape_fn((height, width), |(i, j)| {
        let dx = j as f64 - center_x;
        let dy = i as f64 - center_y;
        let mut value = (-(dx * dx + dy * dy) / denominator).exp();
        if value > CLIP_MAX {
            value = CLIP_MAX;
        }
        if value < CUTOFF {
            value = 0.0;
        }
        value as f32
    })
}

/// Wrap a center map as a (1, 1, H, W) float blob.
pub(crate) fn to_blob(map: ArrayView2<f32>) -> Result<Mat, Error> {
    let (height, width) = map.dim();
    let rows = height.to_i32().ok_or(Error::ConvertToI32)?;
    let cols = width.to_i32().ok_or(Error::ConvertToI32)?;

    let mut mat = Mat::new_rows_cols_with_default(rows, cols, CV_32F, Scalar::all(0.0))
        .map_err(Error::CenterMapBlob)?;
    mat.data_typed_mut::<f32>()
        .map_err(Error::GetTypedData)?
        .iter_mut()
        .zip(map.iter())
        .for_each(|(dst, &src)| *dst = src);

    opencv::dnn::blob_from_image(
        &mat,
        1.0,
        Size::new(cols, rows),
        Scalar::default(),
        false, // swap_rb
        false, // crop
        CV_32F,
    )
    .map_err(Error::CenterMapBlob)
}
