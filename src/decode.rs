use crate::{
    error::Error,
    pose::{self, Keypoint, KeypointKind, Pose},
};
use ndarray::{ArrayView2, ArrayView3, Axis};
use num_traits::cast::{FromPrimitive, ToPrimitive};
use ordered_float::NotNan;
use std::convert::TryFrom;

pub(crate) trait Decoder {
    /// Return the number of heatmaps, background included, the decoder expects.
    fn expected_heatmaps(&self) -> usize;

    /// Decode a (maps, height, width) heatmap stack into a pose in image coordinates.
    fn decode(&self, heatmaps: ArrayView3<f32>, dims: (usize, usize)) -> Result<Pose, Error>;

    /// Validate that the network produced the expected number of heatmaps.
    fn validate_heatmap_count(&self, heatmap_count: usize) -> Result<(), Error> {
        let expected_heatmaps = self.expected_heatmaps();
        if heatmap_count != expected_heatmaps {
            Err(Error::KeypointCount(
                expected_heatmaps - 1,
                heatmap_count.saturating_sub(1),
            ))
        } else {
            Ok(())
        }
    }
}

/// Takes the single highest cell of every keypoint map.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ArgMaxDecoder;

impl Decoder for ArgMaxDecoder {
    fn expected_heatmaps(&self) -> usize {
        pose::NUM_KEYPOINTS + 1
    }

    fn decode(&self, heatmaps: ArrayView3<f32>, dims: (usize, usize)) -> Result<Pose, Error> {
        let (nmaps, _, _) = heatmaps.dim();
        self.validate_heatmap_count(nmaps)?;

        let keypoints = decode_keypoints(heatmaps, dims)?
            .into_iter()
            .enumerate()
            .map(|(i, (point, score))| {
                Ok(Keypoint {
                    kind: KeypointKind::from_usize(i)
                        .ok_or(Error::ConvertUSizeToKeypointKind(i))?,
                    point,
                    score,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let len = keypoints.len();
        Ok(Pose {
            keypoints: <pose::Keypoints>::try_from(keypoints)
                .map_err(|_| Error::KeypointCount(pose::NUM_KEYPOINTS, len))?,
        })
    }
}

/// Locate the maximum of `map` as `(row, col, value)`.
///
/// Cells are visited in row-major order and only a strictly greater value
/// replaces the current best, so the first of several equal maxima wins.
pub(crate) fn argmax(map: ArrayView2<f32>) -> Result<Option<(usize, usize, f32)>, Error> {
    let mut best: Option<(usize, usize, NotNan<f32>)> = None;
    for ((row, col), &value) in map.indexed_iter() {
        let value = NotNan::new(value).map_err(|e| Error::ConstructNotNan(e, value))?;
        if best.map_or(true, |(_, _, current)| value > current) {
            best = Some((row, col, value));
        }
    }
    Ok(best.map(|(row, col, value)| (row, col, value.into_inner())))
}

/// Decode every non-background map of `heatmaps` into an image-space point
/// and its confidence, scaling map coordinates to `(img_height, img_width)`.
pub(crate) fn decode_keypoints(
    heatmaps: ArrayView3<f32>,
    (img_height, img_width): (usize, usize),
) -> Result<Vec<(opencv::core::Point, f32)>, Error> {
    let shape = heatmaps.dim();
    let (nmaps, map_height, map_width) = shape;
    if nmaps < 2 || map_height == 0 || map_width == 0 {
        return Err(Error::DegenerateHeatmaps(shape));
    }

    let img_width = img_width.to_f64().ok_or(Error::ConvertToF64)?;
    let img_height = img_height.to_f64().ok_or(Error::ConvertToF64)?;
    let map_width = map_width.to_f64().ok_or(Error::ConvertToF64)?;
    let map_height = map_height.to_f64().ok_or(Error::ConvertToF64)?;

    heatmaps
        .axis_iter(Axis(0))
        .skip(1)
        .map(|map| {
            let (row, col, score) = argmax(map)?.ok_or(Error::DegenerateHeatmaps(shape))?;
            let x = (col.to_f64().ok_or(Error::ConvertToF64)? * img_width / map_width)
                .trunc()
                .to_i32()
                .ok_or(Error::ConvertToI32)?;
            let y = (row.to_f64().ok_or(Error::ConvertToF64)? * img_height / map_height)
                .trunc()
                .to_i32()
                .ok_or(Error::ConvertToI32)?;
            Ok((opencv::core::Point::new(x, y), score))
        })
        .collect()
}
