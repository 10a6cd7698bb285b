use crate::{config::Config, error::Error, pose};
use ndarray::{Array3, ArrayView};
use opencv::{core::Mat, dnn, prelude::*};
use std::path::{Path, PathBuf};

/// Runs the pose network on a prepared image blob and center-map blob.
pub(crate) trait Network {
    /// Return the final-stage heatmaps as a (maps, height, width) array.
    fn forward(&mut self, image: &Mat, center_map: &Mat) -> Result<Array3<f32>, Error>;
}

/// A network loaded through OpenCV's DNN module.
pub(crate) struct DnnNetwork {
    net: dnn::Net,
    image_input: String,
    center_input: String,
    output_layer: String,
    heatmap_shape: (usize, usize, usize),
}

impl DnnNetwork {
    pub(crate) fn new<P>(
        weights: P,
        weights_config: Option<&Path>,
        config: &Config,
    ) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let weights = weights.as_ref();
        let net = dnn::read_net(
            path_str(weights)?,
            weights_config.map(path_str).transpose()?.unwrap_or(""),
            "",
        )
        .map_err(|e| Error::WeightLoad(e, weights.to_path_buf()))?;

        if net
            .empty()
            .map_err(|e| Error::WeightLoad(e, weights.to_path_buf()))?
        {
            return Err(Error::EmptyNetwork(weights.to_path_buf()));
        }

        let (height, width) = config.heatmap_dims();
        Ok(Self {
            net,
            image_input: config.image_input.clone(),
            center_input: config.center_input.clone(),
            output_layer: config.output_layer.clone().unwrap_or_default(),
            heatmap_shape: (pose::NUM_KEYPOINTS + 1, height, width),
        })
    }
}

fn path_str(path: &Path) -> Result<&str, Error> {
    path.to_str()
        .ok_or_else(|| Error::NonUtf8Path(PathBuf::from(path)))
}

impl Network for DnnNetwork {
    fn forward(&mut self, image: &Mat, center_map: &Mat) -> Result<Array3<f32>, Error> {
        self.net
            .set_input(image, &self.image_input, 1.0, Default::default())
            .map_err(|e| Error::SetInput(e, self.image_input.clone()))?;
        self.net
            .set_input(center_map, &self.center_input, 1.0, Default::default())
            .map_err(|e| Error::SetInput(e, self.center_input.clone()))?;

        let output = self
            .net
            .forward_single(&self.output_layer)
            .map_err(Error::Forward)?;
        heatmaps_from_blob(&output, self.heatmap_shape)
    }
}

/// Copy a (1, maps, height, width) float blob into an owned heatmap stack.
pub(crate) fn heatmaps_from_blob(
    blob: &Mat,
    shape: (usize, usize, usize),
) -> Result<Array3<f32>, Error> {
    let data = blob.data_typed::<f32>().map_err(Error::GetTypedData)?;
    let (maps, height, width) = shape;
    let expected = maps * height * width;
    if data.len() != expected {
        return Err(Error::OutputSize(expected, data.len()));
    }
    Ok(ArrayView::from_shape(shape, data)
        .map_err(Error::ReshapeOutput)?
        .to_owned())
}
