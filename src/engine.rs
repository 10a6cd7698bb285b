use crate::{
    center_map,
    config::Config,
    decode::Decoder,
    error::Error,
    network::Network,
    pose::Pose,
};
use num_traits::cast::ToPrimitive;
use opencv::{
    core::{Mat, Scalar, Size, CV_32F},
    prelude::*,
};
use std::time::{Duration, Instant};

const PIXEL_MEAN: f64 = 128.0;
const PIXEL_SCALE: f64 = 256.0;

pub(crate) struct Engine<N, D> {
    network: N,
    decoder: D,
    config: Config,
    center_blob: Mat,
    pub(crate) timing: Timing,
}

#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Timing {
    pub(crate) inference: Duration,
    pub(crate) decode: Duration,
}

impl<N, D> Engine<N, D>
where
    N: Network,
    D: Decoder,
{
    pub(crate) fn new(network: N, decoder: D, config: Config) -> Result<Self, Error> {
        let center_map = center_map::gaussian(
            usize::from(config.input_height),
            usize::from(config.input_width),
            config.center(),
            config.sigma,
        );
        let center_blob = center_map::to_blob(center_map.view())?;
        Ok(Self {
            network,
            decoder,
            config,
            center_blob,
            timing: Default::default(),
        })
    }

    /// Normalize a BGR image to `(pixel - 128) / 256` and lay it out as NCHW.
    pub(crate) fn preprocess(&self, image: &Mat) -> Result<Mat, Error> {
        check_dims(image, &self.config)?;
        opencv::dnn::blob_from_image(
            image,
            PIXEL_SCALE.recip(),
            Size::new(i32::from(self.config.input_width), i32::from(self.config.input_height)),
            Scalar::all(PIXEL_MEAN),
            false, // swap_rb
            false, // crop
            CV_32F,
        )
        .map_err(Error::BlobFromImage)
    }

    /// Run the network on `image` and decode the final-stage heatmaps.
    pub(crate) fn estimate(&mut self, image: &Mat) -> Result<Pose, Error> {
        let input = self.preprocess(image)?;

        let start_inference = Instant::now();
        let heatmaps = self.network.forward(&input, &self.center_blob)?;
        self.timing.inference += start_inference.elapsed();

        let start_decode = Instant::now();
        let pose = self.decoder.decode(
            heatmaps.view(),
            (
                usize::from(self.config.input_height),
                usize::from(self.config.input_width),
            ),
        )?;
        self.timing.decode += start_decode.elapsed();
        Ok(pose)
    }
}

/// The network input size is fixed; images are never resized.
pub(crate) fn check_dims(image: &Mat, config: &Config) -> Result<(), Error> {
    let size = image.size().map_err(Error::GetSize)?;
    let expected_width = i32::from(config.input_width);
    let expected_height = i32::from(config.input_height);
    if size.width != expected_width || size.height != expected_height {
        return Err(Error::DimensionMismatch {
            expected_width,
            expected_height,
            actual_width: size.width,
            actual_height: size.height,
        });
    }
    let channels = image.channels().map_err(Error::GetSize)?;
    if channels != 3 {
        return Err(Error::ChannelCount(channels));
    }
    Ok(())
}

impl Timing {
    /// Mean inference time per image, in milliseconds.
    pub(crate) fn mean_inference_ms(&self, nimages: usize) -> Option<f64> {
        let nimages = nimages.to_f64().filter(|&n| n > 0.0)?;
        Some(self.inference.as_secs_f64() * 1000.0 / nimages)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{decode::ArgMaxDecoder, pose};
    use ndarray::{Array2, Array3};
    use opencv::core::CV_8UC3;
    use std::{cell::RefCell, rc::Rc};

    /// Plants joint `k` at heatmap cell `(k, k + offset)`; records what it was fed.
    #[derive(Default)]
    pub(crate) struct FakeNetwork {
        pub(crate) offset: usize,
        pub(crate) calls: Rc<RefCell<Vec<(Vec<f32>, Array2<f32>)>>>,
    }

    impl Network for FakeNetwork {
        fn forward(&mut self, image: &Mat, center_map: &Mat) -> Result<Array3<f32>, Error> {
            let image = image.data_typed::<f32>().unwrap().to_vec();
            let center = center_map.data_typed::<f32>().unwrap();
            let center = Array2::from_shape_vec((368, 368), center.to_vec()).unwrap();
            self.calls.borrow_mut().push((image, center));

            let mut maps = Array3::zeros((pose::NUM_KEYPOINTS + 1, 46, 46));
            for k in 0..pose::NUM_KEYPOINTS {
                maps[(k + 1, k, k + self.offset)] = 1.0;
            }
            Ok(maps)
        }
    }

    pub(crate) fn image(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(value)).unwrap()
    }

    #[test]
    fn estimate_scales_to_input() {
        let network = FakeNetwork {
            offset: 3,
            ..Default::default()
        };
        let mut engine = Engine::new(network, ArgMaxDecoder, Config::default()).unwrap();
        let pose = engine.estimate(&image(368, 368, 0.0)).unwrap();
        for (k, keypoint) in pose.keypoints.iter().enumerate() {
            let k = k as i32;
            assert_eq!(keypoint.point, opencv::core::Point::new(8 * (k + 3), 8 * k));
            assert_eq!(keypoint.score, 1.0);
        }
    }

    #[test]
    fn network_sees_normalized_image_and_prior() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let network = FakeNetwork {
            offset: 0,
            calls: calls.clone(),
        };
        let mut engine = Engine::new(network, ArgMaxDecoder, Config::default()).unwrap();

        let mut input = image(368, 368, 0.0);
        opencv::imgproc::rectangle(
            &mut input,
            opencv::core::Rect::new(0, 0, 1, 1),
            Scalar::new(0.0, 128.0, 255.0, 0.0),
            opencv::imgproc::FILLED,
            opencv::imgproc::LINE_8,
            0,
        )
        .unwrap();
        engine.estimate(&input).unwrap();

        let calls = calls.borrow();
        let (blob, center) = &calls[0];
        let plane = 368 * 368;
        assert_eq!(blob.len(), 3 * plane);
        assert_eq!(blob[0], -0.5);
        assert_eq!(blob[plane], 0.0);
        assert_eq!(blob[2 * plane], 127.0 / 256.0);
        assert_eq!(blob[1], -0.5);

        assert_eq!(center[(184, 184)], 1.0);
        assert_eq!(center[(0, 0)], 0.0);
    }

    #[test]
    fn wrong_size_is_rejected() {
        let mut engine =
            Engine::new(FakeNetwork::default(), ArgMaxDecoder, Config::default()).unwrap();
        assert!(matches!(
            engine.estimate(&image(240, 320, 0.0)),
            Err(Error::DimensionMismatch {
                expected_width: 368,
                expected_height: 368,
                actual_width: 320,
                actual_height: 240,
            })
        ));
    }

    #[test]
    fn grayscale_is_rejected() {
        let config = Config::default();
        let gray = Mat::new_rows_cols_with_default(
            368,
            368,
            opencv::core::CV_8UC1,
            Scalar::all(0.0),
        )
        .unwrap();
        assert!(matches!(
            check_dims(&gray, &config),
            Err(Error::ChannelCount(1))
        ));
    }

    #[test]
    fn timing_accumulates() {
        let mut engine =
            Engine::new(FakeNetwork::default(), ArgMaxDecoder, Config::default()).unwrap();
        engine.estimate(&image(368, 368, 10.0)).unwrap();
        assert!(engine.timing.mean_inference_ms(1).is_some());
        assert!(engine.timing.mean_inference_ms(0).is_none());
    }
}
