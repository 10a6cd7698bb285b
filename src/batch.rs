use crate::{decode::Decoder, engine::Engine, error::Error, network::Network, pose};
use indicatif::ProgressBar;
use ndarray::{s, Array3};
use ndarray_npy::NpzWriter;
use opencv::{core::Mat, prelude::*};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];
pub(crate) const JOINTS_KEY: &str = "est_joints";

/// List the `.jpg` images of `dir` followed by its `.png` images.
pub(crate) fn list_images<P>(dir: P) -> Result<Vec<PathBuf>, Error>
where
    P: AsRef<Path>,
{
    let dir = dir.as_ref();
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| Error::ReadImageDir(e, dir.to_path_buf()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::ReadImageDir(e, dir.to_path_buf()))?;
    entries.sort();

    let images = IMAGE_EXTENSIONS
        .iter()
        .flat_map(|&extension| {
            entries
                .iter()
                .filter(move |path| {
                    path.is_file() && path.extension().map_or(false, |ext| ext == extension)
                })
                .cloned()
        })
        .collect::<Vec<_>>();

    if images.is_empty() {
        Err(Error::EmptyBatch(dir.to_path_buf()))
    } else {
        Ok(images)
    }
}

/// Read a 3-channel BGR image.
pub(crate) fn read_image<P>(path: P) -> Result<Mat, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let filename = path
        .to_str()
        .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))?;
    let image = opencv::imgcodecs::imread(filename, opencv::imgcodecs::IMREAD_COLOR)
        .map_err(|e| Error::ImageDecode(e, path.to_path_buf()))?;
    if image
        .empty()
        .map_err(|e| Error::ImageDecode(e, path.to_path_buf()))?
    {
        return Err(Error::EmptyImage(path.to_path_buf()));
    }
    Ok(image)
}

/// Estimate a pose for every image, stacking the joints into a (3, K, N) array.
///
/// The first image that cannot be read or estimated aborts the whole batch.
pub(crate) fn estimate_all<N, D>(
    engine: &mut Engine<N, D>,
    images: &[PathBuf],
    progress: Option<&ProgressBar>,
) -> Result<Array3<f64>, Error>
where
    N: Network,
    D: Decoder,
{
    let mut joints = Array3::zeros((3, pose::NUM_KEYPOINTS, images.len()));

    for (i, path) in images.iter().enumerate() {
        info!(message = "testing on image", path = ?path);
        let image = read_image(path)?;
        let pose = engine.estimate(&image)?;
        for &pose::Keypoint { kind, point, score } in pose.keypoints.iter() {
            debug!(?kind, x = point.x, y = point.y, score);
        }

        joints
            .slice_mut(s![.., .., i])
            .assign(&pose.to_joint_array()?);

        if let Some(progress) = progress {
            progress.inc(1);
        }
    }

    Ok(joints)
}

/// Save the stacked joints as an npz archive under [`JOINTS_KEY`].
pub(crate) fn write_joints<P>(path: P, joints: &Array3<f64>) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::CreateOutput(e, path.to_path_buf()))?;
    let mut npz = NpzWriter::new(file);
    npz.add_array(JOINTS_KEY, joints).map_err(Error::WriteNpz)?;
    npz.finish().map_err(Error::WriteNpz)?;
    Ok(())
}
