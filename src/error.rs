use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to load network weights from {1:?}")]
    WeightLoad(#[source] opencv::Error, PathBuf),

    #[error("network loaded from {0:?} has no layers")]
    EmptyNetwork(PathBuf),

    #[error("failed to decode image {1:?}")]
    ImageDecode(#[source] opencv::Error, PathBuf),

    #[error("image {0:?} is empty or could not be read")]
    EmptyImage(PathBuf),

    #[error("no .jpg or .png images found in {0:?}")]
    EmptyBatch(PathBuf),

    #[error("failed to list images in {1:?}")]
    ReadImageDir(#[source] std::io::Error, PathBuf),

    #[error("image is {actual_width}x{actual_height}, network expects {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: i32,
        expected_height: i32,
        actual_width: i32,
        actual_height: i32,
    },

    #[error("image has {0} channels, expected 3")]
    ChannelCount(i32),

    #[error("heatmap stack of shape {0:?} has no keypoint maps or a zero-area map")]
    DegenerateHeatmaps((usize, usize, usize)),

    #[error("expected {0} keypoint heatmaps, got {1}")]
    KeypointCount(usize, usize),

    #[error("network output holds {1} values, expected {0}")]
    OutputSize(usize, usize),

    #[error("failed to reshape network output")]
    ReshapeOutput(#[source] ndarray::ShapeError),

    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("failed to convert usize value to keypoint kind: {0}")]
    ConvertUSizeToKeypointKind(usize),

    #[error("failed to convert keypoint variant to usize: {0:?}")]
    KeypointVariantToUSize(crate::pose::KeypointKind),

    #[error("failed to convert value to i32")]
    ConvertToI32,

    #[error("failed to convert value to f64")]
    ConvertToF64,

    #[error("failed to build image blob")]
    BlobFromImage(#[source] opencv::Error),

    #[error("failed to build center map blob")]
    CenterMapBlob(#[source] opencv::Error),

    #[error("failed to set network input {1:?}")]
    SetInput(#[source] opencv::Error, String),

    #[error("failed to run forward pass")]
    Forward(#[source] opencv::Error),

    #[error("failed to get typed data from OpenCV Mat")]
    GetTypedData(#[source] opencv::Error),

    #[error("failed to get Mat dimensions")]
    GetSize(#[source] opencv::Error),

    #[error("failed to clone Mat")]
    CloneMat(#[source] opencv::Error),

    #[error("failed to draw circle")]
    DrawCircle(#[source] opencv::Error),

    #[error("failed to compute ellipse polygon")]
    EllipsePoly(#[source] opencv::Error),

    #[error("failed to fill polygon")]
    FillPoly(#[source] opencv::Error),

    #[error("failed to blend images")]
    AddWeighted(#[source] opencv::Error),

    #[error("limb references keypoint {0} but only {1} keypoints are available")]
    LimbIndex(usize, usize),

    #[error("palette has {0} colors for {1} limbs")]
    Palette(usize, usize),

    #[error("path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error("failed to write image to {1:?}")]
    WriteImage(#[source] opencv::Error, PathBuf),

    #[error("OpenCV refused to write image to {0:?}")]
    ImageNotWritten(PathBuf),

    #[cfg(feature = "gui")]
    #[error("failed to show image")]
    ImShow(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to wait for key press")]
    WaitKey(#[source] opencv::Error),

    #[error("failed to create {1:?}")]
    CreateOutput(#[source] std::io::Error, PathBuf),

    #[error("failed to write npz archive")]
    WriteNpz(#[source] ndarray_npy::WriteNpzError),
}
