use std::num::NonZeroU16;

const DEFAULT_INPUT_WIDTH: &str = "368";
const DEFAULT_INPUT_HEIGHT: &str = "368";
const DEFAULT_CENTER_X: &str = "184";
const DEFAULT_CENTER_Y: &str = "184";
const DEFAULT_SIGMA: &str = "3.0";
const DEFAULT_STRIDE: &str = "8";
const DEFAULT_IMAGE_INPUT: &str = "image";
const DEFAULT_CENTER_INPUT: &str = "center_map";

/// Network and prior parameters shared by every stage.
#[derive(Debug, Clone, PartialEq, structopt::StructOpt)]
pub(crate) struct Config {
    /// The width of the image the network expects.
    #[structopt(long, default_value = DEFAULT_INPUT_WIDTH)]
    pub(crate) input_width: u16,

    /// The height of the image the network expects.
    #[structopt(long, default_value = DEFAULT_INPUT_HEIGHT)]
    pub(crate) input_height: u16,

    /// Horizontal pixel coordinate of the subject center, applied to every image.
    #[structopt(long, default_value = DEFAULT_CENTER_X)]
    pub(crate) center_x: f64,

    /// Vertical pixel coordinate of the subject center, applied to every image.
    #[structopt(long, default_value = DEFAULT_CENTER_Y)]
    pub(crate) center_y: f64,

    /// Spread of the Gaussian center prior.
    #[structopt(long, default_value = DEFAULT_SIGMA)]
    pub(crate) sigma: f64,

    /// Ratio between the input size and the heatmap size.
    #[structopt(long, default_value = DEFAULT_STRIDE)]
    pub(crate) stride: NonZeroU16,

    /// Name of the network input receiving the image blob.
    #[structopt(long, default_value = DEFAULT_IMAGE_INPUT)]
    pub(crate) image_input: String,

    /// Name of the network input receiving the center map.
    #[structopt(long, default_value = DEFAULT_CENTER_INPUT)]
    pub(crate) center_input: String,

    /// Layer whose output holds the final-stage heatmaps; defaults to the last layer.
    #[structopt(long)]
    pub(crate) output_layer: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_width: DEFAULT_INPUT_WIDTH.parse().unwrap(),
            input_height: DEFAULT_INPUT_HEIGHT.parse().unwrap(),
            center_x: DEFAULT_CENTER_X.parse().unwrap(),
            center_y: DEFAULT_CENTER_Y.parse().unwrap(),
            sigma: DEFAULT_SIGMA.parse().unwrap(),
            stride: DEFAULT_STRIDE.parse().unwrap(),
            image_input: DEFAULT_IMAGE_INPUT.to_owned(),
            center_input: DEFAULT_CENTER_INPUT.to_owned(),
            output_layer: None,
        }
    }
}

impl Config {
    pub(crate) fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    /// Heatmap (height, width) for the configured input size.
    pub(crate) fn heatmap_dims(&self) -> (usize, usize) {
        (
            usize::from(self.input_height / self.stride.get()),
            usize::from(self.input_width / self.stride.get()),
        )
    }
}
