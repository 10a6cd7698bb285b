use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;

mod batch;
mod center_map;
mod config;
mod decode;
mod engine;
mod error;
mod network;
mod pose;
mod render;

#[derive(Debug, structopt::StructOpt)]
enum Command {
    /// Estimate every .jpg and .png image in a directory and save the joints as npz.
    Batch {
        /// Directory holding the input images.
        #[structopt(parse(from_os_str))]
        image_dir: PathBuf,

        /// Where to write the (3, keypoints, images) joint array.
        #[structopt(short, long, default_value = "est_joints.npz", parse(from_os_str))]
        output: PathBuf,
    },
    /// Estimate a single image and draw its skeleton.
    Render {
        /// The image to annotate.
        #[structopt(parse(from_os_str))]
        image: PathBuf,

        /// Where to write the annotated image.
        #[structopt(short, long, default_value = "test_example.png", parse(from_os_str))]
        output: PathBuf,

        /// Show the annotated image in a window and wait for a key press.
        #[structopt(short, long)]
        display: bool,
    },
}

#[derive(structopt::StructOpt)]
struct Opt {
    /// Path to the pose network weights, in any format OpenCV's DNN module reads.
    #[structopt(parse(from_os_str))]
    weights: PathBuf,

    /// Optional network description accompanying the weights.
    #[structopt(long, parse(from_os_str))]
    weights_config: Option<PathBuf>,

    #[structopt(flatten)]
    config: config::Config,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(short, long)]
    show_progress: bool,

    #[structopt(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    info!(message = "constructing model", weights = ?opt.weights);
    let network = network::DnnNetwork::new(
        &opt.weights,
        opt.weights_config.as_deref(),
        &opt.config,
    )
    .context("failed loading network")?;
    let mut engine = engine::Engine::new(network, decode::ArgMaxDecoder, opt.config)
        .context("failed constructing engine")?;

    match opt.command {
        Command::Batch { image_dir, output } => {
            let images = batch::list_images(&image_dir).context("failed listing images")?;
            info!(message = "performing inference", nimages = images.len());

            let progress = if opt.show_progress {
                Some(
                    ProgressBar::new(images.len() as u64).with_style(
                        ProgressStyle::default_bar()
                            .template("{prefix:.bold.dim} {bar:40} {pos}/{len} {wide_msg}"),
                    ),
                )
            } else {
                None
            };

            let joints = batch::estimate_all(&mut engine, &images, progress.as_ref())
                .context("failed estimating batch")?;
            if let Some(progress) = progress {
                progress.finish();
            }

            batch::write_joints(&output, &joints).context("failed writing joints")?;
            info!(
                message = "wrote joints",
                path = ?output,
                mean_inference_ms = ?engine.timing.mean_inference_ms(images.len()),
                decode = ?engine.timing.decode
            );
        }
        Command::Render {
            image,
            output,
            display,
        } => {
            let frame = batch::read_image(&image).context("failed reading image")?;
            let pose = engine.estimate(&frame).context("failed estimating pose")?;
            info!(keypoints = ?pose.points());

            let limbs = pose::limb_indices()?;
            let annotated = render::overlay(
                &frame,
                &pose.points(),
                render::Skeleton {
                    limbs: &limbs,
                    colors: &pose::constants::LIMB_COLORS,
                    joint_color: pose::constants::JOINT_COLOR,
                },
            )
            .context("failed drawing skeleton")?;

            if display {
                render::display(&annotated).context("failed displaying image")?;
            }
            render::persist(&annotated, &output).context("failed writing annotated image")?;
            info!(message = "wrote annotated image", path = ?output);
        }
    }

    Ok(())
}
