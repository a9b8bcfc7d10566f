use argh::FromArgs;
use std::path::PathBuf;

use facemorph::engine::{FaceMorph, MorphConfig, MorphImage};
use facemorph::io::{functional as F, landmarks as L};

#[derive(FromArgs)]
/// Morph one face into another and write the frames as PNG files
struct Args {
    /// path to the source image
    #[argh(option, short = 's')]
    source: PathBuf,

    /// path to the source landmarks in JSON
    #[argh(option)]
    source_landmarks: PathBuf,

    /// path to the destination image
    #[argh(option, short = 'd')]
    destination: PathBuf,

    /// path to the destination landmarks in JSON
    #[argh(option)]
    destination_landmarks: PathBuf,

    /// number of frames to render, both endpoints included
    #[argh(option, short = 'n', default = "30")]
    frames: usize,

    /// directory to write the frames into
    #[argh(option, short = 'o', default = "PathBuf::from(\"frames\")")]
    output_dir: PathBuf,

    /// optional JSON file with the morph settings
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => MorphConfig::from_json_file(path)?,
        None => MorphConfig::default(),
    };

    // read both faces with their landmarks
    let source = MorphImage::new(
        F::read_image(&args.source)?,
        L::read_landmarks_json(&args.source_landmarks)?,
    )?;
    let destination = MorphImage::new(
        F::read_image(&args.destination)?,
        L::read_landmarks_json(&args.destination_landmarks)?,
    )?;

    let mut morph = FaceMorph::with_cpu_backend(config);
    morph.set_source(source)?;
    morph.set_destination(destination)?;

    std::fs::create_dir_all(&args.output_dir)?;

    for index in 0..args.frames {
        let frame = morph.render_frame_at(index, args.frames)?;
        let rgba = morph.read_frame(&frame)?;

        let file_path = args.output_dir.join(format!("frame_{index:04}.png"));
        F::write_image_png(&file_path, &rgba)?;
        log::info!("wrote {} at t = {:.3}", file_path.display(), frame.t());
    }

    morph.release()?;

    println!(
        "Wrote {} frames to {}",
        args.frames,
        args.output_dir.display()
    );

    Ok(())
}
