//! fight_scan - batch fight detection over a video file
//!
//! Scan mode (default) writes an annotated output video plus alert
//! artifacts. Classify mode (`--classify-only`) samples the whole file
//! uniformly and prints one ranked prediction.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::time::Instant;

use fightwatch::classify::backend_from_name;
use fightwatch::{classify_file, scan_video, ScanOptions, CLASS_LABELS, DEFAULT_SEQUENCE_LENGTH};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the ONNX model file.
    #[arg(long, env = "FIGHTWATCH_MODEL_PATH", default_value = "fightwatch.onnx")]
    model: String,
    /// Input video path (or a stub:// URL for the synthetic source).
    #[arg(long)]
    input: String,
    /// Output folder for the annotated video and alert artifacts.
    #[arg(long, env = "FIGHTWATCH_OUTPUT_DIR", default_value = "alerts")]
    output_dir: String,
    /// Frames per inference clip.
    #[arg(long, default_value_t = DEFAULT_SEQUENCE_LENGTH)]
    sequence_length: usize,
    /// Keep every K-th frame when filling a clip.
    #[arg(long, default_value_t = 2)]
    skip: usize,
    /// Classifier backend (tract|stub).
    #[arg(long, env = "FIGHTWATCH_BACKEND", default_value = "tract")]
    backend: String,
    /// Classify the whole file with one uniformly sampled clip instead of
    /// scanning it.
    #[arg(long)]
    classify_only: bool,
    /// Log every window's prediction.
    #[arg(long)]
    verbose: bool,
    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_flag(&args.ui, std::io::stderr().is_terminal());

    let mut backend = {
        let _stage = ui.stage("Load model");
        backend_from_name(&args.backend, &args.model, args.sequence_length)?
    };

    if args.classify_only {
        let started = Instant::now();
        let prediction = {
            let _stage = ui.stage("Classify video");
            classify_file(backend.as_mut(), &args.input)?
        };
        match prediction {
            Some(prediction) => {
                println!("{}", prediction.label());
                for score in prediction.top_k(CLASS_LABELS.len()) {
                    println!("  {}: {:.5}", score.label, score.probability);
                }
                log::info!("classification took {:.2?}", started.elapsed());
            }
            None => {
                println!(
                    "video is too short for a {}-frame clip, nothing classified",
                    args.sequence_length
                );
            }
        }
        return Ok(());
    }

    let opts = ScanOptions {
        sequence_length: args.sequence_length,
        skip: args.skip,
        verbose: args.verbose,
    };
    let output_path = {
        let _stage = ui.stage("Scan video");
        scan_video(backend.as_mut(), &args.input, &args.output_dir, &opts)?
    };
    println!("{}", output_path.display());
    Ok(())
}
