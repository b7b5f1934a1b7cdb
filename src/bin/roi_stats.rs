// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use env_logger;
use image::{DynamicImage, ImageReader, Rgb};
use imageproc::drawing;
use imageproc::rect::Rect;
use log::{info, warn};
use serde::Deserialize;

use roi_stats::geometry::{resolve_geometry, DimDefinition};
use roi_stats::{EngineConfig, NdFrame, RoiDefinition, RoiEngine};

/// Example program for running ROI extraction and statistics on test
/// image(s).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Path of the file or directory to process.
    #[arg(short, long)]
    input: String,

    /// Directory where output file(s) are written.
    #[arg(short, long)]
    output: String,

    /// JSON file with the ROI definitions. When absent, a single ROI is
    /// defined by the flags below.
    #[arg(short, long)]
    rois: Option<String>,

    /// Left edge of the ROI.
    #[arg(short, long, default_value_t = 0)]
    x: i64,

    /// Top edge of the ROI.
    #[arg(short, long, default_value_t = 0)]
    y: i64,

    /// ROI width in binned pixels; 0 for all that fit.
    #[arg(long, default_value_t = 0)]
    width: i64,

    /// ROI height in binned pixels; 0 for all that fit.
    #[arg(long, default_value_t = 0)]
    height: i64,

    /// Binning factor applied in both directions.
    #[arg(short, long, default_value_t = 1)]
    binning: i64,

    /// Border width for the net intensity background estimate.
    #[arg(long, default_value_t = 0)]
    bgd_width: i64,

    /// Grab the first image as background and subtract it from the others.
    #[arg(short, long, default_value_t = false)]
    grab_background: std::primitive::bool,

    /// Process the ROIs of each image in parallel.
    #[arg(short, long, default_value_t = false)]
    parallel: std::primitive::bool,

    /// Also write each ROI's extracted sub-image.
    #[arg(short, long, default_value_t = false)]
    save_rois: std::primitive::bool,
}

/// Layout of the --rois file.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RoiFile {
    parallel: bool,
    rois: Vec<RoiDefinition>,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let input_metadata = fs::metadata(&args.input).unwrap_or_else(|e| {
        panic!("Input file/dir '{}' does not exist? {:?}", args.input, e);
    });
    let output_metadata = fs::metadata(&args.output).unwrap_or_else(|e| {
        panic!("Output dir '{}' does not exist? {:?}", args.output, e);
    });
    assert!(output_metadata.is_dir(),
            "Output '{}' must be a directory", args.output);

    let mut engine = create_engine(&args);
    if args.grab_background {
        for index in 0..engine.max_rois() {
            engine.grab_background(index).unwrap();
            engine.definition_mut(index).unwrap().do_background = true;
        }
    }

    if input_metadata.is_dir() {
        // Enumerate and process all of the files in the directory.
        let mut paths: Vec<PathBuf> = fs::read_dir(&args.input).unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        for path in paths {
            process_file(path.to_str().unwrap(), &args, &mut engine);
        }
    } else {
        // Process the single file.
        assert!(input_metadata.is_file());
        process_file(args.input.as_str(), &args, &mut engine);
    }
}

fn create_engine(args: &Args) -> RoiEngine {
    let roi_file = match &args.rois {
        Some(rois_path) => {
            let json = fs::read_to_string(rois_path).unwrap_or_else(|e| {
                panic!("Could not read ROI file '{}': {:?}", rois_path, e);
            });
            serde_json::from_str::<RoiFile>(&json).unwrap_or_else(|e| {
                panic!("Could not parse ROI file '{}': {}", rois_path, e);
            })
        },
        None => {
            let dim = |start, size| DimDefinition{start, size, bin: args.binning,
                                                  ..Default::default()};
            let mut definition = RoiDefinition{
                name: "roi".to_string(),
                enabled: true,
                highlight: true,
                bgd_width: args.bgd_width,
                ..Default::default()};
            definition.dims[0] = dim(args.x, args.width);
            definition.dims[1] = dim(args.y, args.height);
            RoiFile{parallel: false, rois: vec![definition]}
        },
    };
    let config = EngineConfig{max_rois: roi_file.rois.len(),
                              parallel: args.parallel || roi_file.parallel};
    let mut engine = RoiEngine::new(&config);
    for (index, definition) in roi_file.rois.into_iter().enumerate() {
        engine.set_definition(index, definition).unwrap();
    }
    engine
}

// 16 bit source images stay 16 bit; everything else is reduced to 8 bit
// grayscale.
fn frame_from_image(img: &DynamicImage) -> NdFrame {
    let color = img.color();
    if color.bytes_per_pixel() / color.channel_count() > 1 {
        NdFrame::from(&img.to_luma16())
    } else {
        NdFrame::from(&img.to_luma8())
    }
}

fn process_file(file: &str, args: &Args, engine: &mut RoiEngine) {
    info!("Processing {}", file);
    let input_path = PathBuf::from(&file);
    let mut output_path = PathBuf::from(&args.output);
    output_path.push(input_path.file_name().unwrap());
    output_path.set_extension("bmp");

    let img = match ImageReader::open(&input_path).unwrap().decode() {
        Ok(img) => img,
        Err(e) => {
            warn!("Skipping {:?} due to: {:?}", input_path, e);
            return;
        },
    };
    let frame = frame_from_image(&img);

    let roi_start = Instant::now();
    let report = engine.process_frame(&frame);
    let elapsed = roi_start.elapsed();
    info!("WxH: {}x{} {:?}; {} ROIs processed in {:?}",
          frame.dims()[0], frame.dims()[1], frame.kind(),
          report.processed.len(), elapsed);
    for (index, e) in &report.failures {
        warn!("ROI {} failed: {}", index, e);
    }

    // Outline the highlighted ROIs in the image.
    let mut img_color = img.into_rgb8();
    for index in &report.processed {
        let index = *index;
        let definition = engine.definition(index).unwrap();
        let state = engine.state(index).unwrap();
        let stats = state.statistics();
        info!("ROI {} '{}' shape {:?}: total {} net {} mean {:.3} min {} max {} \
               centroid ({:.2}, {:.2})",
              index, definition.name, state.shape(), stats.total, stats.net,
              stats.mean, stats.min, stats.max, state.centroid().0, state.centroid().1);
        if definition.compute_histogram {
            info!("ROI {} histogram entropy {:.3}", index, state.histogram_entropy());
        }
        if args.save_rois {
            if let Some(roi_image) = state.output_frame().to_gray_image() {
                let mut roi_path = output_path.clone();
                roi_path.set_extension(format!("roi{}.bmp", index));
                roi_image.save(roi_path).unwrap();
            }
        }
        if !definition.highlight {
            continue;
        }
        let mut dims: [DimDefinition; 3] = definition.dims.clone();
        let geometry = resolve_geometry(&mut dims, frame.dims()).unwrap();
        let (gx, gy) = (geometry.dims()[0], geometry.dims()[1]);
        let (w, h) = (gx.size * gx.bin, gy.size * gy.bin);
        if w == 0 || h == 0 {
            continue;
        }
        drawing::draw_hollow_rect_mut(
            &mut img_color,
            Rect::at(gx.start as i32, gy.start as i32).of_size(w as u32, h as u32),
            Rgb::<u8>([255, 0, 0]));
    }
    img_color.save(output_path).unwrap();
}
