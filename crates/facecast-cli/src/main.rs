use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facecast_core::pipeline::{DEFAULT_JPEG_QUALITY, DEFAULT_RESIZE_WIDTH};
use facecast_core::{
    default_model_dir, FaceAnalyzer, FramePipeline, KnownFaceSet, KnownFaceSetBuilder,
    MatchMetric, OnnxAnalyzer, PipelineOptions,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facecast", version, about = "Build and inspect facecast known-face encodings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an encodings file from a `<dataset>/<name>/<images>` tree
    Encode {
        /// Dataset directory, one subdirectory per person
        #[arg(short, long, default_value = "dataset")]
        dataset: PathBuf,
        /// Encodings file to write
        #[arg(short, long, default_value = "encodings.json")]
        output: PathBuf,
        #[arg(long, env = "FACECAST_MODEL_DIR")]
        model_dir: Option<PathBuf>,
        /// Minimum detector confidence for a face to be encoded
        #[arg(long)]
        min_confidence: Option<f32>,
    },
    /// Print a summary of an encodings file
    Inspect {
        file: PathBuf,
    },
    /// Label the faces in one image
    Recognize {
        image: PathBuf,
        #[arg(short, long, default_value = "encodings.json")]
        encodings: PathBuf,
        /// Write the annotated image here as JPEG
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, env = "FACECAST_MODEL_DIR")]
        model_dir: Option<PathBuf>,
        #[arg(long, default_value_t = MatchMetric::Cosine)]
        metric: MatchMetric,
        /// Match threshold; the metric's default when omitted
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long, default_value_t = DEFAULT_RESIZE_WIDTH)]
        resize_width: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { dataset, output, model_dir, min_confidence } => {
            let model_dir = model_dir.unwrap_or_else(default_model_dir);
            let mut analyzer = OnnxAnalyzer::load(&model_dir)
                .with_context(|| format!("loading models from {}", model_dir.display()))?;
            if let Some(threshold) = min_confidence {
                analyzer = analyzer.with_confidence_threshold(threshold);
            }

            let images = collect_dataset(&dataset)?;
            if images.is_empty() {
                bail!("no images found under {}", dataset.display());
            }
            tracing::info!(images = images.len(), dataset = %dataset.display(), "encoding dataset");

            let known = encode_images(&mut analyzer, &images)?;
            known
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "Wrote {} encodings for {} people to {}",
                known.len(),
                known.identity_counts().len(),
                output.display()
            );
        }
        Commands::Inspect { file } => {
            let known = KnownFaceSet::load(&file)
                .with_context(|| format!("loading {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary(&known))?);
        }
        Commands::Recognize {
            image,
            encodings,
            output,
            model_dir,
            metric,
            threshold,
            resize_width,
        } => {
            let known = KnownFaceSet::load(&encodings)
                .with_context(|| format!("loading {}", encodings.display()))?;
            let model_dir = model_dir.unwrap_or_else(default_model_dir);
            let analyzer = OnnxAnalyzer::load(&model_dir)
                .with_context(|| format!("loading models from {}", model_dir.display()))?;
            let frame = image::open(&image)
                .with_context(|| format!("reading {}", image.display()))?
                .to_rgb8();

            let matcher = metric.matcher(threshold.unwrap_or_else(|| metric.default_threshold()));
            let options = PipelineOptions {
                resize_width,
                jpeg_quality: DEFAULT_JPEG_QUALITY,
            };
            let mut pipeline = FramePipeline::new(analyzer, known, matcher, options);

            match output {
                Some(path) => {
                    let outcome = pipeline.process_frame(frame)?;
                    for face in &outcome.faces {
                        println!("{}\t{:?}", face.label, face.location);
                    }
                    fs::write(&path, &outcome.jpeg)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "annotated image written");
                }
                None => {
                    let faces = pipeline.label_faces(&frame)?;
                    if faces.is_empty() {
                        println!("No faces found");
                    }
                    for face in &faces {
                        println!("{}\t{:?}", face.label, face.location);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Every file under a per-person subdirectory of `dataset`, paired with that person's name.
///
/// The name is the first path component below `dataset`; files directly in
/// `dataset` have no name and are skipped. Results are sorted by path.
fn collect_dataset(dataset: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut images = Vec::new();
    let mut people: Vec<_> = fs::read_dir(dataset)
        .with_context(|| format!("reading {}", dataset.display()))?
        .collect::<Result<_, _>>()?;
    people.sort_by_key(|e| e.path());

    for entry in people {
        let path = entry.path();
        if !path.is_dir() {
            tracing::debug!(path = %path.display(), "skipping file outside a person directory");
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let mut files = Vec::new();
        walk_files(&path, &mut files)?;
        files.sort();
        images.extend(files.into_iter().map(|f| (name.clone(), f)));
    }

    Ok(images)
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            walk_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// One `(embedding, name)` pair per detected face. Undecodable or faceless images are skipped.
fn encode_images<A: FaceAnalyzer>(
    analyzer: &mut A,
    images: &[(String, PathBuf)],
) -> Result<KnownFaceSet> {
    let mut builder = KnownFaceSetBuilder::default();

    for (i, (name, path)) in images.iter().enumerate() {
        tracing::info!(
            image = i + 1,
            total = images.len(),
            name = %name,
            path = %path.display(),
            "processing image"
        );
        let frame = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable image");
                continue;
            }
        };

        let boxes = analyzer.face_locations(&frame)?;
        if boxes.is_empty() {
            tracing::warn!(path = %path.display(), "no face found");
            continue;
        }
        for encoding in analyzer.face_encodings(&frame, &boxes)? {
            builder.push(encoding, name.as_str());
        }
    }

    Ok(builder.build()?)
}

fn summary(known: &KnownFaceSet) -> serde_json::Value {
    serde_json::json!({
        "entries": known.len(),
        "dimension": known.dim(),
        "identities": known.identity_counts(),
    })
}
