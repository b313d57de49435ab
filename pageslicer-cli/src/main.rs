use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pageslicer::{
    AnnotationSet, AspectRatio, CancellationToken, CropPlan, ExternalTools, ExtractOptions,
    NativeOperations, PageOperations, RegionExtractor,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "pageslicer",
    about = "Extract annotated regions from PDF documents as fixed-aspect crops",
    version,
    author
)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop every annotated region and write them, in order, to one PDF
    Extract {
        /// Source PDF file
        source: PathBuf,

        /// Annotation file (JSON: page index -> [[x0, y0, x1, y1], ...])
        annotations: PathBuf,

        /// Output PDF file
        output: PathBuf,

        /// Target aspect ratio of each crop (e.g. "3:4", "16/9", "0.75")
        #[arg(short, long, default_value = "3:4")]
        aspect_ratio: AspectRatio,

        /// Backend that performs the page operations
        #[arg(long, value_enum, default_value_t = Backend::Native)]
        backend: Backend,

        /// pdftk executable, for the external backend
        #[arg(long, env = "PAGESLICER_PDFTK", default_value = "pdftk")]
        pdftk: PathBuf,

        /// pdfcrop executable, for the external backend
        #[arg(long, env = "PAGESLICER_PDFCROP", default_value = "pdfcrop")]
        pdfcrop: PathBuf,

        /// Directory for intermediate files (defaults to the system temp dir)
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },

    /// Show the crops an annotation file produces, without reading any PDF
    Plan {
        /// Annotation file
        annotations: PathBuf,

        /// Target aspect ratio of each crop
        #[arg(short, long, default_value = "3:4")]
        aspect_ratio: AspectRatio,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert screen-space annotations (origin top-left) to page space
    Flip {
        /// PDF the annotations were drawn on
        source: PathBuf,

        /// Annotation file in screen coordinates
        screen_annotations: PathBuf,

        /// Annotation file to write in page coordinates
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// In-process, no external programs required
    Native,
    /// pdftk and pdfcrop
    External,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract {
            source,
            annotations,
            output,
            aspect_ratio,
            backend,
            pdftk,
            pdfcrop,
            scratch_dir,
        } => {
            let ops: Box<dyn PageOperations> = match backend {
                Backend::Native => Box::new(NativeOperations::new()),
                Backend::External => Box::new(
                    ExternalTools::new()
                        .with_pdftk(pdftk)
                        .with_pdfcrop(pdfcrop),
                ),
            };

            let annotations = AnnotationSet::from_path(&annotations)?;
            let token = CancellationToken::new();
            let mut options = ExtractOptions::default()
                .with_aspect_ratio(aspect_ratio)
                .with_cancellation(token.clone());
            if let Some(dir) = scratch_dir {
                options = options.with_scratch_dir(dir);
            }

            let extractor = RegionExtractor::new(ops, options);
            let description = format!("Failed to extract regions from {}", source.display());
            let mut task = tokio::task::spawn_blocking(move || {
                extractor.extract(&source, &annotations, &output)
            });

            let result = tokio::select! {
                joined = &mut task => joined?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, stopping after the current step");
                    token.cancel();
                    task.await?
                }
            };

            let summary = result.context(description)?;
            println!("{summary}");
        }

        Commands::Plan {
            annotations,
            aspect_ratio,
            json,
        } => {
            let set = AnnotationSet::from_path(&annotations)?;
            let plan = CropPlan::build(&set, aspect_ratio)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                for (position, job) in plan.jobs().enumerate() {
                    println!("{:>4}  {}", position + 1, job);
                }
                println!(
                    "{} crops from {} regions on {} pages (aspect ratio {})",
                    plan.job_count(),
                    plan.region_count(),
                    plan.page_count(),
                    plan.aspect_ratio
                );
            }
        }

        Commands::Flip {
            source,
            screen_annotations,
            output,
        } => {
            let screen = AnnotationSet::from_path(&screen_annotations)?;
            let heights = NativeOperations::new()
                .page_heights(&source)
                .with_context(|| format!("Failed to read page sizes from {}", source.display()))?;
            info!("{} has {} pages", source.display(), heights.len());

            let page_space = screen.flip_vertical(&heights)?;
            page_space
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!(
                "Wrote {} boxes on {} pages to {}",
                page_space.box_count(),
                page_space.page_count(),
                output.display()
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "pageslicer=warn",
        1 => "pageslicer=info",
        2 => "pageslicer=debug",
        _ => "pageslicer=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
