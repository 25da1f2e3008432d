//! CLI application for swapping eyes in a photo.
//!
//! Usage:
//!   eye-swap <image> --style googly                     # write eye-swapped-googly.jpg
//!   eye-swap <image> --landmarks faces.json -o out.png  # use recorded landmarks
//!   eye-swap --list-styles                              # show the decal catalog

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use eye_swap::{
    download_filename, Config, DetectorHandle, DirectoryStore, EyeSwapper, ImageStore,
    OutputFormat, RecordedLandmarks,
};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "eye-swap")]
#[command(author, version, about = "Stamp decal eyes over the eyes in a photo", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required_unless_present = "list_styles")]
    image: Option<PathBuf>,

    /// Decal style id (default: first style in the catalog)
    #[arg(short, long)]
    style: Option<String>,

    /// JSON file with recorded landmarks instead of running the detector
    #[arg(short, long)]
    landmarks: Option<PathBuf>,

    /// Configuration file (YAML)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Output file (default: generated download name in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output encoding (overrides the configuration)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Eye box padding factor (overrides the configuration)
    #[arg(short, long)]
    padding: Option<f32>,

    /// Also store the composite in this directory
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// List available decal styles and exit
    #[arg(long)]
    list_styles: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Png => OutputFormat::Png,
        }
    }
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(filter));

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    if let Some(padding) = args.padding {
        config.padding = padding;
    }
    if let Some(format) = args.format {
        config.output.format = format.into();
    }
    config.validate()?;
    Ok(config)
}

fn detector(args: &Args, config: &Config) -> Result<DetectorHandle, Box<dyn std::error::Error>> {
    if let Some(path) = &args.landmarks {
        info!("Using recorded landmarks from {}", path.display());
        let recorded = RecordedLandmarks::from_file(path)?;
        return Ok(DetectorHandle::from_provider("recorded", recorded));
    }

    builtin_detector(config)
}

#[cfg(feature = "rustface")]
fn builtin_detector(config: &Config) -> Result<DetectorHandle, Box<dyn std::error::Error>> {
    Ok(DetectorHandle::initialize(&config.detector)?)
}

#[cfg(not(feature = "rustface"))]
fn builtin_detector(_config: &Config) -> Result<DetectorHandle, Box<dyn std::error::Error>> {
    Err("built without a face detector; pass --landmarks".into())
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;

    if args.list_styles {
        for style in config.load_catalog()?.styles() {
            println!("{:<12} {}", style.id, style.display_name);
        }
        return Ok(());
    }

    let image_path = args.image.as_ref().ok_or("no input image given")?;
    let swapper = EyeSwapper::from_config(detector(args, &config)?, &config)?;
    let style_id = match &args.style {
        Some(id) => id.clone(),
        None => swapper.catalog().default_style().id.clone(),
    };

    let source = std::fs::read(image_path)?;
    info!("Swapping eyes in {} with style {:?}", image_path.display(), style_id);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(swapper.swap(source, &style_id))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(download_filename(&result)));
    eye_swap::export::save(&result, &output)?;
    info!(
        "Wrote {} ({}x{}, {} face(s))",
        output.display(),
        result.width,
        result.height,
        result.num_faces()
    );

    if let Some(dir) = &args.store_dir {
        let store = DirectoryStore::new(dir)?;
        let url = store.store(&download_filename(&result), &result.data)?;
        println!("{}", url);
    }

    Ok(())
}
