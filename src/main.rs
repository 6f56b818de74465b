use clap::{Parser, Subcommand};
use srcset_ladder::imaging::RustBackend;
use srcset_ladder::tier::TierLadder;
use srcset_ladder::{config, generate, markup, output, resolve, scan};
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
struct GenerateArgs {
    /// Source image files
    paths: Vec<PathBuf>,

    /// Directory to discover sources in (default: current directory when no
    /// paths are given)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Descend into subdirectories of the source directory
    #[arg(long)]
    recursive: bool,
}

#[derive(Parser)]
#[command(name = "srcset-ladder")]
#[command(about = "Responsive WebP tier ladders and fallback-aware srcsets")]
#[command(long_about = "\
Responsive WebP tier ladders and fallback-aware srcsets

`generate` turns each source photo into up to five upright, opaque WebP
derivatives. `srcset` and `picture` inspect what exists on storage and build
a complete candidate list, substituting the nearest smaller tier for any
tier that is missing.

Storage layout:

  responsive_images/
  ├── thumb/beach.webp     300w
  ├── small/beach.webp     640w
  ├── medium/beach.webp   1024w
  ├── large/beach.webp    1920w
  └── full/beach.webp     2560w (or native width when smaller)

Tiers are never upscaled: a source narrower than a tier skips it, except
thumb and full which always exist. Existing files are never rewritten, so
re-running over a growing photo set only encodes what is new.

Run 'srcset-ladder gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Derivative output root (overrides `output_root` from the config)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Config file (default: ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the tier ladder for source images
    Generate(GenerateArgs),
    /// Print the resolved srcset for an image
    Srcset {
        /// Base name, or a source file path whose stem is the base name
        name: String,
        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a <picture> element for an image
    Picture {
        /// Base name, or a source file path whose stem is the base name
        name: String,
        /// Fallback <img> src, normally the original file
        #[arg(long)]
        src: String,
        /// Alt text for the fallback <img>
        #[arg(long, default_value = "")]
        alt: String,
    },
    /// List images on storage and which tiers exist for each
    Status {
        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let ladder = TierLadder::canonical();
    // gen-config must work even when the local config.toml is broken
    let load = || -> Result<(config::Config, PathBuf), config::ConfigError> {
        let config = config::load_config(cli.config.as_deref(), Path::new("."))?;
        let output_root = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output_root));
        Ok((config, output_root))
    };

    match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Generate(args) => {
            let (config, output_root) = load()?;
            let mut sources = args.paths.clone();
            if sources.is_empty() || args.source.is_some() {
                let dir = args.source.clone().unwrap_or_else(|| PathBuf::from("."));
                sources.extend(scan::discover_sources(&dir, args.recursive, &output_root)?);
            }

            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_lines(&output::format_generate_event(&event));
                }
            });
            let report = generate::generate_batch(
                &RustBackend::new(),
                &sources,
                &output_root,
                &ladder,
                &config.generate_options(),
                Some(tx),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            output::print_batch_summary(&report);
            if report.has_failures() {
                std::process::exit(1);
            }
        }
        Command::Srcset { name, json } => {
            let (config, output_root) = load()?;
            let Some(descriptor) = resolve::resolve_named(name, &output_root, &ladder) else {
                no_derivatives(name, &output_root);
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
            } else {
                output::print_descriptor(&descriptor);
                println!();
                println!("{}", descriptor.to_srcset(&config.markup.url_prefix));
            }
        }
        Command::Picture { name, src, alt } => {
            let (config, output_root) = load()?;
            let Some(html) = markup::render_picture_for(
                name,
                &output_root,
                &ladder,
                src,
                alt,
                &config.picture_options(),
            ) else {
                no_derivatives(name, &output_root);
            };
            println!("{}", html);
        }
        Command::Status { json } => {
            let (_, output_root) = load()?;
            let entries = scan::inventory(&output_root, &ladder)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                output::print_inventory(&entries, &output_root);
            }
        }
    }

    Ok(())
}

fn no_derivatives(name: &str, output_root: &Path) -> ! {
    eprintln!(
        "No derivatives for '{}' under {}",
        name,
        output_root.display()
    );
    std::process::exit(1);
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
