use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use bvr_search::app_state::{AppState, SearchRequest};
use bvr_search::config::SearchConfig;
use bvr_search::data::{self, FsAccess};
use bvr_search::overlay::{self, DisplayOptions};

#[derive(Parser, Debug)]
#[command(name = "bvr_search", about = "Index object detections in image folders and search them by class")]
struct Args {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file, defaults to $BVR_SEARCH_CONFIG or ~/.config/bvr/search.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the detector over a folder and save its metadata
    Process {
        dir: PathBuf,
        /// Class names file, one per line or a `{0: 'name'}` dictionary
        #[arg(long)]
        names: Option<PathBuf>,
        /// Folder holding the YOLO label files, defaults to `<dir>/labels`
        #[arg(long)]
        labels_dir: Option<PathBuf>,
        /// Process images on all cores
        #[arg(long)]
        parallel: bool,
    },

    /// List the classes in a metadata file and the counts seen for each
    Index {
        /// Metadata file, or the source folder it was generated from
        metadata: PathBuf,
    },

    /// Find images containing the selected classes
    Search {
        /// Metadata file, or the source folder it was generated from
        metadata: PathBuf,
        #[arg(long = "class", required = true)]
        classes: Vec<String>,
        /// `any` (OR) or `all` (AND)
        #[arg(long, default_value = "any")]
        mode: String,
        /// Per-class cap such as `cat=2` or `dog=None`
        #[arg(long = "max", value_parser = parse_key_val)]
        max: Vec<(String, String)>,
        /// Write annotated copies of the matching images here
        #[arg(long)]
        render_dir: Option<PathBuf>,
        /// TTF/OTF font for box labels
        #[arg(long)]
        font: Option<PathBuf>,
        #[arg(long)]
        no_boxes: bool,
        /// Also draw boxes of unselected classes
        #[arg(long)]
        no_highlight: bool,
        /// Write the matching records as JSON
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CLASS=N, got '{}'", raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = SearchConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let state = AppState::new();

    match args.command {
        Command::Process {
            dir,
            names,
            labels_dir,
            parallel,
        } => cmd_process(&state, config, &dir, names, labels_dir, parallel),
        Command::Index { metadata } => cmd_index(&state, &metadata),
        Command::Search {
            metadata,
            classes,
            mode,
            max,
            render_dir,
            font,
            no_boxes,
            no_highlight,
            export,
        } => {
            let request = SearchRequest {
                selected_classes: classes,
                mode,
                thresholds: max.into_iter().collect::<BTreeMap<_, _>>(),
            };
            let options = DisplayOptions {
                show_boxes: !no_boxes,
                highlight_matches: !no_highlight,
                show_labels: font.is_some(),
                ..Default::default()
            };
            cmd_search(&state, &metadata, &request, &options, render_dir.as_deref(), font.as_deref(), export.as_deref())
        }
    }
}

fn cmd_process(
    state: &AppState,
    mut config: SearchConfig,
    dir: &Path,
    names: Option<PathBuf>,
    labels_dir: Option<PathBuf>,
    parallel: bool,
) -> Result<()> {
    if names.is_some() {
        config.model.names_path = names;
    }
    if labels_dir.is_some() {
        config.model.labels_dir = labels_dir;
    }
    config.parallel |= parallel;

    let detector = bvr_search::init_detector(&config)?;
    let (report, saved) = state
        .process_directory(dir, &detector, &config.run_options())
        .with_context(|| format!("failed to process {}", dir.display()))?;

    println!("Processed {} images, metadata saved to {}", report.records.len(), saved.display());
    for failure in &report.failures {
        println!("  skipped {}: {}", failure.path.display(), failure.cause);
    }
    Ok(())
}

fn cmd_index(state: &AppState, metadata: &Path) -> Result<()> {
    let snapshot = state.load_metadata(metadata)?;
    if snapshot.index.is_empty() {
        println!("No classes found in {} images", snapshot.collection.len());
        return Ok(());
    }

    println!("{} images, {} classes", snapshot.collection.len(), snapshot.index.unique_classes.len());
    for label in &snapshot.index.unique_classes {
        let counts: Vec<String> = snapshot.index.options_for(label).iter().map(u32::to_string).collect();
        println!("  {:<24} counts: {}", label, counts.join(", "));
    }
    Ok(())
}

fn cmd_search(
    state: &AppState,
    metadata: &Path,
    request: &SearchRequest,
    options: &DisplayOptions,
    render_dir: Option<&Path>,
    font: Option<&Path>,
    export: Option<&Path>,
) -> Result<()> {
    state.load_metadata(metadata)?;
    let result = state.search(request)?;

    println!("{}", result.summary());
    for row in overlay::grid_rows(&result.records, options.grid_columns) {
        let cards: Vec<String> = row
            .iter()
            .map(|record| overlay::caption(record, &result.spec).replace('\n', ": "))
            .collect();
        println!("  {}", cards.join("  |  "));
    }

    if let Some(out_path) = export {
        let json = data::export_results(&result)?;
        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            FsAccess::create_directory(parent)?;
        }
        std::fs::write(out_path, json).with_context(|| format!("failed to write {}", out_path.display()))?;
        println!("Exported {} records to {}", result.len(), out_path.display());
    }

    if let Some(out_dir) = render_dir {
        let font = font.map(load_font).transpose()?;
        let rendered = overlay::render_to_dir(&result, options, font.as_ref(), out_dir)?;
        for (record, outcome) in result.records.iter().zip(rendered) {
            match outcome {
                Ok(path) => log::debug!("Rendered {} to {}", record.image_path, path.display()),
                Err(e) => log::warn!("Error loading image {}: {}", record.image_path, e),
            }
        }
    }
    Ok(())
}

fn load_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
    FontArc::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))
}
