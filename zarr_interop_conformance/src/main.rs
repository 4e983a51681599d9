//! Fixture generation and verification binary.
//!
//! `generate` writes one fixture tree per layout (zarr-v2 flat, zarr-v2
//! nested, n5) under the output directory, one dataset per codec, all from
//! the deterministic reference array. `verify` re-derives the reference and
//! reads a fixture tree back, failing with a non-zero exit status on the
//! first mismatch.

mod reference;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use zarr_interop::dataset::Layout;
use zarr_interop::fixture::{write_fixture, FixtureConfig};
use zarr_interop::verify::verify_dataset;
use zarr_interop_storage::{FilesystemStore, ListableStorageTraits};

use reference::{reference_array, REFERENCE_CHUNK_SHAPE};

/// Command-line arguments for the conformance binary.
#[derive(Parser, Debug)]
#[command(name = "zarr-interop-conformance")]
#[command(about = "Generate and verify chunked-array interoperability fixtures")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the fixture trees for every supported layout.
    Generate {
        /// Output directory for the fixture trees.
        #[arg(long)]
        out: PathBuf,
        /// Codec identifiers to generate, overriding the per-layout defaults.
        #[arg(long, value_delimiter = ',')]
        codecs: Option<Vec<String>>,
        /// Erase existing datasets rather than failing.
        #[arg(long)]
        overwrite: bool,
        /// Encode and write chunks in parallel.
        #[arg(long)]
        parallel: bool,
    },
    /// Read a fixture tree back and check it against the reference array.
    Verify {
        /// Path of the fixture tree (a `*.zr` or `*.n5` directory).
        #[arg(long)]
        path: PathBuf,
        /// A single dataset to verify; all datasets in the tree by default.
        #[arg(long)]
        dataset: Option<String>,
    },
}

/// The generated fixture trees: directory name and layout.
const TREES: [(&str, Layout); 3] = [
    ("zarr_interop_flat.zr", Layout::zarr_v2_flat()),
    ("zarr_interop_nested.zr", Layout::zarr_v2_nested()),
    ("zarr_interop.n5", Layout::n5()),
];

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            out,
            codecs,
            overwrite,
            parallel,
        } => generate(&out, codecs, overwrite, parallel),
        Command::Verify { path, dataset } => verify(&path, dataset),
    }
}

fn generate(
    out: &Path,
    codecs: Option<Vec<String>>,
    overwrite: bool,
    parallel: bool,
) -> anyhow::Result<()> {
    let array = reference_array();
    for (name, layout) in TREES {
        let tree = out.join(name);
        let storage = Arc::new(
            FilesystemStore::new(&tree)
                .with_context(|| format!("opening store {}", tree.display()))?,
        );
        let mut config = FixtureConfig::new(layout, REFERENCE_CHUNK_SHAPE.to_vec());
        if let Some(codecs) = &codecs {
            config.codecs.clone_from(codecs);
        }
        config.overwrite = overwrite;
        config.parallel = parallel;

        write_fixture(&storage, &array, &config)
            .with_context(|| format!("generating {}", tree.display()))?;
        println!("wrote {} ({})", tree.display(), config.codecs.join(", "));
    }
    Ok(())
}

fn verify(path: &Path, dataset: Option<String>) -> anyhow::Result<()> {
    let storage = Arc::new(
        FilesystemStore::new(path)
            .with_context(|| format!("opening store {}", path.display()))?,
    );

    let datasets = match dataset {
        Some(dataset) => vec![dataset],
        None => discover_datasets(&storage)?,
    };
    anyhow::ensure!(
        !datasets.is_empty(),
        "no datasets found under {}",
        path.display()
    );

    let array = reference_array();
    for dataset in datasets {
        verify_dataset(storage.clone(), &dataset, &array)
            .with_context(|| format!("verifying {} in {}", dataset, path.display()))?;
        println!("verified {dataset}");
    }
    Ok(())
}

/// Find every dataset in the tree by its metadata document.
///
/// The n5 root `attributes.json` is a version document, not a dataset.
fn discover_datasets(storage: &Arc<FilesystemStore>) -> anyhow::Result<Vec<String>> {
    let mut datasets = Vec::new();
    for key in storage.list()? {
        let key = key.as_str();
        if let Some(path) = key
            .strip_suffix("/.zarray")
            .or_else(|| key.strip_suffix("/attributes.json"))
        {
            datasets.push(path.to_string());
        }
    }
    Ok(datasets)
}
