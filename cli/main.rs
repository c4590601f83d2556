// ========================================================================================
//
//                          The command-line driver: metax
//
// ========================================================================================
//
// Resolves the scoring scheme before touching any gene, loads an aligned gene bundle,
// checks that the bundle carries what the scheme reads, scores it on the rayon pool
// and writes one row per gene. Genes that fail fatally are reported on stderr and the
// run exits non-zero after the remaining rows are out.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::Parser;
use metax::batch::{GeneRecord, score_genes};
use metax::config::RunConfig;
use metax::io::{GeneBundle, write_results};
use metax::scheme::Scheme;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(
    name = "metax",
    version,
    about = "Gene-level association z-scores from expression weights and GWAS summary statistics."
)]
struct Args {
    /// TOML gene bundle with aligned weights, statistic sets and covariance.
    #[clap(value_name = "BUNDLE_PATH")]
    bundle: PathBuf,

    /// TOML run configuration (scheme, threads).
    #[clap(long)]
    config: Option<PathBuf>,

    /// Scoring scheme; overrides the config file.
    /// One of: beta_z, beta_z_and_ref, metaxcan, metaxcan_from_reference.
    #[clap(long)]
    scheme: Option<Scheme>,

    /// Number of worker threads. Defaults to the config file, then all cores.
    #[clap(long)]
    threads: Option<usize>,

    /// Output path for the result table. Writes to stdout when absent.
    #[clap(long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let start_time = Instant::now();

    // --- Phase 1: Configuration. The scheme is fixed before any gene is read. ---
    let config = args.config.as_deref().map(RunConfig::load).transpose()?;
    let scheme = args
        .scheme
        .or(config.as_ref().map(|c| c.scheme))
        .ok_or("No zscore scheme given. Pass --scheme or a config file with `scheme`.")?;
    let threads = args.threads.or(config.as_ref().and_then(|c| c.threads));

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        pool = pool.num_threads(n);
    }
    pool.build_global()?;
    log::info!("Using zscore scheme {scheme}");

    // --- Phase 2: Inputs ---
    let bundle = GeneBundle::load(&args.bundle)?;
    log::info!(
        "Loaded {} genes from {}",
        bundle.genes.len(),
        args.bundle.display()
    );
    bundle.check_scheme(scheme)?;

    // --- Phase 3: Scoring ---
    let outcomes = score_genes(
        scheme.config(),
        &bundle.genes,
        bundle.reference_variances.as_ref(),
    );

    let mut records: Vec<GeneRecord> = Vec::with_capacity(outcomes.len());
    let mut failures = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(e) => {
                log::error!("{e}");
                eprintln!("Skipping gene: {e}");
                failures += 1;
            }
        }
    }

    // --- Phase 4: Output ---
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    write_results(writer, &records)?;

    eprintln!(
        "> Wrote {} rows in {:.2?}.",
        records.len(),
        start_time.elapsed()
    );

    if failures > 0 {
        return Err(format!("{failures} gene(s) could not be scored").into());
    }
    Ok(())
}
