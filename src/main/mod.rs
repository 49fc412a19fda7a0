use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cisgrn::{
    commands::{
        cisgrn_annotate, cisgrn_background, cisgrn_empirical, cisgrn_enrich, cisgrn_infer,
        cisgrn_perturb, cisgrn_promoters, cisgrn_rank, cisgrn_shuffle, BackgroundOutputs,
        InferenceOptions,
    },
    prelude::*,
    DEFAULT_ALPHA, DEFAULT_CLUSTER, DEFAULT_CLUSTER_COLUMN, DEFAULT_FIMO_BINARY,
    DEFAULT_FIRST_SAMPLE_COLUMN, DEFAULT_ID_COLUMN, DEFAULT_IMPORTANCE_THRESHOLD,
    DEFAULT_SEED, DEFAULT_SHUFFLE_ROUNDS, DEFAULT_THREADS, DEFAULT_TOP_HIGHLIGHT,
    DEFAULT_TOP_REMOVALS,
};
use log::{warn, Level};

#[cfg(feature = "dev-commands")]
use cisgrn::commands::cisgrn_random_network;

const INFO: &str = "\
cisgrn: promoter motif enrichment and gene regulatory network analysis
usage: cisgrn [--help] <subcommand>

Subcommands:

  background: select an expression-matched background gene set and its promoters.
  promoters:  extract the promoter sequences of a list of genes.
  infer:      infer a gene regulatory network from expression data.
  annotate:   join FIMO hits with promoter sequences and GFF3 gene locations.
  enrich:     test motifs for enrichment against a background (Fisher's exact test).
  shuffle:    write shuffled promoter controls and scan them with FIMO.
  empirical:  test motif scores against the shuffled controls.
  perturb:    remove the highest-degree nodes of a GRN and measure fragmentation.
  rank:       rank removals by how much they fragment the network.

";

#[derive(Parser)]
#[clap(name = "cisgrn")]
#[clap(about = INFO)]
struct Cli {
    /// increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Expression table column options.
#[derive(Args, Clone, Debug)]
struct LayoutArgs {
    /// the column holding gene IDs
    #[arg(long, default_value = DEFAULT_ID_COLUMN)]
    id_column: String,

    /// the column holding cluster labels
    #[arg(long, default_value = DEFAULT_CLUSTER_COLUMN)]
    cluster_column: String,

    /// the first sample column (0-indexed); samples run up to the last column
    #[arg(long, default_value_t = DEFAULT_FIRST_SAMPLE_COLUMN)]
    first_sample_column: usize,

    /// select sample columns whose name contains this text instead (repeatable)
    #[arg(long = "sample-pattern")]
    sample_patterns: Vec<String>,
}

impl LayoutArgs {
    fn layout(&self) -> ExpressionLayout {
        let samples = if self.sample_patterns.is_empty() {
            SampleColumns::Positional {
                first: self.first_sample_column,
            }
        } else {
            SampleColumns::Matching(self.sample_patterns.clone())
        };
        ExpressionLayout {
            id_column: self.id_column.clone(),
            cluster_column: Some(self.cluster_column.clone()),
            samples,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    Background {
        /// a delimited expression table (CSV if the name ends in .csv, TSV otherwise)
        #[arg(required = true)]
        expression: PathBuf,

        /// the foreground cluster label
        #[arg(long, default_value = DEFAULT_CLUSTER)]
        cluster: String,

        /// a genome-wide promoter FASTA
        #[arg(long, required = true)]
        promoters: PathBuf,

        /// the output background gene ID list
        #[arg(long, required = true)]
        ids_out: PathBuf,

        /// the output background promoter FASTA
        #[arg(long, required = true)]
        fasta_out: PathBuf,

        /// a MEME-format motif file, to scan the background promoters with FIMO
        #[arg(long)]
        motifs: Option<PathBuf>,

        /// the FIMO output directory (FIMO runs only if this and --motifs are set)
        #[arg(long)]
        fimo_out: Option<PathBuf>,

        /// the FIMO binary
        #[arg(long, default_value = DEFAULT_FIMO_BINARY)]
        fimo: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    Promoters {
        /// a text file of gene IDs, one per line
        #[arg(required = true)]
        gene_ids: PathBuf,

        /// a genome-wide promoter FASTA
        #[arg(long, required = true)]
        promoters: PathBuf,

        /// the locus ID regular expression (Arabidopsis AGI loci by default)
        #[arg(long)]
        pattern: Option<String>,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Infer {
        /// a delimited expression table (CSV if the name ends in .csv, TSV otherwise)
        #[arg(required = true)]
        expression: PathBuf,

        /// a TSV transcription factor list with a Gene_ID column
        #[arg(long, required = true)]
        tfs: PathBuf,

        /// strip version suffixes (e.g. .1) from the transcription factor IDs
        #[arg(long)]
        strip_versions: bool,

        /// drop genes and transcription factors without expression variation
        #[arg(long)]
        drop_invariant: bool,

        /// the random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// the number of worker threads
        #[arg(long, default_value_t = DEFAULT_THREADS)]
        threads: usize,

        /// an optional output TSV (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    Annotate {
        /// a FIMO fimo.tsv output
        #[arg(required = true)]
        fimo_tsv: PathBuf,

        /// the promoter FASTA that was scanned
        #[arg(long, required = true)]
        promoters: PathBuf,

        /// a GFF3 genome annotation
        #[arg(long, required = true)]
        gff: PathBuf,

        /// an optional output CSV (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Enrich {
        /// the foreground FIMO fimo.tsv
        #[arg(long, required = true)]
        foreground: PathBuf,

        /// the background FIMO fimo.tsv
        #[arg(long, required = true)]
        background: PathBuf,

        /// the FDR level for the enriched motif list
        #[arg(long, default_value_t = DEFAULT_ALPHA)]
        alpha: f64,

        /// an optional output CSV (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// write the significantly enriched motif IDs here
        #[arg(long)]
        enriched_ids: Option<PathBuf>,
    },
    Shuffle {
        /// the real promoter FASTA
        #[arg(required = true)]
        promoters: PathBuf,

        /// the directory for shuffled FASTAs and FIMO outputs
        #[arg(long, required = true)]
        control_dir: PathBuf,

        /// the number of shuffled rounds
        #[arg(long, default_value_t = DEFAULT_SHUFFLE_ROUNDS)]
        rounds: usize,

        /// a random seed; round i is seeded with seed + i
        #[arg(long)]
        seed: Option<u64>,

        /// a MEME-format motif file
        #[arg(long)]
        motifs: Option<PathBuf>,

        /// the FIMO binary
        #[arg(long, default_value = DEFAULT_FIMO_BINARY)]
        fimo: PathBuf,

        /// only write the shuffled FASTAs
        #[arg(long)]
        skip_fimo: bool,
    },
    Empirical {
        /// the directory written by `cisgrn shuffle`
        #[arg(required = true)]
        control_dir: PathBuf,

        /// the real FIMO fimo.tsv (default: <control_dir>/fimo_real/fimo.tsv)
        #[arg(long)]
        real: Option<PathBuf>,

        /// the number of shuffled rounds to look for
        #[arg(long, default_value_t = DEFAULT_SHUFFLE_ROUNDS)]
        rounds: usize,

        /// the FDR level
        #[arg(long, default_value_t = DEFAULT_ALPHA)]
        alpha: f64,

        /// an optional output CSV (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// write the significant motifs scoring above the shuffled mean here
        #[arg(long)]
        filtered_output: Option<PathBuf>,
    },
    Perturb {
        /// a TSV GRN edge list (TF, target, importance)
        #[arg(required = true)]
        network: PathBuf,

        /// keep edges with importance strictly above this
        #[arg(long, default_value_t = DEFAULT_IMPORTANCE_THRESHOLD)]
        threshold: f64,

        /// the number of highest-degree nodes to remove
        #[arg(long, default_value_t = DEFAULT_TOP_REMOVALS)]
        top: usize,

        /// an optional output CSV (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Rank {
        /// a perturbation CSV written by `cisgrn perturb`
        #[arg(required = true)]
        perturbation: PathBuf,

        /// the number of most disruptive removals to label
        #[arg(long, default_value_t = DEFAULT_TOP_HIGHLIGHT)]
        top: usize,

        /// an optional output CSV (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    #[cfg(feature = "dev-commands")]
    RandomNetwork {
        /// number of genes
        #[arg(long, required = true)]
        genes: usize,

        /// number of edges
        #[arg(long, required = true)]
        edges: usize,

        /// the random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    }
}

fn run() -> Result<(), CisGrnError> {
    let cli = Cli::parse();
    simple_logger::init_with_level(log_level(cli.verbose))?;

    let result = match &cli.command {
        Some(Commands::Background {
            expression,
            cluster,
            promoters,
            ids_out,
            fasta_out,
            motifs,
            fimo_out,
            fimo,
            layout,
        }) => {
            let outputs = BackgroundOutputs {
                gene_ids: ids_out.clone(),
                promoters: fasta_out.clone(),
                fimo_dir: fimo_out.clone(),
            };
            cisgrn_background(
                expression,
                &layout.layout(),
                cluster,
                promoters,
                &outputs,
                motifs.as_ref(),
                &FimoRunner::new(fimo),
            )
        }
        Some(Commands::Promoters {
            gene_ids,
            promoters,
            pattern,
            output,
        }) => {
            let pattern = match pattern {
                Some(pattern) => GeneIdPattern::new(pattern)?,
                None => GeneIdPattern::default(),
            };
            cisgrn_promoters(gene_ids, promoters, &pattern, output.as_ref())
        }
        Some(Commands::Infer {
            expression,
            tfs,
            strip_versions,
            drop_invariant,
            seed,
            threads,
            output,
            layout,
        }) => {
            let options = InferenceOptions {
                layout: layout.layout(),
                strip_versions: *strip_versions,
                drop_invariant: *drop_invariant,
                params: InferenceParams {
                    seed: *seed,
                    ..Default::default()
                },
                threads: *threads,
            };
            cisgrn_infer(expression, tfs, &options, output.as_ref())
        }
        Some(Commands::Annotate {
            fimo_tsv,
            promoters,
            gff,
            output,
        }) => cisgrn_annotate(fimo_tsv, promoters, gff, output.as_ref()),
        Some(Commands::Enrich {
            foreground,
            background,
            alpha,
            output,
            enriched_ids,
        }) => cisgrn_enrich(
            foreground,
            background,
            output.as_ref(),
            enriched_ids.as_ref(),
            *alpha,
        ),
        Some(Commands::Shuffle {
            promoters,
            control_dir,
            rounds,
            seed,
            motifs,
            fimo,
            skip_fimo,
        }) => cisgrn_shuffle(
            promoters,
            control_dir,
            *rounds,
            *seed,
            motifs.as_ref(),
            &FimoRunner::new(fimo),
            *skip_fimo,
        ),
        Some(Commands::Empirical {
            control_dir,
            real,
            rounds,
            alpha,
            output,
            filtered_output,
        }) => cisgrn_empirical(
            control_dir,
            real.as_ref(),
            *rounds,
            *alpha,
            output.as_ref(),
            filtered_output.as_ref(),
        ),
        Some(Commands::Perturb {
            network,
            threshold,
            top,
            output,
        }) => {
            let params = RobustnessParams {
                threshold: *threshold,
                top: *top,
            };
            cisgrn_perturb(network, &params, output.as_ref())
        }
        Some(Commands::Rank {
            perturbation,
            top,
            output,
        }) => cisgrn_rank(perturbation, *top, output.as_ref()),
        #[cfg(feature = "dev-commands")]
        Some(Commands::RandomNetwork {
            genes,
            edges,
            seed,
            output,
        }) => cisgrn_random_network(*genes, *edges, *seed, output.as_ref()),
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };
    let (_, report) = result?.into_parts();
    for issue in report.issues() {
        warn!("{}", issue);
    }
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
