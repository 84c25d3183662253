use clap::{Parser, ValueEnum};

/// Short-read simulator backend used to build the synthetic replicates.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum Simulator {
    #[default]
    Wgsim,
    Art,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tesim-pipelines", version)]
pub struct Arguments {

    #[arg(short, long, help = "Pipeline module to run: simulation or teflon")]
    pub module: String,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(short = 'r', long, help = "Reference genome sequence in fasta format")]
    pub reference: Option<String>,

    #[arg(short = 'c', long, help = "Consensus sequences of the TEs for the species in fasta format")]
    pub consensus: Option<String>,

    #[arg(short = 'g', long, help = "Locations of known TEs in the reference genome in GFF 3 format")]
    pub locations: Option<String>,

    #[arg(short = 't', long, help = "Tab delimited file mapping GFF IDs to TE families")]
    pub taxonomy: Option<String>,

    #[arg(short = 'j', long = "config", help = "JSON file with the mcclintock and teflon tool sections")]
    pub tool_config: String,

    #[arg(short = 'p', long = "proc", default_value_t = 1, help = "Processors to use for parallel stages of the wrapped tools")]
    pub threads: usize,

    #[arg(short = 'o', long = "out", help = "Output folder for the run. Defaults to the current directory.")]
    pub out_dir: Option<String>,

    #[arg(short = 'C', long, default_value_t = 100, help = "Target genome coverage for the simulated reads")]
    pub coverage: u64,

    #[arg(short = 'l', long, default_value_t = 101, help = "Read length of the simulated reads")]
    pub length: u64,

    #[arg(short = 'i', long, default_value_t = 300, help = "Median insert size of the simulated reads")]
    pub insert: u64,

    #[arg(short = 'e', long, default_value_t = 0.01, help = "Base error rate for the simulated reads")]
    pub error: f64,

    #[arg(short = 'k', long, default_value = "general", help = "Which intermediate files are preserved after the analysis pipeline completes")]
    pub keep_intermediate: String,

    #[arg(long, default_value_t = 1, help = "First replicate index")]
    pub start: u32,

    #[arg(long, default_value_t = 1, help = "Last replicate index (inclusive)")]
    pub end: u32,

    #[arg(long, help = "Seed for the random number generator so runs can be replicated")]
    pub seed: Option<String>,

    #[arg(long, default_value = "", help = "String prepended to output files so concurrent batches do not clash")]
    pub runid: String,

    #[arg(long = "sim", default_value = "wgsim", value_enum)]
    pub simulator: Simulator,

    #[arg(short = 's', long, action, help = "Run the simulation in single ended mode")]
    pub single: bool,

    #[arg(long, default_value_t = 2, help = "Which version of the analysis pipeline to use (1 or 2)")]
    pub mcc_version: u8,

    // teflon module inputs
    #[arg(long, help = "Alignment file for the teflon module")]
    pub bam: Option<String>,

    #[arg(long, help = "Directory holding the teflon stage scripts")]
    pub script_dir: Option<String>,

    #[arg(long, help = "Log file appended to by each teflon stage")]
    pub log: Option<String>,

    #[arg(long, help = "Status file gating the teflon chain")]
    pub status_log: Option<String>,

    #[arg(long, help = "Final output artifact expected by the build graph")]
    pub output: Option<String>,
}
