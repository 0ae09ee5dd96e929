use chord::config::Config;
use log::error;
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "chord",
    version = "0.1",
    about = "Distributed hash table node based on Chord"
)]
struct Opt {
    /// Path to a custom config file
    #[structopt(short = "c", parse(from_os_str))]
    config: PathBuf,

    /// Address of a bootstrapping peer
    #[structopt(short = "b")]
    bootstrap: Option<String>,

    /// Silence all output
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,

    /// Level of verbosity (v, vv, vvv)
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: usize,

    /// Timestamp (sec, ms, ns, none)
    #[structopt(short = "t")]
    timestamp: Option<stderrlog::Timestamp>,
}

fn main() {
    let opt = Opt::from_args();

    // init logger with verbosity flag
    stderrlog::new()
        .module(module_path!())
        .quiet(opt.quiet)
        .verbosity(opt.verbose)
        .timestamp(opt.timestamp.unwrap_or(stderrlog::Timestamp::Off))
        .init()
        .expect("Failed to initialize logger");

    let config = Config::load_from_file(&opt.config).unwrap_or_else(|err| {
        error!("Error while loading config file: {}", err);
        process::exit(2);
    });

    if let Err(e) = chord::run(config, opt.bootstrap) {
        error!("Fatal application error: {}", e);
        process::exit(1);
    }
}
