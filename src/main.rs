use promptpair::cli::commands::{CliArgs, Commands};
use promptpair::cli::handlers::{handle_classify, handle_extract, handle_signatures};
use promptpair::util::logging::{init_logging, parse_level, LoggingConfig};
use promptpair::VERSION;

use clap::Parser;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("promptpair v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Signatures(signatures_args) => handle_signatures(signatures_args, args.quiet),
        Commands::Extract(extract_args) => handle_extract(extract_args, args.quiet),
        Commands::Classify(classify_args) => handle_classify(classify_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level_override = if let Some(level_str) = &args.log_level {
        Some(parse_level(level_str))
    } else if args.verbose {
        Some(Level::DEBUG)
    } else if args.quiet {
        Some(Level::ERROR)
    } else {
        None
    };

    let mut config = LoggingConfig {
        include_target: true,
        ..LoggingConfig::from_env()
    };
    if let Some(level) = level_override {
        config.level = level;
    }
    init_logging(config);
}
