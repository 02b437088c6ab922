use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Prompt/response pair extraction from chat-completion logs
#[derive(Parser, Debug)]
#[command(
    name = "promptpair",
    about = "Extract classified request/response pairs from chat-completion logs",
    version,
    author,
    long_about = "promptpair learns a signature for every prompt type from sample templates, \
                  classifies the requests found in raw chat-completion logs against those \
                  signatures and stores each completed request/response pair under its type."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build prompt-type signatures from sample templates",
        long_about = "Reads every `<type>.prompt` template below the prompts directory, derives \
                      the instruction markers shared by all samples of a type and writes one \
                      signature artifact per type.\n\n\
                      Examples:\n  \
                      promptpair signatures\n  \
                      promptpair signatures --prompts-dir game/prompts --types-dir prompt_types\n  \
                      promptpair signatures --exceptions-file exceptions.json --format json"
    )]
    Signatures(SignaturesArgs),

    #[command(
        about = "Pair, classify and store requests and responses from logs",
        long_about = "Discovers request and response logs below the log directories, classifies \
                      every request, pairs it with its response and writes both payloads under \
                      `<output>/request/<type>/<id>` and `<output>/response/<type>/<id>`.\n\n\
                      Examples:\n  \
                      promptpair extract\n  \
                      promptpair extract --log-dir logs/session_1 --log-dir logs/session_2\n  \
                      promptpair extract --output-dir data --format yaml"
    )]
    Extract(ExtractArgs),

    #[command(
        about = "Classify a single prompt file",
        long_about = "Classifies the text of one file against the stored signatures. A file \
                      holding a chat-completion request body is reduced to its message contents \
                      first.\n\n\
                      Examples:\n  \
                      promptpair classify prompt.txt\n  \
                      promptpair classify request.json --format json"
    )]
    Classify(ClassifyArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct SignaturesArgs {
    #[arg(long, value_name = "DIR", help = "Directory of sample `*.prompt` templates")]
    pub prompts_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Directory to write signature artifacts to")]
    pub types_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "JSON list of templates without a system block"
    )]
    pub exceptions_file: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(
        short = 'l',
        long = "log-dir",
        value_name = "DIR",
        help = "Base directory searched for logs (repeatable)"
    )]
    pub log_dirs: Vec<PathBuf>,

    #[arg(short = 'o', long, value_name = "DIR", help = "Output root")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Directory of signature artifacts")]
    pub types_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Extra variant phrases per prompt type")]
    pub variants_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SCORE",
        help = "Minimum marker score for a classification, in (0, 1]"
    )]
    pub min_confidence: Option<f64>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(value_name = "FILE", help = "File holding the prompt text")]
    pub file: PathBuf,

    #[arg(long, value_name = "DIR", help = "Directory of signature artifacts")]
    pub types_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Extra variant phrases per prompt type")]
    pub variants_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SCORE",
        help = "Minimum marker score for a classification, in (0, 1]"
    )]
    pub min_confidence: Option<f64>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_extract_args() {
        let args = CliArgs::parse_from(["promptpair", "extract"]);
        match args.command {
            Commands::Extract(extract_args) => {
                assert_eq!(extract_args.format, OutputFormatArg::Human);
                assert!(extract_args.log_dirs.is_empty());
                assert!(extract_args.output_dir.is_none());
                assert!(extract_args.min_confidence.is_none());
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_extract_with_options() {
        let args = CliArgs::parse_from([
            "promptpair",
            "extract",
            "--log-dir",
            "logs/a",
            "-l",
            "logs/b",
            "--output-dir",
            "out",
            "--variants-file",
            "variants.json",
            "--min-confidence",
            "0.8",
            "--format",
            "json",
        ]);

        match args.command {
            Commands::Extract(extract_args) => {
                assert_eq!(
                    extract_args.log_dirs,
                    vec![PathBuf::from("logs/a"), PathBuf::from("logs/b")]
                );
                assert_eq!(extract_args.output_dir, Some(PathBuf::from("out")));
                assert_eq!(
                    extract_args.variants_file,
                    Some(PathBuf::from("variants.json"))
                );
                assert_eq!(extract_args.min_confidence, Some(0.8));
                assert_eq!(extract_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_signatures_command() {
        let args = CliArgs::parse_from([
            "promptpair",
            "signatures",
            "--prompts-dir",
            "prompts",
            "--exceptions-file",
            "exceptions.json",
        ]);
        match args.command {
            Commands::Signatures(sig_args) => {
                assert_eq!(sig_args.prompts_dir, Some(PathBuf::from("prompts")));
                assert!(sig_args.types_dir.is_none());
                assert_eq!(
                    sig_args.exceptions_file,
                    Some(PathBuf::from("exceptions.json"))
                );
            }
            _ => panic!("Expected Signatures command"),
        }
    }

    #[test]
    fn test_classify_requires_file() {
        assert!(CliArgs::try_parse_from(["promptpair", "classify"]).is_err());

        let args = CliArgs::parse_from(["promptpair", "classify", "prompt.txt", "-f", "yaml"]);
        match args.command {
            Commands::Classify(classify_args) => {
                assert_eq!(classify_args.file, PathBuf::from("prompt.txt"));
                assert_eq!(classify_args.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Classify command"),
        }
    }

    #[test]
    fn test_global_verbose_flag() {
        let args = CliArgs::parse_from(["promptpair", "-v", "extract"]);
        assert!(args.verbose);
        assert!(!args.quiet);
    }

    #[test]
    fn test_global_quiet_flag() {
        let args = CliArgs::parse_from(["promptpair", "extract", "-q"]);
        assert!(!args.verbose);
        assert!(args.quiet);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["promptpair", "-v", "-q", "extract"]).is_err());
    }

    #[test]
    fn test_log_level_flag() {
        let args = CliArgs::parse_from(["promptpair", "--log-level", "debug", "signatures"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
