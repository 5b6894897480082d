use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

use bookgen_adapters::{create_image_provider, create_text_adapter, AdapterError};
use bookgen_core::{
    BookError, BookRequest, BookService, Config, ConfigError, ConfigStore, FileLogSink,
    GenerationError, GenerationRequest, ImageRequest, LogLevel, LogRecord, LogSink, PromptError,
    PromptRegistry, StdoutLogSink, TextGenerator,
};

const TEST_PROMPT: &str = "Hello, this is a test message.";
const TEST_MAX_TOKENS: u32 = 10;

fn main() {
    if let Err(err) = run() {
        // errors share the JSON surface of the regular command output
        println!("{}", json!({ "error": err.to_string() }));
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let mut store = ConfigStore::open(cli.config.clone())?;
    store.config_mut().apply_env();

    let sink: Box<dyn LogSink> = match cli.log_file.as_ref() {
        Some(path) => Box::new(FileLogSink::create(path).map_err(|source| CliError::LogFile {
            path: path.clone(),
            source,
        })?),
        None => Box::new(StdoutLogSink::new()),
    };

    match cli.command {
        Command::Text(args) => run_text(store.config(), args),
        Command::Image(args) => run_image(store.config(), args),
        Command::Book(args) => run_book(store.config(), args, sink.as_ref()),
        Command::Test => run_test(store.config(), sink.as_ref()),
    }
}

fn run_text(config: &Config, args: TextArgs) -> Result<(), CliError> {
    let adapter = create_text_adapter(&config.llm)?;
    let request = GenerationRequest::new(args.prompt, config.llm.max_tokens, config.llm.temperature);
    let text = adapter.generate(&request)?;
    print_json(&json!({ "text": text }))
}

fn run_image(config: &Config, args: ImageArgs) -> Result<(), CliError> {
    let provider = create_image_provider(&config.images)?;
    let request = ImageRequest::for_prompt(args.prompt);
    print_json(&json!({ "image_url": provider.image_url(&request) }))
}

fn run_book(config: &Config, args: BookArgs, sink: &dyn LogSink) -> Result<(), CliError> {
    let adapter = create_text_adapter(&config.llm)?;
    let images = create_image_provider(&config.images)?;
    let prompts = PromptRegistry::from_prompt_config(&config.prompts)?;
    let service = BookService::new(&prompts, sink);

    let language = args
        .language
        .unwrap_or_else(|| config.book.language.clone());
    let request = BookRequest::from_comma_separated(args.author, &args.topics, language);

    let book = service.assemble(&adapter, images.as_ref(), &request)?;
    print_json(&serde_json::to_value(&book)?)
}

fn run_test(config: &Config, sink: &dyn LogSink) -> Result<(), CliError> {
    let adapter = create_text_adapter(&config.llm)?;
    let request = GenerationRequest::new(TEST_PROMPT, TEST_MAX_TOKENS, config.llm.temperature);

    let success = match adapter.generate(&request) {
        Ok(_) => true,
        Err(err) => {
            sink.log(LogRecord::new(
                LogLevel::Error,
                format!("connection test failed: {err}"),
            ));
            false
        }
    };
    print_json(&json!({ "connection_test": success }))
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to open log file `{path}`: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("adapter setup failed: {0}")]
    Adapter(#[from] AdapterError),
    #[error("prompt loading failed: {0}")]
    Prompt(#[from] PromptError),
    #[error("text generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("book generation failed: {0}")]
    Book(#[from] BookError),
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Parser)]
#[command(
    name = "bookctl",
    version,
    about = "AI book generator command line tool"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, default_value = "bookgen.json")]
    config: PathBuf,

    /// Append pipeline logs to this file instead of printing them
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate free-form text from a prompt
    Text(TextArgs),
    /// Look up an illustration URL for a prompt
    Image(ImageArgs),
    /// Generate a complete book
    Book(BookArgs),
    /// Test the text service connection
    Test,
}

#[derive(Args)]
struct TextArgs {
    /// The generation prompt
    prompt: String,
}

#[derive(Args)]
struct ImageArgs {
    /// The image description prompt
    prompt: String,
}

#[derive(Args)]
struct BookArgs {
    /// Author name printed on the generated book
    author: String,
    /// Comma-separated topic list
    topics: String,
    /// Target language, defaults to the configured language
    language: Option<String>,
}
