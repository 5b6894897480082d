pub mod book;
pub mod config;
pub mod generation;
pub mod logging;
pub mod prompts;
pub mod toc;

pub use book::{
    normalize_topics, Book, BookError, BookRequest, BookService, BookStep, Chapter,
};
pub use config::{
    BookDefaults, Config, ConfigError, ConfigStore, ImageConfig, LlmConfig, PromptConfig,
};
pub use generation::{
    GenerationError, GenerationRequest, ImageProvider, ImageRequest, Orientation, TextGenerator,
};
pub use logging::{
    FileLogSink, LogLevel, LogRecord, LogSink, NullLogSink, StdoutLogSink, VecLogSink,
};
pub use prompts::{PromptArguments, PromptError, PromptRegistry, PromptTemplate};
pub use toc::{extract_chapter_titles, MAX_CHAPTERS};
