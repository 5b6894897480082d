use crate::generation::{
    GenerationError, GenerationRequest, ImageProvider, ImageRequest, TextGenerator,
};
use crate::logging::{LogLevel, LogRecord, LogSink};
use crate::prompts::{PromptError, PromptRegistry};
use crate::toc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const TITLE_MAX_TOKENS: u32 = 100;
const TITLE_TEMPERATURE: f32 = 0.8;
const TOC_MAX_TOKENS: u32 = 1000;
const CHAPTER_MAX_TOKENS: u32 = 2000;
const AFTERWORD_MAX_TOKENS: u32 = 800;
const BODY_TEMPERATURE: f32 = 0.7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookRequest {
    pub author: String,
    pub topics: Vec<String>,
    pub language: String,
}

impl BookRequest {
    pub fn new(
        author: impl Into<String>,
        topics: Vec<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            topics,
            language: language.into(),
        }
    }

    /// Convenience for the CLI surface, where topics arrive as one
    /// comma-separated argument.
    pub fn from_comma_separated(
        author: impl Into<String>,
        topics: &str,
        language: impl Into<String>,
    ) -> Self {
        Self::new(author, vec![topics.to_string()], language)
    }
}

/// Splits comma-separated entries, trims, and drops empties. The assembler
/// refuses to start without at least one usable topic.
pub fn normalize_topics(topics: &[String]) -> Result<Vec<String>, BookError> {
    let normalized: Vec<String> = topics
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
        .map(str::to_string)
        .collect();

    if normalized.is_empty() {
        Err(BookError::NoTopics)
    } else {
        Ok(normalized)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BookStep {
    Title,
    TableOfContents,
    Chapter(usize),
    Afterword,
}

impl BookStep {
    fn prompt_key(&self) -> &'static str {
        match self {
            Self::Title => "book_title",
            Self::TableOfContents => "table_of_contents",
            Self::Chapter(_) => "chapter",
            Self::Afterword => "afterword",
        }
    }
}

impl fmt::Display for BookStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "book title"),
            Self::TableOfContents => write!(f, "table of contents"),
            Self::Chapter(number) => write!(f, "chapter {number}"),
            Self::Afterword => write!(f, "afterword"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BookError {
    #[error("at least one topic is required")]
    NoTopics,
    #[error("failed to render {step} prompt: {source}")]
    Prompt {
        step: BookStep,
        #[source]
        source: PromptError,
    },
    #[error("failed to render image prompt `{key}`: {source}")]
    ImagePrompt {
        key: &'static str,
        #[source]
        source: PromptError,
    },
    #[error("text generation failed for {step}: {source}")]
    Generation {
        step: BookStep,
        #[source]
        source: GenerationError,
    },
    #[error("{step} response was empty")]
    EmptyResponse { step: BookStep },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub word_count: usize,
}

/// Terminal output record of one generation run. Never mutated after
/// assembly.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub topics: Vec<String>,
    pub language: String,
    pub table_of_contents: String,
    pub chapters: Vec<Chapter>,
    pub afterword: String,
    pub cover_image_url: String,
    pub total_words: usize,
    pub chapter_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// Orchestrates the full pipeline: title, table of contents, chapters with
/// illustrations, afterword, cover. Strictly sequential; any text failure
/// aborts the call, image lookups never do.
pub struct BookService<'a> {
    prompts: &'a PromptRegistry,
    sink: &'a dyn LogSink,
}

impl<'a> BookService<'a> {
    pub fn new(prompts: &'a PromptRegistry, sink: &'a dyn LogSink) -> Self {
        Self { prompts, sink }
    }

    pub fn assemble(
        &self,
        model: &dyn TextGenerator,
        images: &dyn ImageProvider,
        request: &BookRequest,
    ) -> Result<Book, BookError> {
        let topics = normalize_topics(&request.topics)?;
        let joined_topics = topics.join(", ");

        self.log(
            LogLevel::Info,
            format!(
                "starting book generation for author `{}` about {}",
                request.author, joined_topics
            ),
        );

        let title = self.request_text(
            model,
            BookStep::Title,
            [
                ("topics", joined_topics.clone()),
                ("author", request.author.clone()),
                ("language", request.language.clone()),
            ],
            TITLE_MAX_TOKENS,
            TITLE_TEMPERATURE,
        )?;
        self.log(LogLevel::Info, format!("generated book title: {title}"));

        let table_of_contents = self.request_text(
            model,
            BookStep::TableOfContents,
            [
                ("book_title", title.clone()),
                ("topics", joined_topics.clone()),
                ("language", request.language.clone()),
            ],
            TOC_MAX_TOKENS,
            BODY_TEMPERATURE,
        )?;

        let chapter_titles = toc::extract_chapter_titles(&table_of_contents);
        self.log(
            LogLevel::Info,
            format!(
                "parsed {} chapter titles from the table of contents",
                chapter_titles.len()
            ),
        );

        let mut chapters = Vec::with_capacity(chapter_titles.len());
        for (index, chapter_title) in chapter_titles.into_iter().enumerate() {
            let number = index + 1;
            self.log(
                LogLevel::Info,
                format!("generating chapter {number}: {chapter_title}"),
            );

            let content = self.request_text(
                model,
                BookStep::Chapter(number),
                [
                    ("book_title", title.clone()),
                    ("chapter_title", chapter_title.clone()),
                    ("topics", joined_topics.clone()),
                    ("language", request.language.clone()),
                ],
                CHAPTER_MAX_TOKENS,
                BODY_TEMPERATURE,
            )?;

            let image_url = self.request_image(
                images,
                "chapter_image",
                [("chapter_title", chapter_title.clone())],
            )?;

            let word_count = count_words(&content);
            chapters.push(Chapter {
                title: chapter_title,
                content,
                image_url,
                word_count,
            });
        }

        let afterword = self.request_text(
            model,
            BookStep::Afterword,
            [
                ("book_title", title.clone()),
                ("author", request.author.clone()),
                ("language", request.language.clone()),
            ],
            AFTERWORD_MAX_TOKENS,
            BODY_TEMPERATURE,
        )?;

        let cover_image_url = self.request_image(
            images,
            "cover_image",
            [
                ("book_title", title.clone()),
                ("author", request.author.clone()),
                ("topics", joined_topics.clone()),
            ],
        )?;

        let total_words = chapters.iter().map(|chapter| chapter.word_count).sum();
        let chapter_count = chapters.len();
        self.log(
            LogLevel::Info,
            format!("successfully generated complete book: {title} ({total_words} words)"),
        );

        Ok(Book {
            title,
            author: request.author.clone(),
            topics,
            language: request.language.clone(),
            table_of_contents,
            chapters,
            afterword,
            cover_image_url,
            total_words,
            chapter_count,
            generated_at: Utc::now(),
        })
    }

    fn request_text<I, K, V>(
        &self,
        model: &dyn TextGenerator,
        step: BookStep,
        arguments: I,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, BookError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prompt = self
            .prompts
            .format_with(step.prompt_key(), arguments)
            .map_err(|source| BookError::Prompt { step, source })?;

        let request = GenerationRequest::new(prompt, max_tokens, temperature);
        let response = model
            .generate(&request)
            .map_err(|source| BookError::Generation { step, source })?;

        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Err(BookError::EmptyResponse { step });
        }
        Ok(trimmed.to_string())
    }

    fn request_image<I, K, V>(
        &self,
        images: &dyn ImageProvider,
        key: &'static str,
        arguments: I,
    ) -> Result<String, BookError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prompt = self
            .prompts
            .format_with(key, arguments)
            .map_err(|source| BookError::ImagePrompt { key, source })?;
        Ok(images.image_url(&ImageRequest::for_prompt(prompt)))
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.sink.log(LogRecord::new(level, message.into()));
    }
}

fn count_words(content: &str) -> usize {
    content.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::VecLogSink;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    struct MockTextGenerator {
        responses: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl MockTextGenerator {
        fn new<I, S>(responses: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl TextGenerator for MockTextGenerator {
        fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses.lock().unwrap().pop_front().ok_or_else(|| {
                GenerationError::new(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "mock text generator has no remaining responses",
                ))
            })
        }
    }

    struct StaticImages(&'static str);

    impl ImageProvider for StaticImages {
        fn image_url(&self, _request: &ImageRequest) -> String {
            self.0.to_string()
        }
    }

    const TOC_TEXT: &str = "1. Foundations\n2. Practice\n3. Outlook";

    #[test]
    fn assembles_complete_book() {
        let mock = MockTextGenerator::new([
            "The Test Book",
            TOC_TEXT,
            "first chapter body",
            "second chapter body text",
            "third chapter body",
            "closing afterword",
        ]);
        let prompts = PromptRegistry::new().expect("registry");
        let sink = VecLogSink::new();
        let service = BookService::new(&prompts, &sink);
        let images = StaticImages("https://images.example/1.jpg");

        let request = BookRequest::new(
            "Jane Doe",
            vec!["AI, Economics".to_string(), "  ".to_string()],
            "English",
        );
        let book = service
            .assemble(&mock, &images, &request)
            .expect("assembly should succeed");

        assert_eq!(book.title, "The Test Book");
        assert_eq!(book.author, "Jane Doe");
        assert_eq!(book.topics, vec!["AI", "Economics"]);
        assert_eq!(book.table_of_contents, TOC_TEXT);
        assert_eq!(book.chapter_count, 3);
        assert_eq!(book.chapters.len(), 3);
        assert_eq!(book.chapters[0].title, "Foundations");
        assert_eq!(book.chapters[0].word_count, 3);
        assert_eq!(book.chapters[1].word_count, 4);
        assert_eq!(book.total_words, 10);
        assert_eq!(book.afterword, "closing afterword");
        for chapter in &book.chapters {
            assert_eq!(chapter.image_url, "https://images.example/1.jpg");
        }

        let requests = mock.requests();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[0].max_tokens, 100);
        assert_eq!(requests[0].temperature, 0.8);
        assert_eq!(requests[1].max_tokens, 1000);
        assert_eq!(requests[2].max_tokens, 2000);
        assert_eq!(requests[5].max_tokens, 800);
        assert!(requests[2].prompt.contains("Foundations"));
        assert!(requests[2].prompt.contains("The Test Book"));
    }

    #[test]
    fn chapter_text_failure_aborts_assembly() {
        // title, toc, chapter 1 succeed; chapter 2 has no response left
        let mock = MockTextGenerator::new(["Title", TOC_TEXT, "chapter one body"]);
        let prompts = PromptRegistry::new().expect("registry");
        let sink = VecLogSink::new();
        let service = BookService::new(&prompts, &sink);
        let images = StaticImages("unused");

        let request = BookRequest::from_comma_separated("A", "X", "English");
        let error = service
            .assemble(&mock, &images, &request)
            .expect_err("chapter failure must abort");

        match error {
            BookError::Generation { step, .. } => assert_eq!(step, BookStep::Chapter(2)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_topics_are_rejected_before_any_generation() {
        let mock = MockTextGenerator::new(Vec::<String>::new());
        let prompts = PromptRegistry::new().expect("registry");
        let sink = VecLogSink::new();
        let service = BookService::new(&prompts, &sink);
        let images = StaticImages("unused");

        let request = BookRequest::new("A", vec![" , ,".to_string()], "English");
        let error = service
            .assemble(&mock, &images, &request)
            .expect_err("empty topics must fail");

        assert!(matches!(error, BookError::NoTopics));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn empty_title_response_is_an_error() {
        let mock = MockTextGenerator::new(["   "]);
        let prompts = PromptRegistry::new().expect("registry");
        let sink = VecLogSink::new();
        let service = BookService::new(&prompts, &sink);
        let images = StaticImages("unused");

        let request = BookRequest::from_comma_separated("A", "X", "English");
        let error = service
            .assemble(&mock, &images, &request)
            .expect_err("blank title must fail");

        match error {
            BookError::EmptyResponse { step } => assert_eq!(step, BookStep::Title),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_table_of_contents_yields_fewer_chapters() {
        let mock = MockTextGenerator::new([
            "Title",
            "no numbered lines at all",
            "afterword text",
        ]);
        let prompts = PromptRegistry::new().expect("registry");
        let sink = VecLogSink::new();
        let service = BookService::new(&prompts, &sink);
        let images = StaticImages("unused");

        let request = BookRequest::from_comma_separated("A", "X", "English");
        let book = service
            .assemble(&mock, &images, &request)
            .expect("zero chapters is not an error");

        assert!(book.chapters.is_empty());
        assert_eq!(book.chapter_count, 0);
        assert_eq!(book.total_words, 0);
    }

    #[test]
    fn normalize_topics_splits_and_trims() {
        let topics = vec!["  AI ,Economics,".to_string(), "History".to_string()];
        assert_eq!(
            normalize_topics(&topics).unwrap(),
            vec!["AI", "Economics", "History"]
        );
    }
}
