use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use bookgen_adapters::FallbackImages;
use bookgen_core::{
    BookError, BookRequest, BookService, GenerationError, GenerationRequest, PromptRegistry,
    TextGenerator, VecLogSink,
};

struct MockTextService {
    responses: Mutex<VecDeque<String>>,
}

impl MockTextService {
    fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    fn assert_empty(&self) {
        let guard = self.responses.lock().expect("mock mutex poisoned");
        assert!(
            guard.is_empty(),
            "expected all mock responses to be consumed"
        );
    }
}

impl TextGenerator for MockTextService {
    fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut guard = self.responses.lock().expect("mock mutex poisoned");
        guard.pop_front().ok_or_else(|| {
            GenerationError::new(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "mock text service has no remaining responses",
            ))
        })
    }
}

const TOC_TEXT: &str = "1. Getting Started\n2. Deep Dive\n\nClosing notes\n3. Shipping It";

fn book_responses() -> Vec<&'static str> {
    vec![
        "The Pragmatic Machine",
        TOC_TEXT,
        "chapter one body text",
        "chapter two body text goes here",
        "chapter three body",
        "A short afterword.",
    ]
}

#[test]
fn pipeline_with_fallback_images_produces_complete_book() {
    let mock = MockTextService::new(book_responses());
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();
    let service = BookService::new(&prompts, &sink);

    let request = BookRequest::from_comma_separated("Ada Writer", "Software, Craft", "English");
    let book = service
        .assemble(&mock, &FallbackImages, &request)
        .expect("assembly should succeed");
    mock.assert_empty();

    assert_eq!(book.title, "The Pragmatic Machine");
    assert_eq!(book.topics, vec!["Software", "Craft"]);
    assert_eq!(book.chapters.len(), 3);
    assert_eq!(book.chapter_count, 3);
    assert_eq!(
        book.chapters.iter().map(|c| &c.title).collect::<Vec<_>>(),
        ["Getting Started", "Deep Dive", "Shipping It"]
    );

    for chapter in &book.chapters {
        let seed = chapter
            .image_url
            .strip_prefix("https://picsum.photos/800/600?random=")
            .expect("chapter image must use the fallback template");
        assert!(seed.parse::<u64>().expect("numeric seed") < 1000);
    }
    assert!(book
        .cover_image_url
        .starts_with("https://picsum.photos/800/600?random="));

    assert_eq!(
        book.total_words,
        book.chapters.iter().map(|c| c.word_count).sum::<usize>()
    );
    assert_eq!(book.chapters[0].word_count, 4);
    assert_eq!(book.chapters[1].word_count, 6);
}

#[test]
fn fallback_image_urls_are_stable_across_runs() {
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();
    let service = BookService::new(&prompts, &sink);
    let request = BookRequest::from_comma_separated("Ada Writer", "Software", "English");

    let first = service
        .assemble(&MockTextService::new(book_responses()), &FallbackImages, &request)
        .expect("first run");
    let second = service
        .assemble(&MockTextService::new(book_responses()), &FallbackImages, &request)
        .expect("second run");

    let first_urls: Vec<_> = first.chapters.iter().map(|c| c.image_url.clone()).collect();
    let second_urls: Vec<_> = second.chapters.iter().map(|c| c.image_url.clone()).collect();
    assert_eq!(first_urls, second_urls);
    assert_eq!(first.cover_image_url, second.cover_image_url);
}

#[test]
fn text_service_failure_produces_no_book() {
    // only the title succeeds; the table of contents request has nothing left
    let mock = MockTextService::new(["Lonely Title"]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();
    let service = BookService::new(&prompts, &sink);

    let request = BookRequest::from_comma_separated("Ada Writer", "Software", "English");
    let error = service
        .assemble(&mock, &FallbackImages, &request)
        .expect_err("missing toc response must abort");
    assert!(matches!(error, BookError::Generation { .. }));
}
