use std::sync::Arc;

use polydict_types::{ArticleDocument, ArticleEvent, ArticleOutcome, DecompositionKind, FragmentBody};

use crate::article::ArticleRequest;
use crate::dictionary::{ArticleOptions, Dictionary};
use crate::error::DictError;
use crate::subscription::Subscription;
use crate::testing::{FakeDictionary, group, within};

async fn document(subscription: Subscription<ArticleEvent>) -> (Vec<ArticleEvent>, ArticleDocument) {
    let mut events = within(subscription.collect()).await;
    match events.pop() {
        Some(ArticleEvent::Finished { document, .. }) => (events, document),
        other => panic!("Expected a finished document, got {other:?}"),
    }
}

#[tokio::test]
async fn fragments_follow_group_order_not_completion_order() {
    let d1 = FakeDictionary::new("d1")
        .article("cat", "d1 cat")
        .delay_ms(60)
        .into_arc();
    let d2 = FakeDictionary::new("d2").article("cat", "d2 cat").into_arc();
    let d3 = FakeDictionary::new("d3")
        .failing(DictError::BackendCrashed("exit status 3".into()))
        .delay_ms(20)
        .into_arc();

    let request = ArticleRequest::new();
    let (events, document) = document(request.lookup(
        "cat",
        &group("main", &[&d1, &d2, &d3]),
        &ArticleOptions::default(),
    ))
    .await;

    let order: Vec<_> = document
        .fragments
        .iter()
        .map(|f| (f.dictionary_id.as_str(), f.position, f.is_error()))
        .collect();
    assert_eq!(order, vec![("d1", 0, false), ("d2", 1, false), ("d3", 2, true)]);
    assert_eq!(document.fragments[0].content(), Some("d1 cat"));
    assert_eq!(
        document.fragments[2].body,
        FragmentBody::Error("D3: Backend crashed: exit status 3".into())
    );

    // Streamed fragments are released in the same order
    let streamed: Vec<_> = events
        .iter()
        .map(|event| match event {
            ArticleEvent::Fragment { fragment, .. } => fragment.position,
            other => panic!("Unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(streamed, vec![0, 1, 2]);

    assert_eq!(document.outcome, ArticleOutcome::Found);
    assert_eq!(document.failed_count, 1);
    assert_eq!(document.diagnostic.as_deref(), Some("Failed to query 1 dictionary."));
}

#[tokio::test]
async fn dictionaries_without_article_contribute_nothing() {
    let d1 = FakeDictionary::new("d1").article("dog", "d1 dog").into_arc();
    let d2 = FakeDictionary::new("d2").article("cat", "d2 cat").into_arc();

    let request = ArticleRequest::new();
    let (_, document) = document(request.lookup(
        "cat",
        &group("main", &[&d1, &d2]),
        &ArticleOptions::default(),
    ))
    .await;

    assert_eq!(document.fragments.len(), 1);
    assert_eq!(document.fragments[0].dictionary_id, "d2");
    assert_eq!(document.fragments[0].position, 1);
}

#[tokio::test]
async fn no_content_anywhere_is_not_found() {
    let d1 = FakeDictionary::new("d1").article("dog", "d1 dog").into_arc();

    let request = ArticleRequest::new();
    let (_, document) = document(request.lookup(
        "unicorn",
        &group("Animals", &[&d1]),
        &ArticleOptions::default(),
    ))
    .await;

    assert_eq!(document.outcome, ArticleOutcome::NotFound);
    assert!(document.fragments.is_empty());
    assert_eq!(
        document.diagnostic.as_deref(),
        Some("No translation for unicorn was found in group Animals.")
    );
}

#[tokio::test]
async fn dictionary_filter_limits_scope_but_keeps_positions() {
    let d1 = FakeDictionary::new("d1").article("cat", "d1 cat").into_arc();
    let d2 = FakeDictionary::new("d2").article("cat", "d2 cat").into_arc();
    let d3 = FakeDictionary::new("d3").article("cat", "d3 cat").into_arc();

    let options = ArticleOptions {
        dictionary_filter: Some(vec!["d3".into(), "d1".into()]),
        ..ArticleOptions::default()
    };
    let request = ArticleRequest::new();
    let (_, document) =
        document(request.lookup("cat", &group("main", &[&d1, &d2, &d3]), &options)).await;

    let positions: Vec<_> = document.fragments.iter().map(|f| f.position).collect();
    assert_eq!(positions, vec![0, 2]);
}

#[tokio::test]
async fn decompositions_become_labelled_sections() {
    let d1 = FakeDictionary::new("d1")
        .article("big", "large")
        .article("cat", "feline")
        .article("big-cat", "lion, tiger")
        .decomposes(
            "big cat",
            DecompositionKind::IndividualWords,
            &["big", "cat", "Big"],
        )
        .decomposes("big cat", DecompositionKind::CloseWords, &["big-cat", "big cat"])
        .into_arc();
    let d2 = FakeDictionary::new("d2")
        .article("cat", "house cat")
        .decomposes("cat", DecompositionKind::CloseWords, &["cap"])
        .into_arc();

    let request = ArticleRequest::new();
    let (_, document) = document(request.lookup(
        "big cat",
        &group("main", &[&d1, &d2]),
        &ArticleOptions::default(),
    ))
    .await;

    assert_eq!(document.outcome, ArticleOutcome::NotFound);

    let titles: Vec<_> = document.sections.iter().map(|s| s.title()).collect();
    assert_eq!(
        titles,
        vec![
            "Individual words: big",
            "Individual words: cat",
            "Close words: big-cat",
        ]
    );

    // Depth one: the sub-request for "cat" does not expand "cap"
    let cat = &document.sections[1].document;
    assert_eq!(cat.fragments.len(), 2);
    assert!(cat.sections.is_empty());
}

#[tokio::test]
async fn expression_under_two_kinds_is_fetched_once() {
    let fake = Arc::new(
        FakeDictionary::new("d1")
            .article("cat", "feline")
            .decomposes("big cat", DecompositionKind::IndividualWords, &["big", "cat"])
            .decomposes("big cat", DecompositionKind::CloseWords, &["Cat", "bigcat"]),
    );
    let d1: Arc<dyn Dictionary> = fake.clone();

    let request = ArticleRequest::new();
    let (_, document) = document(request.lookup(
        "big cat",
        &group("main", &[&d1]),
        &ArticleOptions::default(),
    ))
    .await;

    let titles: Vec<_> = document.sections.iter().map(|s| s.title()).collect();
    assert_eq!(titles, vec!["Individual words: cat"]);
    assert_eq!(fake.fetches_of("cat"), 1);
    assert_eq!(fake.fetches_of("Cat"), 0);
    assert_eq!(fake.fetches_of("bigcat"), 1);
}

#[tokio::test]
async fn newer_article_supersedes_older_one() {
    let d1 = FakeDictionary::new("d1")
        .article("cat", "feline")
        .article("dog", "canine")
        .delay_ms(50)
        .into_arc();
    let scope = group("main", &[&d1]);

    let request = ArticleRequest::new();
    let mut first = request.lookup("cat", &scope, &ArticleOptions::default());
    let second = request.lookup("dog", &scope, &ArticleOptions::default());

    assert!(within(first.recv()).await.is_none());

    let (_, document) = document(second).await;
    assert_eq!(document.headword, "dog");
    assert_eq!(document.fragments[0].content(), Some("canine"));
}

#[tokio::test]
async fn failing_sibling_does_not_delay_others() {
    let fast = FakeDictionary::new("fast").article("cat", "feline").into_arc();
    let broken = FakeDictionary::new("broken").panicking().into_arc();

    let request = ArticleRequest::new();
    let mut subscription = request.lookup(
        "cat",
        &group("main", &[&fast, &broken]),
        &ArticleOptions::default(),
    );

    match within(subscription.recv()).await {
        Some(ArticleEvent::Fragment { fragment, .. }) => {
            assert_eq!(fragment.content(), Some("feline"))
        }
        other => panic!("Expected the first fragment, got {other:?}"),
    }
}
