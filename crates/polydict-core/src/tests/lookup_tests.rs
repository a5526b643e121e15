use polydict_types::{LookupEvent, LookupSummary, MatchKind, MatchMode, Suggestion};

use crate::error::DictError;
use crate::subscription::Subscription;
use crate::testing::{FakeDictionary, group, within};
use crate::word_finder::{LookupOptions, WordFinder};

async fn finished(subscription: Subscription<LookupEvent>) -> (Vec<Suggestion>, LookupSummary) {
    match within(subscription.finish()).await {
        Some(LookupEvent::Finished {
            suggestions,
            summary,
            ..
        }) => (suggestions, summary),
        Some(other) => panic!("Wrong terminal event: {other:?}"),
        None => panic!("Lookup ended without a summary"),
    }
}

#[tokio::test]
async fn failed_dictionary_is_counted_not_fatal() {
    let a = FakeDictionary::new("a").headwords(&["test"]).into_arc();
    let b = FakeDictionary::new("b").headwords(&["other"]).into_arc();
    let c = FakeDictionary::new("c")
        .failing(DictError::BackendUnavailable("cannot open c.dsl".into()))
        .into_arc();

    let finder = WordFinder::new();
    let subscription = finder
        .lookup("test", &group("main", &[&a, &b, &c]), &LookupOptions::default())
        .unwrap();
    let (suggestions, summary) = finished(subscription).await;

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].headword, "test");
    assert_eq!(suggestions[0].sources, vec!["a"]);
    assert_eq!(summary.results, 1);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(
        summary.diagnostic.as_deref(),
        Some("Failed to query 1 dictionary.")
    );
}

#[tokio::test]
async fn merged_list_is_deduplicated_and_tiered() {
    let a = FakeDictionary::new("a")
        .headwords(&["Contest", "Test", "testing"])
        .into_arc();
    let b = FakeDictionary::new("b")
        .headwords(&["test", "tester", "TESTING"])
        .delay_ms(10)
        .into_arc();

    let finder = WordFinder::new();
    let subscription = finder
        .lookup("test", &group("main", &[&a, &b]), &LookupOptions::default())
        .unwrap();
    let (suggestions, summary) = finished(subscription).await;

    let headwords: Vec<_> = suggestions.iter().map(|s| s.headword.as_str()).collect();
    assert_eq!(headwords, vec!["Test", "tester", "testing", "Contest"]);

    let kinds: Vec<_> = suggestions.iter().map(|s| s.kind).collect();
    assert!(kinds.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(suggestions[0].kind, MatchKind::Exact);
    assert_eq!(suggestions[0].sources, vec!["a", "b"]);
    assert_eq!(summary.failed_count, 0);
    assert!(summary.diagnostic.is_none());
}

#[tokio::test]
async fn repeated_lookup_is_idempotent() {
    let a = FakeDictionary::new("a")
        .headwords(&["bank", "banker", "embankment"])
        .delay_ms(15)
        .into_arc();
    let b = FakeDictionary::new("b")
        .headwords(&["Bank", "bankrupt"])
        .into_arc();
    let scope = group("main", &[&a, &b]);

    let finder = WordFinder::new();
    let first = finished(finder.lookup("bank", &scope, &LookupOptions::default()).unwrap()).await;
    let second = finished(finder.lookup("bank", &scope, &LookupOptions::default()).unwrap()).await;

    assert_eq!(first.0, second.0);
    assert_eq!(first.1.results, second.1.results);
}

#[tokio::test]
async fn newer_query_supersedes_older_one() {
    let slow = FakeDictionary::new("slow")
        .headwords(&["apple", "banana"])
        .delay_ms(100)
        .into_arc();
    let fast = FakeDictionary::new("fast").headwords(&["bandana"]).into_arc();
    let scope = group("main", &[&slow, &fast]);

    let finder = WordFinder::new();
    let mut first = finder.lookup("apple", &scope, &LookupOptions::default()).unwrap();
    let second = finder.lookup("ban", &scope, &LookupOptions::default()).unwrap();
    assert!(!first.is_current());

    // The superseded subscription yields nothing at all
    assert!(within(first.recv()).await.is_none());

    let generation = second.generation();
    let events = within(second.collect()).await;
    assert!(!events.is_empty());
    for event in &events {
        let (event_generation, suggestions) = match event {
            LookupEvent::Updated {
                generation,
                suggestions,
            }
            | LookupEvent::Finished {
                generation,
                suggestions,
                ..
            } => (*generation, suggestions),
        };
        assert_eq!(event_generation, generation);
        assert!(suggestions.iter().all(|s| s.headword != "apple"));
    }
    assert!(matches!(events.last(), Some(LookupEvent::Finished { .. })));
}

#[tokio::test]
async fn incremental_updates_only_grow() {
    let a = FakeDictionary::new("a").headwords(&["cat"]).into_arc();
    let b = FakeDictionary::new("b").headwords(&["catalog"]).delay_ms(20).into_arc();
    let c = FakeDictionary::new("c").headwords(&["category"]).delay_ms(40).into_arc();

    let finder = WordFinder::new();
    let events = within(
        finder
            .lookup("cat", &group("main", &[&a, &b, &c]), &LookupOptions::default())
            .unwrap()
            .collect(),
    )
    .await;

    let sizes: Vec<usize> = events
        .iter()
        .map(|event| match event {
            LookupEvent::Updated { suggestions, .. } => suggestions.len(),
            LookupEvent::Finished { suggestions, .. } => suggestions.len(),
        })
        .collect();
    assert_eq!(sizes, vec![1, 2, 3, 3]);
}

#[tokio::test]
async fn overall_cap_never_drops_an_emitted_suggestion() {
    let a = FakeDictionary::new("a").headwords(&["testa", "testb"]).into_arc();
    let b = FakeDictionary::new("b").headwords(&["test"]).delay_ms(30).into_arc();
    let options = LookupOptions {
        max_total_results: 2,
        ..LookupOptions::default()
    };

    let finder = WordFinder::new();
    let events = within(
        finder
            .lookup("test", &group("main", &[&a, &b]), &options)
            .unwrap()
            .collect(),
    )
    .await;

    let lists: Vec<Vec<String>> = events
        .iter()
        .map(|event| match event {
            LookupEvent::Updated { suggestions, .. } | LookupEvent::Finished { suggestions, .. } => {
                suggestions.iter().map(|s| s.headword.clone()).collect()
            }
        })
        .collect();

    assert_eq!(
        lists,
        vec![
            vec!["testa", "testb"],
            vec!["test", "testa", "testb"],
            vec!["test", "testa"],
        ]
    );
    match events.last() {
        Some(LookupEvent::Finished { summary, .. }) => assert_eq!(summary.results, 2),
        other => panic!("Expected a summary, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_pattern_is_rejected_before_dispatch() {
    let a = FakeDictionary::new("a").headwords(&["test"]).into_arc();
    let options = LookupOptions {
        mode: MatchMode::Wildcard,
        ..LookupOptions::default()
    };

    let finder = WordFinder::new();
    let result = finder.lookup("te[st", &group("main", &[&a]), &options);
    assert!(matches!(result, Err(DictError::QueryInvalid(_))));
}

#[tokio::test]
async fn wildcard_lookup_matches_whole_headwords() {
    let a = FakeDictionary::new("a")
        .headwords(&["test", "toast", "tester", "attest"])
        .into_arc();
    let options = LookupOptions {
        mode: MatchMode::Wildcard,
        ..LookupOptions::default()
    };

    let finder = WordFinder::new();
    let (suggestions, _) =
        finished(finder.lookup("t*st", &group("main", &[&a]), &options).unwrap()).await;

    let mut headwords: Vec<_> = suggestions.into_iter().map(|s| s.headword).collect();
    headwords.sort();
    assert_eq!(headwords, vec!["test", "toast"]);
}

#[tokio::test]
async fn empty_query_finishes_without_dispatch() {
    let a = FakeDictionary::new("a")
        .failing(DictError::BackendUnavailable("must not be called".into()))
        .into_arc();

    let finder = WordFinder::new();
    let (suggestions, summary) =
        finished(finder.lookup("   ", &group("main", &[&a]), &LookupOptions::default()).unwrap())
            .await;

    assert!(suggestions.is_empty());
    assert_eq!(summary.failed_count, 0);
}

#[tokio::test]
async fn all_failures_still_finish_with_diagnostic() {
    let a = FakeDictionary::new("a").panicking().into_arc();
    let b = FakeDictionary::new("b")
        .delay_ms(500)
        .timeout_ms(20)
        .into_arc();

    let finder = WordFinder::new();
    let (suggestions, summary) = finished(
        finder
            .lookup("anything", &group("main", &[&a, &b]), &LookupOptions::default())
            .unwrap(),
    )
    .await;

    assert!(suggestions.is_empty());
    assert_eq!(summary.failed_count, 2);
    assert_eq!(
        summary.diagnostic.as_deref(),
        Some("Failed to query 2 dictionaries.")
    );
}

#[tokio::test]
async fn uncertain_lists_are_flagged() {
    let a = FakeDictionary::new("a").headwords(&["word"]).into_arc();
    let b = FakeDictionary::new("b").uncertain().into_arc();

    let finder = WordFinder::new();
    let (_, summary) = finished(
        finder
            .lookup("word", &group("main", &[&a, &b]), &LookupOptions::default())
            .unwrap(),
    )
    .await;

    assert!(summary.uncertain);
}

#[tokio::test]
async fn cancel_current_ends_subscription() {
    let slow = FakeDictionary::new("slow")
        .headwords(&["test"])
        .delay_ms(1_000)
        .into_arc();

    let finder = WordFinder::new();
    let mut subscription = finder
        .lookup("test", &group("main", &[&slow]), &LookupOptions::default())
        .unwrap();
    finder.cancel_current();

    assert!(within(subscription.recv()).await.is_none());
}
