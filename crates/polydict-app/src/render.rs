use std::sync::OnceLock;

use polydict_core::{Dictionary, DictionaryGroup};
use polydict_types::{
    ArticleDocument, ArticleFragment, FragmentBody, FullTextEvent, FullTextIndexState, IndexStatus,
    LookupSummary, MatchKind, SkipReason, Suggestion,
};
use regex::Regex;

static TAGS: OnceLock<Regex> = OnceLock::new();
static BREAKS: OnceLock<Regex> = OnceLock::new();

fn tags() -> &'static Regex {
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid tag pattern"))
}

/// Line-ending markup: `<br>` and the end of block elements
fn breaks() -> &'static Regex {
    BREAKS.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6])>").expect("Invalid break pattern")
    })
}

/// Terminal rendering of article markup: block ends become newlines, tags go
pub fn plain_text(html: &str) -> String {
    let text = breaks().replace_all(html, "\n");
    let text = tags().replace_all(&text, "");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Exact => "exact",
        MatchKind::Prefix => "prefix",
        MatchKind::Fuzzy => "fuzzy",
    }
}

pub fn suggestion_line(suggestion: &Suggestion) -> String {
    format!(
        "{:<6} {} [{}]",
        kind_label(suggestion.kind),
        suggestion.headword,
        suggestion.sources.join(", ")
    )
}

pub fn summary_lines(summary: &LookupSummary) -> Vec<String> {
    let mut first = format!("{} results", summary.results);
    if summary.uncertain {
        first.push_str(" (some dictionaries could not list every match)");
    }

    let mut lines = vec![first];
    lines.extend(summary.diagnostic.clone());
    lines
}

pub fn fragment_block(fragment: &ArticleFragment) -> String {
    let body = match &fragment.body {
        FragmentBody::Content(html) => plain_text(html),
        FragmentBody::Error(message) => format!("!! {message}"),
    };
    format!("== {} ==\n{body}", fragment.dictionary_name)
}

/// Everything of a finished document that was not streamed as a fragment
pub fn document_tail(document: &ArticleDocument) -> Vec<String> {
    let mut lines = Vec::new();

    for section in &document.sections {
        lines.push(format!("-- {} --", section.title()));
        lines.extend(section.document.fragments.iter().map(fragment_block));
    }

    lines.extend(document.diagnostic.clone());
    lines
}

fn skip_reason(reason: &SkipReason) -> String {
    match reason {
        SkipReason::StillIndexing => "still indexing".to_string(),
        SkipReason::IndexingStopped => "indexing stopped".to_string(),
        SkipReason::IndexFailed => "index failed".to_string(),
        SkipReason::TooManyArticles { articles, limit } => {
            format!("{articles} articles, limit is {limit}")
        }
    }
}

pub fn full_text_lines(event: &FullTextEvent) -> Vec<String> {
    match event {
        FullTextEvent::Waiting { dictionary_id, .. } => {
            vec![format!("{dictionary_id}: waiting for the index")]
        }
        FullTextEvent::Skipped {
            dictionary_id,
            reason,
            ..
        } => vec![format!("{dictionary_id}: skipped, {}", skip_reason(reason))],
        FullTextEvent::Batch {
            dictionary_id,
            hits,
            ..
        } => {
            let mut lines = vec![format!("{dictionary_id}: {} hits", hits.len())];
            lines.extend(
                hits.iter()
                    .map(|hit| format!("  {}: {}", hit.headword, hit.snippet)),
            );
            lines
        }
        FullTextEvent::Failed {
            dictionary_id,
            message,
            ..
        } => vec![format!("{dictionary_id}: {message}")],
        FullTextEvent::Finished { summary, .. } => {
            let mut lines = vec![format!(
                "{} hits in {} dictionaries, {} skipped",
                summary.total_hits, summary.searched, summary.skipped
            )];
            lines.extend(summary.diagnostic.clone());
            lines
        }
    }
}

/// `name (icon): member, member`
pub fn group_line(group: &DictionaryGroup) -> String {
    let members: Vec<_> = group.dictionaries().iter().map(|d| d.name()).collect();
    match group.icon() {
        Some(icon) => format!("{} ({icon}): {}", group.name(), members.join(", ")),
        None => format!("{}: {}", group.name(), members.join(", ")),
    }
}

pub fn index_line(state: &FullTextIndexState) -> String {
    let status = match state.status {
        IndexStatus::NotIndexed => "not indexed",
        IndexStatus::Indexing => "indexing",
        IndexStatus::Ready => "ready",
        IndexStatus::Failed => "failed",
    };
    format!("{}: {status} ({} articles)", state.dictionary_id, state.progress)
}
