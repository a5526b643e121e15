use std::sync::Arc;

use kanal::AsyncSender;
use polydict_core::{DictionaryGroup, LookupOptions};
use polydict_types::LookupEvent;

use crate::render;
use crate::state::AppState;

/// Streams a headword lookup. Only the final list is printed, incremental
/// snapshots are logged.
pub async fn handle_lookup(
    state: Arc<AppState>,
    query: String,
    group: DictionaryGroup,
    options: LookupOptions,
    out: AsyncSender<String>,
) -> anyhow::Result<()> {
    let mut subscription = state.finder.lookup(&query, &group, &options)?;

    while let Some(event) = subscription.recv().await {
        match event {
            LookupEvent::Updated { suggestions, .. } => {
                tracing::debug!("'{query}': {} suggestions so far", suggestions.len());
            }
            LookupEvent::Finished {
                suggestions,
                summary,
                ..
            } => {
                for suggestion in &suggestions {
                    out.send(render::suggestion_line(suggestion)).await?;
                }
                for line in render::summary_lines(&summary) {
                    out.send(line).await?;
                }
            }
        }
    }

    Ok(())
}
