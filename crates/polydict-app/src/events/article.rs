use std::sync::Arc;

use kanal::AsyncSender;
use polydict_core::{ArticleOptions, DictionaryGroup};
use polydict_types::ArticleEvent;

use crate::render;
use crate::state::AppState;

pub async fn handle_article(
    state: Arc<AppState>,
    headword: String,
    group: DictionaryGroup,
    options: ArticleOptions,
    out: AsyncSender<String>,
) -> anyhow::Result<()> {
    let mut subscription = state.articles.lookup(&headword, &group, &options);

    while let Some(event) = subscription.recv().await {
        match event {
            ArticleEvent::Fragment { fragment, .. } => {
                out.send(render::fragment_block(&fragment)).await?;
            }
            ArticleEvent::Finished { document, .. } => {
                tracing::debug!(
                    "'{}': {} fragments, {} failed",
                    document.headword,
                    document.fragments.len(),
                    document.failed_count
                );
                for line in render::document_tail(&document) {
                    out.send(line).await?;
                }
            }
        }
    }

    Ok(())
}
