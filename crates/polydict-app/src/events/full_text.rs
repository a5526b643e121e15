use std::sync::Arc;

use kanal::AsyncSender;
use polydict_core::{DictionaryGroup, FullTextOptions};
use tokio::sync::broadcast::error::RecvError;

use crate::render;
use crate::state::AppState;

pub async fn handle_full_text(
    state: Arc<AppState>,
    text: String,
    group: DictionaryGroup,
    options: FullTextOptions,
    out: AsyncSender<String>,
) -> anyhow::Result<()> {
    let mut subscription = state.full_text.search(&text, &group, &options)?;

    while let Some(event) = subscription.recv().await {
        for line in render::full_text_lines(&event) {
            out.send(line).await?;
        }
    }

    out.send(state.full_text.now_indexing_label()).await?;
    Ok(())
}

/// Builds full-text indexes and reports every state transition until the
/// coordinator is idle. `ids` empty means every eligible dictionary.
pub async fn handle_index(
    state: Arc<AppState>,
    ids: Vec<String>,
    out: AsyncSender<String>,
) -> anyhow::Result<()> {
    let coordinator = &state.full_text;
    let mut transitions = coordinator.subscribe();

    let started = if ids.is_empty() {
        coordinator.prebuild_all()
    } else {
        let mut started = 0;
        for id in &ids {
            if coordinator.state(id).is_none() {
                out.send(format!("{id}: not a full-text dictionary")).await?;
            } else if coordinator.start_indexing(id) || coordinator.retry(id) {
                started += 1;
            }
        }
        started
    };
    out.send(format!("Indexing {started} dictionaries")).await?;

    let idle = coordinator.wait_idle();
    tokio::pin!(idle);
    loop {
        tokio::select! {
            biased;

            transition = transitions.recv() => match transition {
                Ok(index_state) => out.send(render::index_line(&index_state)).await?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {skipped} index transitions");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut idle => break,
        }
    }

    for index_state in coordinator.states() {
        out.send(render::index_line(&index_state)).await?;
    }
    Ok(())
}
