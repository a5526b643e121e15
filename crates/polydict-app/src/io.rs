use std::io::BufRead;
use std::thread;

use kanal::{AsyncReceiver, AsyncSender};
use polydict_types::AppEvent;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Reads prompt lines on a dedicated thread.
///
/// A blocking read cannot be interrupted, so it stays off the runtime's
/// blocking pool where it would hold up shutdown.
pub fn spawn_stdin_watcher(
    event_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> std::io::Result<thread::JoinHandle<()>> {
    let handle = Handle::current();
    thread::Builder::new()
        .name("polydict-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            watch_lines(stdin.lock(), &handle, &event_tx, &cancel);
        })
}

/// Forwards parsed lines until `:q`, end of input or cancellation.
/// End of input counts as `:q`.
pub fn watch_lines(
    reader: impl BufRead,
    handle: &Handle,
    event_tx: &AsyncSender<AppEvent>,
    cancel: &CancellationToken,
) {
    for line in reader.lines() {
        if cancel.is_cancelled() {
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to read input: {e}");
                break;
            }
        };

        let Some(event) = AppEvent::parse(&line) else {
            continue;
        };
        let quit = matches!(event, AppEvent::Quit);

        if let Err(e) = handle.block_on(event_tx.send(event)) {
            tracing::debug!("Input channel closed: {e}");
            return;
        }
        if quit {
            return;
        }
    }

    if !cancel.is_cancelled() {
        let _ = handle.block_on(event_tx.send(AppEvent::Quit));
    }
}

/// Writes output lines to stdout until every sender is gone
pub async fn print_loop(output_rx: AsyncReceiver<String>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Ok(line) = output_rx.recv().await {
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}
