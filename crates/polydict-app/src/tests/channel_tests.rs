use std::io::Cursor;
use std::time::Duration;

use polydict_types::AppEvent;
use tokio::runtime::Handle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::{drain, fixture_state};
use crate::controller::AppController;
use crate::io::watch_lines;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn typed_lines_become_events() {
    let (tx, rx) = kanal::bounded_async::<AppEvent>(16);
    let handle = Handle::current();

    std::thread::spawn(move || {
        let input = Cursor::new("cat\n\n:a big cat\n");
        watch_lines(input, &handle, &tx, &CancellationToken::new());
    });

    let mut events = Vec::new();
    let result = timeout(Duration::from_secs(2), async {
        while let Ok(event) = rx.recv().await {
            let quit = matches!(event, AppEvent::Quit);
            events.push(event);
            if quit {
                break;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "Timeout - watcher never sent Quit");

    assert!(matches!(&events[0], AppEvent::Query(q) if q == "cat"));
    assert!(matches!(&events[1], AppEvent::Article(h) if h == "big cat"));
    assert!(matches!(events[2], AppEvent::Quit));
    assert_eq!(events.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_stops_at_quit() {
    let (tx, rx) = kanal::bounded_async::<AppEvent>(16);
    let handle = Handle::current();

    let watcher = std::thread::spawn(move || {
        let input = Cursor::new(":q\nnever sent\n");
        watch_lines(input, &handle, &tx, &CancellationToken::new());
    });

    match timeout(Duration::from_secs(2), rx.recv()).await {
        Ok(Ok(AppEvent::Quit)) => {}
        Ok(Ok(other)) => panic!("Wrong event type: {other:?}"),
        Ok(Err(e)) => panic!("Channel error: {e}"),
        Err(_) => panic!("Timeout - quit never arrived!"),
    }
    assert!(watcher.join().is_ok());
    // The sender went with the watcher, nothing else was queued
    assert!(rx.recv().await.is_err());
}

#[tokio::test]
async fn event_loop_answers_queries_until_quit() {
    let state = fixture_state();
    let controller = AppController::new(state.clone());
    let input = controller.input();
    let output = controller.output();
    let mut tasks = controller.spawn_tasks(state.group(None).unwrap());

    input.send(AppEvent::Query("catalog".into())).await.unwrap();
    input.send(AppEvent::Quit).await.unwrap();

    match timeout(Duration::from_secs(5), tasks.join_next()).await {
        Ok(Some(Ok(Ok(())))) => {}
        Ok(other) => panic!("Event loop failed: {other:?}"),
        Err(_) => panic!("Timeout - event loop never stopped"),
    }

    drop(input);
    drop(controller);
    assert_eq!(drain(output).await, vec!["exact  catalog [en]", "1 results"]);
}

#[tokio::test]
async fn shutdown_stops_the_event_loop() {
    let state = fixture_state();
    let controller = AppController::new(state.clone());
    let mut tasks = controller.spawn_tasks(state.group(None).unwrap());

    controller.shutdown();

    let result = timeout(Duration::from_secs(2), tasks.join_next()).await;
    assert!(
        matches!(result, Ok(Some(Ok(Ok(()))))),
        "Timeout - event loop ignored shutdown"
    );
}
