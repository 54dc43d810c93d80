use idolboard_engine::BoardStore;
use std::time::Duration;
use tokio::sync::mpsc;

/// Sends encoded boards to the background writer. Each new state restarts the quiet period, so a
/// burst of edits produces one write carrying the last state.
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl PersistHandle {
    pub fn schedule(&self, state: String) {
        if self.tx.send(state).is_err() {
            log::warn!("board writer has stopped; edit not saved");
        }
    }
}

/// Must be called from inside a tokio runtime.
pub fn spawn_persister(store: BoardStore, board: String, debounce: Duration) -> PersistHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(rx, store, board, debounce));
    PersistHandle { tx }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<String>,
    store: BoardStore,
    board: String,
    debounce: Duration,
) {
    let mut pending: Option<String> = None;
    loop {
        let Some(state) = pending.take() else {
            match rx.recv().await {
                Some(state) => {
                    pending = Some(state);
                    continue;
                }
                None => return,
            }
        };
        tokio::select! {
            next = rx.recv() => match next {
                Some(newer) => pending = Some(newer),
                None => {
                    write(&store, &board, state).await;
                    return;
                }
            },
            _ = tokio::time::sleep(debounce) => write(&store, &board, state).await,
        }
    }
}

async fn write(store: &BoardStore, board: &str, state: String) {
    let store = store.clone();
    let name = board.to_string();
    match tokio::task::spawn_blocking(move || store.save(&name, &state)).await {
        Ok(Ok(rev)) => log::debug!("saved board {board} (rev {rev})"),
        Ok(Err(err)) => log::warn!("failed to save board {board}: {err:#}"),
        Err(err) => log::warn!("board save task failed: {err}"),
    }
}
