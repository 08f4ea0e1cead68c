//! Reactive id -> blob -> display chain.
//!
//! Three kinds of cell, all `tokio::sync::watch` channels:
//!
//! - the **id** cell, written by the front-end,
//! - the **blob** cell, written by a single driver task that fetches whenever
//!   the id changes,
//! - two **display** cells (name and image), each recomputed by its own task
//!   whenever the blob cell changes.
//!
//! The driver fetches one id at a time. A watch channel only keeps the latest
//! value, so ids typed while a fetch is in flight collapse into one follow-up
//! fetch, and a response whose id is no longer current is dropped.
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::blob::{display_image, display_name, fetch_blob};
use crate::fetch::PokemonSource;

/// Contents of the blob cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Nothing fetched yet.
    Empty,
    Ready { id: u32, blob: String },
    Failed {
        id: u32,
        message: String,
        status: Option<u16>,
    },
}

impl Stage {
    pub fn id(&self) -> Option<u32> {
        match self {
            Stage::Empty => None,
            Stage::Ready { id, .. } | Stage::Failed { id, .. } => Some(*id),
        }
    }

    pub fn blob(&self) -> Option<&str> {
        match self {
            Stage::Ready { blob, .. } => Some(blob.as_str()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Stage::Failed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Name projection. Empty unless the stage holds a blob.
pub fn name_of(stage: &Stage) -> String {
    stage.blob().map(display_name).unwrap_or_default()
}

/// Image projection. `None` unless the stage holds a blob with a sprite.
pub fn image_of(stage: &Stage) -> Option<String> {
    stage.blob().and_then(display_image)
}

pub struct Pipeline {
    id_tx: watch::Sender<u32>,
    blob_rx: watch::Receiver<Stage>,
    name_rx: watch::Receiver<String>,
    image_rx: watch::Receiver<Option<String>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Start the driver and both display tasks. Must be called inside a tokio
    /// runtime. The first fetch for `initial_id` starts immediately.
    pub fn spawn(source: Arc<dyn PokemonSource>, initial_id: u32) -> Self {
        let (id_tx, id_rx) = watch::channel(initial_id);
        let (blob_tx, blob_rx) = watch::channel(Stage::Empty);

        let driver = tokio::spawn(drive(source, id_rx, blob_tx));
        let (name_rx, name_task) = derive(blob_rx.clone(), name_of);
        let (image_rx, image_task) = derive(blob_rx.clone(), image_of);

        Self {
            id_tx,
            blob_rx,
            name_rx,
            image_rx,
            tasks: vec![driver, name_task, image_task],
        }
    }

    /// Write the id cell. Setting the current id again does not refetch.
    pub fn set_id(&self, id: u32) {
        let changed = self.id_tx.send_if_modified(|current| {
            if *current == id {
                false
            } else {
                *current = id;
                true
            }
        });
        if changed {
            tracing::debug!(id, "id changed");
        }
    }

    pub fn id(&self) -> u32 {
        *self.id_tx.borrow()
    }

    pub fn stage(&self) -> Stage {
        self.blob_rx.borrow().clone()
    }

    /// True while the blob cell does not yet reflect the current id.
    pub fn is_loading(&self) -> bool {
        self.blob_rx.borrow().id() != Some(self.id())
    }

    pub fn blob(&self) -> watch::Receiver<Stage> {
        self.blob_rx.clone()
    }

    pub fn name(&self) -> watch::Receiver<String> {
        self.name_rx.clone()
    }

    pub fn image(&self) -> watch::Receiver<Option<String>> {
        self.image_rx.clone()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn drive(
    source: Arc<dyn PokemonSource>,
    mut id_rx: watch::Receiver<u32>,
    blob_tx: watch::Sender<Stage>,
) {
    loop {
        let id = *id_rx.borrow_and_update();
        let outcome = fetch_blob(source.as_ref(), id).await;

        if *id_rx.borrow() != id {
            tracing::debug!(id, "discarding response for stale id");
            continue;
        }

        let stage = match outcome {
            Ok(blob) => Stage::Ready { id, blob },
            Err(err) => {
                tracing::warn!(id, error = %err, "fetch failed");
                Stage::Failed {
                    id,
                    status: err.status(),
                    message: err.to_string(),
                }
            }
        };
        blob_tx.send_replace(stage);

        if id_rx.changed().await.is_err() {
            break;
        }
    }
}

fn derive<T>(
    mut upstream: watch::Receiver<Stage>,
    project: fn(&Stage) -> T,
) -> (watch::Receiver<T>, JoinHandle<()>)
where
    T: PartialEq + Send + Sync + 'static,
{
    let (tx, rx) = watch::channel(project(&upstream.borrow_and_update()));
    let task = tokio::spawn(async move {
        while upstream.changed().await.is_ok() {
            let next = project(&upstream.borrow_and_update());
            tx.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            });
        }
    });
    (rx, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, Result};
    use crate::models::{Pokemon, StatName};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves `{ name: "mon{id}" }` records; ids above 151 are 404s.
    struct Fixture {
        calls: Mutex<Vec<u32>>,
        slow_id: Option<u32>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                slow_id: None,
            }
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn record(id: u32) -> Value {
        let stats: Vec<Value> = StatName::ALL
            .iter()
            .map(|n| json!({ "base_stat": id, "stat": { "name": n.as_ref() } }))
            .collect();
        json!({
            "id": id,
            "name": format!("mon{}", id),
            "sprites": { "front_default": format!("http://sprites/{}.png", id) },
            "stats": stats,
        })
    }

    #[async_trait]
    impl PokemonSource for Fixture {
        async fn pokemon(&self, id: u32) -> Result<Pokemon> {
            self.calls.lock().unwrap().push(id);
            if self.slow_id == Some(id) {
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
            if id == 0 || id > 151 {
                return Err(ApiError::RemoteRequest {
                    url: format!("http://fixture/pokemon/{}", id),
                    status: Some(404),
                    source: None,
                });
            }
            Pokemon::from_value(record(id))
        }

        async fn sprite(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    async fn settle<T, F>(rx: &mut watch::Receiver<T>, pred: F) -> T
    where
        T: Clone,
        F: FnMut(&T) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .expect("cell settled in time")
            .expect("cell still open")
            .clone()
    }

    #[tokio::test]
    async fn id_change_flows_to_both_display_cells() {
        let pipeline = Pipeline::spawn(Arc::new(Fixture::new()), 7);
        let mut name = pipeline.name();
        let mut image = pipeline.image();

        assert_eq!(settle(&mut name, |n| !n.is_empty()).await, "Mon7");
        assert_eq!(
            settle(&mut image, |i| i.is_some()).await.as_deref(),
            Some("http://sprites/7.png")
        );

        pipeline.set_id(25);
        assert_eq!(settle(&mut name, |n| n == "Mon25").await, "Mon25");
        assert_eq!(
            settle(&mut image, |i| i.as_deref() == Some("http://sprites/25.png"))
                .await
                .as_deref(),
            Some("http://sprites/25.png")
        );
        assert!(!pipeline.is_loading());
    }

    #[tokio::test]
    async fn one_fetch_per_actual_change() {
        let fixture = Arc::new(Fixture::new());
        let pipeline = Pipeline::spawn(fixture.clone(), 7);
        let mut blob = pipeline.blob();
        settle(&mut blob, |s| s.id() == Some(7)).await;

        pipeline.set_id(7);
        pipeline.set_id(8);
        settle(&mut blob, |s| s.id() == Some(8)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(fixture.calls(), vec![7, 8]);
    }

    #[tokio::test]
    async fn stale_response_is_never_published() {
        let fixture = Arc::new(Fixture {
            calls: Mutex::new(Vec::new()),
            slow_id: Some(1),
        });
        let pipeline = Pipeline::spawn(fixture.clone(), 1);
        let mut blob = pipeline.blob();
        tokio::time::sleep(Duration::from_millis(20)).await;
        pipeline.set_id(2);

        let stage = settle(&mut blob, |s| *s != Stage::Empty).await;
        assert_eq!(stage.id(), Some(2));
        assert_eq!(fixture.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn upstream_404_renders_fallback() {
        let pipeline = Pipeline::spawn(Arc::new(Fixture::new()), 7);
        let mut name = pipeline.name();
        settle(&mut name, |n| n == "Mon7").await;

        pipeline.set_id(0);
        let mut blob = pipeline.blob();
        let stage = settle(&mut blob, |s| s.id() == Some(0)).await;
        match &stage {
            Stage::Failed { status, message, .. } => {
                assert_eq!(*status, Some(404));
                assert!(message.contains("404"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(settle(&mut name, |n| n.is_empty()).await, "");
        assert_eq!(image_of(&stage), None);
    }
}
