//! Per-session interaction sinks.
//!
//! One writer task per recording session owns the six per-kind CSV
//! files. Producers hand events over a bounded channel with `try_send`,
//! so a slow disk never blocks the caller; events that do not fit are
//! counted as dropped. Buffers are flushed on an interval and on close.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::events::{EventKind, InteractionEvent};

const CHANNEL_CAPACITY: usize = 1024;
const FLUSH_INTERVAL_MS: u64 = 500;

pub struct EventSink;

impl EventSink {
    /// Create the per-kind CSV files with headers and start the writer
    /// task. Any file that fails to open aborts the whole sink; files
    /// created so far are removed.
    pub async fn open(
        output_dir: &Path,
        streamer: &str,
        start_time: DateTime<Utc>,
    ) -> Result<SinkHandle> {
        tokio::fs::create_dir_all(output_dir).await?;
        let stamp = start_time.format("%Y%m%d_%H%M%S");

        let mut paths = HashMap::new();
        let mut writers = HashMap::new();
        for kind in EventKind::ALL {
            let path = output_dir.join(format!("{streamer}_{stamp}_{}.csv", kind.as_str()));
            let open = async {
                let file = tokio::fs::File::create(&path).await?;
                let mut writer = BufWriter::new(file);
                writer.write_all(kind.csv_header().as_bytes()).await?;
                writer.write_all(b"\n").await?;
                Ok::<_, Error>(writer)
            };
            match open.await {
                Ok(writer) => {
                    paths.insert(kind, path.clone());
                    writers.insert(kind, writer);
                }
                Err(e) => {
                    for created in paths.values() {
                        let _ = tokio::fs::remove_file(created).await;
                    }
                    return Err(e);
                }
            }
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(writer_loop(streamer.to_string(), writers, rx));

        Ok(SinkHandle {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            paths,
            task,
        })
    }
}

pub struct SinkHandle {
    tx: mpsc::Sender<InteractionEvent>,
    dropped: Arc<AtomicU64>,
    paths: HashMap<EventKind, PathBuf>,
    task: JoinHandle<()>,
}

impl SinkHandle {
    /// Queue an event for writing without blocking. A full queue drops
    /// the event and bumps the dropped counter.
    pub fn record(&self, event: InteractionEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Lightweight clone of the producer side, for callers that do not
    /// own the sink.
    pub fn recorder(&self) -> SinkRecorder {
        SinkRecorder {
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn paths(&self) -> &HashMap<EventKind, PathBuf> {
        &self.paths
    }

    /// Stop accepting events, flush everything buffered and close the
    /// files.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!(error = %e, "sink writer task panicked");
        }
    }
}

/// Producer side of a sink, detached from its lifecycle.
#[derive(Clone)]
pub struct SinkRecorder {
    tx: mpsc::Sender<InteractionEvent>,
    dropped: Arc<AtomicU64>,
}

impl SinkRecorder {
    pub fn record(&self, event: InteractionEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn writer_loop(
    streamer: String,
    mut writers: HashMap<EventKind, BufWriter<tokio::fs::File>>,
    mut rx: mpsc::Receiver<InteractionEvent>,
) {
    let mut flush_interval =
        tokio::time::interval(std::time::Duration::from_millis(FLUSH_INTERVAL_MS));
    flush_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        let kind = event.kind();
                        if let Some(writer) = writers.get_mut(&kind) {
                            let row = event.csv_row();
                            if let Err(e) = write_row(writer, &row).await {
                                warn!(streamer = %streamer, kind = kind.as_str(), error = %e, "failed to write interaction row");
                            }
                        }
                    }
                    None => break,
                }
            }
            _ = flush_interval.tick() => {
                for writer in writers.values_mut() {
                    let _ = writer.flush().await;
                }
            }
        }
    }

    for (kind, mut writer) in writers.drain() {
        if let Err(e) = writer.flush().await {
            warn!(streamer = %streamer, kind = kind.as_str(), error = %e, "failed to flush sink on close");
        }
        let _ = writer.shutdown().await;
    }
    debug!(streamer = %streamer, "interaction sinks closed");
}

async fn write_row(writer: &mut BufWriter<tokio::fs::File>, row: &str) -> std::io::Result<()> {
    writer.write_all(row.as_bytes()).await?;
    writer.write_all(b"\n").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_all_kind_files_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let sink = EventSink::open(dir.path(), "amy", Utc::now()).await.unwrap();
        assert_eq!(sink.paths().len(), EventKind::ALL.len());
        sink.close().await;

        for kind in EventKind::ALL {
            let path = dir
                .path()
                .read_dir()
                .unwrap()
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .find(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(&format!("_{}.csv", kind.as_str())))
                })
                .expect("file for kind");
            let content = std::fs::read_to_string(path).unwrap();
            assert!(content.starts_with(kind.csv_header()));
        }
    }

    #[tokio::test]
    async fn recorded_events_land_in_their_kind_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = EventSink::open(dir.path(), "amy", Utc::now()).await.unwrap();

        sink.record(InteractionEvent::Comment {
            timestamp: Utc::now(),
            user_id: "u1".into(),
            nickname: "bea".into(),
            comment: "hi there".into(),
            follower_count: 12,
        });
        sink.record(InteractionEvent::Like {
            timestamp: Utc::now(),
            user_id: "u2".into(),
            nickname: "cal".into(),
            count: 5,
            total: 100,
            color: 0,
            effect_cnt: 0,
        });

        let comments_path = sink.paths()[&EventKind::Comments].clone();
        let likes_path = sink.paths()[&EventKind::Likes].clone();
        sink.close().await;

        let comments = std::fs::read_to_string(comments_path).unwrap();
        assert_eq!(comments.lines().count(), 2);
        assert!(comments.contains("hi there"));

        let likes = std::fs::read_to_string(likes_path).unwrap();
        assert!(likes.contains("5,100,0,0"));
    }
}
