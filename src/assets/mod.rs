//! # Asset Loading
//!
//! Decodes textures and models off the render thread. Requests go to
//! short-lived worker threads and results come back over a channel that the
//! frame loop drains with [`AssetLoader::poll`], so objects can be drawn
//! before their textures exist and the satellite appears once it is ready.

pub mod model;
pub mod texture;

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use thiserror::Error;

pub use model::{load_obj, ModelData, ModelMaterial, ModelMesh};
pub use texture::{load_texture, TextureData};

/// Errors produced while loading assets from disk
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to load OBJ '{path}': {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("model '{0}' contains no geometry")]
    EmptyModel(PathBuf),
}

pub type AssetResult<T> = Result<T, AssetError>;

/// Result of a finished load request
#[derive(Debug)]
pub enum AssetEvent {
    TextureLoaded { key: String, data: TextureData },
    ModelLoaded { key: String, data: ModelData },
    Failed { key: String, error: AssetError },
}

impl AssetEvent {
    pub fn key(&self) -> &str {
        match self {
            AssetEvent::TextureLoaded { key, .. }
            | AssetEvent::ModelLoaded { key, .. }
            | AssetEvent::Failed { key, .. } => key,
        }
    }
}

/// Background asset loader
pub struct AssetLoader {
    sender: Sender<AssetEvent>,
    receiver: Receiver<AssetEvent>,
    in_flight: usize,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Queues a texture decode under `key`
    pub fn request_texture(&mut self, key: &str, path: &Path) {
        let key = key.to_string();
        let path = path.to_path_buf();
        self.spawn(key, move |key| match load_texture(&path) {
            Ok(data) => AssetEvent::TextureLoaded { key, data },
            Err(error) => AssetEvent::Failed { key, error },
        });
    }

    /// Queues an OBJ model load under `key`
    pub fn request_model(&mut self, key: &str, path: &Path) {
        let key = key.to_string();
        let path = path.to_path_buf();
        self.spawn(key, move |key| match load_obj(&path) {
            Ok(data) => AssetEvent::ModelLoaded { key, data },
            Err(error) => AssetEvent::Failed { key, error },
        });
    }

    fn spawn<F>(&mut self, key: String, job: F)
    where
        F: FnOnce(String) -> AssetEvent + Send + 'static,
    {
        let sender = self.sender.clone();
        log::debug!("Queued asset '{}'", key);
        self.in_flight += 1;
        thread::spawn(move || {
            // The receiver only disappears when the app is shutting down.
            let _ = sender.send(job(key));
        });
    }

    /// Drains every finished request without blocking
    pub fn poll(&mut self) -> Vec<AssetEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    events.push(event);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Blocks until every queued request has finished
    pub fn wait_all(&mut self) -> Vec<AssetEvent> {
        let mut events = Vec::new();
        while self.in_flight > 0 {
            match self.receiver.recv() {
                Ok(event) => {
                    self.in_flight -= 1;
                    events.push(event);
                }
                Err(_) => break,
            }
        }
        events
    }

    /// Number of requests that have not reported back yet
    pub fn pending(&self) -> usize {
        self.in_flight
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_report_failure_events() {
        let mut loader = AssetLoader::new();
        let missing = std::env::temp_dir().join("earthview_does_not_exist.jpg");
        loader.request_texture("missing", &missing);
        loader.request_model("missing_model", &missing.with_extension("obj"));
        assert_eq!(loader.pending(), 2);

        let events = loader.wait_all();
        assert_eq!(events.len(), 2);
        assert_eq!(loader.pending(), 0);
        for event in &events {
            match event {
                AssetEvent::Failed { error, .. } => {
                    assert!(matches!(
                        error,
                        AssetError::NotFound(_) | AssetError::Obj { .. }
                    ))
                }
                other => panic!("unexpected event {:?}", other.key()),
            }
        }
    }

    #[test]
    fn poll_drains_results_from_every_worker() {
        let mut loader = AssetLoader::new();
        assert!(loader.poll().is_empty());

        let dir = std::env::temp_dir().join("earthview_loader_many");
        for i in 0..4 {
            loader.request_texture(&format!("missing_{}", i), &dir.join(format!("{}.png", i)));
        }

        let mut keys = Vec::new();
        while keys.len() < 4 {
            keys.extend(loader.poll().iter().map(|e| e.key().to_string()));
            std::thread::yield_now();
        }
        keys.sort();
        assert_eq!(keys, ["missing_0", "missing_1", "missing_2", "missing_3"]);
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn texture_requests_arrive_with_their_key() {
        let dir = std::env::temp_dir().join("earthview_loader_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tiny.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut loader = AssetLoader::new();
        loader.request_texture("tiny", &path);
        let events = loader.wait_all();

        match &events[..] {
            [AssetEvent::TextureLoaded { key, data }] => {
                assert_eq!(key, "tiny");
                assert_eq!((data.width, data.height), (2, 2));
            }
            _ => panic!("expected a single texture event"),
        }
        assert!(loader.poll().is_empty());
    }
}
