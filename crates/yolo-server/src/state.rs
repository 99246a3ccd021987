use crate::graph::Graph;
use crate::hub::Hub;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use yolo_core::paths;

/// Shared application state passed to all route handlers. Handlers only
/// take read locks on the graph.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub graph: Arc<RwLock<Graph>>,
    pub hub: Hub,
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(root: PathBuf, graph: Graph, static_dir: Option<PathBuf>) -> Self {
        Self {
            root,
            graph: Arc::new(RwLock::new(graph)),
            hub: Hub::spawn(),
            static_dir,
        }
    }

    /// Load the graph from `root`. Without an explicit static directory,
    /// `yolo/web` is used when it exists.
    pub fn load(root: &Path, static_dir: Option<PathBuf>) -> yolo_core::Result<Self> {
        let graph = Graph::load(root)?;
        let static_dir = static_dir.or_else(|| {
            let web = root.join(paths::WEB_DIR);
            web.is_dir().then_some(web)
        });
        Ok(Self::new(root.to_path_buf(), graph, static_dir))
    }
}
