use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "rag_local";

/// File layout of a data directory.
pub struct DataPaths {
    pub root: PathBuf,
    pub vectors: PathBuf,
    pub graph: PathBuf,
    pub sqlite: PathBuf,
    pub config: PathBuf,
}

impl DataPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            vectors: root.join("hybrid_vectors.json"),
            graph: root.join("hybrid_graph.json"),
            sqlite: root.join("hybrid.db"),
            config: root.join("config.yaml"),
            root,
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::from_root(PathBuf::from(DEFAULT_DATA_DIR))
    }
}
