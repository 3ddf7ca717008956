//! Store initialization: the mandatory empty collection, then an optional
//! preload of the documents folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use docrag_core::{
    AppConfig, ChunkConfig, Chunker, DocumentFormat, DocumentOrigin, Embedder, RagError, Result,
};
use docrag_store::{SqliteStore, VectorCollection};

use crate::ingest::ingest_document;

/// What happened to the optional preload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// The documents folder does not exist.
    FolderMissing,

    /// The folder exists but produced no documents.
    FolderEmpty { skipped: usize },

    /// At least one document was loaded.
    Loaded {
        documents: usize,
        chunks: usize,
        skipped: usize,
    },

    /// An embedding or storage failure stopped the preload part way.
    Aborted {
        documents: usize,
        chunks: usize,
        reason: String,
    },
}

impl PreloadOutcome {
    /// Documents that made it into the collection.
    pub fn documents(&self) -> usize {
        match self {
            Self::FolderMissing | Self::FolderEmpty { .. } => 0,
            Self::Loaded { documents, .. } | Self::Aborted { documents, .. } => *documents,
        }
    }

    /// Emit one log line describing this outcome.
    pub fn log(&self, folder: &Path) {
        let folder = folder.display();
        match self {
            Self::FolderMissing => {
                info!(%folder, "Documents folder not found, starting with an empty collection")
            }
            Self::FolderEmpty { skipped } => info!(
                %folder,
                skipped,
                "No documents to preload, starting with an empty collection"
            ),
            Self::Loaded {
                documents,
                chunks,
                skipped,
            } => info!(%folder, documents, chunks, skipped, "Preloaded documents"),
            Self::Aborted {
                documents,
                chunks,
                reason,
            } => warn!(
                %folder,
                documents,
                chunks,
                reason = %reason,
                "Preload stopped early, continuing with a partial collection"
            ),
        }
    }
}

/// A ready collection and how its preload went.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub collection: VectorCollection,
    pub preload: PreloadOutcome,
}

/// Build the collection the service answers from.
///
/// Creating the empty collection is mandatory and its failure is returned.
/// The preload that follows never fails; its result is in [`Bootstrap::preload`].
pub async fn initialize_store(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
    chunker: &dyn Chunker,
) -> Result<Bootstrap> {
    let store = Arc::new(SqliteStore::open_memory()?);
    let collection =
        VectorCollection::create(store, embedder, &config.store.collection_name).await?;

    let folder = &config.store.documents_path;
    let preload = preload_folder(
        &collection,
        chunker,
        &config.chunking.to_chunk_config(),
        folder,
    )
    .await;
    preload.log(folder);

    Ok(Bootstrap {
        collection,
        preload,
    })
}

/// Load every supported file under `folder` into `collection`.
///
/// Unreadable or undecodable files are skipped. The first embedding or
/// storage failure stops the walk and leaves what was already loaded.
pub async fn preload_folder(
    collection: &VectorCollection,
    chunker: &dyn Chunker,
    chunk_config: &ChunkConfig,
    folder: &Path,
) -> PreloadOutcome {
    match tokio::fs::metadata(folder).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return PreloadOutcome::Aborted {
                documents: 0,
                chunks: 0,
                reason: format!("{} is not a directory", folder.display()),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return PreloadOutcome::FolderMissing
        }
        Err(e) => {
            return PreloadOutcome::Aborted {
                documents: 0,
                chunks: 0,
                reason: e.to_string(),
            }
        }
    }

    let (files, mut skipped) = match list_documents(folder.to_path_buf()).await {
        Ok(listing) => listing,
        Err(e) => {
            return PreloadOutcome::Aborted {
                documents: 0,
                chunks: 0,
                reason: e.to_string(),
            }
        }
    };
    debug!(folder = %folder.display(), files = files.len(), "Listed documents folder");

    let mut documents = 0;
    let mut chunks = 0;

    for path in files {
        let source = relative_source(folder, &path);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(source = %source, error = %e, "Skipping unreadable file");
                skipped += 1;
                continue;
            }
        };

        match ingest_document(
            collection,
            chunker,
            chunk_config,
            &source,
            &bytes,
            DocumentOrigin::Preload,
        )
        .await
        {
            Ok(report) => {
                documents += 1;
                chunks += report.chunks;
            }
            Err(e) if e.is_client_error() => {
                warn!(source = %source, error = %e, "Skipping file");
                skipped += 1;
            }
            Err(e) => {
                error!(source = %source, error = %e, "Failed to load document");
                return PreloadOutcome::Aborted {
                    documents,
                    chunks,
                    reason: e.to_string(),
                };
            }
        }
    }

    if documents == 0 {
        PreloadOutcome::FolderEmpty { skipped }
    } else {
        PreloadOutcome::Loaded {
            documents,
            chunks,
            skipped,
        }
    }
}

/// Supported files under `root` in file-name order, plus the number of
/// directory entries that could not be read.
async fn list_documents(root: PathBuf) -> Result<(Vec<PathBuf>, usize)> {
    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        let mut unreadable = 0;

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    unreadable += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let supported =
                DocumentFormat::from_filename(&entry.file_name().to_string_lossy()).is_some();
            if supported {
                files.push(entry.into_path());
            } else {
                debug!(path = %entry.path().display(), "Ignoring unsupported file");
            }
        }

        (files, unreadable)
    })
    .await
    .map_err(|e| RagError::internal(format!("folder listing task failed: {e}")))
}

fn relative_source(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
