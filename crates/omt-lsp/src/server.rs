//! OMT Language Server
//!
//! Wires the document index, the workspace lookup and the reference resolver
//! to the editor: document links, hover, go to definition, and the document
//! and workspace lifecycle notifications that keep them current.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions, DidChangeWorkspaceFoldersParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    DocumentLink, DocumentLinkOptions, DocumentLinkParams, FileChangeType, FileSystemWatcher,
    GlobPattern, GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverContents, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, MarkedString,
    MessageType, OneOf, Position, Registration, SaveOptions, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, Url, WorkDoneProgressOptions, WorkspaceFoldersServerCapabilities,
    WorkspaceServerCapabilities,
};
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, error, info, warn};

use omt_core::{
    document_links, AnalysisContext, Definition, DiskFileSystem, FileSystem, ReferenceResolver,
    Usage,
};

use crate::config::Settings;
use crate::index::DocumentIndex;
use crate::navigation::{
    hover_text, link_data, path_to_uri, problem_diagnostics, to_core_position, to_locations,
    to_lsp_link, to_lsp_range, uri_to_path, usage_at,
};
use crate::workspace::WorkspaceLookup;

/// LSP Backend state
pub struct Backend {
    /// LSP client for sending notifications
    client: Client,
    /// Declared modules and alias configs of the workspace
    lookup: WorkspaceLookup,
    /// Analyses of open and looked-up documents
    index: DocumentIndex,
    /// Folders announced in `initialize`, scanned once `initialized` arrives
    initial_folders: Mutex<Vec<PathBuf>>,
}

impl Backend {
    /// Create a new backend instance on the real filesystem
    pub fn new(client: Client) -> Self {
        Self::with_fs(client, Arc::new(DiskFileSystem))
    }

    pub fn with_fs(client: Client, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Settings::default();
        let lookup = WorkspaceLookup::new(Arc::clone(&fs), settings.workspace);
        let index = DocumentIndex::new(fs, lookup.aliases(), settings.index.debounce());
        Self {
            client,
            lookup,
            index,
            initial_folders: Mutex::new(Vec::new()),
        }
    }

    fn apply_settings(&self, settings: Settings) {
        self.index.set_debounce(settings.index.debounce());
        self.lookup.set_settings(settings.workspace);
    }

    async fn add_folder(&self, folder: PathBuf) {
        if let Err(e) = self.lookup.add_folder(&folder).await {
            error!("{}", e);
        }
    }

    /// Publish the extraction problem of a document, or clear it
    async fn publish_diagnostics(&self, uri: Url, path: &Path) {
        publish_problem(&self.client, &self.index, uri, path).await;
    }

    /// Current text of a document: the editor's copy, else the file on disk
    async fn document_text(&self, path: &Path) -> Option<String> {
        if let Some(text) = self.index.latest_text(path).await {
            return Some(text);
        }
        match self.lookup.fs().read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// The usage under the cursor and every definition it resolves to
    async fn definitions_at(&self, uri: &Url, position: Position) -> Option<(Usage, Vec<Definition>)> {
        let path = uri_to_path(uri)?;
        let analysis = self.index.get(&path).await?;
        let usage = usage_at(&analysis, to_core_position(position))?.clone();

        let registry = self.lookup.registry();
        let registry = registry.read().await;
        let aliases = self.lookup.aliases();
        let aliases = aliases.read().await;
        let fs = self.lookup.fs();

        let context = AnalysisContext::new(fs.as_ref(), &aliases);
        let definitions = ReferenceResolver::new(context, &registry).resolve(&usage.name, &analysis, &path);
        debug!("'{}' resolved to {} definitions", usage.name, definitions.len());
        Some((usage, definitions))
    }

    async fn register_file_watchers(&self) {
        let settings = self.lookup.settings();
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: [settings.module_glob, settings.alias_config_glob]
                .into_iter()
                .map(|glob| FileSystemWatcher {
                    glob_pattern: GlobPattern::String(glob),
                    kind: None,
                })
                .collect(),
        };
        let register_options = match serde_json::to_value(options) {
            Ok(value) => value,
            Err(e) => {
                error!("Could not encode file watchers: {}", e);
                return;
            }
        };

        let registration = Registration {
            id: "omt-watched-files".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            warn!("Client refused file watchers: {}", e);
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("OMT LSP server initializing");

        #[allow(deprecated)]
        let folders: Vec<PathBuf> = match params.workspace_folders {
            Some(folders) => folders.iter().filter_map(|f| uri_to_path(&f.uri)).collect(),
            None => params.root_uri.as_ref().and_then(uri_to_path).into_iter().collect(),
        };
        if let Some(root) = folders.first() {
            self.apply_settings(Settings::load(root));
        }
        *self
            .initial_folders
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = folders;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(true),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "omt-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("OMT LSP server initialized");

        let folders = std::mem::take(
            &mut *self
                .initial_folders
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for folder in folders {
            self.add_folder(folder).await;
        }
        self.register_file_watchers().await;

        self.client
            .log_message(MessageType::INFO, "OMT language server ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!("OMT LSP server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("Document opened: {}", uri);
        let Some(path) = uri_to_path(&uri) else {
            return;
        };

        let text = params.text_document.text;
        self.lookup.file_changed(&path, Some(&text)).await;
        self.index.open(&path, text).await;
        self.publish_diagnostics(uri, &path).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("Document changed: {}", uri);
        let Some(path) = uri_to_path(&uri) else {
            return;
        };

        // FULL sync: the whole text is in the last change
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.lookup.file_changed(&path, Some(&change.text)).await;
        let recompute = self.index.invalidate(&path, change.text);

        let client = self.client.clone();
        let index = self.index.clone();
        tokio::spawn(async move {
            // a newer edit cancels this recomputation and publishes in its place
            if recompute.await.is_ok() {
                publish_problem(&client, &index, uri, &path).await;
            }
        });
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("Document saved: {}", uri);
        let Some(path) = uri_to_path(&uri) else {
            return;
        };

        if let Some(text) = params.text {
            self.lookup.file_changed(&path, Some(&text)).await;
            self.index.open(&path, text).await;
        }
        self.publish_diagnostics(uri, &path).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("Document closed: {}", uri);
        if let Some(path) = uri_to_path(&uri) {
            self.index.close(&path).await;
        }
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        for removed in &params.event.removed {
            let Some(folder) = uri_to_path(&removed.uri) else {
                continue;
            };
            if let Err(e) = self.lookup.remove_folder(&folder).await {
                error!("{}", e);
            }
        }
        for added in &params.event.added {
            if let Some(folder) = uri_to_path(&added.uri) {
                self.add_folder(folder).await;
            }
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            let Some(path) = uri_to_path(&change.uri) else {
                continue;
            };
            debug!("Watched file event {:?}: {}", change.typ, path.display());

            if change.typ == FileChangeType::DELETED {
                self.lookup.file_deleted(&path).await;
            } else {
                self.lookup.file_changed(&path, None).await;
            }
            self.index.refresh_from_disk(&path).await;
        }
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let uri = params.text_document.uri;
        debug!("Document link request for: {}", uri);
        let Some(path) = uri_to_path(&uri) else {
            return Ok(None);
        };
        let Some(text) = self.document_text(&path).await else {
            return Ok(None);
        };

        let shorthands = {
            let aliases = self.lookup.aliases();
            let aliases = aliases.read().await;
            let fs = self.lookup.fs();
            AnalysisContext::new(fs.as_ref(), &aliases).shorthands_for(&path)
        };
        let links: Vec<DocumentLink> = document_links(&text, &path, &shorthands)
            .iter()
            .map(to_lsp_link)
            .collect();
        debug!("Found {} links in {}", links.len(), uri);

        Ok(Some(links))
    }

    async fn document_link_resolve(&self, mut link: DocumentLink) -> Result<DocumentLink> {
        if link.target.is_some() {
            return Ok(link);
        }
        let Some(data) = link_data(&link) else {
            return Ok(link);
        };

        match self.lookup.module_path(&data.module_name).await {
            Some(path) => link.target = path_to_uri(&path),
            None => debug!("Module '{}' is not declared in the workspace", data.module_name),
        }
        Ok(link)
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        let Some((usage, definitions)) = self
            .definitions_at(&position.text_document.uri, position.position)
            .await
        else {
            return Ok(None);
        };

        Ok(hover_text(&definitions).map(|text| Hover {
            contents: HoverContents::Scalar(MarkedString::String(text)),
            range: Some(to_lsp_range(usage.range)),
        }))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let Some((_, definitions)) = self
            .definitions_at(&position.text_document.uri, position.position)
            .await
        else {
            return Ok(None);
        };

        let locations = to_locations(&definitions);
        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(GotoDefinitionResponse::Array(locations)))
        }
    }
}

/// Publish the stored extraction problem of a document, or clear it
async fn publish_problem(client: &Client, index: &DocumentIndex, uri: Url, path: &Path) {
    let problem = index.problem(path).await;
    let diagnostics = problem_diagnostics(problem.as_ref());
    client.publish_diagnostics(uri, diagnostics, None).await;
}

/// Run the language server over stdio
pub async fn run_server() {
    // Logs go to stderr, stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting OMT Language Server v{}", env!("CARGO_PKG_VERSION"));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
