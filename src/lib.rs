//! Notebook-aware language server.
//!
//! Notebook cells are separate documents to the client, while the analysis in
//! [`lsp`] understands one flat document. Requests on a cell are rewritten
//! into the concatenated notebook and their results mapped back to the cell.

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};
use tracing::{debug, info, warn};

mod convert;
mod document;
mod error;
pub mod lsp;
pub mod notebook;
mod session;
pub(crate) mod settings;

pub use document::{
    CellSplice, CellTextChange, DocumentStore, LineIndex, Notebook, NotebookChange,
    NotebookQuery, TextDocument, Workspace,
};
pub use error::{ConvertError, NotebookError, SettingsError};
pub use session::{ServerState, Session};
pub use settings::{discover_settings, load_settings, try_load_settings, Settings};

pub struct Backend {
    client: Client,
    state: ServerState,
}

impl Backend {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            state: ServerState::new(),
        }
    }

    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::INCREMENTAL,
            )),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            completion_provider: Some(CompletionOptions {
                resolve_provider: Some(false),
                ..Default::default()
            }),
            definition_provider: Some(OneOf::Left(true)),
            references_provider: Some(OneOf::Left(true)),
            document_highlight_provider: Some(OneOf::Left(true)),
            rename_provider: Some(OneOf::Left(true)),
            ..Default::default()
        }
    }

    /// Notebook sync is not part of the static capabilities here, so it is
    /// registered once the client is initialized.
    async fn register_notebook_sync(&self) {
        let settings = &self.state.settings().notebooks;
        if !settings.sync {
            return;
        }
        let registration = convert::notebook_sync_registration(&settings.cell_language);
        if let Err(err) = self.client.register_capability(vec![registration]).await {
            warn!(%err, "failed to register notebook sync");
        }
    }

    async fn did_open_notebook(&self, params: lsp_types::DidOpenNotebookDocumentParams) {
        match convert::notebook_open(params) {
            Ok(open) => self.state.documents.open_notebook(
                open.uri,
                open.version,
                open.cells,
                open.cell_documents,
            ),
            Err(err) => warn!(%err, "ignoring notebook open"),
        }
    }

    async fn did_change_notebook(&self, params: lsp_types::DidChangeNotebookDocumentParams) {
        match convert::notebook_change(params) {
            Ok(change) => self.state.documents.apply_notebook_change(change),
            Err(err) => warn!(%err, "ignoring notebook change"),
        }
    }

    async fn did_close_notebook(&self, params: lsp_types::DidCloseNotebookDocumentParams) {
        let close = match convert::notebook_close(params) {
            Ok(close) => close,
            Err(err) => {
                warn!(%err, "ignoring notebook close");
                return;
            }
        };
        self.state.documents.close_notebook(&close.uri);
        for cell in &close.cells {
            self.state.documents.close(cell);
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|f| f.uri.to_file_path().ok())
            .or_else(|| {
                #[allow(deprecated)]
                params.root_uri.as_ref()?.to_file_path().ok()
            });

        if let Some(root) = workspace_root {
            let (settings, settings_dir) = settings::discover_settings(&root);
            info!(root = %root.display(), settings = %settings_dir.display(), "workspace initialized");
            self.state.set_settings(settings);
        }

        Ok(InitializeResult {
            capabilities: self.capabilities(),
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.register_notebook_sync().await;
        self.client
            .log_message(MessageType::INFO, "notebook language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.state
            .documents
            .open(document.uri, document.text, document.version);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let document = params.text_document;
        if self
            .state
            .documents
            .change(&document.uri, document.version, params.content_changes)
            .is_none()
        {
            debug!(uri = %document.uri, "change for unknown document");
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.state.documents.close(&params.text_document.uri);
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri.clone();
        let hover = notebook::with_notebooks(&self.state, params, |session, params| {
            lsp::hover(session, params)
        });
        Ok(hover.map(|hover| notebook::label_hover(&self.state.documents, &uri, hover)))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        Ok(notebook::with_notebooks(&self.state, params, |session, params| {
            lsp::completion(session, params)
        }))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        Ok(notebook::with_notebooks(&self.state, params, |session, params| {
            lsp::goto_definition(session, params)
        }))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        Ok(notebook::with_notebooks(&self.state, params, |session, params| {
            lsp::references(session, params)
        }))
    }

    async fn document_highlight(
        &self,
        params: DocumentHighlightParams,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        Ok(notebook::with_notebooks(&self.state, params, |session, params| {
            lsp::document_highlight(session, params)
        }))
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        Ok(notebook::with_notebooks(&self.state, params, |session, params| {
            lsp::rename(session, params)
        }))
    }
}

pub fn create_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::build(Backend::new)
        .custom_method("notebookDocument/didOpen", Backend::did_open_notebook)
        .custom_method("notebookDocument/didChange", Backend::did_change_notebook)
        .custom_method("notebookDocument/didClose", Backend::did_close_notebook)
        .finish()
}
