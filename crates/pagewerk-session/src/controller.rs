// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session controller: one loaded document, its masks and assignments, and the
// operations a front end drives (load, auto-match, edit, export, reset).
//
// State lives behind a std `Mutex` that is never held across an `.await`.
// Whole-document work (parsing, OCR, export) runs on the blocking pool. A
// separate `processing` flag marks a long operation in flight: while it is
// set, load/OCR/export/reset and mask or assignment edits are refused with
// `Busy`, but navigation, zoom, and rendering stay available.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use image::DynamicImage;
use pagewerk_bridge::Capabilities;
use pagewerk_core::config::EngineConfig;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::integrity::{hash_bytes, short_hash};
use pagewerk_core::types::{
    Assignments, AutoMatchSummary, DocumentSource, EditTarget, ExportedFile, Mask, MergePolicy,
    PageIndex, Record, RecordId, SessionId, SourceInfo,
};
use pagewerk_document::ocr::summarize;
use pagewerk_document::{
    CatalogIndex, DragRect, ExportPlan, ExportSettings, MaskStore, PageMatcher, Point, SourcePdf,
    export_as_new_documents, redact_in_place,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::state::{SessionEvent, SessionPhase};

/// Page and zoom of the interactive view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub page: PageIndex,
    pub zoom: f64,
}

/// What a successful [`EditSession::load`] produced.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub info: SourceInfo,
    /// Present when the automatic post-load OCR pass ran.
    pub auto_match: Option<AutoMatchSummary>,
}

/// Point-in-time view of a session for front ends.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub phase: SessionPhase,
    pub processing: bool,
    pub source: Option<SourceInfo>,
    pub edit_target: Option<EditTarget>,
    pub masks: Vec<Mask>,
    pub assignments: Assignments,
    pub view: Option<ViewState>,
}

struct LoadedDocument {
    bytes: Arc<Vec<u8>>,
    pdf: Arc<SourcePdf>,
    info: SourceInfo,
    target: EditTarget,
    store: MaskStore,
    view: ViewState,
}

#[derive(Default)]
struct SessionState {
    phase: SessionPhase,
    document: Option<LoadedDocument>,
    catalog: Arc<Vec<Record>>,
}

struct Shared {
    id: SessionId,
    config: EngineConfig,
    capabilities: Capabilities,
    state: Mutex<SessionState>,
    processing: AtomicBool,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state
            .lock()
            .map_err(|_| PagewerkError::TaskFailed("session state lock poisoned".into()))
    }
}

/// Marks a long operation in flight; cleared on drop, including on error paths.
struct ProcessingGuard {
    shared: Arc<Shared>,
}

impl ProcessingGuard {
    fn acquire(shared: &Arc<Shared>) -> Result<Self> {
        shared
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PagewerkError::Busy)?;
        Ok(Self {
            shared: Arc::clone(shared),
        })
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.shared.processing.store(false, Ordering::Release);
    }
}

/// One page's recognition result.
type PageOutcome = (PageIndex, Result<Option<RecordId>>);

/// Where exported documents go once built.
enum Delivery {
    Return,
    Persist,
    Directory(PathBuf),
}

/// An editing session over one source document.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct EditSession {
    shared: Arc<Shared>,
}

impl EditSession {
    pub fn new(config: EngineConfig, capabilities: Capabilities) -> Self {
        let id = SessionId::new();
        debug!(session = %id, "Session created");
        Self {
            shared: Arc::new(Shared {
                id,
                config,
                capabilities,
                state: Mutex::new(SessionState::default()),
                processing: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared
            .lock()
            .map(|state| state.phase)
            .unwrap_or(SessionPhase::Failed)
    }

    /// A load, OCR run, or export is in flight.
    pub fn is_processing(&self) -> bool {
        self.shared.processing.load(Ordering::Acquire)
    }

    // -- Loading --------------------------------------------------------------

    /// Load the session's one source document and the record catalog.
    ///
    /// `existing` names the file being edited: when present the session
    /// overwrites it in place, otherwise it produces new documents and, if
    /// configured, runs OCR matching straight away. On any failure the
    /// session stays empty.
    #[instrument(skip_all, fields(session = %self.shared.id))]
    pub async fn load(&self, source: DocumentSource, existing: Option<PathBuf>) -> Result<LoadOutcome> {
        let _guard = ProcessingGuard::acquire(&self.shared)?;
        self.shared.lock()?.phase.apply(SessionEvent::SourceLoaded)?;

        let capabilities = self.shared.capabilities.clone();
        let (bytes, name) = match source {
            DocumentSource::Bytes { bytes, name } => (bytes, name),
            DocumentSource::Reference(reference) => {
                let name = file_name_of(Path::new(&reference));
                let fetcher = Arc::clone(&capabilities.fetcher);
                let bytes = blocking(move || fetcher.fetch_document(&reference)).await?;
                (bytes, name)
            }
        };
        let name = name.or_else(|| existing.as_deref().and_then(file_name_of));
        let bytes = Arc::new(bytes);

        let parse_bytes = Arc::clone(&bytes);
        let catalog_source = Arc::clone(&capabilities.catalog);
        let (pdf, catalog) = blocking(move || {
            let pdf = SourcePdf::from_bytes(&parse_bytes)?;
            let catalog = catalog_source.fetch_record_catalog()?;
            Ok((pdf, catalog))
        })
        .await?;

        let info = SourceInfo {
            name,
            page_count: pdf.page_count(),
            page_sizes: pdf.page_sizes(),
            fingerprint: hash_bytes(&bytes),
            loaded_at: Utc::now(),
        };
        let target = match existing {
            Some(original) => EditTarget::OverwriteInPlace { original },
            None => EditTarget::NewDocuments,
        };
        let auto_match = target == EditTarget::NewDocuments && self.shared.config.auto_match_on_load;

        info!(
            pages = info.page_count,
            records = catalog.len(),
            fingerprint = short_hash(&info.fingerprint),
            target = target.label(),
            "Document loaded"
        );

        {
            let mut state = self.shared.lock()?;
            let mut phase = state.phase.apply(SessionEvent::SourceLoaded)?;
            if auto_match {
                phase = phase.apply(SessionEvent::AutoMatchStarted)?;
            }
            state.phase = phase;
            state.catalog = Arc::new(catalog);
            state.document = Some(LoadedDocument {
                bytes,
                store: MaskStore::new(info.page_count, self.shared.config.min_mask_size),
                pdf: Arc::new(pdf),
                info: info.clone(),
                target,
                view: ViewState {
                    page: PageIndex(1),
                    zoom: self.initial_zoom(),
                },
            });
        }

        let summary = if auto_match {
            match self.match_and_merge(true).await {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(%err, "Automatic matching failed, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        {
            let mut state = self.shared.lock()?;
            state.phase = state.phase.apply(SessionEvent::Ready)?;
        }
        Ok(LoadOutcome {
            info,
            auto_match: summary,
        })
    }

    fn initial_zoom(&self) -> f64 {
        let zoom = self.shared.config.initial_zoom;
        if zoom.is_finite() && zoom > 0.0 {
            zoom
        } else {
            warn!(zoom, "Configured initial zoom is not usable, using 1.0");
            1.0
        }
    }

    /// Re-fetch the record catalog without touching masks or assignments.
    #[instrument(skip_all, fields(session = %self.shared.id))]
    pub async fn refresh_catalog(&self) -> Result<usize> {
        let source = Arc::clone(&self.shared.capabilities.catalog);
        let catalog = blocking(move || source.fetch_record_catalog()).await?;
        let count = catalog.len();
        self.shared.lock()?.catalog = Arc::new(catalog);
        info!(records = count, "Catalog refreshed");
        Ok(count)
    }

    pub fn catalog(&self) -> Result<Arc<Vec<Record>>> {
        Ok(Arc::clone(&self.shared.lock()?.catalog))
    }

    pub fn source_info(&self) -> Option<SourceInfo> {
        let state = self.shared.lock().ok()?;
        state.document.as_ref().map(|doc| doc.info.clone())
    }

    // -- OCR ------------------------------------------------------------------

    /// Recognise every page and fold the matches into the assignments.
    ///
    /// A foreground run (`background == false`) is an explicit request, so
    /// its matches overwrite existing assignments; a background run merges
    /// with the configured policy. Pages that fail are reported in the
    /// summary; pages without a match keep their current assignment.
    #[instrument(skip_all, fields(session = %self.shared.id, background = background))]
    pub async fn run_auto_match(&self, background: bool) -> Result<AutoMatchSummary> {
        let _guard = ProcessingGuard::acquire(&self.shared)?;
        {
            let state = self.shared.lock()?;
            if state.document.is_none() {
                return Err(PagewerkError::NoSourceLoaded);
            }
            state.phase.apply(SessionEvent::Edited)?;
        }
        self.match_and_merge(background).await
    }

    /// OCR every page and merge. The caller holds the processing guard.
    async fn match_and_merge(&self, background: bool) -> Result<AutoMatchSummary> {
        let (bytes, page_count, catalog) = {
            let state = self.shared.lock()?;
            let doc = state.document.as_ref().ok_or(PagewerkError::NoSourceLoaded)?;
            (Arc::clone(&doc.bytes), doc.info.page_count, Arc::clone(&state.catalog))
        };

        let summary = self.match_pages(bytes, page_count, &catalog).await;

        let policy = if background {
            self.shared.config.auto_match_merge
        } else {
            MergePolicy::Overwrite
        };
        let mut state = self.shared.lock()?;
        let phase = state.phase;
        let doc = state.document.as_mut().ok_or(PagewerkError::NoSourceLoaded)?;
        let changed = doc.store.merge_assignments(&summary.matches, policy)?;
        if changed > 0 && phase.is_editable() {
            state.phase = phase.apply(SessionEvent::Edited)?;
        }

        info!(
            examined = summary.examined_pages,
            matched = summary.matched_count,
            failed = summary.failures.len(),
            changed,
            "Auto-match finished"
        );
        Ok(summary)
    }

    /// Recognise pages on a bounded pool of blocking workers.
    async fn match_pages(
        &self,
        bytes: Arc<Vec<u8>>,
        page_count: u32,
        catalog: &[Record],
    ) -> AutoMatchSummary {
        let index = Arc::new(CatalogIndex::new(catalog));
        if index.is_empty() {
            info!("Catalog has no matchable entries, skipping OCR");
            return AutoMatchSummary::default();
        }

        let capabilities = &self.shared.capabilities;
        let matcher = Arc::new(PageMatcher::new(
            Arc::clone(&capabilities.rasterizer),
            Arc::clone(&capabilities.recognizer),
            &self.shared.config,
        ));
        let permits = Arc::new(Semaphore::new(self.shared.config.effective_ocr_workers()));

        let mut tasks = JoinSet::new();
        let mut pages = HashMap::with_capacity(page_count as usize);
        for n in 1..=page_count {
            let page = PageIndex(n);
            let (matcher, index, bytes, permits) = (
                Arc::clone(&matcher),
                Arc::clone(&index),
                Arc::clone(&bytes),
                Arc::clone(&permits),
            );
            let handle = tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        blocking(move || matcher.match_page(&bytes, page, &index)).await
                    }
                    Err(_) => Err(PagewerkError::TaskFailed("OCR worker pool closed".into())),
                };
                (page, outcome)
            });
            pages.insert(handle.id(), page);
        }

        summarize(join_pages(tasks, pages).await)
    }

    // -- Editing --------------------------------------------------------------

    /// Run `edit` against the store if the session accepts edits right now.
    fn edit<T>(&self, edit: impl FnOnce(&mut MaskStore, &ViewState) -> Result<T>) -> Result<T> {
        let mut state = self.shared.lock()?;
        if self.is_processing() {
            return Err(PagewerkError::Busy);
        }
        let phase = state.phase;
        let doc = state.document.as_mut().ok_or(PagewerkError::NoSourceLoaded)?;
        let next = phase.apply(SessionEvent::Edited)?;
        let output = edit(&mut doc.store, &doc.view)?;
        state.phase = next;
        Ok(output)
    }

    /// Add a mask in document space. Returns its position on its page, or
    /// `None` when it was too small to keep.
    pub fn add_mask(&self, mask: Mask) -> Result<Option<usize>> {
        self.edit(|store, _| store.add_mask(mask))
    }

    /// Add the mask described by a drag in interaction space at the current zoom.
    pub fn add_mask_from_drag(&self, page: PageIndex, start: Point, end: Point) -> Result<Option<usize>> {
        self.edit(|store, view| {
            let mask = DragRect::from_points(start, end).to_mask(page, view.zoom);
            debug!(page = page.get(), zoom = view.zoom, ?mask, "Drag converted");
            store.add_mask(mask)
        })
    }

    pub fn remove_mask(&self, page: PageIndex, local_index: usize) -> Result<Mask> {
        self.edit(|store, _| store.remove_mask(page, local_index))
    }

    pub fn set_assignment(&self, page: PageIndex, record: Option<RecordId>) -> Result<Option<RecordId>> {
        self.edit(|store, _| store.set_assignment(page, record))
    }

    pub fn merge_assignments(&self, incoming: &Assignments, policy: MergePolicy) -> Result<usize> {
        self.edit(|store, _| store.merge_assignments(incoming, policy))
    }

    // -- View -----------------------------------------------------------------

    pub fn navigate_to(&self, page: PageIndex) -> Result<()> {
        let mut state = self.shared.lock()?;
        let doc = state.document.as_mut().ok_or(PagewerkError::NoSourceLoaded)?;
        if !page.is_within(doc.info.page_count) {
            return Err(PagewerkError::PageOutOfRange {
                page: page.get(),
                page_count: doc.info.page_count,
            });
        }
        doc.view.page = page;
        Ok(())
    }

    pub fn set_zoom(&self, zoom: f64) -> Result<()> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(PagewerkError::InvalidZoom(zoom));
        }
        let mut state = self.shared.lock()?;
        let doc = state.document.as_mut().ok_or(PagewerkError::NoSourceLoaded)?;
        doc.view.zoom = zoom;
        Ok(())
    }

    pub fn view(&self) -> Result<ViewState> {
        let state = self.shared.lock()?;
        state
            .document
            .as_ref()
            .map(|doc| doc.view)
            .ok_or(PagewerkError::NoSourceLoaded)
    }

    /// Rasterise the current page at the current zoom for display.
    pub async fn render_page(&self) -> Result<DynamicImage> {
        let (bytes, view) = {
            let state = self.shared.lock()?;
            let doc = state.document.as_ref().ok_or(PagewerkError::NoSourceLoaded)?;
            (Arc::clone(&doc.bytes), doc.view)
        };
        let rasterizer = Arc::clone(&self.shared.capabilities.rasterizer);
        blocking(move || rasterizer.rasterize(&bytes, view.page, view.zoom as f32)).await
    }

    // -- Export ---------------------------------------------------------------

    /// Build one PDF per assigned record and hand them back in memory.
    pub async fn export_as_new_documents(&self) -> Result<Vec<ExportedFile>> {
        self.export(Delivery::Return).await
    }

    /// Build the record documents and hand them to the export sink.
    pub async fn export_and_persist(&self) -> Result<Vec<ExportedFile>> {
        self.export(Delivery::Persist).await
    }

    /// Build the record documents and write each into `directory`.
    pub async fn export_to_directory(&self, directory: impl Into<PathBuf>) -> Result<Vec<ExportedFile>> {
        self.export(Delivery::Directory(directory.into())).await
    }

    #[instrument(skip_all, fields(session = %self.shared.id))]
    async fn export(&self, delivery: Delivery) -> Result<Vec<ExportedFile>> {
        let _guard = ProcessingGuard::acquire(&self.shared)?;
        let (pdf, plan, masks, catalog) = {
            let mut state = self.shared.lock()?;
            let doc = state.document.as_ref().ok_or(PagewerkError::NoSourceLoaded)?;
            if doc.target != EditTarget::NewDocuments {
                return Err(PagewerkError::WrongEditTarget {
                    expected: EditTarget::NewDocuments.label(),
                });
            }
            // Rejects an empty plan before any document work.
            let plan = ExportPlan::from_assignments(doc.store.assignments())?;
            let next = state.phase.apply(SessionEvent::ExportStarted)?;
            let inputs = (
                Arc::clone(&doc.pdf),
                plan,
                doc.store.masks().to_vec(),
                Arc::clone(&state.catalog),
            );
            state.phase = next;
            inputs
        };

        info!(records = plan.len(), masks = masks.len(), "Export started");
        let settings = ExportSettings::from(&self.shared.config);
        let capabilities = self.shared.capabilities.clone();
        let result = blocking(move || {
            let files = export_as_new_documents(&pdf, &plan, &masks, &catalog, &settings)?;
            match &delivery {
                Delivery::Return => {}
                Delivery::Persist => capabilities.export_sink.persist_exported_files(&files)?,
                Delivery::Directory(directory) => {
                    for file in &files {
                        capabilities
                            .file_writer
                            .write_file(&file.bytes, &file.file_name, directory)?;
                    }
                }
            }
            Ok(files)
        })
        .await;

        self.finish_export(result)
    }

    /// Burn the masks into the source and write it over `file_path`.
    ///
    /// Only valid for sessions opened on an existing file. Page count and
    /// order are preserved.
    #[instrument(skip_all, fields(session = %self.shared.id, path = %file_path.as_ref().display()))]
    pub async fn overwrite_in_place(&self, file_path: impl AsRef<Path>) -> Result<PathBuf> {
        self.overwrite(Some(file_path.as_ref().to_path_buf())).await
    }

    /// [`overwrite_in_place`](Self::overwrite_in_place) onto the file the
    /// session was opened on.
    #[instrument(skip_all, fields(session = %self.shared.id))]
    pub async fn overwrite_original(&self) -> Result<PathBuf> {
        self.overwrite(None).await
    }

    async fn overwrite(&self, file_path: Option<PathBuf>) -> Result<PathBuf> {
        let _guard = ProcessingGuard::acquire(&self.shared)?;
        let (pdf, masks, directory, file_name) = {
            let mut state = self.shared.lock()?;
            let doc = state.document.as_ref().ok_or(PagewerkError::NoSourceLoaded)?;
            let EditTarget::OverwriteInPlace { original } = &doc.target else {
                return Err(PagewerkError::WrongEditTarget {
                    expected: "overwrite-in-place",
                });
            };
            let (directory, file_name) = split_path(file_path.as_deref().unwrap_or(original))?;
            let next = state.phase.apply(SessionEvent::ExportStarted)?;
            let inputs = (
                Arc::clone(&doc.pdf),
                doc.store.masks().to_vec(),
                directory,
                file_name,
            );
            state.phase = next;
            inputs
        };

        let settings = ExportSettings::from(&self.shared.config);
        let writer = Arc::clone(&self.shared.capabilities.file_writer);
        let result = blocking(move || {
            let bytes = redact_in_place(&pdf, &masks, &settings)?;
            writer.write_file(&bytes, &file_name, &directory)
        })
        .await;

        self.finish_export(result)
    }

    /// Record the outcome of an export. Masks and assignments are untouched
    /// either way.
    fn finish_export<T>(&self, result: Result<T>) -> Result<T> {
        let mut state = self.shared.lock()?;
        let event = match &result {
            Ok(_) => {
                info!("Export finished");
                SessionEvent::ExportSucceeded
            }
            Err(err) => {
                error!(%err, "Export failed");
                SessionEvent::ExportFailed
            }
        };
        state.phase = state.phase.apply(event)?;
        result
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Discard the source, masks, assignments, and catalog.
    #[instrument(skip_all, fields(session = %self.shared.id))]
    pub fn reset(&self) -> Result<()> {
        let mut state = self.shared.lock()?;
        if self.is_processing() {
            return Err(PagewerkError::Busy);
        }
        let next = state.phase.apply(SessionEvent::Reset)?;
        *state = SessionState {
            phase: next,
            ..SessionState::default()
        };
        info!("Session reset");
        Ok(())
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let state = self.shared.lock()?;
        let doc = state.document.as_ref();
        Ok(SessionSnapshot {
            id: self.shared.id,
            phase: state.phase,
            processing: self.is_processing(),
            source: doc.map(|doc| doc.info.clone()),
            edit_target: doc.map(|doc| doc.target.clone()),
            masks: doc.map(|doc| doc.store.masks().to_vec()).unwrap_or_default(),
            assignments: doc
                .map(|doc| doc.store.assignments().clone())
                .unwrap_or_default(),
            view: doc.map(|doc| doc.view),
        })
    }
}

/// Drain `tasks`. A task that panicked or was cancelled becomes a failure
/// for the page it was working on.
async fn join_pages(
    mut tasks: JoinSet<PageOutcome>,
    pages: HashMap<task::Id, PageIndex>,
) -> Vec<PageOutcome> {
    let mut outcomes = Vec::with_capacity(pages.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => match pages.get(&err.id()) {
                Some(page) => {
                    error!(page = page.get(), %err, "OCR task failed");
                    outcomes.push((*page, Err(PagewerkError::TaskFailed(err.to_string()))));
                }
                None => error!(%err, "OCR task failed for an unknown page"),
            },
        }
    }
    outcomes
}

/// Run blocking work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| PagewerkError::TaskFailed(err.to_string()))?
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// Split a target path into its directory (`.` when bare) and file name.
fn split_path(path: &Path) -> Result<(PathBuf, String)> {
    let file_name = file_name_of(path).ok_or_else(|| {
        PagewerkError::Storage(format!("{} does not name a file", path.display()))
    })?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, file_name))
}
