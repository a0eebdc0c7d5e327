//! # Meme Session
//!
//! All state of one meme-editing visit: catalog page, active image source,
//! overlay lines, style, and the last composition.
//!
//! Every installed source bumps a generation counter; a composition carries
//! the generation it started with and is discarded if the counter moved in the
//! meantime. Remote URL loads are numbered separately, so the newest request
//! wins without a rejected URL disturbing a composition in flight.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use crate::catalog::{Catalog, Direction, TemplateDescriptor};
use crate::compose::{ComposeRequest, CompositionResult, Compositor, GIF_NOTICE, OutputFormat};
use crate::error::MemeError;
use crate::export::{self, Download, ShareAction, SocialIntent};
use crate::overlay::{
    DEFAULT_LINE_COUNT, OverlayModel, PreviewRect, StyleSettings, StyleUpdate, TextLine, TextPosition,
};
use crate::source::remote::validate_url;
use crate::source::{ActiveImageSource, RemoteResolver, SourceSummary, UploadedImage};

/// Where a session is in the generate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposePhase {
    Idle,
    Rendering,
}

/// Proof that a composition was started at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    run: u64,
}

/// Proof that a remote source request was the latest one when issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTicket(u64);

/// Outcome of a successful generate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateSummary {
    pub format: OutputFormat,
    pub size: usize,
    pub animated_passthrough: bool,
    /// Shown to the user when the preview text was not baked in.
    pub notice: Option<&'static str>,
}

impl GenerateSummary {
    fn from_result(result: &CompositionResult) -> Self {
        Self {
            format: result.format,
            size: result.bytes.len(),
            animated_passthrough: result.animated_passthrough,
            notice: result.animated_passthrough.then_some(GIF_NOTICE),
        }
    }
}

/// Client-facing view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub source: Option<SourceSummary>,
    pub lines: Vec<TextLine>,
    pub style: StyleSettings,
    pub dragging: Option<usize>,
    pub page: usize,
    pub total_pages: usize,
    pub templates: Vec<TemplateDescriptor>,
    pub phase: ComposePhase,
    pub result: Option<GenerateSummary>,
}

pub struct MemeSession {
    catalog: Catalog,
    source: Option<ActiveImageSource>,
    overlay: OverlayModel,
    style: StyleSettings,
    result: Option<CompositionResult>,
    generation: u64,
    source_requests: u64,
    render_run: u64,
    phase: ComposePhase,
    pub last_accessed: Instant,
}

impl MemeSession {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            source: None,
            overlay: OverlayModel::default(),
            style: StyleSettings::default(),
            result: None,
            generation: 0,
            source_requests: 0,
            render_run: 0,
            phase: ComposePhase::Idle,
            last_accessed: Instant::now(),
        }
    }

    /// Update the last accessed time.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn source(&self) -> Option<&ActiveImageSource> {
        self.source.as_ref()
    }

    pub fn overlay(&self) -> &OverlayModel {
        &self.overlay
    }

    pub fn style(&self) -> &StyleSettings {
        &self.style
    }

    pub fn result(&self) -> Option<&CompositionResult> {
        self.result.as_ref()
    }

    pub fn phase(&self) -> ComposePhase {
        self.phase
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Replace the active source and reset everything derived from it.
    fn install_source(&mut self, source: ActiveImageSource) {
        info!(target: "session", "Active source: {} '{}'", source.kind(), source.tag());
        self.overlay.reset(source.line_count());
        self.source = Some(source);
        self.result = None;
        self.source_requests += 1;
        self.bump();
    }

    // ===== Image source =====

    /// Pick a template from the catalog.
    pub fn select_template(&mut self, id: &str) -> Result<(), MemeError> {
        let template = self.catalog.find(id)?.clone();
        self.install_source(ActiveImageSource::Template(template));
        Ok(())
    }

    pub fn use_upload(&mut self, upload: UploadedImage) {
        self.install_source(ActiveImageSource::Upload(upload));
    }

    /// Start a source change that completes later (remote URL loading).
    ///
    /// Supersedes earlier pending requests but leaves the current source and
    /// any composition alone until [`commit_source`](Self::commit_source).
    pub fn begin_source_change(&mut self) -> SourceTicket {
        self.source_requests += 1;
        SourceTicket(self.source_requests)
    }

    /// Install a source resolved outside the session, unless a newer request
    /// was made or another source was installed since the ticket was issued.
    pub fn commit_source(&mut self, ticket: SourceTicket, source: ActiveImageSource) -> Result<(), MemeError> {
        if ticket.0 != self.source_requests {
            debug!(target: "session", "Discarding stale source {} '{}'", source.kind(), source.tag());
            return Err(MemeError::Stale);
        }
        self.install_source(source);
        Ok(())
    }

    /// Resolve and install a remote URL in one step.
    pub async fn load_url(&mut self, resolver: &RemoteResolver, url: &str) -> Result<(), MemeError> {
        validate_url(url)?;
        let ticket = self.begin_source_change();
        let remote = resolver.resolve(url).await?;
        self.commit_source(ticket, ActiveImageSource::Remote(remote))
    }

    // ===== Catalog =====

    /// Move the carousel. A real page change drops a selected template and
    /// any text or result.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        if !self.catalog.navigate(direction) {
            return false;
        }
        if matches!(self.source, Some(ActiveImageSource::Template(_))) {
            self.source = None;
        }
        let count = self.source.as_ref().map_or(DEFAULT_LINE_COUNT, |s| s.line_count());
        self.overlay.reset(count);
        self.result = None;
        self.bump();
        true
    }

    // ===== Overlay =====

    pub fn update_text(&mut self, index: usize, value: impl Into<String>) -> Result<(), MemeError> {
        self.overlay.update_text(index, value)
    }

    pub fn set_rotation(&mut self, index: usize, degrees: f32) -> Result<f32, MemeError> {
        self.overlay.set_rotation(index, degrees)
    }

    pub fn begin_drag(&mut self, index: usize) -> Result<(), MemeError> {
        self.overlay.begin_drag(index)
    }

    pub fn pointer_move(&mut self, client_x: f32, client_y: f32, rect: PreviewRect) -> Option<TextPosition> {
        self.overlay.pointer_move(client_x, client_y, rect)
    }

    pub fn end_drag(&mut self) {
        self.overlay.end_drag();
    }

    pub fn apply_style(&mut self, update: &StyleUpdate) -> StyleSettings {
        self.style.apply(update);
        self.style
    }

    // ===== Generate =====

    /// Validate and snapshot the current state for composition.
    ///
    /// Refuses while another composition is rendering. A validation failure
    /// leaves the session idle.
    pub fn begin_compose(&mut self) -> Result<(Ticket, ComposeRequest), MemeError> {
        if self.phase == ComposePhase::Rendering {
            return Err(MemeError::Busy);
        }
        let request = ComposeRequest::prepare(self.source.as_ref(), &self.overlay, &self.style)?;
        self.phase = ComposePhase::Rendering;
        self.render_run += 1;
        debug!(target: "session", "Composition started at generation {}", self.generation);
        let ticket = Ticket {
            generation: self.generation,
            run: self.render_run,
        };
        Ok((ticket, request))
    }

    /// Abandon a composition whose outcome will never arrive.
    ///
    /// Only the run named by `ticket` is cancelled; a later run keeps rendering.
    pub fn cancel_compose(&mut self, ticket: Ticket) {
        if self.is_current_run(ticket) {
            debug!(target: "session", "Composition run {} abandoned", ticket.run);
            self.phase = ComposePhase::Idle;
        }
    }

    fn is_current_run(&self, ticket: Ticket) -> bool {
        self.phase == ComposePhase::Rendering && ticket.run == self.render_run
    }

    /// Record the outcome of a composition started with `ticket`.
    ///
    /// Failures leave source, text and style untouched. A result whose source
    /// was replaced meanwhile is dropped.
    pub fn finish_compose(
        &mut self,
        ticket: Ticket,
        outcome: Result<CompositionResult, MemeError>,
    ) -> Result<GenerateSummary, MemeError> {
        let current = self.is_current_run(ticket);
        if current {
            self.phase = ComposePhase::Idle;
        }
        let result = outcome?;
        if !current || ticket.generation != self.generation {
            debug!(target: "session", "Discarding composition from generation {}", ticket.generation);
            return Err(MemeError::Stale);
        }
        let summary = GenerateSummary::from_result(&result);
        info!(
            target: "session",
            "Composition succeeded: {:?}, {} bytes",
            summary.format,
            summary.size
        );
        self.result = Some(result);
        Ok(summary)
    }

    /// Run a whole composition while holding the session.
    ///
    /// Dropping the returned future mid-render puts the session back to idle.
    pub async fn generate(&mut self, compositor: &Compositor) -> Result<GenerateSummary, MemeError> {
        let (ticket, request) = self.begin_compose()?;
        let guard = RenderGuard {
            session: self,
            ticket,
            armed: true,
        };
        let outcome = compositor.compose(request).await;
        guard.finish(outcome)
    }

    // ===== Export =====

    fn require_result(&self) -> Result<&CompositionResult, MemeError> {
        self.result
            .as_ref()
            .ok_or_else(|| MemeError::NotFound("no meme generated yet".to_string()))
    }

    pub fn download(&self) -> Result<Download, MemeError> {
        Ok(export::download(self.source.as_ref(), self.require_result()?))
    }

    pub fn share(&self, native_available: bool) -> Result<ShareAction, MemeError> {
        Ok(export::share(self.require_result()?, native_available))
    }

    pub fn social_intent(&self) -> Result<SocialIntent, MemeError> {
        let reference = export::result_reference(self.require_result()?);
        Ok(export::social_intent(&reference))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            source: self.source.as_ref().map(|s| s.summary()),
            lines: self.overlay.lines().to_vec(),
            style: self.style,
            dragging: self.overlay.dragging(),
            page: self.catalog.page(),
            total_pages: self.catalog.total_pages(),
            templates: self.catalog.visible().to_vec(),
            phase: self.phase,
            result: self.result.as_ref().map(GenerateSummary::from_result),
        }
    }
}

/// Cancels its composition run unless finished.
struct RenderGuard<'a> {
    session: &'a mut MemeSession,
    ticket: Ticket,
    armed: bool,
}

impl RenderGuard<'_> {
    fn finish(mut self, outcome: Result<CompositionResult, MemeError>) -> Result<GenerateSummary, MemeError> {
        self.armed = false;
        self.session.finish_compose(self.ticket, outcome)
    }
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.cancel_compose(self.ticket);
        }
    }
}
