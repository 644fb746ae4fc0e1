//! State façade
//!
//! Caller-facing surface over the orchestrator. Every operation kind keeps
//! its latest [`OperationState`] in a `watch` channel, so a UI or any other
//! observer can render idle, loading, ready and failed states without polling.
//! Every call also returns an [`Outcome`] carrying the same information.
//!
//! Errors never escape as `Err`; messages are surfaced as produced.

use crate::diagnostic::DiagnosticResult;
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::orchestrator::{CountryConfiguration, RepairOrchestrator, ToggleOutcome};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use visa_model::{CountryId, DocumentChecklistItem, DocumentDraft, PackageDraft, VisaPackage};

/// Lifecycle of the latest call of one operation kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum OperationState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        OperationState::Idle
    }
}

impl<T> OperationState<T> {
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, OperationState::Loading)
    }

    /// Data of a ready state
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match self {
            OperationState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Message of a failed state
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            OperationState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Operation kinds tracked by the façade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    FetchPackage,
    FetchDocuments,
    SavePackage,
    SaveDocuments,
    SaveConfiguration,
    Toggle,
    Diagnostic,
    Refresh,
}

/// What a façade call returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    /// Classification of the failure, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> Outcome<T> {
    fn ready(message: String, data: T) -> Self {
        Self {
            success: true,
            message,
            data: Some(data),
            error_kind: None,
        }
    }

    fn failed(message: String, error_kind: Option<ErrorKind>) -> Self {
        Self {
            success: false,
            message,
            data: None,
            error_kind,
        }
    }
}

#[derive(Debug)]
struct Channels {
    fetch_package: watch::Sender<OperationState<Option<VisaPackage>>>,
    fetch_documents: watch::Sender<OperationState<Vec<DocumentChecklistItem>>>,
    save_package: watch::Sender<OperationState<VisaPackage>>,
    save_documents: watch::Sender<OperationState<Vec<DocumentChecklistItem>>>,
    save_configuration: watch::Sender<OperationState<CountryConfiguration>>,
    toggle: watch::Sender<OperationState<ToggleOutcome>>,
    diagnostic: watch::Sender<OperationState<DiagnosticResult>>,
    refresh: watch::Sender<OperationState<DiagnosticResult>>,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            fetch_package: watch::Sender::new(OperationState::Idle),
            fetch_documents: watch::Sender::new(OperationState::Idle),
            save_package: watch::Sender::new(OperationState::Idle),
            save_documents: watch::Sender::new(OperationState::Idle),
            save_configuration: watch::Sender::new(OperationState::Idle),
            toggle: watch::Sender::new(OperationState::Idle),
            diagnostic: watch::Sender::new(OperationState::Idle),
            refresh: watch::Sender::new(OperationState::Idle),
        }
    }
}

/// Observable wrapper around [`RepairOrchestrator`]
#[derive(Debug, Clone)]
pub struct StateFacade {
    orchestrator: Arc<RepairOrchestrator>,
    channels: Arc<Channels>,
}

impl StateFacade {
    /// Create façade; every operation starts idle
    #[must_use]
    pub fn new(orchestrator: Arc<RepairOrchestrator>) -> Self {
        Self {
            orchestrator,
            channels: Arc::new(Channels::default()),
        }
    }

    /// Underlying orchestrator
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &RepairOrchestrator {
        &self.orchestrator
    }

    pub fn watch_fetch_package(&self) -> watch::Receiver<OperationState<Option<VisaPackage>>> {
        self.channels.fetch_package.subscribe()
    }

    pub fn watch_fetch_documents(
        &self,
    ) -> watch::Receiver<OperationState<Vec<DocumentChecklistItem>>> {
        self.channels.fetch_documents.subscribe()
    }

    pub fn watch_save_package(&self) -> watch::Receiver<OperationState<VisaPackage>> {
        self.channels.save_package.subscribe()
    }

    pub fn watch_save_documents(
        &self,
    ) -> watch::Receiver<OperationState<Vec<DocumentChecklistItem>>> {
        self.channels.save_documents.subscribe()
    }

    pub fn watch_save_configuration(
        &self,
    ) -> watch::Receiver<OperationState<CountryConfiguration>> {
        self.channels.save_configuration.subscribe()
    }

    pub fn watch_toggle(&self) -> watch::Receiver<OperationState<ToggleOutcome>> {
        self.channels.toggle.subscribe()
    }

    pub fn watch_diagnostic(&self) -> watch::Receiver<OperationState<DiagnosticResult>> {
        self.channels.diagnostic.subscribe()
    }

    pub fn watch_refresh(&self) -> watch::Receiver<OperationState<DiagnosticResult>> {
        self.channels.refresh.subscribe()
    }

    pub async fn fetch_package(&self, country_id: &CountryId) -> Outcome<Option<VisaPackage>> {
        let message = format!("Loaded package for {country_id}");
        track(
            &self.channels.fetch_package,
            OperationKind::FetchPackage,
            message,
            self.orchestrator.fetch_package(country_id),
        )
        .await
    }

    /// Never fails; a read error shows up as an empty list
    pub async fn fetch_documents(
        &self,
        country_id: &CountryId,
    ) -> Outcome<Vec<DocumentChecklistItem>> {
        let message = format!("Loaded documents for {country_id}");
        let fut = self.orchestrator.fetch_documents(country_id);
        track(
            &self.channels.fetch_documents,
            OperationKind::FetchDocuments,
            message,
            async { Ok::<_, EngineError>(fut.await) },
        )
        .await
    }

    pub async fn save_package(&self, draft: &PackageDraft) -> Outcome<VisaPackage> {
        let message = format!("Package saved for {}", draft.country_id);
        track(
            &self.channels.save_package,
            OperationKind::SavePackage,
            message,
            self.orchestrator.save_package(draft),
        )
        .await
    }

    pub async fn save_documents(
        &self,
        country_id: &CountryId,
        items: &[DocumentDraft],
    ) -> Outcome<Vec<DocumentChecklistItem>> {
        let message = format!("Documents saved for {country_id}");
        track(
            &self.channels.save_documents,
            OperationKind::SaveDocuments,
            message,
            self.orchestrator.save_documents(country_id, items),
        )
        .await
    }

    pub async fn save_country_configuration(
        &self,
        package: &PackageDraft,
        documents: &[DocumentDraft],
    ) -> Outcome<CountryConfiguration> {
        let message = format!("Configuration saved for {}", package.country_id);
        track(
            &self.channels.save_configuration,
            OperationKind::SaveConfiguration,
            message,
            self.orchestrator.save_country_configuration(package, documents),
        )
        .await
    }

    pub async fn toggle_package(
        &self,
        country_id: &CountryId,
        is_active: bool,
    ) -> Outcome<ToggleOutcome> {
        let message = if is_active {
            format!("Package activated for {country_id}")
        } else {
            format!("Package deactivated for {country_id}")
        };
        track(
            &self.channels.toggle,
            OperationKind::Toggle,
            message,
            self.orchestrator
                .toggle_package_and_ensure_documents(country_id, is_active),
        )
        .await
    }

    /// Country diagnostic. A completed run is `Ready` even when it found
    /// problems; `success` on the outcome follows the result.
    pub async fn run_diagnostic(&self, country_id: &CountryId) -> Outcome<DiagnosticResult> {
        let fut = self.orchestrator.run_country_diagnostic(country_id);
        report(&self.channels.diagnostic, OperationKind::Diagnostic, fut).await
    }

    /// Schema refresh followed by a country diagnostic
    pub async fn refresh_schema_and_data(
        &self,
        country_id: &CountryId,
    ) -> Outcome<DiagnosticResult> {
        let fut = self.orchestrator.refresh_schema_and_data(country_id);
        report(&self.channels.refresh, OperationKind::Refresh, fut).await
    }
}

async fn track<T, F>(
    state: &watch::Sender<OperationState<T>>,
    kind: OperationKind,
    message: String,
    fut: F,
) -> Outcome<T>
where
    T: Clone,
    F: Future<Output = EngineResult<T>>,
{
    state.send_replace(OperationState::Loading);
    match fut.await {
        Ok(data) => {
            tracing::debug!(?kind, "operation ready");
            state.send_replace(OperationState::Ready(data.clone()));
            Outcome::ready(message, data)
        }
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(?kind, error = %message, "operation failed");
            state.send_replace(OperationState::Failed(message.clone()));
            Outcome::failed(message, Some(e.kind()))
        }
    }
}

async fn report<F>(
    state: &watch::Sender<OperationState<DiagnosticResult>>,
    kind: OperationKind,
    fut: F,
) -> Outcome<DiagnosticResult>
where
    F: Future<Output = DiagnosticResult>,
{
    state.send_replace(OperationState::Loading);
    let result = fut.await;
    tracing::debug!(?kind, success = result.success, "diagnostic ready");
    state.send_replace(OperationState::Ready(result.clone()));
    Outcome {
        success: result.success,
        message: result.message.clone(),
        error_kind: result.error_kind,
        data: Some(result),
    }
}
