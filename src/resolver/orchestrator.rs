// Coordinator with single-retry fallback between the two resolvers

use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;

use super::backends::backend_for;
use super::diagnostics::{diagnose_error, FailureReason};
use super::dispatch::DispatchRouter;
use super::errors::ResolveError;
use super::host_table::HostMetadataTable;
use super::models::{Mode, ResolutionRequest, ResolutionResult, ResolveOutcome, ResolverIdentity};
use super::process::{ResolverProcess, RunEvent};
use super::traits::{Collaborators, Prompter, ResolverBackend, UpgradeChoice, Upgrader};

pub const BUSY_MESSAGE: &str = "Another file is being parsed.";

/// Runs one resolution at a time per resolver identity.
///
/// Dropping the coordinator signals any running resolver to die but does not
/// wait for it; call `shutdown` first when the child must be gone on return.
pub struct Coordinator {
    primary: ResolverProcess,
    secondary: ResolverProcess,
    default_resolver: ResolverIdentity,
    router: DispatchRouter,
    prompter: Arc<dyn Prompter>,
    upgrader: Arc<dyn Upgrader>,
}

impl Coordinator {
    pub fn new(
        primary: Arc<dyn ResolverBackend>,
        secondary: Arc<dyn ResolverBackend>,
        default_resolver: ResolverIdentity,
        timeout: Option<Duration>,
        router: DispatchRouter,
        collaborators: &Collaborators,
    ) -> Self {
        Self {
            primary: ResolverProcess::new(primary, timeout),
            secondary: ResolverProcess::new(secondary, timeout),
            default_resolver,
            router,
            prompter: Arc::clone(&collaborators.prompter),
            upgrader: Arc::clone(&collaborators.upgrader),
        }
    }

    /// Wire both resolvers, the router and the collaborators from configuration
    pub fn from_settings(
        settings: &Settings,
        hosts: Arc<HostMetadataTable>,
        collaborators: Collaborators,
    ) -> Self {
        let backend = |identity: ResolverIdentity| {
            let binding = settings.binding(identity);
            backend_for(
                binding.kind,
                binding.program.clone(),
                settings.preferred_stream.clone(),
            )
        };
        let router = DispatchRouter::new(&settings.download_dir, hosts, collaborators.clone());

        Self::new(
            backend(ResolverIdentity::Primary),
            backend(ResolverIdentity::Secondary),
            settings.default_resolver,
            settings.resolve_timeout(),
            router,
            &collaborators,
        )
    }

    pub fn hosts(&self) -> &Arc<HostMetadataTable> {
        self.router.hosts()
    }

    pub fn resolver_name(&self, identity: ResolverIdentity) -> &'static str {
        self.process(identity).name()
    }

    pub fn is_running(&self, identity: ResolverIdentity) -> bool {
        self.process(identity).is_running()
    }

    fn process(&self, identity: ResolverIdentity) -> &ResolverProcess {
        match identity {
            ResolverIdentity::Primary => &self.primary,
            ResolverIdentity::Secondary => &self.secondary,
        }
    }

    /// Resolve `url` with the default resolver, falling back to the other one once.
    ///
    /// Only `Busy`, `DoubleFailure` and dispatch errors are returned; a failed
    /// first attempt is reported to the user and retried.
    pub async fn resolve(&self, url: &str, mode: Mode) -> Result<ResolveOutcome, ResolveError> {
        let mut request = ResolutionRequest::new(url, mode, self.default_resolver);

        loop {
            let process = self.process(request.resolver);
            tracing::info!("[Coordinator] Trying {} ({}) for {}", process.name(), request.resolver, url);

            let failure = match self.attempt(process, &request).await {
                Ok(result) => return self.finish(&request, result),
                Err(e) if e.is_recoverable() => e,
                Err(e) => return Err(e),
            };
            tracing::warn!("[Coordinator] ✗ {}", failure);

            if !request.is_first_attempt() {
                return Err(self.give_up(&request, &failure).await);
            }

            let next = self.process(request.resolver.other());
            self.prompter.warn(&format!(
                "Parsing with {} failed. We will try with {} again.\n\nURL:{}\n\nError Output:\n{}",
                process.name(),
                next.name(),
                url,
                error_output(&failure)
            ));
            request = request.fallback();
        }
    }

    async fn attempt(
        &self,
        process: &ResolverProcess,
        request: &ResolutionRequest,
    ) -> Result<ResolutionResult, ResolveError> {
        let pending = process.start(&request.url).inspect_err(|_| {
            self.prompter.warn(BUSY_MESSAGE);
        })?;

        match pending.wait().await {
            RunEvent::Completed(output) => {
                let result = process.backend().parse(&output.stdout);
                let stderr = output.stderr_text();
                if !result.is_empty() {
                    if !output.status.success() {
                        tracing::warn!(
                            "[Coordinator] {} exited with {} but printed usable streams",
                            process.name(),
                            output.status
                        );
                    }
                    return Ok(result);
                }
                if output.status.success() {
                    Err(ResolveError::EmptyResult {
                        resolver: process.name(),
                        stderr,
                    })
                } else {
                    Err(ResolveError::ProcessFailure {
                        resolver: process.name(),
                        reason: format!("exited with {}", output.status),
                        stderr,
                    })
                }
            }
            RunEvent::LaunchFailed(reason) => Err(ResolveError::ProcessFailure {
                resolver: process.name(),
                reason,
                stderr: String::new(),
            }),
        }
    }

    fn finish(
        &self,
        request: &ResolutionRequest,
        result: ResolutionResult,
    ) -> Result<ResolveOutcome, ResolveError> {
        let resolver_name = self.resolver_name(request.resolver);
        tracing::info!(
            "[Coordinator] ✓ {} resolved {} stream(s) for '{}'",
            resolver_name,
            result.stream_count(),
            result.title
        );

        if let Err(e) = self.router.dispatch(&result, request.mode) {
            self.prompter
                .warn(&format!("Failed to queue streams for {}:\n{}", request.url, e));
            return Err(e);
        }

        Ok(ResolveOutcome {
            resolver: request.resolver,
            resolver_name,
            used_fallback: !request.is_first_attempt(),
            result,
        })
    }

    async fn give_up(&self, request: &ResolutionRequest, failure: &ResolveError) -> ResolveError {
        let output = error_output(failure);
        let advice = match diagnose_error(&failure_text(failure)) {
            Some(reason) if !reason.upgrade_might_help() => "Upgrading the resolvers is unlikely to help.",
            _ => "Upgrading the resolvers may fix this.",
        };
        let choice = self
            .prompter
            .confirm_upgrade(&format!("Parse failed!\nURL:{}\n{}\n\n{}", request.url, output, advice))
            .await;

        if choice == UpgradeChoice::Upgrade {
            self.upgrader.run_upgrade();
        }

        ResolveError::DoubleFailure {
            url: request.url.clone(),
            stderr: failure.stderr().to_string(),
        }
    }

    /// Kill any running resolver and wait for it to exit
    pub async fn shutdown(&self) {
        tokio::join!(self.primary.shutdown(), self.secondary.shutdown());
    }
}

/// Text shown to the user for a failed attempt: stderr, or the failure itself
/// when the tool printed nothing, followed by a hint when one applies
fn error_output(failure: &ResolveError) -> String {
    let body = failure_text(failure);
    match diagnose_error(&body) {
        Some(FailureReason::Unknown) | None => body,
        Some(reason) => format!("{}\n\n{}", body, reason.hint()),
    }
}

fn failure_text(failure: &ResolveError) -> String {
    match failure.stderr() {
        "" => failure.to_string(),
        stderr => stderr.to_string(),
    }
}
