//! Network and view resolution.
//!
//! One resolver serves both call shapes: explicit identifiers, or the host's
//! current network and view substituted in their place. Every failure yields
//! exactly one 404 error record.

#![allow(missing_docs)]

use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;
use tracing::warn;

use crate::envelope::{ErrorCode, ErrorRecord};

pub const NOT_FOUND: u16 = 404;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHandle {
    pub suid: i64,
    pub name: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewHandle {
    pub suid: i64,
    pub network_suid: i64,
}

/// Network and view resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub network: NetworkHandle,
    pub view: ViewHandle,
}

/// Explicit network/view identifiers from the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetIds {
    pub network: i64,
    pub view: i64,
}

/// Read-only access to the host's networks, views and current selection.
pub trait NetworkRegistry: Send + Sync {
    fn network(&self, suid: i64) -> Option<NetworkHandle>;
    /// Views of `network` in registration order.
    fn views(&self, network: &NetworkHandle) -> Vec<ViewHandle>;
    fn current_network(&self) -> Option<NetworkHandle>;
    fn current_view(&self) -> Option<ViewHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    CurrentNetwork,
    CurrentView,
    Network,
    NoViews,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .record.message)]
pub struct ResolveError {
    pub kind: NotFound,
    pub record: ErrorRecord,
}

impl ResolveError {
    fn new(kind: NotFound, resource_path: &str, code: ErrorCode, message: String) -> Self {
        warn!("{message}");
        Self {
            kind,
            record: ErrorRecord::new(NOT_FOUND, resource_path, code, message),
        }
    }
}

#[derive(Clone)]
pub struct TargetResolver {
    registry: Arc<dyn NetworkRegistry>,
}

impl TargetResolver {
    #[must_use]
    pub fn new(registry: Arc<dyn NetworkRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves a network by id, or the current network when `suid` is `None`.
    pub fn resolve_network(
        &self,
        resource_path: &str,
        suid: Option<i64>,
    ) -> Result<NetworkHandle, ResolveError> {
        match suid {
            Some(suid) => self.registry.network(suid).ok_or_else(|| {
                ResolveError::new(
                    NotFound::Network,
                    resource_path,
                    ErrorCode::NetworkNotFound,
                    format!("Could not find network with SUID: {suid}"),
                )
            }),
            None => self.registry.current_network().ok_or_else(|| {
                ResolveError::new(
                    NotFound::CurrentNetwork,
                    resource_path,
                    ErrorCode::NetworkNotFound,
                    "Could not find current Network".to_string(),
                )
            }),
        }
    }

    /// Resolves network and view; `None` substitutes the current selection.
    pub fn resolve(
        &self,
        resource_path: &str,
        ids: Option<TargetIds>,
    ) -> Result<Target, ResolveError> {
        let (network, view_suid) = match ids {
            Some(ids) => (self.resolve_network(resource_path, Some(ids.network))?, ids.view),
            None => {
                let network = self.resolve_network(resource_path, None)?;
                let view = self.registry.current_view().ok_or_else(|| {
                    ResolveError::new(
                        NotFound::CurrentView,
                        resource_path,
                        ErrorCode::NetworkViewNotFound,
                        "Could not find current Network View".to_string(),
                    )
                })?;
                (network, view.suid)
            }
        };
        let view = self.resolve_view(resource_path, &network, view_suid)?;
        Ok(Target { network, view })
    }

    fn resolve_view(
        &self,
        resource_path: &str,
        network: &NetworkHandle,
        view_suid: i64,
    ) -> Result<ViewHandle, ResolveError> {
        let views = self.registry.views(network);
        if views.is_empty() {
            return Err(ResolveError::new(
                NotFound::NoViews,
                resource_path,
                ErrorCode::NetworkViewNotFound,
                format!("No views are available for network with SUID: {}", network.suid),
            ));
        }
        views
            .into_iter()
            .find(|view| view.suid == view_suid)
            .ok_or_else(|| {
                ResolveError::new(
                    NotFound::View,
                    resource_path,
                    ErrorCode::NetworkViewNotFound,
                    format!(
                        "Could not find network view with SUID: {view_suid} for network with SUID: {}",
                        network.suid
                    ),
                )
            })
    }
}
