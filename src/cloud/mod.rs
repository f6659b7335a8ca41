//! Cloud-side collaborators: scopes, the client seam every listing goes
//! through, cancellation, and typed resource models.

pub mod inventory;
pub mod models;
pub mod pager;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError};

pub use models::{AdvisorRecommendation, ArmResource, DiagnosticSetting};
pub use pager::{collect_pages, Page};

/// A subscription the run targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Level at which a scanner lists resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Subscription,
    ResourceGroup,
}

/// The unit a listing call or index build operates over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Subscription {
        subscription_id: String,
    },
    ResourceGroup {
        subscription_id: String,
        resource_group: String,
    },
}

impl Scope {
    pub fn subscription_id(&self) -> &str {
        match self {
            Self::Subscription { subscription_id } => subscription_id,
            Self::ResourceGroup {
                subscription_id, ..
            } => subscription_id,
        }
    }

    pub fn resource_group(&self) -> Option<&str> {
        match self {
            Self::Subscription { .. } => None,
            Self::ResourceGroup { resource_group, .. } => Some(resource_group),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Subscription { .. } => ScopeKind::Subscription,
            Self::ResourceGroup { .. } => ScopeKind::ResourceGroup,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscription { subscription_id } => {
                write!(f, "/subscriptions/{subscription_id}")
            }
            Self::ResourceGroup {
                subscription_id,
                resource_group,
            } => write!(
                f,
                "/subscriptions/{subscription_id}/resourceGroups/{resource_group}"
            ),
        }
    }
}

/// Run-wide cancellation: an explicit flag plus an optional deadline.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Same flag, with a deadline `timeout` from now.
    pub fn expiring_after(&self, timeout: Duration) -> Self {
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ReviewError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Listing operations a scan needs from the cloud provider.
///
/// Page methods take the `next_link` returned by the previous page (or
/// `None` for the first page) and may fail with an [`crate::error::ApiError`].
pub trait CloudClient: Send + Sync {
    fn list_subscriptions(&self) -> Result<Vec<Subscription>>;

    fn list_resource_groups(&self, subscription_id: &str) -> Result<Vec<String>>;

    fn list_resources(
        &self,
        scope: &Scope,
        resource_type: &str,
        next_link: Option<&str>,
    ) -> Result<Page<serde_json::Value>>;

    fn list_diagnostic_settings(
        &self,
        subscription_id: &str,
        next_link: Option<&str>,
    ) -> Result<Page<DiagnosticSetting>>;

    fn list_advisor_recommendations(
        &self,
        subscription_id: &str,
        next_link: Option<&str>,
    ) -> Result<Page<AdvisorRecommendation>>;
}

/// Everything a scanner needs to talk to one subscription.
#[derive(Clone)]
pub struct ScannerConfig {
    pub subscription: Subscription,
    pub client: Arc<dyn CloudClient>,
    pub cancel: CancellationToken,
}

impl fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

/// Extract the resource group segment from a resource id.
///
/// `/subscriptions/s/resourceGroups/rg/providers/...` yields `rg`; ids
/// without the segment yield an empty string.
pub fn resource_group_from_id(id: &str) -> String {
    let mut parts = id.split('/');
    while let Some(part) = parts.next() {
        if part.eq_ignore_ascii_case("resourcegroups") {
            return parts.next().unwrap_or_default().to_string();
        }
    }
    String::new()
}

/// Show only the final seven characters of a subscription id.
pub fn mask_subscription_id(id: &str) -> String {
    let keep = id.len().saturating_sub(7);
    match id.get(keep..) {
        Some(tail) if id.len() > 7 => format!("xxxxxxxx-xxxx-xxxx-xxxx-xxxxx{tail}"),
        _ => id.to_string(),
    }
}
