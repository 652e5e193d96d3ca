//! Device permission gate (camera / microphone).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tool::{ToolDescriptor, ToolId, ToolRegistry};

/// A device capability that needs explicit user consent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Camera,
    Microphone,
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Permission::Camera => f.write_str("camera"),
            Permission::Microphone => f.write_str("microphone"),
        }
    }
}

/// What the platform currently knows about a permission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    /// Permanently refused; the platform will not show a prompt again.
    Denied,
    Undetermined,
}

/// Answer to a consent prompt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptDecision {
    Granted,
    Denied,
    Dismissed,
}

/// Platform hook that can query and request permissions.
#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    async fn status(&self, permission: Permission) -> PermissionStatus;

    /// Show the consent prompt and wait for the user.
    async fn request(&self, permission: Permission) -> PromptDecision;
}

/// Decides whether a tool may run.
#[derive(Clone)]
pub struct PermissionGate {
    registry: ToolRegistry,
    prompter: Arc<dyn PermissionPrompter>,
}

impl PermissionGate {
    pub fn new(registry: ToolRegistry, prompter: Arc<dyn PermissionPrompter>) -> Self {
        Self { registry, prompter }
    }

    /// Resolve `true` only when every permission the tool needs is granted.
    ///
    /// Tools without requirements resolve immediately without touching the
    /// prompter. Camera is handled before microphone; the first refusal stops.
    pub async fn authorize(&self, tool: ToolId) -> bool {
        let descriptor = self.registry.descriptor(tool);
        for permission in required(descriptor) {
            if !self.ensure(tool, permission).await {
                return false;
            }
        }
        true
    }

    async fn ensure(&self, tool: ToolId, permission: Permission) -> bool {
        match self.prompter.status(permission).await {
            PermissionStatus::Granted => true,
            PermissionStatus::Denied => {
                tracing::info!(%tool, %permission, "permission previously denied");
                false
            }
            PermissionStatus::Undetermined => {
                let decision = self.prompter.request(permission).await;
                tracing::info!(%tool, %permission, ?decision, "permission prompt answered");
                decision == PromptDecision::Granted
            }
        }
    }
}

fn required(descriptor: &ToolDescriptor) -> impl Iterator<Item = Permission> {
    let camera = descriptor.requires_camera.then_some(Permission::Camera);
    let microphone = descriptor.requires_microphone.then_some(Permission::Microphone);
    camera.into_iter().chain(microphone)
}
