//! Static catalog of the six search/capture modalities.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::Endpoint;
use crate::error::SearchError;

/// One of the six supported query mechanisms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    QuickSearch,
    DeepSearch,
    ImageRead,
    QrScan,
    BarcodeScan,
    VoiceInput,
}

impl ToolId {
    /// All tools, in display order.
    pub const ALL: [ToolId; 6] = [
        ToolId::QuickSearch,
        ToolId::DeepSearch,
        ToolId::ImageRead,
        ToolId::QrScan,
        ToolId::BarcodeScan,
        ToolId::VoiceInput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::QuickSearch => "quick_search",
            ToolId::DeepSearch => "deep_search",
            ToolId::ImageRead => "image_read",
            ToolId::QrScan => "qr_scan",
            ToolId::BarcodeScan => "barcode_scan",
            ToolId::VoiceInput => "voice_input",
        }
    }

    /// Backend capability this tool calls. 1:1 over all tools.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ToolId::QuickSearch => Endpoint::QuickSearch,
            ToolId::DeepSearch => Endpoint::DeepSearch,
            ToolId::ImageRead => Endpoint::ImageRead,
            ToolId::QrScan => Endpoint::QrScan,
            ToolId::BarcodeScan => Endpoint::BarcodeScan,
            ToolId::VoiceInput => Endpoint::VoiceInput,
        }
    }

    /// Scan tools may run without a text query.
    pub fn is_scan(&self) -> bool {
        matches!(self, ToolId::QrScan | ToolId::BarcodeScan)
    }
}

impl core::fmt::Display for ToolId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolId::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SearchError::UnknownTool(s.to_string()))
    }
}

/// Device permissions a tool needs before it may run.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub camera: bool,
    pub microphone: bool,
}

impl PermissionSet {
    pub fn is_empty(&self) -> bool {
        !self.camera && !self.microphone
    }
}

/// Immutable descriptor of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub label: &'static str,
    pub icon: &'static str,
    pub requires_camera: bool,
    pub requires_microphone: bool,
}

impl ToolDescriptor {
    pub fn permissions(&self) -> PermissionSet {
        PermissionSet {
            camera: self.requires_camera,
            microphone: self.requires_microphone,
        }
    }
}

const CATALOG: [ToolDescriptor; 6] = [
    ToolDescriptor {
        id: ToolId::QuickSearch,
        label: "Quick Search",
        icon: "search",
        requires_camera: false,
        requires_microphone: false,
    },
    ToolDescriptor {
        id: ToolId::DeepSearch,
        label: "Deep Search",
        icon: "sparkles",
        requires_camera: false,
        requires_microphone: false,
    },
    ToolDescriptor {
        id: ToolId::ImageRead,
        label: "Image Read",
        icon: "image",
        requires_camera: true,
        requires_microphone: false,
    },
    ToolDescriptor {
        id: ToolId::QrScan,
        label: "QR Scan",
        icon: "qr-code",
        requires_camera: true,
        requires_microphone: false,
    },
    ToolDescriptor {
        id: ToolId::BarcodeScan,
        label: "Barcode Scan",
        icon: "barcode",
        requires_camera: true,
        requires_microphone: false,
    },
    ToolDescriptor {
        id: ToolId::VoiceInput,
        label: "Voice Input",
        icon: "mic",
        requires_camera: false,
        requires_microphone: true,
    },
];

/// Read-only registry of tool descriptors.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: &'static [ToolDescriptor],
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolRegistry {
    /// The fixed six-entry catalog.
    pub fn builtin() -> Self {
        Self { tools: &CATALOG }
    }

    /// Descriptors in stable display order.
    pub fn list(&self) -> &[ToolDescriptor] {
        self.tools
    }

    pub fn get(&self, tool_id: &str) -> Result<&ToolDescriptor, SearchError> {
        self.tools
            .iter()
            .find(|t| t.id.as_str() == tool_id)
            .ok_or_else(|| SearchError::UnknownTool(tool_id.to_string()))
    }

    /// Infallible lookup for an already-typed id.
    pub fn descriptor(&self, tool: ToolId) -> &ToolDescriptor {
        // Catalog order matches the ToolId discriminants.
        &self.tools[tool as usize]
    }

    pub fn permissions_for(&self, tool_id: &str) -> Result<PermissionSet, SearchError> {
        self.get(tool_id).map(ToolDescriptor::permissions)
    }
}
