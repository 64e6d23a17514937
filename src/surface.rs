//! Preview surface
//!
//! The on-screen panel showing rendered output. Hosts implement [`Surface`];
//! the session only ever pushes a complete [`PreviewContent`] to it.

use serde::{Deserialize, Serialize};

/// Everything a surface shows at once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewContent {
    /// Title derived from the bound document
    pub title: String,
    /// Last successfully rendered SVG
    pub svg: Option<String>,
    /// Non-blocking diagnostic from the latest failed render
    pub diagnostic: Option<String>,
}

impl PreviewContent {
    pub fn rendered(title: impl Into<String>, svg: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            svg: Some(svg.into()),
            diagnostic: None,
        }
    }

    /// Failed render: keep showing `last_good` under the diagnostic
    pub fn failed(title: impl Into<String>, last_good: Option<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            svg: last_good,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostic.is_some()
    }
}

/// A live preview panel
pub trait Surface {
    /// Replace what the panel shows
    fn present(&mut self, content: &PreviewContent);

    /// Bring the panel to the front
    fn reveal(&mut self) {}

    /// Close the panel from our side (teardown, editor closed)
    fn dispose(&mut self) {}
}

/// Messages posted by a surface's controls
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceMessage {
    CopyAsPng,
    CopyAsSvg,
}

impl SurfaceMessage {
    /// Decode a surface message
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        assert_eq!(
            SurfaceMessage::parse(r#"{"command":"copyAsPng"}"#).unwrap(),
            SurfaceMessage::CopyAsPng
        );
        assert_eq!(SurfaceMessage::CopyAsSvg.to_json(), r#"{"command":"copyAsSvg"}"#);
        assert!(SurfaceMessage::parse(r#"{"command":"zoomIn"}"#).is_err());
    }

    #[test]
    fn test_failed_keeps_last_good() {
        let content = PreviewContent::failed("Preview: a.dot", Some("<svg/>".into()), "syntax error");
        assert!(content.has_error());
        assert_eq!(content.svg.as_deref(), Some("<svg/>"));
    }
}
