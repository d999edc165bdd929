//! The headless-renderer collaborator.
//!
//! Rendering markup to a screenshot is out of this crate's scope — it's
//! modeled as a trait seam so the verification loop can run against a real
//! headless browser in production and a fake in tests.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{NodeBridgeError, Result};

/// Renders HTML/CSS markup to a raster image at a given viewport.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        html: &str,
        viewport: (u32, u32),
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// Shells out to an external renderer binary: markup on stdin, PNG bytes on
/// stdout, `{width}x{height}` as the first two CLI args. A non-zero exit
/// code carries stderr as the error body.
pub struct SubprocessRenderer {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl SubprocessRenderer {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Renderer for SubprocessRenderer {
    async fn render(&self, html: &str, viewport: (u32, u32)) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.binary)
            .arg(viewport.0.to_string())
            .arg(viewport.1.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(NodeBridgeError::Io)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(html.as_bytes())
                .await
                .map_err(NodeBridgeError::Io)?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| NodeBridgeError::Timeout(self.timeout))?
            .map_err(NodeBridgeError::Io)?;

        if !output.status.success() {
            return Err(NodeBridgeError::Unknown {
                code: output.status.code().unwrap_or(-1),
                body: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_an_io_error() {
        let renderer = SubprocessRenderer::new("/nonexistent/renderer-binary", Duration::from_secs(5));
        let err = renderer.render("<html></html>", (100, 100)).await.unwrap_err();
        assert!(matches!(err, NodeBridgeError::Io(_)));
    }
}
