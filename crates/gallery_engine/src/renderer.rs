use std::time::Duration;

use crate::types::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// A rendering engine able to open isolated page contexts.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn open_context(&self) -> Result<Box<dyn RenderContext>, CaptureError>;
}

/// One isolated page. Owned by a single capture task.
#[async_trait::async_trait]
pub trait RenderContext: Send {
    /// Loads `url` and returns once the page's network has gone quiet.
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError>;

    /// Lets the page run for `delay` while still collecting diagnostics.
    async fn settle(&mut self, delay: Duration);

    /// PNG of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Console and error lines seen so far, oldest first.
    fn take_diagnostics(&mut self) -> Vec<String>;

    async fn close(&mut self);
}
