//! Winit-backed window provider.
//!
//! Winit 0.30 only creates windows inside the event loop's callbacks, so
//! the pool inverts control: the host's `ApplicationHandler` pushes windows
//! it created in `resumed`, and output nodes take them as they are
//! constructed.

use std::sync::Arc;

use parking_lot::Mutex;
use winit::window::Window;

use crate::errors::{PrismError, Result};
use crate::gfx::{RenderWindow, WindowProvider};

struct PooledWindow(Arc<Window>);

impl raw_window_handle::HasWindowHandle for PooledWindow {
    fn window_handle(
        &self,
    ) -> std::result::Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError>
    {
        self.0.window_handle()
    }
}

impl raw_window_handle::HasDisplayHandle for PooledWindow {
    fn display_handle(
        &self,
    ) -> std::result::Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError>
    {
        self.0.display_handle()
    }
}

impl RenderWindow for PooledWindow {
    fn pixel_size(&self) -> (u32, u32) {
        let size = self.0.inner_size();
        (size.width, size.height)
    }
}

/// A pool of host-created winit windows serving as the engine's window
/// provider.
#[derive(Default)]
pub struct WinitWindowPool {
    windows: Mutex<Vec<Arc<Window>>>,
}

impl WinitWindowPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands a host-created window to the pool. Called from the host's
    /// event loop (e.g. `ApplicationHandler::resumed`).
    pub fn push_window(&self, window: Arc<Window>) {
        self.windows.lock().push(window);
    }
}

impl WindowProvider for WinitWindowPool {
    fn create_window(&self, title: &str, _width: u32, _height: u32) -> Result<Arc<dyn RenderWindow>> {
        let Some(window) = self.windows.lock().pop() else {
            return Err(PrismError::MissingResource("pooled winit window"));
        };
        window.set_title(title);
        Ok(Arc::new(PooledWindow(window)))
    }
}
