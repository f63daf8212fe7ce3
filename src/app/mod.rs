//! Optional host shims.
//!
//! The engine itself has no windowing dependency; this module provides a
//! thin winit-backed [`WindowProvider`](crate::gfx::WindowProvider) for
//! hosts that want one, behind the `winit` feature.

#[cfg(feature = "winit")]
mod winit_host;

#[cfg(feature = "winit")]
pub use winit_host::WinitWindowPool;
