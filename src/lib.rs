//! Glasspane: a borderless Win32 window that paints its own chrome.
//!
//! The crate splits into two halves. [`window`] owns the frame: it removes
//! the standard non-client area, extends the DWM frame into the client
//! region and reclassifies non-client messages so dragging, resizing and
//! snapping keep working without a system title bar. [`render`] owns the GPU
//! side: a DirectComposition virtual surface driven through Direct2D with a
//! begin/end-draw frame protocol, a composed transform stack and a
//! path-keyed texture cache.
//!
//! Hit-test classification, the caption-height formula and the transform
//! stack are pure and compile on every platform; everything that touches an
//! `HWND` or the device chain is Windows-only.

pub mod render;
pub mod window;

#[cfg(windows)]
pub mod app;
#[cfg(windows)]
pub mod error;
