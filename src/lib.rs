//! scorecanvas — music notation layout and drawing pipeline.
//!
//! A [`ScoreRenderer`] lays a [`Score`] out into systems and draws each one
//! onto a [`Canvas`] backend (SVG or raster), reporting progress through
//! [`RenderEvent`]s. The [`bridge`] module carries the same operations over a
//! JSON message protocol so the renderer can live on a worker thread or
//! behind an FFI boundary.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use scorecanvas::{Score, ScoreRenderer, Settings};
//!
//! let score: Score = serde_json::from_str(r#"{ "masterBars": [{}], "tracks": [{ "name": "Piano" }] }"#).unwrap();
//! let mut renderer = ScoreRenderer::new(Settings::default());
//! renderer.add_listener(|event| println!("{}", event.name()));
//! renderer.render(Arc::new(score), &[0]);
//! ```

pub mod bridge;
pub mod canvas;
pub mod error;
pub mod model;
pub mod renderer;
pub mod settings;

#[cfg(target_os = "android")]
pub mod android;

pub use bridge::{Bridge, Command, EventMessage, InlineBridge, ReceivedEvent, ScoreWorker};
pub use canvas::{create_canvas, Canvas, Color, Font, FontStyle, RenderPayload};
pub use error::{Error, ErrorEnvelope, ErrorKind, Result};
pub use model::*;
pub use renderer::{
    Bounds, BoundsLookup, ElementId, RenderEvent, RenderResult, RenderState, ScoreRenderer,
};
pub use settings::{Engine, LayoutMode, Settings};

// ═══════════════════════════════════════════════════════════════════════
// C FFI — for iOS (static library) and desktop hosts
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Create an inline bridge. Free it with `scorecanvas_bridge_free`.
#[no_mangle]
pub extern "C" fn scorecanvas_bridge_new() -> *mut InlineBridge {
    Box::into_raw(Box::new(InlineBridge::new()))
}

/// Post one JSON message and return the produced event messages as a JSON
/// array. The caller must free the returned string with
/// `scorecanvas_free_string`.
///
/// # Safety
/// `bridge` must come from `scorecanvas_bridge_new` and not be freed.
/// `message` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn scorecanvas_bridge_post(
    bridge: *mut InlineBridge,
    message: *const c_char,
) -> *mut c_char {
    if bridge.is_null() || message.is_null() {
        return std::ptr::null_mut();
    }
    let bridge = unsafe { &mut *bridge };
    let text = match unsafe { CStr::from_ptr(message) }.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    CString::new(bridge.post_json(text))
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}

/// Destroy a bridge created by `scorecanvas_bridge_new`.
///
/// # Safety
/// `bridge` must come from `scorecanvas_bridge_new`, or be null.
#[no_mangle]
pub unsafe extern "C" fn scorecanvas_bridge_free(bridge: *mut InlineBridge) {
    if !bridge.is_null() {
        unsafe {
            drop(Box::from_raw(bridge));
        }
    }
}

/// Free a string previously returned by scorecanvas functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scorecanvas function, or null.
#[no_mangle]
pub unsafe extern "C" fn scorecanvas_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
