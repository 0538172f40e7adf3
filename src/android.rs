//! JNI bindings for Android.
//!
//! Kotlin keeps an opaque `Long` handle to an [`InlineBridge`] and posts
//! JSON messages through it; each post returns the produced event messages
//! as a JSON array string.

use jni::objects::{JClass, JString};
use jni::sys::{jlong, jstring};
use jni::JNIEnv;

use crate::InlineBridge;

/// Called from Kotlin as:
///   external fun nativeCreate(): Long
#[no_mangle]
pub extern "system" fn Java_com_scorecanvas_ScoreBridge_nativeCreate(
    _env: JNIEnv,
    _class: JClass,
) -> jlong {
    Box::into_raw(Box::new(InlineBridge::new())) as jlong
}

/// Called from Kotlin as:
///   external fun nativePost(handle: Long, message: String): String?
#[no_mangle]
pub extern "system" fn Java_com_scorecanvas_ScoreBridge_nativePost(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    message: JString,
) -> jstring {
    if handle == 0 {
        return std::ptr::null_mut();
    }
    let text: String = match env.get_string(&message) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };

    // SAFETY: the handle comes from nativeCreate and Kotlin serializes calls.
    let bridge = unsafe { &mut *(handle as *mut InlineBridge) };
    match env.new_string(bridge.post_json(&text)) {
        Ok(js) => js.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Called from Kotlin as:
///   external fun nativeDestroy(handle: Long)
#[no_mangle]
pub extern "system" fn Java_com_scorecanvas_ScoreBridge_nativeDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: the handle comes from nativeCreate and is destroyed once.
        drop(unsafe { Box::from_raw(handle as *mut InlineBridge) });
    }
}
