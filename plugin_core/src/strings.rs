//! Plugin-owned C strings.
//!
//! Strings leave the plugin through [`into_plugin_string`] and come back
//! through [`free_string`], the function every table publishes as
//! `free_string`. A counter of live allocations lets tests confirm that the
//! host released everything it was given exactly once.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::str::Utf8Error;
use std::sync::atomic::{AtomicUsize, Ordering};

static OUTSTANDING: AtomicUsize = AtomicUsize::new(0);

/// Hands a string to the host. Interior NUL bytes are dropped.
pub fn into_plugin_string(value: impl Into<String>) -> *const c_char {
    let mut bytes = value.into().into_bytes();
    bytes.retain(|b| *b != 0);
    let c_string = match CString::new(bytes) {
        Ok(s) => s,
        Err(_) => CString::default(),
    };
    OUTSTANDING.fetch_add(1, Ordering::SeqCst);
    c_string.into_raw()
}

/// Reclaims a string produced by [`into_plugin_string`]. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a pointer returned by `into_plugin_string` in this
/// same module instance that has not been freed yet.
pub unsafe fn free_plugin_string(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr as *mut c_char));
    OUTSTANDING.fetch_sub(1, Ordering::SeqCst);
}

/// The `free_string` slot of every table built by this crate.
///
/// # Safety
/// Same contract as [`free_plugin_string`].
pub unsafe extern "C" fn free_string(ptr: *const c_char) {
    free_plugin_string(ptr)
}

/// Strings handed out and not yet released.
pub fn outstanding_strings() -> usize {
    OUTSTANDING.load(Ordering::SeqCst)
}

/// Copies a borrowed C string, replacing invalid UTF-8. Null yields `None`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer valid for reads.
pub unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Like [`read_c_str`] but rejects invalid UTF-8.
///
/// # Safety
/// Same contract as [`read_c_str`].
pub unsafe fn read_utf8<'a>(ptr: *const c_char) -> Result<Option<&'a str>, Utf8Error> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr).to_str().map(Some)
}
