use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr::NonNull;

use plugin_core::abi::FreeStringFn;

/// A string allocated by a plugin, released through that plugin's
/// `free_string` exactly once when the guard drops.
///
/// The guard borrows the `free_string` slot it will call, so it cannot
/// outlive the binding holding that slot:
///
/// ```compile_fail
/// use host_core::PluginString;
/// use plugin_core::abi::FreeStringFn;
///
/// unsafe extern "C" fn release(_: *const std::os::raw::c_char) {}
///
/// let guard = {
///     let slot: FreeStringFn = release;
///     unsafe { PluginString::from_raw(b"x\0".as_ptr().cast(), &slot) }
/// };
/// drop(guard);
/// ```
pub struct PluginString<'a> {
    ptr: NonNull<c_char>,
    free: &'a FreeStringFn,
}

impl<'a> PluginString<'a> {
    /// Takes ownership of a plugin string. Null yields `None` and nothing is freed.
    ///
    /// # Safety
    /// `ptr` must be null or a NUL-terminated buffer returned by the plugin
    /// that owns `free`, not yet released.
    pub unsafe fn from_raw(ptr: *const c_char, free: &'a FreeStringFn) -> Option<Self> {
        NonNull::new(ptr as *mut c_char).map(|ptr| PluginString { ptr, free })
    }

    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: from_raw's contract guarantees a live NUL-terminated buffer
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        self.as_c_str().to_string_lossy()
    }

    pub fn into_string(self) -> String {
        self.to_string_lossy().into_owned()
    }
}

impl Drop for PluginString<'_> {
    fn drop(&mut self) {
        // SAFETY: released once, through the allocating plugin
        unsafe { (*self.free)(self.ptr.as_ptr()) }
    }
}

/// Copies a plugin string and releases it. Null yields `None`.
///
/// # Safety
/// Same contract as [`PluginString::from_raw`].
pub unsafe fn take_plugin_string(ptr: *const c_char, free: &FreeStringFn) -> Option<String> {
    PluginString::from_raw(ptr, free).map(PluginString::into_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FREED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting_free(ptr: *const c_char) {
        drop(CString::from_raw(ptr as *mut c_char));
        FREED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn frees_once_and_skips_null() {
        let before = FREED.load(Ordering::SeqCst);
        let slot: FreeStringFn = counting_free;

        let raw = CString::new("{\"ok\":true}").unwrap().into_raw();
        let text = unsafe { take_plugin_string(raw, &slot) };
        assert_eq!(text.as_deref(), Some("{\"ok\":true}"));

        assert!(unsafe { take_plugin_string(std::ptr::null(), &slot) }.is_none());
        assert_eq!(FREED.load(Ordering::SeqCst) - before, 1);
    }
}
