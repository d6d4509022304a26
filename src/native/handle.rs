//! Owned Native Handles
//!
//! Every pointer handed out by the native library must be released with the
//! matching delete function exactly once. [`Owned`] ties that release to
//! scope exit so early returns and `?` paths cannot leak.

use std::fmt;
use std::ptr::NonNull;

use crate::error::{SignerError, SignerResult};

/// A native type with its own delete function
pub trait NativeResource {
    /// Name used in error messages
    const KIND: &'static str;

    /// Release a pointer obtained from the native library.
    ///
    /// # Safety
    /// `ptr` must be non-null, owned by the caller and not released before.
    unsafe fn release(ptr: *mut Self);
}

/// Owning guard over a non-null native pointer
pub struct Owned<T: NativeResource> {
    ptr: NonNull<T>,
}

impl<T: NativeResource> Owned<T> {
    /// Take ownership of a pointer returned by the native library.
    /// Returns `None` for null.
    ///
    /// # Safety
    /// The pointer must be owned by the caller and released by nobody else.
    pub unsafe fn from_raw(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Like [`Owned::from_raw`], but a null pointer becomes an `EmptyResult` error
    /// naming the call that produced it.
    ///
    /// # Safety
    /// Same as [`Owned::from_raw`].
    pub unsafe fn from_raw_or_err(ptr: *mut T, call: &str) -> SignerResult<Self> {
        Self::from_raw(ptr).ok_or_else(|| {
            SignerError::empty_result(format!("{} returned a null {}", call, T::KIND))
        })
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T: NativeResource> Drop for Owned<T> {
    fn drop(&mut self) {
        // SAFETY: constructed from an owned non-null pointer and released only here
        unsafe { T::release(self.ptr.as_ptr()) }
    }
}

impl<T: NativeResource> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("kind", &T::KIND)
            .field("ptr", &self.ptr)
            .finish()
    }
}
