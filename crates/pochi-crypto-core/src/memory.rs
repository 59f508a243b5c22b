//! Secure memory wrappers for key material and decrypted plaintext.
//!
//! - Zeroed on drop via [`zeroize`] / [`secrecy`]
//! - Best-effort `mlock` so secrets avoid swap (soft fallback if denied)
//! - Masked `Debug`/`Display` so secrets never reach logs

use crate::error::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// RAII page lock: `mlock` on creation, `munlock` on drop.
///
/// Locking is best-effort. If the kernel refuses (quota, privileges) the
/// guard records the failure and drop becomes a no-op.
struct PageLock {
    ptr: *const u8,
    len: usize,
    active: bool,
}

// SAFETY: the pointer is only handed to mlock/munlock; the pointed-to
// bytes are owned and accessed by the enclosing secret wrapper.
unsafe impl Send for PageLock {}
unsafe impl Sync for PageLock {}

impl PageLock {
    fn acquire(ptr: *const u8, len: usize) -> Self {
        let active = len > 0 && sys::mlock(ptr, len);
        Self { ptr, len, active }
    }

    const fn inactive() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
            active: false,
        }
    }
}

impl Drop for PageLock {
    fn drop(&mut self) {
        if self.active {
            sys::munlock(self.ptr, self.len);
        }
    }
}

/// Variable-length secret — decrypted plaintext, derived key material.
///
/// Wraps [`SecretSlice<u8>`] so the bytes are zeroized on drop, with the
/// backing allocation page-locked while alive.
pub struct SecretBuffer {
    inner: SecretSlice<u8>,
    _lock: PageLock,
}

impl SecretBuffer {
    /// Copy `data` into a new zeroize-on-drop allocation.
    ///
    /// The caller should zeroize the source after this returns.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if allocation fails.
    pub fn new(data: &[u8]) -> Result<Self, CryptoError> {
        let inner: SecretSlice<u8> = data.to_vec().into();
        let exposed = inner.expose_secret();
        let lock = PageLock::acquire(exposed.as_ptr(), exposed.len());
        Ok(Self { inner, _lock: lock })
    }

    /// Expose the raw bytes. Keep the borrow short-lived.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// `true` if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

/// Fixed-size secret — symmetric keys, session key material.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes<const N: usize> {
    bytes: [u8; N],
    #[zeroize(skip)]
    lock: PageLock,
}

impl<const N: usize> SecretBytes<N> {
    /// Take ownership of a fixed-size array (no copy remains with the caller).
    ///
    /// The page lock targets the array's address at construction time. A
    /// later move leaves the lock pointing at the old address; `munlock`
    /// on a stale address is a harmless no-op and zeroize-on-drop does not
    /// depend on the lock.
    #[must_use]
    pub fn new(data: [u8; N]) -> Self {
        let mut s = Self {
            bytes: data,
            lock: PageLock::inactive(),
        };
        s.lock = PageLock::acquire(s.bytes.as_ptr(), N);
        s
    }

    /// Fill from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; N];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
        Ok(Self::new(bytes))
    }

    /// Expose the raw bytes for a cryptographic operation.
    #[must_use]
    pub const fn expose(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> fmt::Display for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> From<[u8; N]> for SecretBytes<N> {
    fn from(data: [u8; N]) -> Self {
        Self::new(data)
    }
}

#[cfg(unix)]
mod sys {
    pub(super) fn mlock(ptr: *const u8, len: usize) -> bool {
        // SAFETY: mlock accepts any valid pointer/length; errors are reported
        // via the return value and treated as a soft failure.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn munlock(ptr: *const u8, len: usize) {
        // SAFETY: munlock failure is non-critical.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }
}

#[cfg(not(unix))]
mod sys {
    pub(super) fn mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn munlock(_ptr: *const u8, _len: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_buffer_holds_content() {
        let buf = SecretBuffer::new(b"session key material").expect("allocation should succeed");
        assert_eq!(buf.expose(), b"session key material");
        assert_eq!(buf.len(), 20);
        assert!(!buf.is_empty());
    }

    #[test]
    fn secret_buffer_empty() {
        let buf = SecretBuffer::new(b"").expect("allocation should succeed");
        assert!(buf.is_empty());
    }

    #[test]
    fn secret_buffer_debug_and_display_are_masked() {
        let buf = SecretBuffer::new(b"123456").expect("allocation should succeed");
        assert_eq!(format!("{buf:?}"), "SecretBuffer(***)");
        assert_eq!(format!("{buf}"), "SecretBuffer(***)");
    }

    #[test]
    fn secret_bytes_roundtrip() {
        let data: [u8; 32] = [0x5C; 32];
        let key = SecretBytes::new(data);
        assert_eq!(key.expose(), &data);
    }

    #[test]
    fn secret_bytes_random_is_unique() {
        let a = SecretBytes::<32>::random().expect("random should succeed");
        let b = SecretBytes::<32>::random().expect("random should succeed");
        assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn secret_bytes_debug_is_masked() {
        let key = SecretBytes::<16>::new([0xFF; 16]);
        assert_eq!(format!("{key:?}"), "SecretBytes<16>(***)");
    }

    #[test]
    fn secret_bytes_from_array() {
        let key: SecretBytes<16> = [0x42u8; 16].into();
        assert_eq!(key.expose(), &[0x42u8; 16]);
    }
}
