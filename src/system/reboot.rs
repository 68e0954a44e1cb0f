//! Optional reboot-after-install support. Invoked only when
//! `reboot_after_install` is configured and the installer reports success;
//! failures are logged and swallowed rather than propagated, since a device
//! that missed its reboot is recoverable but a crash loop here would not be.

#[cfg(unix)]
pub fn sync_and_reboot() {
    // SAFETY: `sync()` takes no arguments and flushes pending filesystem
    // writes; it has no preconditions and cannot fail observably.
    unsafe {
        libc::sync();
    }

    // SAFETY: `reboot()` with `RB_AUTOBOOT` takes no pointer arguments; it
    // only has an effect when the caller holds `CAP_SYS_BOOT`, in which
    // case the process does not return from this call.
    let result = unsafe { libc::reboot(libc::RB_AUTOBOOT) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        tracing::warn!(%err, "reboot request failed");
    }
}

#[cfg(not(unix))]
pub fn sync_and_reboot() {
    tracing::warn!("reboot after install is not supported on this platform");
}
