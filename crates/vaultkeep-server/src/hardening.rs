//! Core dump prevention.
//!
//! A core dump of this process would contain the derived field key, the
//! token signing secret, and whatever vault items were being decrypted at
//! the time. On Unix, [`disable_core_dumps`] sets `RLIMIT_CORE` to 0 so the
//! kernel never writes one. It is a no-op elsewhere.

/// Set `RLIMIT_CORE` to 0 for this process.
///
/// Call early in `main()`, before any secret is loaded.
///
/// # Errors
///
/// Returns the OS error if `setrlimit` fails.
#[cfg(unix)]
pub fn disable_core_dumps() -> std::io::Result<()> {
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: `setrlimit` only reads the `rlimit` we pass by reference, which
    // is a fully initialized local that outlives the call.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &raw const limit) };

    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// No-op on non-Unix platforms.
#[cfg(not(unix))]
pub fn disable_core_dumps() -> std::io::Result<()> {
    Ok(())
}
