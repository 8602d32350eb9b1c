//! Logging abstraction
//!
//! Unified logging macros that work across targets:
//! - Firmware (`target_os = "none"`): `defmt` over RTT
//! - Host tests: `println!` / `eprintln!`
//! - Host non-test (simulator binary): arguments are type-checked, nothing is printed
//!
//! Call sites use only `{}` placeholders with primitive arguments so the same
//! format string is valid for both `defmt` and `core::fmt`.

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::info!($($arg)*);
        #[cfg(all(not(target_os = "none"), test))]
        println!("[INFO] {}", format!($($arg)*));
        #[cfg(all(not(target_os = "none"), not(test)))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::debug!($($arg)*);
        #[cfg(all(not(target_os = "none"), test))]
        println!("[DEBUG] {}", format!($($arg)*));
        #[cfg(all(not(target_os = "none"), not(test)))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::warn!($($arg)*);
        #[cfg(all(not(target_os = "none"), test))]
        println!("[WARN] {}", format!($($arg)*));
        #[cfg(all(not(target_os = "none"), not(test)))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::error!($($arg)*);
        #[cfg(all(not(target_os = "none"), test))]
        eprintln!("[ERROR] {}", format!($($arg)*));
        #[cfg(all(not(target_os = "none"), not(test)))]
        let _ = ::core::format_args!($($arg)*);
    }};
}
