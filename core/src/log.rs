//! Minimal internal tracing, in the spirit of the original `src/log.c`'s
//! `LOGD`/`LOGW`/`LOGE` macros. The core carries no external logging crate
//! (the teacher workspace doesn't either); this just routes the handful of
//! diagnostics `spec.md` §7 calls for (unmapped I/O, unknown opcode,
//! instruction traces) to stderr, compiled out in release builds except
//! for warnings.

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        eprintln!("[khepra:trace] {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        eprintln!("[khepra:warn] {}", format!($($arg)*));
    };
}
