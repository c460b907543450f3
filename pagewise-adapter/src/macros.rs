// Events go to `tracing` under the `pagewise_adapter` target. Without the `tracing` feature the
// arguments are dropped unexpanded.
macro_rules! log_event {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        tracing::$level!(target: "pagewise_adapter", $($arg)+);
    }};
}

macro_rules! ptrace {
    ($($arg:tt)+) => {
        log_event!(trace, $($arg)+)
    };
}

macro_rules! pdebug {
    ($($arg:tt)+) => {
        log_event!(debug, $($arg)+)
    };
}

macro_rules! pwarn {
    ($($arg:tt)+) => {
        log_event!(warn, $($arg)+)
    };
}
