//! Operation boundary macros
//!
//! Every repository mutation, store build and loader scan logs exactly one
//! start event and one end (or end_error) event through these macros. They
//! reach `tracing` through this crate, so callers need no direct dependency
//! on it.
//!
//! Levels: start is `debug`, end is `info`, end_error is `warn`.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        $crate::__tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use flatstore_core::log_op_start;
/// log_op_start!("insert");
/// log_op_start!("insert", entity = "page");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(debug, $op, $crate::log_schema::EVENT_START $(, $($field)*)?)
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use flatstore_core::log_op_end;
/// log_op_end!("insert", duration_ms = 3);
/// log_op_end!("build_store", duration_ms = 12, entity_count = 4);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            $op,
            $crate::log_schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log the failed end of an operation
///
/// Accepts anything convertible into [`ExError`](crate::errors::ExError);
/// the error is cloned, not consumed, and logged with its kind and code.
///
/// ```
/// # use flatstore_core::{log_op_error, FlatstoreError};
/// let err = FlatstoreError::EntityNotFound { entity: "page".into() };
/// log_op_error!("find_one", err, duration_ms = 1, entity = "page");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = ($err).clone().into();
        $crate::__log_op_event!(
            warn,
            $op,
            $crate::log_schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            error = %ex_err
            $(, $($field)*)?
        )
    }};
}
