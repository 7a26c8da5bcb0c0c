//! FFI bindings for Assessment Metrics
//!
//! C-compatible functions for calling the engine from other languages.
//! All functions take null-terminated C strings and return allocated memory
//! that must be freed by the caller using `assess_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{event_log_to_metrics, MetricsProcessor};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a pipeline result across the boundary, recording any error
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute a metrics report from event log JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `assess_free_string`.
/// - Returns NULL on error; call `assess_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn assess_event_log_to_metrics(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    finish(event_log_to_metrics(json_str))
}

/// Score attention-test JSON (`{"stimuli": [...], "responses": [...]}`).
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `assess_free_string`.
/// - Returns NULL on error; call `assess_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn assess_score_attention(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    finish(MetricsProcessor::new().process_attention(&json_str))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a MetricsProcessor
pub struct MetricsProcessorHandle {
    processor: MetricsProcessor,
}

/// Create a new MetricsProcessor.
///
/// `config_json` may be NULL for the default configuration; otherwise it is
/// an `EngineConfig` JSON object (missing fields take their defaults).
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `assess_processor_free`.
/// - Returns NULL on an invalid configuration; call `assess_last_error`.
#[no_mangle]
pub unsafe extern "C" fn assess_processor_new(
    config_json: *const c_char,
) -> *mut MetricsProcessorHandle {
    clear_last_error();

    let processor = if config_json.is_null() {
        Ok(MetricsProcessor::new())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => EngineConfig::from_json(&s).and_then(MetricsProcessor::with_config),
            None => Err(ComputeError::InvalidConfig(
                "Config string is not valid UTF-8".to_string(),
            )),
        }
    };

    match processor {
        Ok(processor) => Box::into_raw(Box::new(MetricsProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a MetricsProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `assess_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn assess_processor_free(processor: *mut MetricsProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Compute a metrics report with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `assess_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `assess_free_string`.
/// - Returns NULL on error; call `assess_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn assess_processor_process(
    processor: *const MetricsProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    finish(handle.processor.process(&json_str))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by an `assess_*` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an `assess_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn assess_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `assess_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn assess_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the engine version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn assess_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
