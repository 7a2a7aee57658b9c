//! FFI bindings for SitSense Core
//!
//! This module provides C-compatible functions for driving the engine from a
//! host UI. All functions use C strings (null-terminated) and exchange JSON.
//! Returned strings are allocated here and must be freed by the caller using
//! `sitsense_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;

use crate::config::{AlertSettings, NormalizationUpdate, SenseConfig, ThresholdUpdate};
use crate::engine::SitSenseEngine;
use crate::error::SenseError;
use crate::palette::color_of;
use crate::types::PressureGrid;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Serialize `value` into a newly allocated C string, or NULL with the error set
fn json_to_cstr<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Heatmap payload handed to the host renderer
#[derive(Serialize)]
struct RenderedGrid {
    size: usize,
    intensities: Vec<Vec<f64>>,
    colors: Vec<Vec<String>>,
}

// ============================================================================
// Engine lifecycle
// ============================================================================

/// Opaque handle to a SitSenseEngine
pub struct SitSenseEngineHandle {
    engine: SitSenseEngine,
}

/// Create a new engine.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer that must be freed with `sitsense_engine_free`.
/// - Returns NULL on error; call `sitsense_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_new(config_json: *const c_char) -> *mut SitSenseEngineHandle {
    clear_last_error();

    let config = match cstr_to_string(config_json) {
        None => SenseConfig::default(),
        Some(json) => match SenseConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        },
    };

    let handle = Box::new(SitSenseEngineHandle {
        engine: SitSenseEngine::new(config),
    });
    Box::into_raw(handle)
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_free(engine: *mut SitSenseEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Ingest one pressure grid (JSON array of rows) and return the frame report.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - `grid_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sitsense_free_string`.
/// - Returns NULL on error; the previous frame's outputs are kept.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_ingest(
    engine: *mut SitSenseEngineHandle,
    grid_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(grid_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid grid string pointer");
            return ptr::null_mut();
        }
    };

    let rows: Vec<Vec<f64>> = match serde_json::from_str(&json_str) {
        Ok(rows) => rows,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match handle.engine.ingest_grid(rows) {
        Ok(report) => json_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Return the heatmap to draw, if it changed since the last call.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns a newly allocated string that must be freed with `sitsense_free_string`.
/// - Returns NULL when there is nothing new to draw (no error is set).
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_render(engine: *mut SitSenseEngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;
    if !handle.engine.render_frame() {
        return ptr::null_mut();
    }

    match handle.engine.intensities() {
        Some(grid) => {
            let intensities = grid.to_rows();
            let colors = intensities
                .iter()
                .map(|row| row.iter().map(|v| color_of(*v).to_hex()).collect())
                .collect();
            json_to_cstr(&RenderedGrid {
                size: grid.size(),
                intensities,
                colors,
            })
        }
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Timer and alerts
// ============================================================================

/// Signal that the user sat down (`sitting != 0`) or stood up.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns 0 on success, -1 on a null pointer.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_set_sitting(
    engine: *mut SitSenseEngineHandle,
    sitting: i32,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    (*engine).engine.set_sitting(sitting != 0);
    0
}

/// Stop the timer, zero it and start a new session.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns 0 on success, -1 on a null pointer.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_reset(engine: *mut SitSenseEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    (*engine).engine.reset();
    0
}

/// Whole seconds of sitting time, or -1 on a null pointer.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_elapsed_seconds(engine: *const SitSenseEngineHandle) -> i64 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    i64::try_from((*engine).engine.elapsed_seconds()).unwrap_or(i64::MAX)
}

/// Run one timer/alert evaluation. Hosts call this once per second and again
/// when they return to the foreground.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns a newly allocated tick report that must be freed with `sitsense_free_string`.
/// - Returns NULL while the timer is stopped (no error is set).
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_tick(engine: *mut SitSenseEngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    match (*engine).engine.tick() {
        Some(report) => json_to_cstr(&report),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Apply a partial threshold update in seconds,
/// e.g. `{"soft": 1200, "repeat_hard": 600}`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error. Valid fields of a partially
///   rejected update still take effect.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_set_thresholds(
    engine: *mut SitSenseEngineHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    let result = serde_json::from_str::<ThresholdUpdate>(&json_str)
        .map_err(SenseError::from)
        .and_then(|update| handle.engine.set_thresholds(&update));

    match result {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Apply minute-based alert settings (`softMin`, `hardMin`, `repeatSoftMin`,
/// `repeatHardMin`), clamped to 1..=600 minutes.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_set_alert_settings(
    engine: *mut SitSenseEngineHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    let result = serde_json::from_str::<AlertSettings>(&json_str)
        .map_err(SenseError::from)
        .and_then(|settings| handle.engine.set_alert_settings(settings));

    match result {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Apply a partial normalization update,
/// e.g. `{"target_resolution": 16, "sensitivity": 0.8}`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_set_normalization(
    engine: *mut SitSenseEngineHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    let result = serde_json::from_str::<NormalizationUpdate>(&json_str)
        .map_err(SenseError::from)
        .and_then(|update| handle.engine.set_normalization_config(&update));

    match result {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Set the calibration baseline. With `grid_json` NULL the most recent frame
/// is used.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - `grid_json` must be a valid null-terminated C string, or NULL.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_calibrate(
    engine: *mut SitSenseEngineHandle,
    grid_json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    match cstr_to_string(grid_json) {
        None => {
            if handle.engine.calibrate_from_last() {
                0
            } else {
                set_last_error("No frame received yet");
                -1
            }
        }
        Some(json) => match PressureGrid::from_json(&json) {
            Ok(grid) => {
                handle.engine.set_calibration(&grid);
                0
            }
            Err(e) => {
                set_last_error(&e.to_string());
                -1
            }
        },
    }
}

/// Drop the calibration baseline.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns 0 on success, -1 on a null pointer.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_clear_calibration(engine: *mut SitSenseEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    (*engine).engine.clear_calibration();
    0
}

/// Save the calibration baseline to JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns a newly allocated string that must be freed with `sitsense_free_string`.
/// - Returns NULL on error; call `sitsense_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_save_calibration(
    engine: *const SitSenseEngineHandle,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    match (*engine).engine.save_calibration() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load a calibration baseline saved with `sitsense_engine_save_calibration`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_load_calibration(
    engine: *mut SitSenseEngineHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.engine.load_calibration(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Score, imbalance, duration and last alert for the advice collaborator.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns a newly allocated string that must be freed with `sitsense_free_string`.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_advice_context(
    engine: *const SitSenseEngineHandle,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    json_to_cstr(&(*engine).engine.advice_context())
}

/// Summary of the current sitting session.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `sitsense_engine_new`.
/// - Returns a newly allocated string that must be freed with `sitsense_free_string`.
#[no_mangle]
pub unsafe extern "C" fn sitsense_engine_session_summary(
    engine: *const SitSenseEngineHandle,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    json_to_cstr(&(*engine).engine.session_summary())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by SitSense functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a SitSense function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sitsense_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next SitSense function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn sitsense_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn sitsense_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        sitsense_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        unsafe {
            let engine = sitsense_engine_new(ptr::null());
            assert!(!engine.is_null());

            // Nothing to draw before the first frame
            assert!(sitsense_engine_render(engine).is_null());

            let grid = CString::new("[[10, 90], [90, 10]]").unwrap();
            let report = take_string(sitsense_engine_ingest(engine, grid.as_ptr()));
            let report: serde_json::Value = serde_json::from_str(&report).unwrap();
            assert!(report["score"]["value"].is_u64());

            let rendered = take_string(sitsense_engine_render(engine));
            let rendered: serde_json::Value = serde_json::from_str(&rendered).unwrap();
            assert_eq!(rendered["size"], 8);
            assert!(rendered["colors"][0][0].as_str().unwrap().starts_with('#'));
            assert!(sitsense_engine_render(engine).is_null());

            sitsense_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_invalid_grid_sets_error() {
        unsafe {
            let engine = sitsense_engine_new(ptr::null());
            let ragged = CString::new("[[1, 2], [3]]").unwrap();

            let result = sitsense_engine_ingest(engine, ragged.as_ptr());
            assert!(result.is_null());

            let error = sitsense_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("Invalid pressure grid"));

            sitsense_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_invalid_config_rejected() {
        unsafe {
            let config = CString::new(r#"{"normalization": {"target_resolution": 500}}"#).unwrap();
            let engine = sitsense_engine_new(config.as_ptr());
            assert!(engine.is_null());
            assert!(!sitsense_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_tick_while_stopped_is_null() {
        unsafe {
            let engine = sitsense_engine_new(ptr::null());
            assert!(sitsense_engine_tick(engine).is_null());
            assert!(sitsense_last_error().is_null());

            assert_eq!(sitsense_engine_set_sitting(engine, 1), 0);
            let tick = take_string(sitsense_engine_tick(engine));
            assert!(tick.contains("\"alert\":null"));
            assert_eq!(sitsense_engine_elapsed_seconds(engine), 0);

            assert_eq!(sitsense_engine_reset(engine), 0);
            sitsense_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_settings() {
        unsafe {
            let engine = sitsense_engine_new(ptr::null());

            let thresholds = CString::new(r#"{"soft": 1200, "repeat_hard": 600}"#).unwrap();
            assert_eq!(sitsense_engine_set_thresholds(engine, thresholds.as_ptr()), 0);

            let bad = CString::new(r#"{"repeat_soft": 1}"#).unwrap();
            assert_eq!(sitsense_engine_set_thresholds(engine, bad.as_ptr()), -1);

            let settings = CString::new(
                r#"{"softMin": 20, "hardMin": 45, "repeatSoftMin": 10, "repeatHardMin": 15}"#,
            )
            .unwrap();
            assert_eq!(sitsense_engine_set_alert_settings(engine, settings.as_ptr()), 0);

            let norm = CString::new(r#"{"sensitivity": 0.9}"#).unwrap();
            assert_eq!(sitsense_engine_set_normalization(engine, norm.as_ptr()), 0);

            let norm = CString::new(r#"{"target_resolution": 1}"#).unwrap();
            assert_eq!(sitsense_engine_set_normalization(engine, norm.as_ptr()), -1);

            sitsense_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_calibration_roundtrip() {
        unsafe {
            let engine = sitsense_engine_new(ptr::null());
            assert_eq!(sitsense_engine_calibrate(engine, ptr::null()), -1);

            let grid = CString::new("[[5, 5], [5, 5]]").unwrap();
            assert_eq!(sitsense_engine_calibrate(engine, grid.as_ptr()), 0);

            let saved = sitsense_engine_save_calibration(engine);
            assert!(!saved.is_null());

            let other = sitsense_engine_new(ptr::null());
            assert_eq!(sitsense_engine_load_calibration(other, saved), 0);
            sitsense_free_string(saved);

            assert_eq!(sitsense_engine_clear_calibration(other), 0);
            sitsense_engine_free(engine);
            sitsense_engine_free(other);
        }
    }

    #[test]
    fn test_ffi_snapshots() {
        unsafe {
            let engine = sitsense_engine_new(ptr::null());
            let advice = take_string(sitsense_engine_advice_context(engine));
            assert!(advice.contains("duration_sec"));

            let summary = take_string(sitsense_engine_session_summary(engine));
            assert!(summary.contains("session_id"));
            sitsense_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_null_engine() {
        unsafe {
            assert!(sitsense_engine_tick(ptr::null_mut()).is_null());
            assert!(!sitsense_last_error().is_null());
            assert_eq!(sitsense_engine_elapsed_seconds(ptr::null()), -1);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = sitsense_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
