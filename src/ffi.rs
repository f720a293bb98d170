//! FFI interface for host applications
//!
//! Exposes the exporter through C-compatible functions. Markdown is returned
//! as a plain string, message lists as JSON. Every result carries a numeric
//! error code next to the message so hosts can branch without parsing text.

use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::ExportError;
use crate::exporter::{EnvPreferences, Exporter};

pub const FFI_OK: i32 = 0;
pub const FFI_UNSUPPORTED_SITE: i32 = 1;
pub const FFI_NO_MESSAGES: i32 = 2;
pub const FFI_INVALID_INPUT: i32 = 3;
pub const FFI_INTERNAL_ERROR: i32 = 4;

static EXPORTER: Lazy<Exporter> =
    Lazy::new(|| Exporter::default().with_preferences(Arc::new(EnvPreferences::new())));

/// Result struct returned to the host
/// Both pointers are owned by Rust and must be freed via free_export_result
#[repr(C)]
pub struct ExportResultFFI {
    /// Markdown, or the JSON message list (null-terminated)
    pub text_ptr: *mut c_char,
    /// Error message if the export failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
    /// One of the `FFI_*` codes
    pub error_code: i32,
}

/// Export the conversation in an HTML document as Markdown.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `url` - Page URL, selects the site (null-terminated)
/// * `flavour` - Flavour name (null-terminated), or null to use the
///   `CHAT2MD_FLAVOUR` preference
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `url` and `flavour`, when not null, must be valid null-terminated C strings
/// - Caller must free the result via `free_export_result`
#[no_mangle]
pub unsafe extern "C" fn export_markdown_ffi(
    html_ptr: *const c_char,
    html_len: usize,
    url: *const c_char,
    flavour: *const c_char,
) -> ExportResultFFI {
    let (html, url, flavour) = match read_inputs(html_ptr, html_len, url, flavour) {
        Ok(inputs) => inputs,
        Err(result) => return result,
    };

    guarded(|| {
        futures::executor::block_on(EXPORTER.export(html, url, flavour))
            .map_err(export_error_result)
    })
}

/// Export the conversation as a JSON list of `{"role", "markdown"}` objects.
///
/// # Safety
/// Same as export_markdown_ffi
#[no_mangle]
pub unsafe extern "C" fn export_messages_ffi(
    html_ptr: *const c_char,
    html_len: usize,
    url: *const c_char,
    flavour: *const c_char,
) -> ExportResultFFI {
    let (html, url, flavour) = match read_inputs(html_ptr, html_len, url, flavour) {
        Ok(inputs) => inputs,
        Err(result) => return result,
    };

    guarded(|| {
        let flavour = futures::executor::block_on(EXPORTER.resolve_flavour(flavour));
        let messages = EXPORTER
            .messages(html, url, &flavour)
            .map_err(export_error_result)?;
        serde_json::to_string(&messages).map_err(|e| {
            make_error_result(FFI_INTERNAL_ERROR, &format!("Serialize error: {}", e))
        })
    })
}

/// Free an ExportResultFFI returned by one of the export functions
///
/// # Safety
/// - `result` must have been returned by `export_markdown_ffi` or
///   `export_messages_ffi`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_export_result(result: ExportResultFFI) {
    if !result.text_ptr.is_null() {
        drop(CString::from_raw(result.text_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

type Inputs<'a> = (&'a str, &'a str, Option<&'a str>);

unsafe fn read_inputs<'a>(
    html_ptr: *const c_char,
    html_len: usize,
    url: *const c_char,
    flavour: *const c_char,
) -> Result<Inputs<'a>, ExportResultFFI> {
    let html = if html_ptr.is_null() || html_len == 0 {
        ""
    } else {
        let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
        std::str::from_utf8(slice)
            .map_err(|_| make_error_result(FFI_INVALID_INPUT, "Invalid UTF-8 in HTML content"))?
    };

    if url.is_null() {
        return Err(make_error_result(FFI_INVALID_INPUT, "URL is null"));
    }
    let url = CStr::from_ptr(url)
        .to_str()
        .map_err(|_| make_error_result(FFI_INVALID_INPUT, "Invalid UTF-8 in URL"))?;

    let flavour = if flavour.is_null() {
        None
    } else {
        Some(
            CStr::from_ptr(flavour)
                .to_str()
                .map_err(|_| make_error_result(FFI_INVALID_INPUT, "Invalid UTF-8 in flavour"))?,
        )
    };

    Ok((html, url, flavour))
}

// Run an export, turning panics into internal errors
fn guarded<F>(export: F) -> ExportResultFFI
where
    F: FnOnce() -> Result<String, ExportResultFFI>,
{
    match panic::catch_unwind(AssertUnwindSafe(export)) {
        Ok(Ok(text)) => make_text_result(text),
        Ok(Err(result)) => result,
        Err(_) => make_error_result(FFI_INTERNAL_ERROR, "Export panicked"),
    }
}

fn error_code(err: &ExportError) -> i32 {
    match err {
        ExportError::UnsupportedSite(_) => FFI_UNSUPPORTED_SITE,
        ExportError::NoMessages => FFI_NO_MESSAGES,
        ExportError::Internal(_) => FFI_INTERNAL_ERROR,
    }
}

fn export_error_result(err: ExportError) -> ExportResultFFI {
    if err.is_internal() {
        tracing::error!("export failed: {}", err);
    }
    make_error_result(error_code(&err), &err.to_string())
}

fn make_text_result(text: String) -> ExportResultFFI {
    match CString::new(text) {
        Ok(cstr) => ExportResultFFI {
            text_ptr: cstr.into_raw(),
            error_ptr: ptr::null_mut(),
            error_code: FFI_OK,
        },
        Err(_) => make_error_result(FFI_INTERNAL_ERROR, "Result contains null bytes"),
    }
}

// Helper to create error result
fn make_error_result(code: i32, msg: &str) -> ExportResultFFI {
    let error_cstr = CString::new(msg).unwrap_or_else(|_| CString::new("Unknown error").unwrap());
    ExportResultFFI {
        text_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
        error_code: code,
    }
}
