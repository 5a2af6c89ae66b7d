//! FFI layer for the mobile host.
//!
//! This module provides C-compatible functions that can be called from the
//! app's native bridge. All structured data crosses the boundary as JSON.
//!
//! # Memory Management
//!
//! - Strings returned by `scorecard_*` functions are allocated by Rust
//! - Caller must free them with `scorecard_string_free`
//! - Score map pointers must be freed with `scorecard_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{migrate, CoursePars, HoleNumber, HoleScoreMap, Strokes};
use serde::Serialize;
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(Serialize)]
#[serde(untagged)]
enum FfiResult<T: Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Payload of `scorecard_migrate`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MigrateResponse {
    scores: HoleScoreMap,
    needs_rewrite: bool,
    discarded: Vec<String>,
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `scorecard_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => c"{\"error\":\"string contained null bytes\"}".to_owned().into_raw(),
    }
}

fn respond<T: Serialize>(result: FfiResult<T>) -> *mut c_char {
    to_c_string(result.to_json())
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

// ============================================================================
// Score Map Lifecycle
// ============================================================================

/// Create an empty score map.
///
/// Caller must free the returned pointer with `scorecard_free`.
#[no_mangle]
pub extern "C" fn scorecard_new() -> *mut HoleScoreMap {
    Box::into_raw(Box::new(HoleScoreMap::new()))
}

/// Create a score map from a persisted blob, upgrading legacy data.
///
/// Use `scorecard_migrate` instead when the caller needs to know whether the
/// blob must be written back.
///
/// # Returns
/// Pointer to the score map, or null if the blob cannot be read.
///
/// # Safety
/// - `raw_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `scorecard_free`
#[no_mangle]
pub unsafe extern "C" fn scorecard_load(
    raw_json: *const c_char,
    active_hole: HoleNumber,
) -> *mut HoleScoreMap {
    let Some(raw) = from_c_string(raw_json) else {
        return std::ptr::null_mut();
    };

    match migrate::upgrade(&raw, active_hole) {
        Ok(upgrade) => Box::into_raw(Box::new(upgrade.scores)),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a score map.
///
/// # Safety
/// - `card` must be a valid pointer from `scorecard_new` or `scorecard_load`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn scorecard_free(card: *mut HoleScoreMap) {
    if !card.is_null() {
        drop(Box::from_raw(card));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `scorecard_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn scorecard_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Score Map Operations
// ============================================================================

/// Record strokes for a player on a hole.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `card` must be a valid pointer from `scorecard_new` or null
/// - `player_id` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `scorecard_string_free`
#[no_mangle]
pub unsafe extern "C" fn scorecard_set_score(
    card: *mut HoleScoreMap,
    hole: HoleNumber,
    player_id: *const c_char,
    strokes: Strokes,
) -> *mut c_char {
    let Some(card) = card.as_mut() else {
        return respond(FfiResult::<()>::err("null scorecard pointer"));
    };
    let Some(player_id) = from_c_string(player_id) else {
        return respond(FfiResult::<()>::err("invalid player id"));
    };
    if hole == 0 || strokes == 0 {
        return respond(FfiResult::<()>::err("hole and strokes must be positive"));
    }

    card.set_score(hole, player_id, strokes);
    respond(FfiResult::ok(()))
}

/// Remove a player's score for a hole.
///
/// # Returns
/// JSON string: `{"ok": <removed strokes or null>}` or `{"error": "message"}`
///
/// # Safety
/// - `card` must be a valid pointer from `scorecard_new` or null
/// - `player_id` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `scorecard_string_free`
#[no_mangle]
pub unsafe extern "C" fn scorecard_clear_score(
    card: *mut HoleScoreMap,
    hole: HoleNumber,
    player_id: *const c_char,
) -> *mut c_char {
    let Some(card) = card.as_mut() else {
        return respond(FfiResult::<()>::err("null scorecard pointer"));
    };
    let Some(player_id) = from_c_string(player_id) else {
        return respond(FfiResult::<()>::err("invalid player id"));
    };

    respond(FfiResult::ok(card.clear_score(hole, &player_id)))
}

/// Get the strokes a player recorded on a hole.
///
/// # Returns
/// The strokes, or -1 if absent or on invalid input.
///
/// # Safety
/// - `card` must be a valid pointer from `scorecard_new` or null
/// - `player_id` must be a valid null-terminated C string or null
#[no_mangle]
pub unsafe extern "C" fn scorecard_get_score(
    card: *const HoleScoreMap,
    hole: HoleNumber,
    player_id: *const c_char,
) -> i64 {
    let (Some(card), Some(player_id)) = (card.as_ref(), from_c_string(player_id)) else {
        return -1;
    };

    card.get_score(hole, &player_id).map_or(-1, i64::from)
}

/// Cumulative score relative to par across every scored hole.
///
/// # Arguments
/// - `pars_json`: JSON array of pars in hole order, or null for an unknown
///   course (par 3 everywhere)
///
/// # Returns
/// JSON string: `{"ok": <number or null>}` or `{"error": "message"}`.
/// `null` means the player has no score yet; `0` is even par.
///
/// # Safety
/// - `card` must be a valid pointer from `scorecard_new` or null
/// - `player_id` and `pars_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `scorecard_string_free`
#[no_mangle]
pub unsafe extern "C" fn scorecard_relative_to_par(
    card: *const HoleScoreMap,
    player_id: *const c_char,
    pars_json: *const c_char,
) -> *mut c_char {
    let Some(card) = card.as_ref() else {
        return respond(FfiResult::<()>::err("null scorecard pointer"));
    };
    let Some(player_id) = from_c_string(player_id) else {
        return respond(FfiResult::<()>::err("invalid player id"));
    };

    let pars = match from_c_string(pars_json) {
        None => CoursePars::unknown(),
        Some(json) => match serde_json::from_str::<CoursePars>(&json) {
            Ok(pars) => pars,
            Err(e) => return respond(FfiResult::<()>::err(format!("parse error: {}", e))),
        },
    };

    respond(FfiResult::ok(
        card.cumulative_relative_to_par(&player_id, pars.lookup()),
    ))
}

/// Build the submission for one hole.
///
/// # Arguments
/// - `players_json`: JSON array of player ids in display order
///
/// # Returns
/// JSON string: `{"ok": [ScoreEntry...]}`, `{"ok": null}` if any player is
/// missing a score, or `{"error": "message"}`
///
/// # Safety
/// - `card` must be a valid pointer from `scorecard_new` or null
/// - `players_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `scorecard_string_free`
#[no_mangle]
pub unsafe extern "C" fn scorecard_hole_submission(
    card: *const HoleScoreMap,
    hole: HoleNumber,
    players_json: *const c_char,
) -> *mut c_char {
    let Some(card) = card.as_ref() else {
        return respond(FfiResult::<()>::err("null scorecard pointer"));
    };
    let Some(players_json) = from_c_string(players_json) else {
        return respond(FfiResult::<()>::err("invalid players JSON"));
    };
    let players: Vec<String> = match serde_json::from_str(&players_json) {
        Ok(players) => players,
        Err(e) => return respond(FfiResult::<()>::err(format!("parse error: {}", e))),
    };

    respond(FfiResult::ok(card.hole_submission(hole, &players)))
}

/// Export the score map in its persisted form.
///
/// # Returns
/// JSON string: `{"ok": HoleScoreMap}` or `{"error": "message"}`
///
/// # Safety
/// - `card` must be a valid pointer from `scorecard_new` or null
/// - Caller must free the returned string with `scorecard_string_free`
#[no_mangle]
pub unsafe extern "C" fn scorecard_export(card: *const HoleScoreMap) -> *mut c_char {
    match card.as_ref() {
        Some(card) => respond(FfiResult::ok(card)),
        None => respond(FfiResult::<()>::err("null scorecard pointer")),
    }
}

// ============================================================================
// Migration
// ============================================================================

/// Upgrade a persisted blob to the hole-indexed format.
///
/// # Returns
/// JSON string: `{"ok": {"scores": ..., "needsRewrite": bool, "discarded": [...]}}`
/// or `{"error": "message"}`. When `needsRewrite` is true the host must
/// persist `scores` back under the same key.
///
/// # Safety
/// - `raw_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `scorecard_string_free`
#[no_mangle]
pub unsafe extern "C" fn scorecard_migrate(
    raw_json: *const c_char,
    active_hole: HoleNumber,
) -> *mut c_char {
    let Some(raw) = from_c_string(raw_json) else {
        return respond(FfiResult::<()>::err("invalid scorecard JSON"));
    };

    match migrate::upgrade(&raw, active_hole) {
        Ok(upgrade) => {
            let needs_rewrite = upgrade.needs_rewrite();
            respond(FfiResult::ok(MigrateResponse {
                scores: upgrade.scores,
                needs_rewrite,
                discarded: upgrade.discarded,
            }))
        }
        Err(e) => respond(FfiResult::<()>::err(e.to_string())),
    }
}

// ============================================================================
// Version Info
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn scorecard_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the retry ceiling for queued operations.
#[no_mangle]
pub extern "C" fn scorecard_max_retries() -> u32 {
    crate::MAX_RETRIES
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        scorecard_string_free(ptr);
        s
    }

    #[test]
    fn ffi_scorecard_lifecycle() {
        let card = scorecard_new();
        assert!(!card.is_null());
        unsafe { scorecard_free(card) };
    }

    #[test]
    fn ffi_set_and_get_score() {
        unsafe {
            let card = scorecard_new();
            let player = CString::new("p1").unwrap();

            let result = take_string(scorecard_set_score(card, 1, player.as_ptr(), 4));
            assert_eq!(result, r#"{"ok":null}"#);

            assert_eq!(scorecard_get_score(card, 1, player.as_ptr()), 4);
            assert_eq!(scorecard_get_score(card, 2, player.as_ptr()), -1);

            let exported = take_string(scorecard_export(card));
            assert_eq!(exported, r#"{"ok":{"1":{"p1":4}}}"#);

            let cleared = take_string(scorecard_clear_score(card, 1, player.as_ptr()));
            assert_eq!(cleared, r#"{"ok":4}"#);

            scorecard_free(card);
        }
    }

    #[test]
    fn ffi_rejects_zero_strokes() {
        unsafe {
            let card = scorecard_new();
            let player = CString::new("p1").unwrap();

            let result = take_string(scorecard_set_score(card, 1, player.as_ptr(), 0));
            assert!(result.contains("\"error\""));
            assert_eq!(scorecard_get_score(card, 1, player.as_ptr()), -1);

            scorecard_free(card);
        }
    }

    #[test]
    fn ffi_relative_to_par() {
        unsafe {
            let card = scorecard_new();
            let p1 = CString::new("p1").unwrap();
            let p2 = CString::new("p2").unwrap();
            let pars = CString::new("[4, 3]").unwrap();

            take_string(scorecard_set_score(card, 1, p1.as_ptr(), 4));
            take_string(scorecard_set_score(card, 2, p1.as_ptr(), 5));

            let result = take_string(scorecard_relative_to_par(card, p1.as_ptr(), pars.as_ptr()));
            assert_eq!(result, r#"{"ok":2}"#);

            let unknown = take_string(scorecard_relative_to_par(
                card,
                p1.as_ptr(),
                std::ptr::null(),
            ));
            assert_eq!(unknown, r#"{"ok":3}"#);

            let none = take_string(scorecard_relative_to_par(card, p2.as_ptr(), pars.as_ptr()));
            assert_eq!(none, r#"{"ok":null}"#);

            scorecard_free(card);
        }
    }

    #[test]
    fn ffi_hole_submission() {
        unsafe {
            let card = scorecard_new();
            let p1 = CString::new("p1").unwrap();
            let p2 = CString::new("p2").unwrap();
            let players = CString::new(r#"["p2","p1"]"#).unwrap();

            take_string(scorecard_set_score(card, 3, p1.as_ptr(), 4));
            let partial = take_string(scorecard_hole_submission(card, 3, players.as_ptr()));
            assert_eq!(partial, r#"{"ok":null}"#);

            take_string(scorecard_set_score(card, 3, p2.as_ptr(), 2));
            let full = take_string(scorecard_hole_submission(card, 3, players.as_ptr()));
            assert_eq!(
                full,
                r#"{"ok":[{"playerId":"p2","holeNumber":3,"strokes":2},{"playerId":"p1","holeNumber":3,"strokes":4}]}"#
            );

            scorecard_free(card);
        }
    }

    #[test]
    fn ffi_migrate_legacy() {
        unsafe {
            let raw = CString::new(r#"{"p1":4,"p2":3}"#).unwrap();
            let result = take_string(scorecard_migrate(raw.as_ptr(), 1));
            assert_eq!(
                result,
                r#"{"ok":{"scores":{"1":{"p1":4,"p2":3}},"needsRewrite":true,"discarded":[]}}"#
            );

            let card = scorecard_load(raw.as_ptr(), 2);
            assert!(!card.is_null());
            let p1 = CString::new("p1").unwrap();
            assert_eq!(scorecard_get_score(card, 2, p1.as_ptr()), 4);
            scorecard_free(card);
        }
    }

    #[test]
    fn ffi_null_handling() {
        unsafe {
            let result = take_string(scorecard_export(std::ptr::null()));
            assert!(result.contains("null scorecard pointer"));

            let result = take_string(scorecard_migrate(std::ptr::null(), 1));
            assert!(result.contains("\"error\""));

            assert!(scorecard_load(std::ptr::null(), 1).is_null());
            let bad = CString::new("[]").unwrap();
            assert!(scorecard_load(bad.as_ptr(), 1).is_null());

            // Should not crash
            scorecard_free(std::ptr::null_mut());
            scorecard_string_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn ffi_version() {
        let version = unsafe { CStr::from_ptr(scorecard_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
        assert_eq!(scorecard_max_retries(), 3);
    }
}
