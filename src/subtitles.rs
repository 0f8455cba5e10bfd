//! SRT sidecar to WebVTT translation.
//!
//! Browsers only take WebVTT in `<track>` elements. SRT is close enough
//! that prepending the header and switching the cue-timestamp millisecond
//! separator from `,` to `.` covers the libraries this server targets.
//! Commas inside dialogue are left alone.

use std::sync::OnceLock;

use regex::Regex;

fn cue_timestamp() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2}:\d{2}:\d{2}),(\d{3})").expect("valid literal regex"))
}

/// Converts SRT text into a WebVTT document.
pub fn srt_to_vtt(srt: &str) -> String {
    let body = cue_timestamp().replace_all(srt, "$1.$2");
    format!("WEBVTT\n\n{body}")
}
