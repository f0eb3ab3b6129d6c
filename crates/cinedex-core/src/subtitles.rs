//! SubRip to WebVTT conversion for stored subtitle tracks.

const VTT_HEADER: &str = "WEBVTT";
const CUE_ARROW: &str = "-->";

/// Converts a SubRip (`.srt`) track to WebVTT.
///
/// Prepends the `WEBVTT` header and switches the millisecond separator in
/// cue timings from `,` to `.`. Cue text is left untouched, so commas in
/// dialogue survive. Input that already starts with the header is returned
/// with normalized line endings only.
///
/// # Examples
///
/// ```
/// use cinedex_core::subtitles::srt_to_vtt;
///
/// let vtt = srt_to_vtt("1\n00:00:01,500 --> 00:00:03,000\nWell, hello.\n");
/// assert_eq!(vtt, "WEBVTT\n\n1\n00:00:01.500 --> 00:00:03.000\nWell, hello.\n");
/// ```
pub fn srt_to_vtt(srt: &str) -> String {
    let body = srt.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    if body.starts_with(VTT_HEADER) {
        return body;
    }

    let mut vtt = String::with_capacity(body.len() + VTT_HEADER.len() + 2);
    vtt.push_str(VTT_HEADER);
    vtt.push_str("\n\n");
    for line in body.split_inclusive('\n') {
        if line.contains(CUE_ARROW) {
            vtt.push_str(&line.replace(',', "."));
        } else {
            vtt.push_str(line);
        }
    }
    vtt
}
