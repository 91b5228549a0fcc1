//! Demo playback page: a minimal hls.js player pointed at the proxy.

use axum::extract::Query;
use axum::response::Html;
use serde::Deserialize;

const DEFAULT_SRC: &str = "/hls/live/playlist.m3u8";

/// Query parameters for the player page
#[derive(Debug, Deserialize)]
pub struct PlayerParams {
    /// Proxy-relative stream URL, e.g. `/hls/live2/playlist.m3u8`
    src: Option<String>,
}

impl PlayerParams {
    /// Only proxy-relative sources are embedded; anything absolute or
    /// scheme-relative falls back to the default stream.
    fn source(&self) -> &str {
        match self.src.as_deref() {
            Some(s) if s.starts_with('/') && !s.starts_with("//") => s,
            _ => DEFAULT_SRC,
        }
    }
}

/// Serve the test player. The stream URL is JSON-encoded into the inline
/// script so quotes in the query cannot break out of the string literal.
pub async fn player_page(Query(params): Query<PlayerParams>) -> Html<String> {
    let src = serde_json::to_string(params.source())
        .unwrap_or_else(|_| format!("\"{DEFAULT_SRC}\""));

    Html(format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>HLS Test</title>
</head>
<body style="background:#000;margin:0;display:grid;place-items:center;height:100vh">
<video id="v" controls playsinline style="width:min(90vw,900px);max-height:90vh;background:#111"></video>
<script src="https://cdn.jsdelivr.net/npm/hls.js@latest"></script>
<script>
const v = document.getElementById('v');
const src = {src};
if (Hls.isSupported()) {{
  const h = new Hls();
  h.loadSource(src);
  h.attachMedia(v);
  h.on(Hls.Events.ERROR, (e, d) => console.log('HLS error', d));
}} else if (v.canPlayType('application/vnd.apple.mpegurl')) {{
  v.src = src;
}}
</script>
</body>
</html>"#
    ))
}
