//! Content Classifier: request path + upstream Content-Type → category,
//! canonical Content-Type, and cache policy.

/// Resource category as seen by the proxy pipeline.
///
/// Only `Manifest` bodies are buffered and rewritten; everything else is
/// streamed through. `.mpd` manifests are recognized but classified `Other`:
/// DASH rewriting is out of scope, so they must not enter the rewrite path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Manifest,
    Segment,
    Other,
}

impl ContentCategory {
    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Manifest => "manifest",
            ContentCategory::Segment => "segment",
            ContentCategory::Other => "other",
        }
    }
}

/// Classifier output: what the resource is and which headers to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: ContentCategory,
    /// Canonical Content-Type; `None` passes the upstream's own through.
    pub content_type: Option<&'static str>,
    /// Cache-Control to emit; `None` adds no caching directive.
    pub cache_control: Option<&'static str>,
}

/// Live playlists change every few seconds — never cache them.
pub const MANIFEST_CACHE: &str = "no-store";

/// A published segment URL's bytes never change — cache aggressively.
pub const SEGMENT_CACHE: &str = "public, max-age=31536000, immutable";

pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const DASH_CONTENT_TYPE: &str = "application/dash+xml";

/// Classify a resource. File extension on the request path wins; the
/// upstream's declared Content-Type is the fallback for extensionless or
/// unknown paths.
pub fn classify(path: &str, upstream_content_type: Option<&str>) -> Classification {
    if let Some(ext) = extension(path) {
        if let Some(c) = classify_extension(&ext) {
            return c;
        }
    }
    classify_content_type(upstream_content_type)
}

/// Lowercased extension of the last path segment, query excluded.
fn extension(path: &str) -> Option<String> {
    let without_query = path.split('?').next().unwrap_or(path);
    let name = without_query.rsplit('/').next().unwrap_or(without_query);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn classify_extension(ext: &str) -> Option<Classification> {
    let c = match ext {
        "m3u8" | "m3u" => Classification {
            category: ContentCategory::Manifest,
            content_type: Some(HLS_CONTENT_TYPE),
            cache_control: Some(MANIFEST_CACHE),
        },
        "ts" => segment("video/mp2t"),
        "m4s" | "mp4" | "m4v" => segment("video/mp4"),
        "aac" => segment("audio/aac"),
        "m4a" => segment("audio/mp4"),
        // Manifest-like XML, but DASH rewriting is not performed.
        "mpd" => Classification {
            category: ContentCategory::Other,
            content_type: Some(DASH_CONTENT_TYPE),
            cache_control: Some(MANIFEST_CACHE),
        },
        _ => return None,
    };
    Some(c)
}

fn segment(content_type: &'static str) -> Classification {
    Classification {
        category: ContentCategory::Segment,
        content_type: Some(content_type),
        cache_control: Some(SEGMENT_CACHE),
    }
}

fn classify_content_type(content_type: Option<&str>) -> Classification {
    let Some(ct) = content_type else {
        return other();
    };
    let ct = ct.to_ascii_lowercase();

    if ct.contains("mpegurl") {
        return Classification {
            category: ContentCategory::Manifest,
            content_type: Some(HLS_CONTENT_TYPE),
            cache_control: Some(MANIFEST_CACHE),
        };
    }
    if ct.contains("dash+xml") {
        return Classification {
            category: ContentCategory::Other,
            content_type: Some(DASH_CONTENT_TYPE),
            cache_control: Some(MANIFEST_CACHE),
        };
    }
    if ct.starts_with("video/") || ct.starts_with("audio/") {
        // Keep the upstream's own media type; it already knows best.
        return Classification {
            category: ContentCategory::Segment,
            content_type: None,
            cache_control: Some(SEGMENT_CACHE),
        };
    }
    other()
}

fn other() -> Classification {
    Classification {
        category: ContentCategory::Other,
        content_type: None,
        cache_control: None,
    }
}
