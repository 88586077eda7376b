use tracing::debug;

/// Default per-request character budget for the batch path.
pub const DEFAULT_MAX_CHARS: usize = 7000;

/// Split slides into contiguous groups whose combined length stays within
/// `max_chars`. A slide is never split; an oversized slide forms its own group.
pub fn chunk_slides(slides: &[String], max_chars: usize) -> Vec<&[String]> {
    let mut groups = Vec::new();
    let mut start = 0usize;
    let mut size = 0usize;

    for (i, slide) in slides.iter().enumerate() {
        let len = slide.chars().count();
        if size + len > max_chars && i > start {
            groups.push(&slides[start..i]);
            start = i;
            size = 0;
        }
        size += len;
    }
    if start < slides.len() {
        groups.push(&slides[start..]);
    }

    debug!(target: "slide_quiz::chunker", slides = slides.len(), groups = groups.len(), max_chars, "chunked slides");
    groups
}
