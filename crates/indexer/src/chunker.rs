/// Window budget per chunk, in characters.
pub const MAX_CHUNK_CHARS: usize = 2_000;

/// Chunks shorter than this carry no retrievable signal.
const MIN_CHUNK_CHARS: usize = 16;

/// One line-window slice of a source file, before embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    /// 1-based, inclusive.
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

/// Split file content into contiguous line windows of at most
/// [`MAX_CHUNK_CHARS`] characters.
///
/// A single line over the budget still becomes its own chunk; windows never
/// split mid-line. Whitespace-only windows are dropped.
#[must_use]
pub fn chunk_lines(content: &str) -> Vec<FileChunk> {
    let mut chunks = Vec::new();
    let mut window = String::new();
    let mut window_start = 1usize;
    let mut current_line = 0usize;

    for (i, line) in content.lines().enumerate() {
        current_line = i + 1;
        if !window.is_empty() && window.len() + line.len() + 1 > MAX_CHUNK_CHARS {
            push_window(&mut chunks, &mut window, window_start, current_line - 1);
            window_start = current_line;
        }
        if !window.is_empty() {
            window.push('\n');
        }
        window.push_str(line);
    }
    if !window.is_empty() {
        push_window(&mut chunks, &mut window, window_start, current_line);
    }
    chunks
}

fn push_window(chunks: &mut Vec<FileChunk>, window: &mut String, start: usize, end: usize) {
    let content = std::mem::take(window);
    if content.trim().len() >= MIN_CHUNK_CHARS {
        chunks.push(FileChunk {
            start_line: start,
            end_line: end,
            content,
        });
    }
}
