#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sentence_aware: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            sentence_aware: true,
        }
    }
}

/// Splits text into ordered, overlapping spans.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split `text` into spans of at most `chunk_size` characters; whitespace-only
    /// input yields none.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunk_size = self.config.chunk_size.max(1);
        if self.config.sentence_aware {
            let spans = fit_spans(&split_sentences(text), chunk_size);
            merge_spans(&spans, chunk_size, self.config.chunk_overlap)
        } else {
            char_windows(text, chunk_size, self.config.chunk_overlap)
                .into_iter()
                .map(str::to_owned)
                .collect()
        }
    }
}

/// Break `text` after `.`, `?` or `!` followed by a space, and after blank lines.
///
/// Spans keep their trailing punctuation and whitespace, so concatenating them
/// reproduces `text`. Blank spans are folded into the following one.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let end = match (c, chars.peek()) {
            ('\n', Some(&(next, '\n'))) => {
                chars.next();
                next + 1
            }
            ('.' | '?' | '!', Some(&(_, ' '))) => idx + 1,
            _ => continue,
        };
        if !text[start..end].trim().is_empty() {
            sentences.push(&text[start..end]);
            start = end;
        }
    }

    if !text[start..].trim().is_empty() {
        sentences.push(&text[start..]);
    }

    sentences
}

/// Separators tried, in order, on spans still longer than the chunk size.
const FALLBACK_SEPARATORS: [char; 2] = ['\n', ' '];

/// Re-split every span longer than `chunk_size` characters at line breaks,
/// then spaces, then fixed character windows.
fn fit_spans<'a>(spans: &[&'a str], chunk_size: usize) -> Vec<&'a str> {
    let mut fitted = Vec::with_capacity(spans.len());
    for &span in spans {
        refine(span, chunk_size, &FALLBACK_SEPARATORS, &mut fitted);
    }
    fitted
}

fn refine<'a>(span: &'a str, chunk_size: usize, separators: &[char], out: &mut Vec<&'a str>) {
    if span.chars().count() <= chunk_size {
        out.push(span);
        return;
    }
    match separators.split_first() {
        Some((&separator, rest)) => {
            for part in span.split_inclusive(separator) {
                refine(part, chunk_size, rest, out);
            }
        }
        None => out.extend(char_windows(span, chunk_size, 0)),
    }
}

/// Pack spans of at most `chunk_size` characters into chunks of at most
/// `chunk_size` characters, carrying trailing spans worth up to `chunk_overlap`
/// characters into the next chunk. Chunks are trimmed of surrounding whitespace.
fn merge_spans(spans: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let lens: Vec<usize> = spans.iter().map(|s| s.chars().count()).collect();
    let mut chunks = Vec::new();
    // Spans in the chunk being built: `spans[first..next]`.
    let mut first = 0;
    let mut len = 0;

    for (next, &span_len) in lens.iter().enumerate() {
        if len > 0 && len + span_len > chunk_size {
            push_trimmed(&mut chunks, &spans[first..next].concat());

            // The carried tail leaves at least the first span of the emitted chunk behind.
            let emitted_from = first;
            let mut carried = 0;
            first = next;
            while first > emitted_from + 1 {
                let candidate = lens[first - 1];
                if carried + candidate > chunk_overlap
                    || carried + candidate + span_len > chunk_size
                {
                    break;
                }
                carried += candidate;
                first -= 1;
            }
            len = carried;
        }
        len += span_len;
    }

    if first < spans.len() {
        push_trimmed(&mut chunks, &spans[first..].concat());
    }

    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_owned());
    }
}

/// Fixed windows of `chunk_size` characters advancing by `chunk_size - overlap`.
fn char_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let step = chunk_size.saturating_sub(overlap).max(1);
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        windows.push(&text[bounds[start]..bounds[end]]);
        if end == char_count {
            break;
        }
        start += step;
    }

    windows
}
