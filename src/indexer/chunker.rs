#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub position: usize,
}

/// Splits text into ordered chunks and tags each with its position.
pub fn chunk_text(content: &str, chunk_size: usize) -> Vec<Chunk> {
    split_into_chunks(content, chunk_size)
        .into_iter()
        .enumerate()
        .map(|(position, content)| Chunk { content, position })
        .collect()
}

/// Packs whitespace-separated words into chunks of at most `chunk_size`
/// characters (using `char` count), joined by single spaces.
///
/// Words are never split. A word longer than `chunk_size` becomes a chunk
/// of its own. Joining the output with single spaces gives back the
/// whitespace-normalized input.
pub fn split_into_chunks(content: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in content.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len > chunk_size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
