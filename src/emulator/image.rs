use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("line {line}: `{token}` is not a 32 bit hexadecimal word")]
    InvalidWord { line: usize, token: String },
    #[error("binary image is {len} bytes long, which is not a whole number of words")]
    TruncatedWord { len: usize },
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),
}

/// How the words of a program image are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// hexadecimal words separated by whitespace, `#` and `;` start comments
    #[default]
    Text,
    /// raw big-endian words
    Binary,
}

fn parse_word(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Parse a text image. Line numbers in errors start at 1.
pub fn parse_text(source: &str) -> Result<Vec<u32>, ImageError> {
    let mut words = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let code = line.split(['#', ';']).next().unwrap_or_default();
        for token in code.split_whitespace() {
            let word = parse_word(token).ok_or_else(|| ImageError::InvalidWord {
                line: index + 1,
                token: token.to_string(),
            })?;
            words.push(word);
        }
    }
    tracing::debug!(words = words.len(), "parsed text image");
    Ok(words)
}

pub fn parse_binary(bytes: &[u8]) -> Result<Vec<u32>, ImageError> {
    if bytes.len() % 4 != 0 {
        return Err(ImageError::TruncatedWord { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

pub fn read_image(path: impl AsRef<Path>, format: ImageFormat) -> Result<Vec<u32>, ImageError> {
    let path = path.as_ref();
    let span = tracing::info_span!("read_image", path = %path.display(), ?format);
    let _guard = span.enter();

    match format {
        ImageFormat::Text => parse_text(&std::fs::read_to_string(path)?),
        ImageFormat::Binary => parse_binary(&std::fs::read(path)?),
    }
}
