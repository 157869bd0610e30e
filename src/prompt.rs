//! Prompt file parsing.
//!
//! A prompt file is plain text with optional `#` comments, `section:`
//! headers, and `key=value` settings:
//!
//! ```text
//! # sunset scene
//! prompt:
//! A lighthouse on a cliff
//! at golden hour
//! negative_prompt:
//! blurry, low quality
//! size=1328*1328
//! watermark=false
//! ```

use crate::error::{Error, Result};
use std::path::Path;

/// Size used when the prompt file does not set one.
pub const DEFAULT_SIZE: &str = "1024*1024";

/// Parameters for one generation run, read from a prompt file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    /// Text describing the desired image. Never empty.
    pub prompt: String,
    /// Attributes to avoid; empty when unset.
    pub negative_prompt: String,
    /// `"<width>*<height>"`, passed through verbatim.
    pub size: String,
    /// Let the service rewrite and extend the prompt.
    pub prompt_extend: bool,
    /// Ask the service to add a watermark.
    pub watermark: bool,
    /// Requested image count, kept verbatim. Not sent to the API.
    pub n: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Prompt,
    NegativePrompt,
    Other,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name {
            "prompt" => Self::Prompt,
            "negative_prompt" => Self::NegativePrompt,
            _ => Self::Other,
        }
    }
}

impl PromptSpec {
    /// Reads and parses the prompt file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::PromptFileNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;

        let spec = Self::parse(&text).ok_or_else(|| Error::PromptEmpty {
            path: path.to_path_buf(),
        })?;

        tracing::info!(
            prompt_chars = spec.prompt.chars().count(),
            "prompt file parsed"
        );
        if !spec.negative_prompt.is_empty() {
            tracing::info!(
                negative_prompt_chars = spec.negative_prompt.chars().count(),
                "negative prompt present"
            );
        }
        Ok(spec)
    }

    /// Parses prompt file text. Returns `None` if no prompt text was found.
    pub fn parse(text: &str) -> Option<Self> {
        let mut prompt: Vec<&str> = Vec::new();
        let mut negative: Vec<&str> = Vec::new();
        let mut size = DEFAULT_SIZE.to_string();
        let mut n = None;
        let mut prompt_extend = true;
        let mut watermark = false;
        let mut section = None;

        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_suffix(':') {
                section = Some(Section::from_header(&name.to_lowercase()));
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                section = None;
                let value = value.trim();
                match key.trim().to_lowercase().as_str() {
                    "size" => size = value.to_string(),
                    "n" => n = Some(value.to_string()),
                    "prompt_extend" => prompt_extend = parse_flag(value),
                    "watermark" => watermark = parse_flag(value),
                    "negative_prompt" => negative = vec![value],
                    other => tracing::debug!(key = other, "ignoring unknown prompt setting"),
                }
                continue;
            }

            match section {
                Some(Section::Prompt) => prompt.push(line),
                Some(Section::NegativePrompt) => negative.push(line),
                // Only the first unlabeled line becomes the prompt.
                _ if prompt.is_empty() => prompt.push(line),
                _ => {}
            }
        }

        let prompt = prompt.join(" ").trim().to_string();
        if prompt.is_empty() {
            return None;
        }

        Some(Self {
            prompt,
            negative_prompt: negative.join(" ").trim().to_string(),
            size,
            prompt_extend,
            watermark,
            n,
        })
    }

    /// Returns the prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the negative prompt (possibly empty).
    pub fn negative_prompt(&self) -> &str {
        &self.negative_prompt
    }

    /// Returns the size string.
    pub fn size(&self) -> &str {
        &self.size
    }

    /// Returns whether prompt extension is enabled.
    pub fn prompt_extend(&self) -> bool {
        self.prompt_extend
    }

    /// Returns whether a watermark is requested.
    pub fn watermark(&self) -> bool {
        self.watermark
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "yes" | "1" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_prompt_section_joins_lines() {
        let spec = PromptSpec::parse("prompt:\nA lighthouse\n  on a cliff  \nat dusk\n").unwrap();
        assert_eq!(spec.prompt, "A lighthouse on a cliff at dusk");
    }

    #[test]
    fn test_cat_example() {
        let spec = PromptSpec::parse("prompt:\nA cat\nsize=512*512\nwatermark=true").unwrap();
        assert_eq!(
            spec,
            PromptSpec {
                prompt: "A cat".into(),
                negative_prompt: String::new(),
                size: "512*512".into(),
                prompt_extend: true,
                watermark: true,
                n: None,
            }
        );
    }

    #[test]
    fn test_defaults() {
        let spec = PromptSpec::parse("A red fox").unwrap();
        assert_eq!(spec.prompt(), "A red fox");
        assert_eq!(spec.negative_prompt(), "");
        assert_eq!(spec.size(), DEFAULT_SIZE);
        assert!(spec.prompt_extend());
        assert!(!spec.watermark());
        assert_eq!(spec.n, None);
    }

    #[test]
    fn test_flags_case_insensitive() {
        for value in ["true", "TRUE", "Yes", "1", "on", "ON"] {
            let spec = PromptSpec::parse(&format!("x\nwatermark={value}")).unwrap();
            assert!(spec.watermark, "{value} should be true");
        }
        for value in ["false", "no", "0", "off", "maybe", ""] {
            let spec = PromptSpec::parse(&format!("x\nprompt_extend={value}")).unwrap();
            assert!(!spec.prompt_extend, "{value} should be false");
        }
    }

    #[test]
    fn test_keys_are_case_insensitive_and_trimmed() {
        let spec = PromptSpec::parse("x\n  SIZE = 1328*1328 \nN=2").unwrap();
        assert_eq!(spec.size, "1328*1328");
        assert_eq!(spec.n.as_deref(), Some("2"));
    }

    #[test]
    fn test_negative_prompt_section() {
        let text = "prompt:\nA forest\nnegative_prompt:\nblurry\nlow quality\n";
        let spec = PromptSpec::parse(text).unwrap();
        assert_eq!(spec.prompt, "A forest");
        assert_eq!(spec.negative_prompt, "blurry low quality");
    }

    #[test]
    fn test_negative_prompt_key_overwrites_section() {
        let text = "prompt:\nA forest\nnegative_prompt:\nblurry\nnegative_prompt=text, watermark";
        let spec = PromptSpec::parse(text).unwrap();
        assert_eq!(spec.negative_prompt, "text, watermark");
    }

    #[test]
    fn test_section_headers_lowercased() {
        let spec = PromptSpec::parse("PROMPT:\nA\nB").unwrap();
        assert_eq!(spec.prompt, "A B");
    }

    #[test]
    fn test_header_name_is_not_trimmed() {
        let spec = PromptSpec::parse("intro\nprompt :\nignored").unwrap();
        assert_eq!(spec.prompt, "intro");
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let text = "# title\n\nprompt:\n# inner comment\nA boat\n\n";
        let spec = PromptSpec::parse(text).unwrap();
        assert_eq!(spec.prompt, "A boat");
    }

    #[test]
    fn test_only_first_unlabeled_line_is_kept() {
        let spec = PromptSpec::parse("first line\nsecond line\n").unwrap();
        assert_eq!(spec.prompt, "first line");
    }

    #[test]
    fn test_unlabeled_line_then_prompt_section() {
        let spec = PromptSpec::parse("intro\nprompt:\nmore").unwrap();
        assert_eq!(spec.prompt, "intro more");
    }

    #[test]
    fn test_key_value_closes_section() {
        let spec = PromptSpec::parse("prompt:\nA cat\nsize=512*512\nstray text").unwrap();
        assert_eq!(spec.prompt, "A cat");
    }

    #[test]
    fn test_unknown_section_text_falls_back_to_first_line_rule() {
        let spec = PromptSpec::parse("notes:\nA harbor\nignored").unwrap();
        assert_eq!(spec.prompt, "A harbor");
    }

    #[test]
    fn test_empty_prompt() {
        assert!(PromptSpec::parse("").is_none());
        assert!(PromptSpec::parse("# only a comment\n\n").is_none());
        assert!(PromptSpec::parse("prompt:\nsize=512*512").is_none());
        assert!(PromptSpec::parse("negative_prompt:\nblurry").is_none());
    }

    #[test]
    fn test_from_file_empty_prompt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"# nothing here\n").unwrap();
        let err = PromptSpec::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::PromptEmpty { .. }));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptSpec::from_file(dir.path().join("prompt.txt")).unwrap_err();
        assert!(matches!(err, Error::PromptFileNotFound { .. }));
    }

    #[test]
    fn test_from_file_crlf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"prompt:\r\nA cat\r\nsize=512*512\r\n").unwrap();
        let spec = PromptSpec::from_file(file.path()).unwrap();
        assert_eq!(spec.prompt, "A cat");
        assert_eq!(spec.size, "512*512");
    }
}
