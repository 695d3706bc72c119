use std::fmt;

/// Input to a generation call: plain text, or an instruction plus a binary
/// payload for multimodal analysis.
#[derive(Clone, PartialEq)]
pub enum GenerationRequest {
    Text(String),
    Multimodal {
        prompt: String,
        media: Vec<u8>,
        media_type: String,
    },
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        GenerationRequest::Text(prompt.into())
    }

    pub fn multimodal(
        prompt: impl Into<String>,
        media: Vec<u8>,
        media_type: impl Into<String>,
    ) -> Self {
        GenerationRequest::Multimodal {
            prompt: prompt.into(),
            media,
            media_type: media_type.into(),
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            GenerationRequest::Text(prompt) => prompt,
            GenerationRequest::Multimodal { prompt, .. } => prompt,
        }
    }

    pub fn is_multimodal(&self) -> bool {
        matches!(self, GenerationRequest::Multimodal { .. })
    }
}

// Media payloads can be megabytes; show their size instead.
impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationRequest::Text(prompt) => f.debug_tuple("Text").field(prompt).finish(),
            GenerationRequest::Multimodal {
                prompt,
                media,
                media_type,
            } => f
                .debug_struct("Multimodal")
                .field("prompt", prompt)
                .field("media_len", &media.len())
                .field("media_type", media_type)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_accessor() {
        assert_eq!(GenerationRequest::text("hi").prompt(), "hi");
        let req = GenerationRequest::multimodal("describe", vec![1, 2, 3], "image/jpeg");
        assert_eq!(req.prompt(), "describe");
        assert!(req.is_multimodal());
    }

    #[test]
    fn test_debug_omits_media_bytes() {
        let req = GenerationRequest::multimodal("describe", vec![0xAB; 4096], "image/png");
        let debug = format!("{:?}", req);
        assert!(debug.contains("media_len: 4096"));
        assert!(!debug.contains("171"));
    }
}
