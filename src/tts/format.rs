use crate::error::AppError;

/// Output encoding used when the caller does not pick one.
pub const DEFAULT_OUTPUT_FORMAT: &str = "wav_22050";

/// An ElevenLabs `output_format` value such as `wav_22050` or `mp3_44100_128`.
///
/// The string is passed through to the vendor untouched; only its `wav_`
/// prefix matters here, deciding the content type and file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat(String);

impl OutputFormat {
    /// Pick the caller's format, or the default when unset or blank.
    ///
    /// Vendor format names are lowercase ASCII letters, digits and `_`;
    /// anything else is rejected before it reaches the vendor or a header.
    pub fn resolve(requested: Option<&str>) -> Result<Self, AppError> {
        match requested {
            Some(format) if !format.trim().is_empty() => {
                let valid = format
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
                if !valid {
                    return Err(AppError::BadRequest(format!(
                        "Invalid output format '{}'",
                        format.escape_debug()
                    )));
                }
                Ok(Self(format.to_string()))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wav(&self) -> bool {
        self.0.starts_with("wav_")
    }

    pub fn content_type(&self) -> &'static str {
        if self.is_wav() {
            "audio/wav"
        } else {
            "audio/mpeg"
        }
    }

    pub fn extension(&self) -> &'static str {
        if self.is_wav() {
            "wav"
        } else {
            "mp3"
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("inline; filename=speech.{}", self.extension())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self(DEFAULT_OUTPUT_FORMAT.to_string())
    }
}
