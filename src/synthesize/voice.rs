use serde::Serialize;

use crate::error::{DublineError, Result};

/// Built-in speakers: (language code, male, female)
const SPEAKERS: &[(&str, &str, &str)] = &[
    ("hi", "Rohit", "Divya"),
    ("mr", "Sanjay", "Sunita"),
    ("bn", "Arjun", "Aditi"),
];

/// Map a language name or code to its ISO 639-1 code.
///
/// Unknown values are passed through lower-cased so that any code the
/// translation backend understands still works.
pub fn normalize_language(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    match lowered.as_str() {
        "hindi" | "hin" => "hi",
        "marathi" | "mar" => "mr",
        "bengali" | "bangla" | "ben" => "bn",
        "english" | "eng" => "en",
        "tamil" | "tam" => "ta",
        "telugu" | "tel" => "te",
        "gujarati" | "guj" => "gu",
        "kannada" | "kan" => "kn",
        "malayalam" | "mal" => "ml",
        "punjabi" | "pan" => "pa",
        "odia" | "oriya" | "ori" => "or",
        "urdu" | "urd" => "ur",
        "spanish" | "spa" => "es",
        "french" | "fra" => "fr",
        "german" | "deu" => "de",
        "japanese" | "jpn" => "ja",
        _ => return lowered,
    }
    .to_string()
}

/// Speaker and description sent to the TTS service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceProfile {
    pub language: String,
    /// Named built-in speaker, if one was selected
    pub speaker: Option<String>,
    pub description: String,
}

impl VoiceProfile {
    /// `male`/`female` select a built-in speaker for the language; anything
    /// else is used verbatim as the voice description.
    pub fn resolve(language: &str, voice: &str, speaker_style: &str) -> Result<Self> {
        let language = normalize_language(language);
        let voice = voice.trim();

        let pick_female = match voice.to_lowercase().as_str() {
            "male" => Some(false),
            "female" => Some(true),
            _ => None,
        };

        let Some(female) = pick_female else {
            if voice.is_empty() {
                return Err(DublineError::Validation("voice must not be empty".to_string()));
            }
            return Ok(Self {
                language,
                speaker: None,
                description: voice.to_string(),
            });
        };

        let (_, male_name, female_name) = SPEAKERS
            .iter()
            .find(|(code, _, _)| *code == language)
            .ok_or_else(|| {
                DublineError::Validation(format!(
                    "no built-in {} voice for language '{}'; choose from Hindi, Marathi, Bengali or pass a voice description",
                    voice.to_lowercase(),
                    language
                ))
            })?;

        let name = if female { *female_name } else { *male_name };
        Ok(Self {
            language,
            speaker: Some(name.to_string()),
            description: format!("{} {}", name, speaker_style.trim()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLE: &str = "speaks quickly";

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("Hindi"), "hi");
        assert_eq!(normalize_language(" MARATHI "), "mr");
        assert_eq!(normalize_language("bn"), "bn");
        assert_eq!(normalize_language("pt-BR"), "pt-br");
    }

    #[test]
    fn test_builtin_speakers() {
        let profile = VoiceProfile::resolve("Hindi", "female", STYLE).unwrap();
        assert_eq!(profile.language, "hi");
        assert_eq!(profile.speaker.as_deref(), Some("Divya"));
        assert_eq!(profile.description, "Divya speaks quickly");

        let profile = VoiceProfile::resolve("mr", "Male", STYLE).unwrap();
        assert_eq!(profile.speaker.as_deref(), Some("Sanjay"));

        let profile = VoiceProfile::resolve("bengali", "female", STYLE).unwrap();
        assert_eq!(profile.speaker.as_deref(), Some("Aditi"));
    }

    #[test]
    fn test_free_text_voice_used_verbatim() {
        let profile = VoiceProfile::resolve("fr", "A calm narrator with a deep voice", STYLE).unwrap();
        assert_eq!(profile.speaker, None);
        assert_eq!(profile.description, "A calm narrator with a deep voice");
    }

    #[test]
    fn test_builtin_voice_needs_supported_language() {
        let err = VoiceProfile::resolve("fr", "male", STYLE).unwrap_err();
        assert!(matches!(err, DublineError::Validation(_)));
        assert!(VoiceProfile::resolve("hi", "  ", STYLE).is_err());
    }
}
