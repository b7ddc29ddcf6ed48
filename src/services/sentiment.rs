use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::diary::Emotion;

const SUMMARY_MAX_CHARS: usize = 140;

const POSITIVE_WORDS: &[&str] = &[
    "feliz", "alegre", "contento", "contenta", "tranquilo", "tranquila", "bien", "genial",
    "agradecido", "agradecida", "relajado", "relajada", "motivado", "motivada", "orgulloso",
    "orgullosa", "calma", "disfruté", "descansé", "happy", "calm", "grateful", "relaxed",
    "great", "good", "proud", "rested", "excited", "hopeful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "triste", "ansioso", "ansiosa", "ansiedad", "estresado", "estresada", "estrés", "cansado",
    "cansada", "agotado", "agotada", "preocupado", "preocupada", "enojado", "enojada", "miedo",
    "solo", "sola", "mal", "frustrado", "frustrada", "llorar", "lloré", "sad", "anxious",
    "stressed", "tired", "exhausted", "worried", "angry", "afraid", "lonely", "bad",
    "frustrated", "overwhelmed",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub emotion: Emotion,
    pub intensity: f64,
    pub summary: String,
    #[serde(skip)]
    pub source: SentimentSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentimentSource {
    Claude,
    #[default]
    Lexicon,
}

/// Fills the derived sentiment fields of diary entries. Uses Claude when an
/// API key is configured and falls back to a word list otherwise, so a diary
/// write never fails because of analysis.
pub struct SentimentAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl SentimentAnalyzer {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: config.claude_api_key.clone(),
            model: config.claude_model.clone(),
        })
    }

    pub async fn analyze(&self, text: &str) -> Sentiment {
        if self.api_key.is_empty() {
            return lexicon_sentiment(text);
        }

        match self.call_claude(text).await {
            Ok(sentiment) => sentiment,
            Err(e) => {
                tracing::warn!(error = %e, "Claude API unavailable, using lexicon sentiment");
                lexicon_sentiment(text)
            }
        }
    }

    async fn call_claude(&self, text: &str) -> anyhow::Result<Sentiment> {
        let prompt = format!(
            r#"Analyze the emotional tone of this personal diary entry.

Entry:
{}

Reply with JSON only, using this exact schema:
{{
  "emotion": "positive" | "negative" | "neutral",
  "intensity": number between 0 and 1,
  "summary": "one sentence summary in the entry's language"
}}"#,
            text
        );

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": 256,
                "messages": [{
                    "role": "user",
                    "content": prompt
                }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Claude API error {}: {}", status, body);
        }

        let claude_response: serde_json::Value = response.json().await?;
        let verdict = claude_response["content"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Claude response has no text content"))?;

        parse_verdict(verdict)
    }
}

fn parse_verdict(raw: &str) -> anyhow::Result<Sentiment> {
    let mut sentiment: Sentiment = serde_json::from_str(raw.trim())?;
    if !(0.0..=1.0).contains(&sentiment.intensity) {
        anyhow::bail!("intensity {} out of range", sentiment.intensity);
    }
    sentiment.summary = truncate_chars(sentiment.summary.trim(), SUMMARY_MAX_CHARS);
    sentiment.source = SentimentSource::Claude;
    Ok(sentiment)
}

/// Deterministic word-list scoring. Intensity is the margin between positive
/// and negative hits relative to all hits.
pub fn lexicon_sentiment(text: &str) -> Sentiment {
    let lowered = text.to_lowercase();
    let (mut positive, mut negative) = (0usize, 0usize);

    for word in lowered.split(|c: char| !c.is_alphanumeric()) {
        if POSITIVE_WORDS.contains(&word) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&word) {
            negative += 1;
        }
    }

    let matched = positive + negative;
    let intensity = if matched == 0 {
        0.0
    } else {
        (positive.abs_diff(negative) as f64 / matched as f64).clamp(0.0, 1.0)
    };

    let emotion = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Emotion::Positive,
        std::cmp::Ordering::Less => Emotion::Negative,
        std::cmp::Ordering::Equal => Emotion::Neutral,
    };

    Sentiment {
        emotion,
        intensity,
        summary: first_sentence(text),
        source: SentimentSource::Lexicon,
    }
}

fn first_sentence(text: &str) -> String {
    let text = text.trim();
    let end = text
        .find(|c: char| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|i| i + 1)
        .unwrap_or(text.len());
    truncate_chars(text[..end].trim(), SUMMARY_MAX_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_words_win() {
        let s = lexicon_sentiment("Me siento cansada y muy ansiosa por el trabajo. Hoy lloré.");
        assert_eq!(s.emotion, Emotion::Negative);
        assert_eq!(s.intensity, 1.0);
        assert_eq!(s.summary, "Me siento cansada y muy ansiosa por el trabajo.");
    }

    #[test]
    fn mixed_text_has_partial_intensity() {
        let s = lexicon_sentiment("Estaba feliz en la mañana, tranquila, pero luego triste.");
        assert_eq!(s.emotion, Emotion::Positive);
        assert!((s.intensity - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn no_signal_is_neutral() {
        let s = lexicon_sentiment("Fui al supermercado y después cociné arroz");
        assert_eq!(s.emotion, Emotion::Neutral);
        assert_eq!(s.intensity, 0.0);
        assert_eq!(s.source, SentimentSource::Lexicon);
    }

    #[test]
    fn summary_is_truncated_on_char_boundary() {
        let long = "á".repeat(300);
        let summary = first_sentence(&long);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS + 1);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn claude_verdict_is_validated() {
        let ok = parse_verdict(r#"{"emotion":"positive","intensity":0.7,"summary":"Un buen día."}"#)
            .unwrap();
        assert_eq!(ok.emotion, Emotion::Positive);
        assert_eq!(ok.source, SentimentSource::Claude);

        assert!(parse_verdict(r#"{"emotion":"positive","intensity":3,"summary":"x"}"#).is_err());
        assert!(parse_verdict("not json").is_err());
    }

    #[tokio::test]
    async fn analyzer_without_key_uses_lexicon() {
        let analyzer = SentimentAnalyzer {
            client: reqwest::Client::new(),
            api_key: String::new(),
            model: "unused".into(),
        };
        let s = analyzer.analyze("Hoy me sentí muy feliz y agradecida.").await;
        assert_eq!(s.emotion, Emotion::Positive);
        assert_eq!(s.source, SentimentSource::Lexicon);
    }
}
