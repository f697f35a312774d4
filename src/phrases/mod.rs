use std::{future::Future, pin::Pin, time::Duration};

use anyhow::Result;

/// Boxed so generators can sit behind `Arc<dyn PhraseGenerator>`.
pub type PhraseFuture = Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'static>>;

/// Turns a confirmed keyword into candidate sentences. Implementations are
/// expected to be slow and unreliable.
pub trait PhraseGenerator: Send + Sync {
    fn generate(&self, keyword: &str) -> PhraseFuture;
}

/// Deterministic phrases offered when generation fails, so the user never
/// hits a dead end.
pub fn fallback_phrases(keyword: &str) -> Vec<String> {
    vec![
        format!("I need {keyword}."),
        format!("Can you help me with {keyword}?"),
        format!("I am thinking about {keyword}."),
    ]
}

/// Trims, drops blanks and caps the list. `None` when nothing usable remains.
pub fn sanitize_phrases(raw: Vec<String>, max: usize) -> Option<Vec<String>> {
    let phrases: Vec<String> = raw
        .into_iter()
        .map(|phrase| phrase.trim().to_string())
        .filter(|phrase| !phrase.is_empty())
        .take(max)
        .collect();

    if phrases.is_empty() {
        None
    } else {
        Some(phrases)
    }
}

/// Resolves after a fixed delay with numbered example sentences. Stands in
/// for the cloud generator in the driver binary and in tests.
#[derive(Debug, Clone)]
pub struct CannedPhraseGenerator {
    delay: Duration,
}

impl CannedPhraseGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl PhraseGenerator for CannedPhraseGenerator {
    fn generate(&self, keyword: &str) -> PhraseFuture {
        let delay = self.delay;
        let keyword = keyword.to_string();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok((1..=3)
                .map(|n| format!("{keyword} – example sentence {n}"))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_templates_embed_keyword() {
        assert_eq!(
            fallback_phrases("WATER"),
            vec![
                "I need WATER.",
                "Can you help me with WATER?",
                "I am thinking about WATER.",
            ]
        );
    }

    #[test]
    fn sanitize_trims_drops_blanks_and_caps() {
        let raw = vec![
            "  I am thirsty. ".to_string(),
            "".to_string(),
            "May I have some water?".to_string(),
            "   ".to_string(),
            "Please help me drink.".to_string(),
            "One too many.".to_string(),
        ];
        assert_eq!(
            sanitize_phrases(raw, 3).unwrap(),
            vec!["I am thirsty.", "May I have some water?", "Please help me drink."]
        );
    }

    #[test]
    fn sanitize_rejects_empty_output() {
        assert!(sanitize_phrases(Vec::new(), 3).is_none());
        assert!(sanitize_phrases(vec![" ".into()], 3).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn canned_generator_waits_then_answers() {
        let generator = CannedPhraseGenerator::new(Duration::from_millis(1000));
        let phrases = generator.generate("CUP").await.unwrap();
        assert_eq!(phrases.len(), 3);
        assert_eq!(phrases[0], "CUP – example sentence 1");
    }
}
