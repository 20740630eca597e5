use super::{ContextSources, ExternalLookup};
use crate::documents::NumerologyLibrary;
use crate::numerology::{NumerologyCalculator, NumerologyProfile};
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, info};

pub const DEFAULT_KEYWORDS: [&str; 12] = [
    "life_path",
    "purpose",
    "soul",
    "balance",
    "personality",
    "attitude",
    "maturity",
    "passion",
    "birth_day",
    "rational_thinking",
    "lifepath_life_purpose_link",
    "soul_personality_link",
];

/// Document category, number and optional phase for one keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRef {
    pub category: &'static str,
    pub number: u32,
    pub phase: Option<u32>,
}

/// What a planner keyword points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordTarget {
    Document(DocumentRef),
    /// Known keyword whose number list is empty for this profile
    NoValue,
    Unknown,
}

impl KeywordTarget {
    pub fn document(self) -> Option<DocumentRef> {
        match self {
            KeywordTarget::Document(doc) => Some(doc),
            _ => None,
        }
    }

    fn simple(category: &'static str, number: u32) -> Self {
        KeywordTarget::Document(DocumentRef {
            category,
            number,
            phase: None,
        })
    }

    fn first_of(category: &'static str, numbers: &[u32]) -> Self {
        match numbers.first() {
            Some(number) => Self::simple(category, *number),
            None => KeywordTarget::NoValue,
        }
    }

    fn phased(category: &'static str, number: u32, phase: u32) -> Self {
        KeywordTarget::Document(DocumentRef {
            category,
            number,
            phase: Some(phase),
        })
    }
}

/// Resolve a planner keyword against a computed profile
pub fn resolve_keyword(keyword: &str, profile: &NumerologyProfile) -> KeywordTarget {
    let m = &profile.milestone_phase;
    let c = &profile.challenge;
    let signals = &profile.alignment_signals;

    match keyword {
        "life_path" => KeywordTarget::simple("life_path", profile.life_path),
        "purpose" | "life_purpose" => KeywordTarget::simple("life_purpose", profile.life_purpose),
        "soul" => KeywordTarget::simple("soul", profile.soul),
        "balance" => KeywordTarget::simple("balance", profile.balance),
        "personality" | "attitude" => KeywordTarget::simple("personality", profile.personality),
        "maturity" => KeywordTarget::simple("maturity", profile.maturity),
        "passion" => KeywordTarget::first_of("passion", &profile.passion),
        "birth_day" => KeywordTarget::simple("birth_day", profile.birth_day),
        "rational_thinking" => KeywordTarget::simple("rational_thinking", profile.rational_thinking),
        "missing_aspects" => {
            KeywordTarget::first_of("missing_aspects", &profile.missing_aspects)
        }
        "personal_year" => KeywordTarget::simple("personal_year", signals.personal_year),
        "personal_month" => KeywordTarget::simple("personal_month", signals.personal_month),
        "personal_day" => KeywordTarget::simple("personal_day", signals.personal_day),
        "lifepath_life_purpose_link" => {
            KeywordTarget::simple("lifepath_life_purpose_link", profile.lifepath_life_purpose_link)
        }
        "soul_personality_link" => {
            KeywordTarget::simple("soul_personality_link", profile.soul_personality_link)
        }
        "milestone_1" => KeywordTarget::phased("milestone", m.milestone_1, 1),
        "milestone_2" => KeywordTarget::phased("milestone", m.milestone_2, 2),
        "milestone_3" => KeywordTarget::phased("milestone", m.milestone_3, 3),
        "milestone_4" => KeywordTarget::phased("milestone", m.milestone_4, 4),
        "challenge_1" => KeywordTarget::phased("challenge", c.challenge_1, 1),
        "challenge_2" => KeywordTarget::phased("challenge", c.challenge_2, 2),
        "challenge_3" => KeywordTarget::phased("challenge", c.challenge_3, 3),
        "challenge_4" => KeywordTarget::phased("challenge", c.challenge_4, 4),
        _ => KeywordTarget::Unknown,
    }
}

/// Numerology documents for one person
pub struct NumerologyContextProvider {
    name: String,
    dob: String,
    current_date: Option<String>,
    library: NumerologyLibrary,
}

impl NumerologyContextProvider {
    pub fn new(
        name: impl Into<String>,
        dob: impl Into<String>,
        current_date: Option<String>,
        library: NumerologyLibrary,
    ) -> Self {
        Self {
            name: name.into(),
            dob: dob.into(),
            current_date,
            library,
        }
    }

    pub fn profile(&self) -> Result<NumerologyProfile> {
        let calculator =
            NumerologyCalculator::new(&self.name, &self.dob, self.current_date.as_deref())?;
        Ok(calculator.profile())
    }
}

#[async_trait]
impl ExternalLookup for NumerologyContextProvider {
    async fn lookup(&self, keywords: &[String]) -> Result<Option<ContextSources>> {
        let profile = self.profile()?;
        let mut sources = ContextSources::new();

        for keyword in keywords {
            let text = match resolve_keyword(keyword, &profile) {
                KeywordTarget::Document(doc) => match self
                    .library
                    .try_document_text(doc.category, doc.number, doc.phase)
                    .await
                {
                    Ok(text) => text,
                    Err(e) => {
                        debug!(keyword = %keyword, "Document fetch failed: {}", e);
                        format!("Information about {} number {}", keyword, doc.number)
                    }
                },
                KeywordTarget::NoValue => {
                    format!("No {} number can be derived for this profile", keyword)
                }
                KeywordTarget::Unknown => {
                    format!("No information available for keyword: {}", keyword)
                }
            };
            sources.insert(keyword.clone(), text);
        }

        info!(keywords = keywords.len(), life_path = profile.life_path, "Numerology context built");
        Ok((!sources.is_empty()).then_some(sources))
    }

    fn default_keywords(&self) -> Vec<String> {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::docx::tests::build_docx;
    use crate::documents::InMemoryDocumentStore;
    use std::sync::Arc;

    async fn provider() -> NumerologyContextProvider {
        let store = InMemoryDocumentStore::new();
        store
            .insert("p/duong_doi/duong_doi_8.docx", build_docx(&["Số 8: quyền lực"]))
            .await;
        store
            .insert("p/giai_doan_2/chang_9.docx", build_docx(&["Chặng 9"]))
            .await;

        NumerologyContextProvider::new(
            "Hồ Đăng Mạnh",
            "18/11/2004",
            Some("18/10/2026".to_string()),
            NumerologyLibrary::new(Arc::new(store), "p"),
        )
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_lookup_mixes_documents_and_fallbacks() {
        let provider = provider().await;

        let sources = provider
            .lookup(&keywords(&["life_path", "soul", "lucky_color", "milestone_2"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(sources["life_path"], "Số 8: quyền lực");
        assert_eq!(sources["soul"], "Information about soul number 8");
        assert_eq!(sources["lucky_color"], "No information available for keyword: lucky_color");
        assert_eq!(sources["milestone_2"], "Chặng 9");
    }

    #[tokio::test]
    async fn test_link_keywords_have_no_documents() {
        let provider = provider().await;
        let sources = provider
            .lookup(&keywords(&["soul_personality_link"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            sources["soul_personality_link"],
            "Document for soul_personality_link with value 4 is not available yet."
        );
    }

    #[tokio::test]
    async fn test_invalid_date_fails_lookup() {
        let provider = NumerologyContextProvider::new(
            "An",
            "31/02/2000",
            None,
            NumerologyLibrary::new(Arc::new(InMemoryDocumentStore::new()), "p"),
        );

        assert!(provider.lookup(&keywords(&["soul"])).await.is_err());
    }

    #[tokio::test]
    async fn test_passion_without_letters() {
        let provider = NumerologyContextProvider::new(
            "  ",
            "18/11/2004",
            Some("18/10/2026".to_string()),
            NumerologyLibrary::new(Arc::new(InMemoryDocumentStore::new()), "p"),
        );

        let sources = provider
            .lookup(&keywords(&["passion"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(sources["passion"], "No passion number can be derived for this profile");
    }

    #[tokio::test]
    async fn test_empty_keywords() {
        let provider = provider().await;
        assert!(provider.lookup(&[]).await.unwrap().is_none());
        assert_eq!(provider.default_keywords().len(), 12);
    }

    #[test]
    fn test_aliases_resolve() {
        let profile = NumerologyCalculator::new("Hồ Đăng Mạnh", "18/11/2004", Some("18/10/2026"))
            .unwrap()
            .profile();

        let doc = |k: &str| resolve_keyword(k, &profile).document().unwrap();

        assert_eq!(resolve_keyword("attitude", &profile), resolve_keyword("personality", &profile));
        assert_eq!(doc("purpose").number, 4);
        assert_eq!(doc("passion").number, 1);
        assert_eq!(doc("missing_aspects").number, 2);
        assert_eq!(doc("challenge_4").phase, Some(4));
        assert_eq!(resolve_keyword("lucky_color", &profile), KeywordTarget::Unknown);
    }
}
