use crate::core::schema::StructuredOutput;
use crate::domain::model::{CompanyList, CompanyProfile, Location, Summit, SummitList};
use crate::domain::ports::{DiscoveryService, LlmClient};
use crate::utils::error::DiscoveryError;
use async_trait::async_trait;

const SUMMIT_SEARCH_PROMPT: &str = "\
Look up technology summits and conferences taking place in {location}, {period}.

For each event give its name, its dates, the topics it focuses on, its website URL and its venue.";

const COMPANY_SEARCH_PROMPT: &str = "\
Look up the companies that took part in the tech summit \"{name}\".

What is known about the event:
- Dates: {dates}
- Website: {website}
- Venue: {venue}
- Topics: {categories}

List as many participating companies as you can: sponsors, exhibitors, speakers' employers, \
startups from the startup area and any other corporate participant.

For each company give:
1. name: the official company name
2. country: the country of its headquarters, in English
3. field: one of {fields}
4. scale: one of {scales}";

const STRUCTURIZE_PROMPT: &str = "\
Convert the text below into JSON that matches the required schema.
Carry over every item the text mentions; do not drop entries and do not invent new ones.

Text:
{text}";

const FIELD_VALUES: &str = "software, artificial_intelligence, cloud_computing, cybersecurity, \
data_analytics, gaming, hardware, semiconductors, telecommunications, fintech, healthcare, \
e_commerce, automotive, aerospace, energy, manufacturing, media_entertainment, education, \
consulting, other";

const SCALE_VALUES: &str = "startup (<50 employees), small (50-200), medium (200-1000), \
large (1000-10000), enterprise (10000+)";

/// Discovery backed by a generative model: a grounded free-text search,
/// followed by a second call that restates the answer as schema-checked JSON.
pub struct ModelDiscovery<C: LlmClient> {
    client: C,
    grounding: bool,
}

impl<C: LlmClient> ModelDiscovery<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            grounding: true,
        }
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    async fn structurize<T: StructuredOutput>(&self, text: &str) -> Result<T, DiscoveryError> {
        tracing::debug!("Structurizing {} chars into {}", text.len(), T::type_name());
        let prompt = STRUCTURIZE_PROMPT.replace("{text}", text);
        let json = self
            .client
            .generate_json(&prompt, T::response_schema())
            .await?;
        T::from_model_output(&json)
    }
}

pub fn summit_prompt(location: &Location) -> String {
    SUMMIT_SEARCH_PROMPT
        .replace("{location}", location.city.trim())
        .replace("{period}", &location.period_for_prompt())
}

pub fn company_prompt(summit: &Summit) -> String {
    let categories = if summit.categories.is_empty() {
        "N/A".to_string()
    } else {
        summit.categories.join(", ")
    };
    COMPANY_SEARCH_PROMPT
        .replace("{name}", &summit.name)
        .replace("{dates}", &summit.dates)
        .replace("{website}", summit.website.as_deref().unwrap_or("N/A"))
        .replace("{venue}", summit.venue.as_deref().unwrap_or("N/A"))
        .replace("{categories}", &categories)
        .replace("{fields}", FIELD_VALUES)
        .replace("{scales}", SCALE_VALUES)
}

fn clean_summits(summits: Vec<Summit>) -> Vec<Summit> {
    summits
        .into_iter()
        .filter_map(|mut summit| {
            summit.name = summit.name.trim().to_string();
            if summit.name.is_empty() {
                tracing::debug!("Dropping summit without a name");
                return None;
            }
            summit.confidence = summit.confidence.map(|c| c.clamp(0.0, 1.0));
            Some(summit)
        })
        .collect()
}

fn clean_companies(companies: Vec<CompanyProfile>) -> Vec<CompanyProfile> {
    companies
        .into_iter()
        .filter_map(|mut company| {
            company.name = company.name.trim().to_string();
            company.country = company.country.trim().to_string();
            if company.name.is_empty() {
                tracing::debug!("Dropping company without a name");
                return None;
            }
            Some(company)
        })
        .collect()
}

#[async_trait]
impl<C: LlmClient> DiscoveryService for ModelDiscovery<C> {
    async fn find_summits(&self, location: &Location) -> Result<Vec<Summit>, DiscoveryError> {
        tracing::info!(
            "Searching summits: location={}, period={}",
            location.city,
            location.period_for_prompt()
        );

        let raw_text = self
            .client
            .generate_text(&summit_prompt(location), self.grounding)
            .await?;
        tracing::debug!("Raw summit search response: {} chars", raw_text.len());

        let list: SummitList = self.structurize(&raw_text).await?;
        let summits = clean_summits(list.summits);
        tracing::info!("Found {} summits in {}", summits.len(), location.city);
        Ok(summits)
    }

    async fn find_companies(&self, summit: &Summit) -> Result<Vec<CompanyProfile>, DiscoveryError> {
        tracing::info!("Searching companies for summit: {}", summit.name);

        let raw_text = self
            .client
            .generate_text(&company_prompt(summit), self.grounding)
            .await?;
        tracing::debug!("Raw company search response: {} chars", raw_text.len());

        let list: CompanyList = self.structurize(&raw_text).await?;
        let companies = clean_companies(list.companies);
        tracing::info!("Found {} companies for {}", companies.len(), summit.name);
        Ok(companies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CompanyField, CompanyScale};
    use chrono::NaiveDate;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned answers and records the prompts it was given.
    struct ScriptedClient {
        answers: Mutex<VecDeque<Result<String, DiscoveryError>>>,
        prompts: Mutex<Vec<(String, bool)>>,
    }

    impl ScriptedClient {
        fn new(answers: Vec<Result<String, DiscoveryError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn next(&self, prompt: &str, structured: bool) -> Result<String, DiscoveryError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), structured));
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted answer left")
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate_text(&self, prompt: &str, _grounding: bool) -> Result<String, DiscoveryError> {
            self.next(prompt, false)
        }

        async fn generate_json(
            &self,
            prompt: &str,
            _schema: serde_json::Value,
        ) -> Result<String, DiscoveryError> {
            self.next(prompt, true)
        }
    }

    fn berlin() -> Location {
        Location::new(
            "Berlin",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        )
    }

    fn summit(name: &str) -> Summit {
        Summit {
            name: name.to_string(),
            dates: "June 1-2, 2025".to_string(),
            categories: vec!["AI".to_string(), "Cloud".to_string()],
            website: None,
            venue: Some("Station Berlin".to_string()),
            confidence: None,
        }
    }

    #[test]
    fn test_prompts_carry_context() {
        let prompt = summit_prompt(&berlin());
        assert!(prompt.contains("Berlin"));
        assert!(prompt.contains("From January 2025 to December 2025"));

        let prompt = company_prompt(&summit("Tech Open Air"));
        assert!(prompt.contains("\"Tech Open Air\""));
        assert!(prompt.contains("Website: N/A"));
        assert!(prompt.contains("Topics: AI, Cloud"));
        assert!(prompt.contains("artificial_intelligence"));
        assert!(!prompt.contains('{'));
    }

    #[tokio::test]
    async fn test_find_summits_searches_then_structurizes() {
        let client = ScriptedClient::new(vec![
            Ok("TOA runs in June at Station Berlin.".to_string()),
            Ok(serde_json::json!({
                "summits": [
                    { "name": " Tech Open Air ", "dates": "June 1-2, 2025", "confidence": 1.7 },
                    { "name": "  ", "dates": "n/a" }
                ]
            })
            .to_string()),
        ]);
        let discovery = ModelDiscovery::new(client);

        let summits = discovery.find_summits(&berlin()).await.unwrap();

        assert_eq!(summits.len(), 1);
        assert_eq!(summits[0].name, "Tech Open Air");
        assert_eq!(summits[0].confidence, Some(1.0));

        let prompts = discovery.client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].1);
        assert!(prompts[1].1);
        assert!(prompts[1].0.contains("TOA runs in June at Station Berlin."));
    }

    #[tokio::test]
    async fn test_empty_summit_list_is_not_an_error() {
        let client = ScriptedClient::new(vec![
            Ok("Nothing found.".to_string()),
            Ok("{\"summits\": []}".to_string()),
        ]);
        let summits = ModelDiscovery::new(client)
            .find_summits(&berlin())
            .await
            .unwrap();
        assert!(summits.is_empty());
    }

    #[tokio::test]
    async fn test_find_companies_cleans_entries() {
        let client = ScriptedClient::new(vec![
            Ok("Acme exhibited.".to_string()),
            Ok(serde_json::json!({
                "companies": [
                    { "name": " Acme ", "country": " Germany ", "field": "software", "scale": "startup" },
                    { "name": "", "country": "France", "field": "other", "scale": "small" }
                ]
            })
            .to_string()),
        ]);

        let companies = ModelDiscovery::new(client)
            .find_companies(&summit("Tech Open Air"))
            .await
            .unwrap();

        assert_eq!(
            companies,
            vec![CompanyProfile {
                name: "Acme".to_string(),
                country: "Germany".to_string(),
                field: CompanyField::Software,
                scale: CompanyScale::Startup,
            }]
        );
    }

    #[tokio::test]
    async fn test_schema_violation_is_malformed() {
        let client = ScriptedClient::new(vec![
            Ok("Acme exhibited.".to_string()),
            Ok("{\"companies\": [{\"name\": \"Acme\"}]}".to_string()),
        ]);

        let err = ModelDiscovery::new(client)
            .find_companies(&summit("Tech Open Air"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_search_failure_skips_structurize() {
        let client = ScriptedClient::new(vec![Err(DiscoveryError::Api {
            status: 429,
            body: "quota".to_string(),
        })]);
        let discovery = ModelDiscovery::new(client);

        let err = discovery.find_summits(&berlin()).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::Api { status: 429, .. }));
        assert_eq!(discovery.client.prompts.lock().unwrap().len(), 1);
    }
}
