use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trim, collapse inner whitespace and lowercase. Used for every identity and
/// filter comparison so `" De "` and `"de"` are the same country.
pub fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Location {
    pub fn new(city: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            city: city.into(),
            start_date,
            end_date,
        }
    }

    /// `<city-slug>_<start>_<end>.json`; identical locations always map to the same file.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            city_slug(&self.city),
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d")
        )
    }

    /// Renders the range the way the search prompt expects, e.g. "From January 2025 to December 2025".
    pub fn period_for_prompt(&self) -> String {
        format!(
            "From {} to {}",
            self.start_date.format("%B %Y"),
            self.end_date.format("%B %Y")
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} to {})", self.city, self.start_date, self.end_date)
    }
}

fn city_slug(city: &str) -> String {
    let mut slug = String::with_capacity(city.len());
    for c in city.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "location".to_string()
    } else {
        slug.to_string()
    }
}

/// Company size: startup (<50), small (50-200), medium (200-1k), large (1k-10k), enterprise (10k+).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CompanyScale {
    Startup,
    Small,
    Medium,
    Large,
    Enterprise,
    #[serde(other)]
    Unknown,
}

impl CompanyScale {
    pub const ALL: [CompanyScale; 6] = [
        CompanyScale::Startup,
        CompanyScale::Small,
        CompanyScale::Medium,
        CompanyScale::Large,
        CompanyScale::Enterprise,
        CompanyScale::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyScale::Startup => "startup",
            CompanyScale::Small => "small",
            CompanyScale::Medium => "medium",
            CompanyScale::Large => "large",
            CompanyScale::Enterprise => "enterprise",
            CompanyScale::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CompanyScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanyScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        CompanyScale::ALL
            .into_iter()
            .find(|scale| scale.as_str() == wanted)
            .ok_or_else(|| format!("unknown company scale '{}'", s))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CompanyField {
    Software,
    ArtificialIntelligence,
    CloudComputing,
    Cybersecurity,
    DataAnalytics,
    Gaming,
    Hardware,
    Semiconductors,
    Telecommunications,
    Fintech,
    Healthcare,
    ECommerce,
    Automotive,
    Aerospace,
    Energy,
    Manufacturing,
    MediaEntertainment,
    Education,
    Consulting,
    #[default]
    #[serde(other)]
    Other,
}

impl fmt::Display for CompanyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde owns the canonical spelling
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => f.write_str(&s),
            _ => f.write_str("other"),
        }
    }
}

/// A tech conference found for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Summit {
    /// Official summit name, e.g. "Web Summit 2025".
    pub name: String,
    /// Date range as "Month Day-Day, Year", e.g. "June 15-17, 2025".
    pub dates: String,
    /// Focus areas, e.g. ["AI", "Cloud", "DevOps"].
    #[serde(default)]
    pub categories: Vec<String>,
    /// Full website URL, e.g. "https://websummit.com".
    #[serde(default)]
    pub website: Option<String>,
    /// Location as "Venue, City" or "City, Country".
    #[serde(default)]
    pub venue: Option<String>,
    /// How sure the source is that this summit takes place in the requested period, 0 to 1.
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// A company as reported by the model, before it is tied to a summit and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompanyProfile {
    /// Official company name, e.g. "Google LLC".
    pub name: String,
    /// Headquarters country in English, e.g. "Germany".
    pub country: String,
    /// Primary industry based on the main product or service.
    #[serde(default)]
    pub field: CompanyField,
    /// Size: startup (<50), small (50-200), medium (200-1k), large (1k-10k), enterprise (10k+).
    pub scale: CompanyScale,
}

impl CompanyProfile {
    pub fn attend(self, summit: &str, location: &Location) -> Company {
        Company {
            name: self.name,
            country: self.country,
            field: self.field,
            scale: self.scale,
            summit: summit.to_string(),
            location: location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub field: CompanyField,
    pub scale: CompanyScale,
    pub summit: String,
    pub location: Location,
}

impl Company {
    pub fn identity(&self) -> (String, String) {
        (normalize(&self.name), normalize(&self.country))
    }
}

/// Structured output wrapper for summit discovery.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SummitList {
    /// Matching summits, no duplicates.
    pub summits: Vec<Summit>,
}

/// Structured output wrapper for company discovery.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompanyList {
    /// Participating companies, no duplicates.
    pub companies: Vec<CompanyProfile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSummit {
    pub summit: String,
    pub error: String,
}

/// Everything found for one location. Written once, never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub location: Location,
    pub status: LocationStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub summits: Vec<Summit>,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub skipped_summits: Vec<SkippedSummit>,
}

impl LocationResult {
    pub fn failure(location: Location, error: impl Into<String>) -> Self {
        Self {
            location,
            status: LocationStatus::Failure,
            error: Some(error.into()),
            summits: Vec::new(),
            companies: Vec::new(),
            skipped_summits: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LocationStatus::Success
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchRunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_locations: Vec<Location>,
    pub saved: Vec<String>,
}

impl BatchRunSummary {
    pub fn is_success(&self) -> bool {
        self.failed_locations.is_empty()
    }
}

/// One line of the aggregated output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCompany {
    pub name: String,
    pub scale: CompanyScale,
    pub country: String,
    pub field: CompanyField,
}

impl From<&Company> for AggregatedCompany {
    fn from(company: &Company) -> Self {
        Self {
            name: company.name.trim().to_string(),
            scale: company.scale,
            country: company.country.trim().to_string(),
            field: company.field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Acme   Corp "), "acme corp");
        assert_eq!(normalize(" DE "), "de");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_file_name_is_deterministic() {
        let berlin = Location::new("Berlin", date("2025-01-01"), date("2025-12-31"));
        assert_eq!(berlin.file_name(), "berlin_2025-01-01_2025-12-31.json");
        assert_eq!(berlin.file_name(), berlin.clone().file_name());

        let sao_paulo = Location::new(" São  Paulo ", date("2025-03-01"), date("2025-03-31"));
        assert_eq!(sao_paulo.file_name(), "são-paulo_2025-03-01_2025-03-31.json");

        let odd = Location::new("???", date("2025-03-01"), date("2025-03-31"));
        assert_eq!(odd.file_name(), "location_2025-03-01_2025-03-31.json");
    }

    #[test]
    fn test_period_for_prompt() {
        let loc = Location::new("Paris", date("2025-06-01"), date("2025-12-31"));
        assert_eq!(loc.period_for_prompt(), "From June 2025 to December 2025");
    }

    #[test]
    fn test_scale_parsing() {
        assert_eq!("Startup".parse::<CompanyScale>().unwrap(), CompanyScale::Startup);
        assert_eq!(" MEDIUM ".parse::<CompanyScale>().unwrap(), CompanyScale::Medium);
        assert!("huge".parse::<CompanyScale>().is_err());
    }

    #[test]
    fn test_unrecognized_enum_values_fall_back() {
        let profile: CompanyProfile = serde_json::from_value(serde_json::json!({
            "name": "Acme",
            "country": "Germany",
            "field": "quantum_knitting",
            "scale": "gigantic"
        }))
        .unwrap();
        assert_eq!(profile.scale, CompanyScale::Unknown);
        assert_eq!(profile.field, CompanyField::Other);
    }

    #[test]
    fn test_field_display_uses_serde_name() {
        assert_eq!(CompanyField::ArtificialIntelligence.to_string(), "artificial_intelligence");
        assert_eq!(CompanyField::ECommerce.to_string(), "e_commerce");
    }

    #[test]
    fn test_company_identity_ignores_case_and_whitespace() {
        let loc = Location::new("Berlin", date("2025-01-01"), date("2025-12-31"));
        let a = CompanyProfile {
            name: "A".to_string(),
            country: "DE".to_string(),
            field: CompanyField::Software,
            scale: CompanyScale::Startup,
        }
        .attend("Summit One", &loc);
        let b = CompanyProfile {
            name: "a ".to_string(),
            country: " de ".to_string(),
            field: CompanyField::Software,
            scale: CompanyScale::Startup,
        }
        .attend("Summit Two", &loc);
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.summit, "Summit One");
    }
}
