use async_trait::async_trait;
use chrono::NaiveDate;
use summit_scout::domain::model::CompanyProfile;
use summit_scout::domain::ports::DiscoveryService;
use summit_scout::{
    Aggregator, BatchOrchestrator, CompanyField, CompanyScale, DiscoveryError, FilterConfig,
    FixedPacing, LocalStorage, Location, LocationFinder, Presets, Summit,
};
use tempfile::TempDir;
use tokio_test::assert_ok;

/// Every city has one summit named after it; `Atlantis` has none that can be parsed.
struct CityDiscovery;

#[async_trait]
impl DiscoveryService for CityDiscovery {
    async fn find_summits(&self, location: &Location) -> Result<Vec<Summit>, DiscoveryError> {
        if location.city == "Atlantis" {
            return Err(DiscoveryError::malformed("SummitList", "expected value at line 1"));
        }
        Ok(vec![Summit {
            name: format!("{} Tech Week", location.city),
            dates: "May 2025".to_string(),
            categories: vec![],
            website: None,
            venue: None,
            confidence: Some(0.9),
        }])
    }

    async fn find_companies(&self, summit: &Summit) -> Result<Vec<CompanyProfile>, DiscoveryError> {
        let local = CompanyProfile {
            name: format!("{} Robotics", summit.name.split(' ').next().unwrap_or("X")),
            country: "Europe".to_string(),
            field: CompanyField::Hardware,
            scale: CompanyScale::Small,
        };
        let shared = CompanyProfile {
            name: "Omnicorp".to_string(),
            country: "Netherlands".to_string(),
            field: CompanyField::Software,
            scale: CompanyScale::Medium,
        };
        let giant = CompanyProfile {
            name: "Megasoft".to_string(),
            country: "United States".to_string(),
            field: CompanyField::Software,
            scale: CompanyScale::Startup,
        };
        Ok(vec![local, shared, giant])
    }
}

fn year() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
    )
}

fn plan(cities: &[&str]) -> Vec<Location> {
    let (start, end) = year();
    let cities: Vec<String> = cities.iter().map(|c| c.to_string()).collect();
    summit_scout::core::batch::plan_locations(&cities, &[], &Presets::default(), start, end)
        .unwrap()
}

#[tokio::test]
async fn test_batch_then_aggregate() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let finder = LocationFinder::new(CityDiscovery, LocalStorage::new(dir.path()));
    let locations = plan(&["Berlin", "Atlantis", "Lisbon", "berlin "]);

    let summary = BatchOrchestrator::new(finder, FixedPacing::immediate())
        .run(&locations)
        .await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_locations[0].city, "Atlantis");
    assert!(!summary.is_success());

    let storage = LocalStorage::new(dir.path());
    let report = assert_ok!(
        Aggregator::new(FilterConfig::default())
            .run(&storage, &storage, "filtered_companies.json")
            .await
    );

    assert_eq!(report.files_read, 3);
    assert_eq!(report.failed_results, 1);
    assert_eq!(report.total_companies, 6);
    assert_eq!(report.after_country_filter, 4);
    assert_eq!(report.unique_companies, 3);
    assert_eq!(report.by_scale.get("small"), Some(&2));
    assert_eq!(report.top_fields[0], ("hardware".to_string(), 2));

    let output = std::fs::read_to_string(dir.path().join("filtered_companies.json"))?;
    let names: Vec<String> = serde_json::from_str::<Vec<serde_json::Value>>(&output)?
        .iter()
        .map(|c| c["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Berlin Robotics", "Lisbon Robotics", "Omnicorp"]);

    Ok(())
}

#[tokio::test]
async fn test_aggregate_is_idempotent_and_skips_corrupt_files() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let finder = LocationFinder::new(CityDiscovery, LocalStorage::new(dir.path()));
    BatchOrchestrator::new(finder, FixedPacing::immediate())
        .run(&plan(&["Vienna", "Prague"]))
        .await;

    std::fs::write(dir.path().join("broken.json"), "{ not json")?;
    std::fs::write(dir.path().join("notes.txt"), "ignored")?;

    let storage = LocalStorage::new(dir.path());
    let aggregator = Aggregator::new(FilterConfig::default());

    let first = aggregator
        .run(&storage, &storage, "filtered_companies.json")
        .await?;
    let first_bytes = std::fs::read(dir.path().join("filtered_companies.json"))?;

    let second = aggregator
        .run(&storage, &storage, "filtered_companies.json")
        .await?;
    let second_bytes = std::fs::read(dir.path().join("filtered_companies.json"))?;

    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first, second);
    assert_eq!(first.files_read, 2);
    assert_eq!(first.files_skipped, 1);
    assert_eq!(first.unique_companies, 3);

    Ok(())
}

#[tokio::test]
async fn test_aggregate_missing_directory_writes_empty_list() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let source = LocalStorage::new(dir.path().join("does-not-exist"));
    let sink = LocalStorage::new(dir.path());

    let report = Aggregator::new(FilterConfig::default())
        .run(&source, &sink, "out.json")
        .await?;

    assert_eq!(report.files_read, 0);
    assert_eq!(std::fs::read_to_string(dir.path().join("out.json"))?, "[]\n");
    Ok(())
}

#[tokio::test]
async fn test_cities_with_the_same_slug_keep_one_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let locations = plan(&["New York", "New-York"]);
    assert_eq!(locations.len(), 1);

    let finder = LocationFinder::new(CityDiscovery, LocalStorage::new(dir.path()));
    let summary = BatchOrchestrator::new(finder, FixedPacing::immediate())
        .run(&locations)
        .await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.saved.len(), 1);
    assert!(summary.saved[0].ends_with("new-york_2025-01-01_2025-12-31.json"));
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}
