//! Integration tests for the harvester
//!
//! These tests use wiremock to serve listing pages over real HTTP and drive
//! the network document source, the harvest loop and the spreadsheet sink
//! end-to-end. The catalog side is a scripted reveal surface.

use async_trait::async_trait;
use chrono::Local;
use listing_harvester::config::FetchConfig;
use listing_harvester::fetch::{
    fetch_with_retry, DelayRange, FetchError, FetchMode, NetworkSource, Pacing, RetryPolicy,
};
use listing_harvester::harvest::{
    collect_listings, CatalogRevealer, ClickOutcome, HarvestPlan, RevealSurface,
};
use listing_harvester::output::{OutputSink, SpreadsheetSink};
use listing_harvester::storage::{NullJournal, SqliteStorage, Storage};
use listing_harvester::DocumentSource;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A catalog whose reveal affordance disappears after a fixed number of clicks
struct ScriptedCatalog {
    markup: String,
    reveals_left: Mutex<u32>,
}

#[async_trait]
impl RevealSurface for ScriptedCatalog {
    async fn open(&self, _url: &str) -> Result<(), FetchError> {
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<ClickOutcome, FetchError> {
        if selector != "a.load-more" {
            return Ok(ClickOutcome::Unavailable);
        }
        let mut left = self.reveals_left.lock().unwrap();
        if *left == 0 {
            return Ok(ClickOutcome::Unavailable);
        }
        *left -= 1;
        Ok(ClickOutcome::Clicked)
    }

    async fn markup(&self) -> Result<String, FetchError> {
        Ok(self.markup.clone())
    }
}

fn test_fetch_config() -> FetchConfig {
    FetchConfig {
        timeout_secs: 2,
        user_agent: "listing-harvester-tests/1.0".to_string(),
        ..FetchConfig::default()
    }
}

fn detail_page(title: &str, company: &str, with_deadline: bool) -> String {
    let deadline = if with_deadline {
        r#"<li class="application-deadline">30.11.2019</li>"#
    } else {
        ""
    };
    format!(
        r#"<html><body>
        <h1 class="page-title">  {title}  </h1>
        <ul>
            <li class="job-company"><a href="/c">{company}</a></li>
            <li class="location"><a href="/l">Prishtinë</a></li>
            <li class="date-posted">04.11.2019</li>
            {deadline}
        </ul>
        <div class="job-overview-content row">Description of {title}</div>
        <div class="job_listing-categories">IT</div>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_network_source_returns_body() {
    let server = MockServer::start().await;
    mount_page(&server, "/job/1/", "<html>listing</html>".to_string()).await;

    let source = NetworkSource::new(&test_fetch_config()).unwrap();
    let markup = source
        .fetch(&format!("{}/job/1/", server.uri()))
        .await
        .unwrap();

    assert_eq!(markup, "<html>listing</html>");
}

#[tokio::test]
async fn test_network_source_returns_body_of_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>expired</html>"))
        .mount(&server)
        .await;

    let source = NetworkSource::new(&test_fetch_config()).unwrap();
    let markup = source
        .fetch(&format!("{}/job/1/", server.uri()))
        .await
        .unwrap();

    assert_eq!(markup, "<html>expired</html>");
}

#[tokio::test]
async fn test_network_source_timeout_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = FetchConfig {
        timeout_secs: 1,
        ..test_fetch_config()
    };
    let source = NetworkSource::new(&config).unwrap();
    let result = source.fetch(&format!("{}/slow/", server.uri())).await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_robust_fetch_recovers_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky/", "<html>recovered</html>".to_string()).await;

    let config = FetchConfig {
        timeout_secs: 1,
        ..test_fetch_config()
    };
    let source = NetworkSource::new(&config).unwrap();
    let policy = RetryPolicy {
        max_attempts: 3,
        backoff: DelayRange::ZERO,
        penalty_step: Duration::ZERO,
        timeout_wait: Duration::ZERO,
    };

    let markup = fetch_with_retry(
        &source,
        &format!("{}/flaky/", server.uri()),
        FetchMode::Robust,
        &policy,
    )
    .await
    .unwrap();

    assert_eq!(markup, "<html>recovered</html>");
}

#[tokio::test]
async fn test_end_to_end_network_harvest() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/job/1/", detail_page("Developer", "Acme", true)).await;
    mount_page(&server, "/job/2/", detail_page("Designer", "Studio", false)).await;
    Mock::given(method("GET"))
        .and(path("/job/3/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/job/4/", detail_page("Tester", "QA Sh.p.k.", true)).await;

    let catalog = ScriptedCatalog {
        markup: format!(
            r#"<html><body><div class="job_listings">
                <a class="job_listing-clickbox" href="/job/1/"></a>
                <a class="job_listing-clickbox" href="{base}/job/2/"></a>
                <a class="job_listing-clickbox" href="/job/3/"></a>
                <a class="job_listing-clickbox" href="/job/1/"></a>
                <a class="job_listing-clickbox" href="/job/4/"></a>
            </div></body></html>"#
        ),
        reveals_left: Mutex::new(3),
    };

    let plan = HarvestPlan {
        catalog_url: url::Url::parse(&format!("{}/jobs/", base)).unwrap(),
        revealer: CatalogRevealer::new(DelayRange::ZERO, 10).with_selectors(None, "a.load-more"),
        max_enumeration_attempts: 2,
        mode: FetchMode::Robust,
        retry: RetryPolicy::default(),
        pacing: Pacing::none(),
    };
    let source = NetworkSource::new(&test_fetch_config()).unwrap();

    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let run_id = storage.create_run("hash", plan.catalog_url.as_str()).unwrap();
    let collected = {
        let mut journal = storage.journal(run_id);
        collect_listings(&catalog, &source, &plan, &HashSet::new(), &mut journal)
            .await
            .unwrap()
    };

    assert_eq!(collected.links_found, 4);
    assert_eq!(collected.outcome.records.len(), 4);
    assert!(collected.outcome.skipped.is_empty());
    assert!(collected.outcome.is_complete());

    let designer = &collected.outcome.records[1];
    assert_eq!(designer.title, "Designer");
    assert_eq!(designer.company_name, "Studio");
    assert_eq!(designer.expiration_date, "");

    // The 404 page still yields a record keyed by its link
    let expired = &collected.outcome.records[2];
    assert_eq!(expired.link, format!("{}/job/3/", base));
    assert_eq!(expired.title, "");

    assert_eq!(storage.listings_for_run(run_id).unwrap().len(), 4);

    let dir = tempfile::tempdir().unwrap();
    let sink = SpreadsheetSink::new(dir.path(), "ofertapune_kosovajob", Local::now());
    let written = sink.write_records(&collected.outcome.records).unwrap();

    let file_name = written.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.ends_with("_ofertapune_kosovajob.csv"));

    let mut reader = csv::Reader::from_path(&written).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[0][1], format!("{}/job/1/", base));
    assert_eq!(&rows[0][2], "Developer");
    assert_eq!(&rows[3][3], "QA Sh.p.k.");
}

#[tokio::test]
async fn test_fast_mode_skips_unreachable_listing() {
    let server = MockServer::start().await;
    mount_page(&server, "/job/1/", detail_page("Developer", "Acme", true)).await;

    let catalog = ScriptedCatalog {
        markup: format!(
            r#"<div class="job_listings">
                <a class="job_listing-clickbox" href="http://127.0.0.1:1/job/0/"></a>
                <a class="job_listing-clickbox" href="{}/job/1/"></a>
            </div>"#,
            server.uri()
        ),
        reveals_left: Mutex::new(0),
    };
    let plan = HarvestPlan {
        catalog_url: url::Url::parse(&server.uri()).unwrap(),
        revealer: CatalogRevealer::new(DelayRange::ZERO, 10).with_selectors(None, "a.load-more"),
        max_enumeration_attempts: 1,
        mode: FetchMode::Fast,
        retry: RetryPolicy::default(),
        pacing: Pacing::none(),
    };
    let source = NetworkSource::new(&test_fetch_config()).unwrap();

    let collected = collect_listings(&catalog, &source, &plan, &HashSet::new(), &mut NullJournal)
        .await
        .unwrap();

    assert_eq!(collected.outcome.records.len(), 1);
    assert_eq!(collected.outcome.records[0].title, "Developer");
    assert_eq!(collected.outcome.skipped.len(), 1);
    assert!(collected.outcome.is_complete());
}
