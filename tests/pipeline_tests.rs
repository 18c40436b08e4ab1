use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use job_scraper::{
    CategoryCatalog, CategoryDescriptor, FetchError, JobRecord, JobSink, ListingParser,
    ListingSelectors, PageFetcher, PayPeriod, RecordBuilder, RunState, ScrapeError,
    ScrapeOrchestrator, SinkFactory, SqlJobStore, StorageError,
};

const BASE: &str = "https://www.visidarbi.lv";

/// Serves canned pages keyed by (category id, page); anything else is a 404.
struct StubFetcher {
    pages: HashMap<(u32, u32), String>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl StubFetcher {
    fn new(pages: Vec<((u32, u32), String)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch_page(&self, category_id: u32, page: u32) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push((category_id, page));
        self.pages
            .get(&(category_id, page))
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: format!("stub://{}/{}", category_id, page),
                status: 404,
            })
    }
}

/// Remembers every commit it receives.
#[derive(Default, Clone)]
struct RecordingSink {
    commits: Arc<Mutex<Vec<Vec<JobRecord>>>>,
    fail_on_commit: Option<usize>,
}

impl RecordingSink {
    fn commits(&self) -> Vec<Vec<JobRecord>> {
        self.commits.lock().unwrap().clone()
    }

    fn records(&self) -> Vec<JobRecord> {
        self.commits().into_iter().flatten().collect()
    }
}

#[async_trait]
impl JobSink for RecordingSink {
    async fn insert_page(&mut self, records: &[JobRecord]) -> Result<(), StorageError> {
        let mut commits = self.commits.lock().unwrap();
        if self.fail_on_commit == Some(commits.len()) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        commits.push(records.to_vec());
        Ok(())
    }
}

struct RecordingFactory {
    sink: RecordingSink,
}

#[async_trait]
impl SinkFactory for RecordingFactory {
    type Sink = RecordingSink;

    async fn open(&self) -> Result<RecordingSink, StorageError> {
        Ok(self.sink.clone())
    }
}

fn listing(title: &str, href: &str, salary: &str) -> String {
    format!(
        r#"<div class="item premium big-item">
             <a class="long-title" href="{href}">{title}</a>
             <ul>
               <li class="location"><span>Rīga</span></li>
               <li class="company"><span>SIA Tests</span></li>
               <li class="salary"><span>{salary}</span></li>
               <li class="duedate"><span>31.12.2026</span></li>
             </ul>
           </div>"#
    )
}

fn page(listings: &[String]) -> String {
    format!("<html><body>{}</body></html>", listings.join("\n"))
}

fn one_category(name: &str, id: u32) -> CategoryCatalog {
    CategoryCatalog::new(vec![CategoryDescriptor::new(name, id)])
}

fn orchestrator<F: PageFetcher>(
    fetcher: F,
    catalog: CategoryCatalog,
    pages: u32,
) -> ScrapeOrchestrator<F> {
    ScrapeOrchestrator::new(
        fetcher,
        catalog,
        ListingParser::new(ListingSelectors::default(), BASE).unwrap(),
        RecordBuilder::default(),
        pages,
    )
}

#[tokio::test]
async fn two_pages_produce_two_records_with_one_commit_each() {
    let fetcher = StubFetcher::new(vec![
        (
            (6, 1),
            page(&[listing("Izstrādātājs", "/job/1", "2500 - 3500 EUR")]),
        ),
        ((6, 2), page(&[listing("Testētājs", "/job/2", "10-15 EUR/h")])),
    ]);
    let mut orchestrator = orchestrator(
        fetcher,
        one_category("Informāciju tehnoloģijas, Datori", 6),
        2,
    );
    let mut sink = RecordingSink::default();

    assert_eq!(orchestrator.state(), &RunState::Idle);
    let summary = orchestrator.run(&mut sink).await.unwrap();
    assert_eq!(orchestrator.state(), &RunState::Done);

    let commits = sink.commits();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].len(), 1);
    assert_eq!(commits[1].len(), 1);

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Izstrādātājs");
    assert_eq!(records[0].salary_type, PayPeriod::Monthly);
    assert_eq!(records[0].url, "https://www.visidarbi.lv/job/1");
    assert_eq!(records[1].title, "Testētājs");
    assert_eq!(records[1].salary_type, PayPeriod::Hourly);
    assert_eq!(records[1].monthly_equiv_max, 2400.0);
    assert!(records
        .iter()
        .all(|r| r.category == "Informāciju tehnoloģijas, Datori" && !r.calculated));

    assert_eq!(summary.records(), 2);
    assert_eq!(summary.pages(), 2);
    assert_eq!(summary.listings(), 2);
}

#[tokio::test]
async fn categories_run_in_catalog_order_and_labels_come_from_the_catalog() {
    let catalog = CategoryCatalog::default()
        .restrict(&["Vadība", "Pakalpojumi"])
        .unwrap();
    let fetcher = StubFetcher::new(vec![
        ((13, 1), page(&[listing("Apkopējs", "/a", "900")])),
        ((19, 1), page(&[listing("Direktors", "/b", "4000")])),
    ]);
    let fetcher = Arc::new(fetcher);
    let mut orchestrator = orchestrator(Arc::clone(&fetcher), catalog.clone(), 1);
    let mut sink = RecordingSink::default();

    orchestrator.run(&mut sink).await.unwrap();

    // "Pakalpojumi" (13) comes before "Vadība" (19) in the catalog.
    assert_eq!(*fetcher.calls.lock().unwrap(), vec![(13, 1), (19, 1)]);
    let categories: Vec<_> = sink.records().into_iter().map(|r| r.category).collect();
    assert_eq!(categories, vec!["Pakalpojumi", "Vadība"]);
    assert!(categories.iter().all(|c| catalog.contains(c)));
}

#[tokio::test]
async fn unresolved_salaries_and_broken_listings_are_dropped_but_page_still_commits() {
    let broken = r#"<div class="item premium big-item"><span>no link</span></div>"#.to_string();
    let fetcher = StubFetcher::new(vec![(
        (4, 1),
        page(&[
            listing("Bez algas", "/x", "Pēc vienošanās"),
            broken,
            listing("Ar algu", "/y", "1200"),
        ]),
    )]);
    let mut orchestrator = orchestrator(
        fetcher,
        one_category("Būvniecība, Nekustamais īpašums, Ceļu būve", 4),
        1,
    );
    let mut sink = RecordingSink::default();

    let summary = orchestrator.run(&mut sink).await.unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Ar algu");
    assert_eq!(summary.listings(), 2);
    assert_eq!(sink.commits().len(), 1);
}

#[tokio::test]
async fn empty_pages_still_commit_once() {
    let fetcher = StubFetcher::new(vec![((1, 1), page(&[])), ((1, 2), page(&[]))]);
    let mut orchestrator = orchestrator(fetcher, one_category("Administrēšana, Asistēšana", 1), 2);
    let mut sink = RecordingSink::default();

    orchestrator.run(&mut sink).await.unwrap();

    let commits = sink.commits();
    assert_eq!(commits.len(), 2);
    assert!(commits.iter().all(|c| c.is_empty()));
}

#[tokio::test]
async fn fetch_failure_aborts_remaining_categories() {
    let catalog = CategoryCatalog::new(vec![
        CategoryDescriptor::new("Pirmā", 1),
        CategoryDescriptor::new("Otrā", 2),
    ]);
    // Page 2 of the first category is missing.
    let fetcher = Arc::new(StubFetcher::new(vec![
        ((1, 1), page(&[listing("Viens", "/1", "1000")])),
        ((2, 1), page(&[listing("Divi", "/2", "1000")])),
        ((2, 2), page(&[listing("Trīs", "/3", "1000")])),
    ]));
    let mut orchestrator = orchestrator(Arc::clone(&fetcher), catalog, 2);
    let mut sink = RecordingSink::default();

    let err = orchestrator.run(&mut sink).await.unwrap_err();

    assert!(matches!(
        err,
        ScrapeError::Fetch { ref category, page: 2, source: FetchError::Status { status: 404, .. } }
            if category == "Pirmā"
    ));
    assert_eq!(orchestrator.state(), &RunState::Failed);
    assert_eq!(sink.commits().len(), 1);
    assert_eq!(*fetcher.calls.lock().unwrap(), vec![(1, 1), (1, 2)]);
}

#[tokio::test]
async fn storage_failure_aborts_the_run() {
    let fetcher = StubFetcher::new(vec![
        ((5, 1), page(&[listing("Elektriķis", "/e1", "1800")])),
        ((5, 2), page(&[listing("Montieris", "/e2", "1600")])),
        ((5, 3), page(&[listing("Inženieris", "/e3", "2600")])),
    ]);
    let mut orchestrator = orchestrator(
        fetcher,
        one_category("Elektronika, Telekomunikācijas, Enerģētika", 5),
        3,
    );
    let mut sink = RecordingSink {
        fail_on_commit: Some(1),
        ..RecordingSink::default()
    };

    let err = orchestrator.run(&mut sink).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Storage { page: 2, .. }));
    assert_eq!(
        err.category(),
        Some("Elektronika, Telekomunikācijas, Enerģētika")
    );
    assert_eq!(sink.records().len(), 1);
    assert_eq!(orchestrator.state(), &RunState::Failed);
}

#[tokio::test]
async fn parallel_run_isolates_failing_categories() {
    let catalog = CategoryCatalog::new(vec![
        CategoryDescriptor::new("Labā", 1),
        CategoryDescriptor::new("Slikta", 2),
        CategoryDescriptor::new("Arī labā", 3),
    ]);
    let fetcher = StubFetcher::new(vec![
        ((1, 1), page(&[listing("A", "/a", "1000")])),
        ((3, 1), page(&[listing("C", "/c", "12")])),
    ]);
    let mut orchestrator = orchestrator(fetcher, catalog, 1);
    let factory = Arc::new(RecordingFactory {
        sink: RecordingSink::default(),
    });

    let report = orchestrator.run_parallel(Arc::clone(&factory), 2).await;

    assert!(!report.is_success());
    assert_eq!(report.outcomes.len(), 3);
    let order: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| o.category.as_str())
        .collect();
    assert_eq!(order, vec!["Labā", "Slikta", "Arī labā"]);
    assert!(report.outcomes[0].result.is_ok());
    assert!(matches!(
        report.outcomes[1].result,
        Err(ScrapeError::Fetch { page: 1, .. })
    ));
    assert!(report.outcomes[2].result.is_ok());
    assert_eq!(report.records(), 2);
    assert_eq!(orchestrator.state(), &RunState::Failed);

    let mut titles: Vec<_> = factory
        .sink
        .records()
        .into_iter()
        .map(|r| r.title)
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["A", "C"]);
}

#[tokio::test]
async fn records_land_in_sqlite_store() {
    let fetcher = StubFetcher::new(vec![
        (
            (21, 1),
            page(&[
                listing("Ārsts", "/d1", "3000 - 4000"),
                listing("Māsa", "/d2", "1400"),
            ]),
        ),
        ((21, 2), page(&[listing("Farmaceits", "/d3", "20-25 EUR")])),
    ]);
    let mut orchestrator = orchestrator(
        fetcher,
        one_category("Veselības aprūpe, Farmācija", 21),
        2,
    );
    let mut store = SqlJobStore::connect("sqlite::memory:").await.unwrap();
    store.ensure_schema().await.unwrap();

    let summary = orchestrator.run(&mut store).await.unwrap();

    assert_eq!(summary.records(), 3);
    assert_eq!(store.count().await.unwrap(), 3);
}
