mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use customer_order_etl::error::PipelineErrorKind;
use customer_order_etl::ingestion::Severity;
use customer_order_etl::loader::{SqliteConnector, SqliteStore, StoreConnector, TableStore};
use customer_order_etl::pipeline::{Pipeline, PipelineOptions, PipelineState, RunSummary};
use customer_order_etl::types::DataSet;
use customer_order_etl::{LoadError, LoadResult};

use common::{RecordingObserver, SCHEMA_SQL, fixture};

/// In-process store that can be told to fail on a given table and records its own release.
struct FakeStore {
    fail_table: Option<&'static str>,
    appended: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl TableStore for FakeStore {
    fn append(&mut self, table: &str, dataset: &DataSet) -> LoadResult<usize> {
        if self.fail_table == Some(table) {
            return Err(LoadError::storage(table, "constraint violation"));
        }
        self.appended.fetch_add(1, Ordering::SeqCst);
        Ok(dataset.row_count())
    }
}

impl Drop for FakeStore {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeConnector {
    fail_table: Option<&'static str>,
    refuse: bool,
    connects: Arc<AtomicUsize>,
    appended: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl StoreConnector for FakeConnector {
    type Store = FakeStore;

    fn connect(&self) -> LoadResult<FakeStore> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(LoadError::connect(
                "fake",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            ));
        }
        Ok(FakeStore {
            fail_table: self.fail_table,
            appended: Arc::clone(&self.appended),
            released: Arc::clone(&self.released),
        })
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

#[test]
fn full_run_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("etl.db");
    SqliteStore::open(&db)
        .unwrap()
        .connection()
        .execute_batch(SCHEMA_SQL)
        .unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let mut pipeline = Pipeline::new(SqliteConnector::new(&db), obs.clone());
    let summary = pipeline
        .run(fixture("customers.csv"), fixture("orders.xml"))
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            customers_loaded: 3,
            orders_loaded: 2,
        }
    );
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(
        obs.transitions(),
        vec![
            PipelineState::NormalizingCustomers,
            PipelineState::NormalizingOrders,
            PipelineState::LoadingCustomers,
            PipelineState::LoadingOrders,
            PipelineState::Done,
        ]
    );

    let store = SqliteStore::open(&db).unwrap();
    let joined: i64 = store
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM orders o JOIN customers c ON c.mobilenumber = o.mobilenumber",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(joined, 2);
}

#[test]
fn customer_load_failure_skips_orders_and_releases_store() {
    let connector = FakeConnector {
        fail_table: Some("customers"),
        ..Default::default()
    };
    let appended = Arc::clone(&connector.appended);
    let released = Arc::clone(&connector.released);

    let obs = Arc::new(RecordingObserver::default());
    let mut pipeline = Pipeline::new(connector, obs.clone());
    let err = pipeline
        .run(fixture("customers.csv"), fixture("orders.xml"))
        .unwrap_err();

    assert_eq!(err.stage(), PipelineState::LoadingCustomers);
    assert!(matches!(err.kind(), PipelineErrorKind::Load(_)));
    assert!(err.to_string().starts_with("stage 'load-customers' failed"));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(appended.load(Ordering::SeqCst), 0);
    assert!(released.load(Ordering::SeqCst));

    assert_eq!(
        obs.transitions(),
        vec![
            PipelineState::NormalizingCustomers,
            PipelineState::NormalizingOrders,
            PipelineState::LoadingCustomers,
            PipelineState::Failed,
        ]
    );
    // Reported once, by the loader.
    assert_eq!(obs.failures.lock().unwrap().len(), 1);
}

#[test]
fn order_load_failure_keeps_customer_rows_and_releases_store() {
    let connector = FakeConnector {
        fail_table: Some("orders"),
        ..Default::default()
    };
    let appended = Arc::clone(&connector.appended);
    let released = Arc::clone(&connector.released);

    let mut pipeline = Pipeline::new(connector, Arc::new(RecordingObserver::default()));
    let err = pipeline
        .run(fixture("customers.csv"), fixture("orders.xml"))
        .unwrap_err();

    assert_eq!(err.stage(), PipelineState::LoadingOrders);
    assert_eq!(appended.load(Ordering::SeqCst), 1);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn bad_customer_source_aborts_before_connecting() {
    let connector = FakeConnector::default();
    let connects = Arc::clone(&connector.connects);

    let obs = Arc::new(RecordingObserver::default());
    let mut pipeline = Pipeline::new(connector, obs.clone());
    let err = pipeline
        .run(fixture("customers_missing_column.csv"), fixture("orders.xml"))
        .unwrap_err();

    assert_eq!(err.stage(), PipelineState::NormalizingCustomers);
    assert!(matches!(err.kind(), PipelineErrorKind::Input(_)));
    assert_eq!(connects.load(Ordering::SeqCst), 0);
    assert_eq!(
        obs.transitions(),
        vec![PipelineState::NormalizingCustomers, PipelineState::Failed]
    );
    assert_eq!(obs.failures.lock().unwrap()[0].1, Severity::Error);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn malformed_order_source_names_its_stage() {
    let connector = FakeConnector::default();
    let connects = Arc::clone(&connector.connects);
    let mut pipeline = Pipeline::new(connector, Arc::new(RecordingObserver::default()));
    let err = pipeline
        .run(fixture("customers.csv"), fixture("malformed_orders.xml"))
        .unwrap_err();
    assert_eq!(err.stage(), PipelineState::NormalizingOrders);
    assert!(err.to_string().starts_with("stage 'normalize-orders' failed"));
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_source_file_raises_critical_alert() {
    let obs = Arc::new(RecordingObserver::default());
    let mut pipeline = Pipeline::new(FakeConnector::default(), obs.clone());
    let _ = pipeline
        .run(fixture("customers.csv"), fixture("does_not_exist.xml"))
        .unwrap_err();
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![Severity::Critical]);
}

#[test]
fn connection_failure_is_a_load_customers_failure() {
    let connector = FakeConnector {
        refuse: true,
        ..Default::default()
    };
    let obs = Arc::new(RecordingObserver::default());
    let mut pipeline = Pipeline::with_options(
        connector,
        obs.clone(),
        PipelineOptions {
            alert_at_or_above: Severity::Error,
            ..Default::default()
        },
    );
    let err = pipeline
        .run(fixture("customers.csv"), fixture("orders.xml"))
        .unwrap_err();
    assert_eq!(err.stage(), PipelineState::LoadingCustomers);
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![Severity::Critical]);
}

#[test]
fn pipeline_can_run_again_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("etl.db");
    let mut pipeline = Pipeline::new(SqliteConnector::new(&db), Arc::new(RecordingObserver::default()));

    // No tables yet.
    let err = pipeline
        .run(fixture("customers.csv"), fixture("orders.xml"))
        .unwrap_err();
    assert_eq!(err.stage(), PipelineState::LoadingCustomers);

    SqliteStore::open(&db)
        .unwrap()
        .connection()
        .execute_batch(SCHEMA_SQL)
        .unwrap();
    let summary = pipeline
        .run(fixture("customers.csv"), fixture("orders.xml"))
        .unwrap();
    assert_eq!(summary.customers_loaded, 3);
    assert_eq!(pipeline.state(), PipelineState::Done);
}
