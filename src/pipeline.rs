//! Orchestrator: normalize customers, normalize orders, load customers, load orders.
//!
//! Strictly sequential. The first failure moves the pipeline to [`PipelineState::Failed`] and the
//! remaining stages are not attempted. One store connection is opened per run, right before the
//! first load, and dropped on every exit path.

use std::error::Error as StdError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::ingestion::observability::{PipelineObserver, Severity, StageContext};
use crate::loader::{Loader, StoreConnector, TableNames};
use crate::normalize::{CustomerNormalizer, CustomerOptions, OrderNormalizer};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    NormalizingCustomers,
    NormalizingOrders,
    LoadingCustomers,
    LoadingOrders,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::NormalizingCustomers => "normalize-customers",
            PipelineState::NormalizingOrders => "normalize-orders",
            PipelineState::LoadingCustomers => "load-customers",
            PipelineState::LoadingOrders => "load-orders",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Row counts appended by a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub customers_loaded: usize,
    pub orders_loaded: usize,
}

/// Options controlling a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub customers: CustomerOptions,
    pub tables: TableNames,
    /// Severity threshold at which `on_alert` is invoked for a failed stage.
    pub alert_at_or_above: Severity,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            customers: CustomerOptions::default(),
            tables: TableNames::default(),
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// Sequences normalization and loading against one store connection per run.
pub struct Pipeline<C: StoreConnector> {
    connector: C,
    customers: CustomerNormalizer,
    orders: OrderNormalizer,
    observer: Arc<dyn PipelineObserver>,
    options: PipelineOptions,
    state: PipelineState,
}

impl<C: StoreConnector> Pipeline<C> {
    pub fn new(connector: C, observer: Arc<dyn PipelineObserver>) -> Self {
        Self::with_options(connector, observer, PipelineOptions::default())
    }

    pub fn with_options(connector: C, observer: Arc<dyn PipelineObserver>, options: PipelineOptions) -> Self {
        Self {
            connector,
            customers: CustomerNormalizer::new(Arc::clone(&observer)).with_options(options.customers),
            orders: OrderNormalizer::new(Arc::clone(&observer)),
            observer,
            options,
            state: PipelineState::Idle,
        }
    }

    /// State after the most recent transition.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the whole pipeline once.
    ///
    /// Returns the first error encountered, tagged with the stage it happened in.
    pub fn run(
        &mut self,
        customer_source: impl AsRef<Path>,
        order_source: impl AsRef<Path>,
    ) -> Result<RunSummary, PipelineError> {
        let customer_source = customer_source.as_ref();
        let order_source = order_source.as_ref();
        self.state = PipelineState::Idle;

        self.transition(PipelineState::NormalizingCustomers);
        let customers = match self.customers.normalize_path(customer_source) {
            Ok(ds) => ds,
            Err(e) => {
                self.report_failure(&StageContext::normalize(customer_source.display().to_string()), &e, true);
                return Err(self.fail(|stage| PipelineError::input(stage, e)));
            }
        };

        self.transition(PipelineState::NormalizingOrders);
        let orders = match self.orders.normalize_path(order_source) {
            Ok(ds) => ds,
            Err(e) => {
                self.report_failure(&StageContext::normalize(order_source.display().to_string()), &e, true);
                return Err(self.fail(|stage| PipelineError::input(stage, e)));
            }
        };

        self.transition(PipelineState::LoadingCustomers);
        // The store lives until the end of this scope and is released on every return below.
        let mut store = match self.connector.connect() {
            Ok(store) => store,
            Err(e) => {
                self.report_failure(&StageContext::load(self.connector.describe()), &e, true);
                return Err(self.fail(|stage| PipelineError::load(stage, e)));
            }
        };
        let mut loader =
            Loader::new(&mut store, Arc::clone(&self.observer)).with_tables(self.options.tables.clone());

        let customers_loaded = match loader.load_customers(&customers) {
            Ok(n) => n,
            Err(e) => {
                // The loader has already reported the failure.
                let table = loader.tables().customers.clone();
                self.report_failure(&StageContext::load(table), &e, false);
                return Err(self.fail(|stage| PipelineError::load(stage, e)));
            }
        };

        self.transition(PipelineState::LoadingOrders);
        let orders_loaded = match loader.load_orders(&orders) {
            Ok(n) => n,
            Err(e) => {
                let table = loader.tables().orders.clone();
                self.report_failure(&StageContext::load(table), &e, false);
                return Err(self.fail(|stage| PipelineError::load(stage, e)));
            }
        };

        self.transition(PipelineState::Done);
        Ok(RunSummary {
            customers_loaded,
            orders_loaded,
        })
    }

    fn transition(&mut self, to: PipelineState) {
        let from = self.state;
        self.state = to;
        self.observer.on_transition(from, to);
    }

    /// Move to `Failed`, building the error from the stage that was running.
    fn fail(&mut self, make: impl FnOnce(PipelineState) -> PipelineError) -> PipelineError {
        let stage = self.state;
        self.transition(PipelineState::Failed);
        make(stage)
    }

    fn report_failure(&self, ctx: &StageContext, error: &(dyn StdError + 'static), notify_failure: bool) {
        let severity = Severity::for_error(error);
        if notify_failure {
            self.observer.on_failure(ctx, severity, error);
        }
        if severity >= self.options.alert_at_or_above {
            self.observer.on_alert(ctx, severity, error);
        }
    }
}
