use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use report_common::{CatalogSnapshot, FactoryId, HistoryEntry};

use super::{CommonLists, DataService, ReportSubmission};
use crate::errors::DataServiceError;

/// In-process data service backed by a fixed catalog.
///
/// Used by the `preview` command and by tests, which can inject latency and
/// failures and inspect what was persisted.
pub struct StaticDataService {
    catalog: CatalogSnapshot,
    history: Mutex<BTreeMap<String, Vec<HistoryEntry>>>,
    submissions: Mutex<Vec<ReportSubmission>>,
    latency: Duration,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    list_calls: AtomicUsize,
}

impl StaticDataService {
    pub fn new(catalog: CatalogSnapshot) -> Self {
        Self {
            catalog,
            history: Mutex::new(BTreeMap::new()),
            submissions: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `getCommonLists` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<ReportSubmission> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn seed_history(&self, sheet: &str, entries: Vec<HistoryEntry>) {
        if let Ok(mut history) = self.history.lock() {
            history.insert(sheet.to_string(), entries);
        }
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn check_reads(&self, action: &str) -> Result<(), DataServiceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DataServiceError::Unreachable {
                action: action.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DataService for StaticDataService {
    async fn common_lists(&self) -> Result<CommonLists, DataServiceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check_reads("getCommonLists")?;
        Ok(CommonLists {
            names: self.catalog.reporters.clone(),
            defects: self.catalog.defect_categories.clone(),
        })
    }

    async fn machine_products(
        &self,
        factory: &FactoryId,
    ) -> Result<BTreeMap<String, Vec<String>>, DataServiceError> {
        self.pause().await;
        self.check_reads("getMachineProducts")?;
        Ok(self
            .catalog
            .machines_by_factory
            .get(factory)
            .cloned()
            .unwrap_or_default())
    }

    async fn reports(&self, sheet: &str) -> Result<Vec<HistoryEntry>, DataServiceError> {
        self.pause().await;
        self.check_reads("getReports")?;
        let history = self
            .history
            .lock()
            .map_err(|_| DataServiceError::Unreachable {
                action: "getReports".to_string(),
                message: "history lock poisoned".to_string(),
            })?;
        Ok(history.get(sheet).cloned().unwrap_or_default())
    }

    async fn submit(&self, submission: &ReportSubmission) -> Result<(), DataServiceError> {
        self.pause().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DataServiceError::Rejected {
                action: "submitReports".to_string(),
                status: 500,
            });
        }
        let rows: Vec<HistoryEntry> = submission
            .reports
            .iter()
            .map(|row| HistoryEntry {
                reporter: submission.reporter.clone(),
                timestamp: String::new(),
                machine_no: row.machine_no.clone(),
                product_name: row.product_name.clone(),
                defect: row.defect.clone(),
                details: row.details.clone(),
            })
            .collect();
        let sheet = submission.factory.history_sheet();
        if let Ok(mut history) = self.history.lock() {
            history.entry(sheet).or_default().extend(rows);
        }
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push(submission.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReportRow;

    fn catalog() -> CatalogSnapshot {
        let mut machines = BTreeMap::new();
        machines.insert("M1".to_string(), vec!["P1".to_string()]);
        let mut by_factory = BTreeMap::new();
        by_factory.insert(FactoryId::from("1a_machine"), machines);
        CatalogSnapshot {
            reporters: vec!["Sato".into()],
            defect_categories: vec!["burr".into()],
            machines_by_factory: by_factory,
        }
    }

    #[tokio::test]
    async fn serves_catalog_lists() {
        let service = StaticDataService::new(catalog());
        let lists = service.common_lists().await.unwrap();
        assert_eq!(lists.names, vec!["Sato"]);
        assert_eq!(service.list_calls(), 1);

        let machines = service
            .machine_products(&FactoryId::from("1a_machine"))
            .await
            .unwrap();
        assert_eq!(machines["M1"], vec!["P1"]);
        assert!(
            service
                .machine_products(&FactoryId::from("zz"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn injected_read_failure() {
        let service = StaticDataService::new(catalog());
        service.set_fail_reads(true);
        assert!(service.common_lists().await.is_err());
        assert!(service.reports("1a_reports").await.is_err());
    }

    #[tokio::test]
    async fn submit_appends_to_factory_history() {
        let service = StaticDataService::new(catalog());
        let submission = ReportSubmission {
            factory: FactoryId::from("1a_machine"),
            reporter: "Sato".into(),
            reports: vec![ReportRow {
                machine_no: "M1".into(),
                product_name: "P1".into(),
                defect: String::new(),
                details: String::new(),
            }],
        };
        service.submit(&submission).await.unwrap();

        let history = service.reports("1a_reports").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reporter, "Sato");
        assert_eq!(service.submissions(), vec![submission]);
    }

    #[tokio::test]
    async fn injected_write_failure_persists_nothing() {
        let service = StaticDataService::new(catalog());
        service.set_fail_writes(true);
        let submission = ReportSubmission::new(FactoryId::from("1a_machine"), "Sato", &[]);
        assert!(service.submit(&submission).await.is_err());
        assert!(service.submissions().is_empty());
    }
}
