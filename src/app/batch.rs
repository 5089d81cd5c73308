use crate::config::engine_config::BatchConfig;
use crate::core::engine::RiskEngine;
use crate::domain::model::{AnalysisReport, RawScanText, RiskLevel, SummaryRisk};
use crate::domain::ports::Storage;
use crate::domain::profile::UserSkinProfile;
use crate::utils::error::{Result, RiskError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use zip::write::{FileOptions, ZipWriter};

pub const SUMMARY_FILE: &str = "summary.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

/// One row of `summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub scan: String,
    pub summary: SummaryRisk,
    pub recognized: usize,
    pub unrecognized: usize,
    pub avoid: usize,
    pub caution: usize,
}

impl ScanOutcome {
    fn from_report(scan: &str, report: &AnalysisReport) -> Self {
        Self {
            scan: scan.to_string(),
            summary: report.summary,
            recognized: report.recognized_count,
            unrecognized: report.unrecognized_count,
            avoid: report.count_at(RiskLevel::Avoid),
            caution: report.count_at(RiskLevel::Caution),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedScan {
    pub scan: String,
    pub error: String,
}

/// Written as `manifest.json` and returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub generated_at: DateTime<Utc>,
    pub reference_ingredients: usize,
    pub scans: Vec<ScanOutcome>,
    pub failed: Vec<FailedScan>,
    pub files: Vec<String>,
}

fn scan_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("scan")
        .to_string()
}

pub struct BatchRunner<S: Storage> {
    engine: RiskEngine,
    storage: S,
    config: BatchConfig,
}

impl<S: Storage> BatchRunner<S> {
    pub fn new(engine: RiskEngine, storage: S, config: BatchConfig) -> Self {
        Self {
            engine,
            storage,
            config,
        }
    }

    /// `*.txt` files directly inside the input directory, sorted by name.
    pub fn collect_scans(&self) -> Result<Vec<PathBuf>> {
        let mut scans = Vec::new();
        for entry in std::fs::read_dir(&self.config.input_dir)? {
            let path = entry?.path();
            let is_text = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
            if path.is_file() && is_text {
                scans.push(path);
            }
        }
        scans.sort();
        Ok(scans)
    }

    pub async fn run(&self, profile: &UserSkinProfile) -> Result<BatchSummary> {
        let scans = self.collect_scans()?;
        tracing::info!(
            "Analysing {} scans from {} (concurrency {})",
            scans.len(),
            self.config.input_dir,
            self.config.concurrency()
        );

        let reports = self.analyse_all(scans, profile).await?;

        let mut outcomes = Vec::new();
        let mut failed = Vec::new();
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        for (scan, result) in reports {
            match result {
                Ok(report) => {
                    outcomes.push(ScanOutcome::from_report(&scan, &report));
                    if self.config.wants_format("json") {
                        files.push((format!("{}.report.json", scan), serde_json::to_vec_pretty(&report)?));
                    }
                }
                Err(e) => {
                    tracing::warn!("⚠️ Scan {} failed: {}", scan, e);
                    failed.push(FailedScan {
                        scan,
                        error: e.to_string(),
                    });
                }
            }
        }

        if self.config.wants_format("csv") {
            files.push((SUMMARY_FILE.to_string(), summary_csv(&outcomes)?));
        }

        let mut summary = BatchSummary {
            generated_at: Utc::now(),
            reference_ingredients: self.engine.index().len(),
            scans: outcomes,
            failed,
            files: files.iter().map(|(name, _)| name.clone()).collect(),
        };
        summary.files.push(MANIFEST_FILE.to_string());
        files.push((MANIFEST_FILE.to_string(), serde_json::to_vec_pretty(&summary)?));

        match self.config.archive_name() {
            Some(archive) => {
                let data = zip_files(&files)?;
                tracing::debug!("Writing ZIP file ({} bytes) to storage", data.len());
                self.storage.write_file(archive, &data).await?;
            }
            None => {
                for (name, data) in &files {
                    self.storage.write_file(name, data).await?;
                }
            }
        }

        tracing::info!(
            "✅ Batch finished: {} analysed, {} failed",
            summary.scans.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Every scan runs on the same index snapshot. Results come back sorted by scan name.
    async fn analyse_all(
        &self,
        scans: Vec<PathBuf>,
        profile: &UserSkinProfile,
    ) -> Result<Vec<(String, Result<AnalysisReport>)>> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut tasks = JoinSet::new();

        for path in scans {
            let semaphore = Arc::clone(&semaphore);
            let engine = self.engine.clone();
            let profile = profile.clone();
            let locale = self.config.locale.clone();

            tasks.spawn(async move {
                let scan = scan_name(&path);
                let result = async {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| RiskError::TaskError {
                        message: e.to_string(),
                    })?;
                    let bytes = tokio::fs::read(&path).await?;
                    let raw = RawScanText::from_bytes(&bytes, locale);
                    engine.analyze_async(raw, profile).await
                }
                .await;
                (scan, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (scan, result) = joined.map_err(|e| RiskError::TaskError {
                message: format!("scan task failed: {}", e),
            })?;
            tracing::debug!("Scan {} done", scan);
            results.push((scan, result));
        }

        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }
}

fn summary_csv(outcomes: &[ScanOutcome]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for outcome in outcomes {
        writer.serialize(outcome)?;
    }
    writer
        .into_inner()
        .map_err(|e| RiskError::IoError(e.into_error()))
}

fn zip_files(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
