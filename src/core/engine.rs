use crate::config::engine_config::{EngineConfig, MatcherConfig};
use crate::core::dataset::{load_index, IndexBuildReport};
use crate::core::matcher::IngredientMatcher;
use crate::core::normalizer::Normalizer;
use crate::core::reference_index::ReferenceIndex;
use crate::core::report::build_report;
use crate::core::scorer::RiskScorer;
use crate::domain::model::{AnalysisReport, RawScanText};
use crate::domain::ports::DatasetSource;
use crate::domain::profile::UserSkinProfile;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::Validate;
use std::sync::Arc;

fn run_analysis(
    raw: &RawScanText,
    profile: &UserSkinProfile,
    index: &ReferenceIndex,
    normalizer: &Normalizer,
    matcher_config: &MatcherConfig,
    scorer: &RiskScorer,
) -> AnalysisReport {
    let tokens = normalizer.normalize(raw);
    let token_count = tokens.len();

    let matcher = IngredientMatcher::new(index, matcher_config);
    let verdicts = matcher
        .match_all(tokens)
        .iter()
        .map(|result| scorer.score(result, profile))
        .collect();

    let report = build_report(verdicts);
    tracing::debug!(
        tokens = token_count,
        recognized = report.recognized_count,
        unrecognized = report.unrecognized_count,
        summary = %report.summary,
        "Analysis finished"
    );
    report
}

/// Runs one analysis against a borrowed index. The analysis sections of the
/// configuration are validated before any token is matched, so an invalid
/// config never yields a partial report.
pub fn analyze(
    raw: &RawScanText,
    profile: &UserSkinProfile,
    index: &ReferenceIndex,
    config: &EngineConfig,
) -> Result<AnalysisReport> {
    config.validate_analysis()?;
    let normalizer = Normalizer::new(&config.normalizer)?;
    let scorer = RiskScorer::from_config(&config.scoring);
    Ok(run_analysis(raw, profile, index, &normalizer, &config.matcher, &scorer))
}

/// Long-lived analysis service: validated config plus a shared index snapshot.
///
/// Cloning is cheap. Clones share the index until one of them reloads.
#[derive(Clone)]
pub struct RiskEngine {
    index: Arc<ReferenceIndex>,
    normalizer: Arc<Normalizer>,
    scorer: Arc<RiskScorer>,
    config: Arc<EngineConfig>,
}

impl RiskEngine {
    pub fn new(index: Arc<ReferenceIndex>, config: EngineConfig) -> Result<Self> {
        config.validate_analysis()?;
        let normalizer = Normalizer::new(&config.normalizer)?;
        let scorer = RiskScorer::from_config(&config.scoring);

        tracing::info!(
            "Risk engine ready: {} reference ingredients, acceptance threshold {}",
            index.len(),
            config.matcher.acceptance_threshold
        );

        Ok(Self {
            index,
            normalizer: Arc::new(normalizer),
            scorer: Arc::new(scorer),
            config: Arc::new(config),
        })
    }

    /// Validates `config`, then builds the index from `source`.
    pub async fn from_source(
        source: &dyn DatasetSource,
        config: EngineConfig,
    ) -> Result<(Self, IndexBuildReport)> {
        config.validate()?;
        let (index, report) = load_index(source, config.dataset.resolved_format()).await?;
        let engine = Self::new(Arc::new(index), config)?;
        Ok((engine, report))
    }

    pub fn index(&self) -> Arc<ReferenceIndex> {
        Arc::clone(&self.index)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(&self, raw: &RawScanText, profile: &UserSkinProfile) -> AnalysisReport {
        run_analysis(
            raw,
            profile,
            &self.index,
            &self.normalizer,
            &self.config.matcher,
            &self.scorer,
        )
    }

    /// Runs the analysis on the blocking pool so async callers are not stalled.
    pub async fn analyze_async(
        &self,
        raw: RawScanText,
        profile: UserSkinProfile,
    ) -> Result<AnalysisReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.analyze(&raw, &profile))
            .await
            .map_err(|e| RiskError::TaskError {
                message: format!("analysis task failed: {}", e),
            })
    }

    /// Rebuilds the index from `source` and swaps it in. Analyses already
    /// running, and other clones of this engine, keep their old snapshot.
    pub async fn reload(&mut self, source: &dyn DatasetSource) -> Result<IndexBuildReport> {
        let (index, report) = load_index(source, self.config.dataset.resolved_format()).await?;
        tracing::info!(
            "Reference index reloaded from {}: {} -> {} ingredients",
            source.describe(),
            self.index.len(),
            index.len()
        );
        self.index = Arc::new(index);
        Ok(report)
    }
}
