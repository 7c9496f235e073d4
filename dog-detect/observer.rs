use dog_core::FeaturePoint;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hooks into the detection pipeline. Observers see each stage's output
/// but cannot change it.
pub trait DetectionObserver {
    /// Refined extrema, before pruning
    fn on_candidates(&mut self, _points: &[FeaturePoint]) {}

    /// Survivors of spatial pruning
    fn on_pruned(&mut self, _points: &[FeaturePoint]) {}

    /// Final oriented points
    fn on_oriented(&mut self, _points: &[FeaturePoint]) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DetectionObserver for NoopObserver {}

/// Size of each pipeline stage's output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub candidates: usize,
    pub pruned: usize,
    pub oriented: usize,
}

impl DetectionObserver for StageCounts {
    fn on_candidates(&mut self, points: &[FeaturePoint]) {
        self.candidates = points.len();
    }

    fn on_pruned(&mut self, points: &[FeaturePoint]) {
        self.pruned = points.len();
    }

    fn on_oriented(&mut self, points: &[FeaturePoint]) {
        self.oriented = points.len();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TraceStage {
    Candidates,
    Oriented,
}

/// One disagreement between a run and its recorded trace
#[derive(Debug, Clone, PartialEq)]
pub enum TraceMismatch {
    Count { stage: TraceStage, expected: usize, actual: usize },
    Field { stage: TraceStage, index: usize, field: &'static str, expected: f64, actual: f64 },
}

/// Recorded output of a trusted run, compared against each new run
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceTrace {
    #[cfg_attr(feature = "serde", serde(default))]
    pub candidates: Vec<FeaturePoint>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub oriented: Vec<FeaturePoint>,
    #[cfg_attr(feature = "serde", serde(default = "default_tolerance"))]
    pub tolerance: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    mismatches: Vec<TraceMismatch>,
}

fn default_tolerance() -> f64 {
    1e-3
}

impl Default for ReferenceTrace {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl ReferenceTrace {
    pub fn new(candidates: Vec<FeaturePoint>, oriented: Vec<FeaturePoint>) -> Self {
        Self {
            candidates,
            oriented,
            tolerance: default_tolerance(),
            mismatches: Vec::new(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn mismatches(&self) -> &[TraceMismatch] {
        &self.mismatches
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    fn compare(&mut self, stage: TraceStage, actual: &[FeaturePoint]) {
        let expected = match stage {
            TraceStage::Candidates => &self.candidates,
            TraceStage::Oriented => &self.oriented,
        };
        if expected.is_empty() {
            return;
        }

        let mut found = Vec::new();
        if expected.len() != actual.len() {
            warn!(?stage, expected = expected.len(), actual = actual.len(), "trace count mismatch");
            found.push(TraceMismatch::Count {
                stage,
                expected: expected.len(),
                actual: actual.len(),
            });
        }

        for (index, (e, a)) in expected.iter().zip(actual).enumerate() {
            let mut fields = vec![("x", e.x, a.x), ("y", e.y, a.y), ("score", e.score, a.score), ("sigma", e.sigma, a.sigma)];
            if stage == TraceStage::Oriented {
                fields.push(("angle", e.angle, a.angle));
            }
            for (field, ev, av) in fields {
                if (ev - av).abs() > self.tolerance || ev.is_nan() != av.is_nan() {
                    warn!(?stage, index, field, expected = ev, actual = av, "trace field mismatch");
                    found.push(TraceMismatch::Field { stage, index, field, expected: ev, actual: av });
                }
            }
        }

        self.mismatches.extend(found);
    }
}

impl DetectionObserver for ReferenceTrace {
    fn on_candidates(&mut self, points: &[FeaturePoint]) {
        self.compare(TraceStage::Candidates, points);
    }

    fn on_oriented(&mut self, points: &[FeaturePoint]) {
        self.compare(TraceStage::Oriented, points);
    }
}
