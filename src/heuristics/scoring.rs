//! Beta-uniform mixture (BUM) scoring of p-values.
//!
//! Nodes carry p-values; a BUM model with mixture parameter `lambda` and shape `a` together
//! with a false discovery rate turns them into log-likelihood scores that are positive for
//! significant nodes and negative otherwise.

use crate::error::{MwcsError, Result};
use crate::graph::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BumModel {
    lambda: f64,
    a: f64,
    fdr: f64,
}

fn check_unit_interval(value: f64, name: &str) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MwcsError::Config(format!(
            "Value of {} should be in the range [0,1]",
            name
        )))
    }
}

impl BumModel {
    /// Fails if a parameter lies outside of [0, 1]; the parameters are checked in the order
    /// FDR, lambda, a.
    pub fn new(lambda: f64, a: f64, fdr: f64) -> Result<Self> {
        check_unit_interval(fdr, "FDR")?;
        check_unit_interval(lambda, "lambda")?;
        check_unit_interval(a, "a")?;
        Ok(Self { lambda, a, fdr })
    }

    /// Significance threshold: p-values below `tau` receive positive scores
    pub fn tau(&self) -> f64 {
        let pi = self.lambda + (1.0 - self.lambda) * self.a;
        ((pi - self.fdr * self.lambda) / (self.fdr * (1.0 - self.lambda))).powf(1.0 / (self.a - 1.0))
    }

    pub fn score(&self, p_value: f64) -> Result<Weight> {
        let p = p_value.max(f64::MIN_POSITIVE);
        let score = (self.a - 1.0) * (p.ln() - self.tau().ln());
        if score.is_finite() {
            Ok(score)
        } else {
            Err(MwcsError::Config(format!(
                "BUM parameters lambda={} a={} FDR={} give no finite score for p-value {}",
                self.lambda, self.a, self.fdr, p_value
            )))
        }
    }

    /// Replaces every node profit, interpreted as p-value, by its score
    pub fn score_graph(&self, graph: &mut WeightedGraph) -> Result<()> {
        for u in graph.vertices_sorted() {
            let score = self.score(graph.profit(u))?;
            graph.set_profit(u, score)?;
        }
        Ok(())
    }
}
