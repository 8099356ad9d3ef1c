//! Advice Strategies
//!
//! Single-asset hedge guidance and whole-portfolio diagnosis, both driven by
//! cluster themes.

mod hedge;
mod portfolio;

pub use hedge::{Action, AdviceReport, HedgeAdvisor, Recommendation};
pub use portfolio::{
    ClusterExposure, Diagnosis, DiagnosisReport, HoldingValuation, PortfolioAnalyzer,
    PortfolioReport, ThemeExposure,
};
