//! Engine run parameters
//!
//! [`RunConfig`] mirrors the sections of the gpredomics parameter file.
//! Every field has a default so clients may send a partial document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LANGUAGES: &[&str] = &["bin", "ter", "ratio", "pow2"];
const DATA_TYPES: &[&str] = &["raw", "prev", "log"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warning", "warn", "error"];

/// Rejected run parameters; each entry names the offending field
#[derive(Debug, Error, PartialEq)]
#[error("Invalid run configuration: {}", .0.join("; "))]
pub struct ConfigValidationError(pub Vec<String>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Ga,
    Beam,
    Mcmc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitFunction {
    #[default]
    Auc,
    Specificity,
    Sensitivity,
    Mcc,
    F1Score,
    GMean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BeamMethod {
    #[default]
    Combinatorial,
    Extend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralParams {
    pub seed: u64,
    pub algo: Algorithm,
    pub thread_number: u32,
    pub fit: FitFunction,
    pub k_penalty: f64,
    /// Comma-separated model languages, e.g. "bin,ter,ratio"
    pub language: String,
    /// Comma-separated data transforms, e.g. "raw,prev"
    pub data_type: String,
    pub log_level: String,
}

impl Default for GeneralParams {
    fn default() -> Self {
        Self {
            seed: 42,
            algo: Algorithm::Ga,
            thread_number: 4,
            fit: FitFunction::Auc,
            k_penalty: 0.0001,
            language: "bin,ter,ratio".to_string(),
            data_type: "raw,prev".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataParams {
    pub feature_minimal_prevalence_pct: f64,
    pub feature_maximal_pvalue: f64,
    pub feature_minimal_feature_value: f64,
    pub classes: Vec<String>,
}

impl Default for DataParams {
    fn default() -> Self {
        Self {
            feature_minimal_prevalence_pct: 10.0,
            feature_maximal_pvalue: 0.5,
            feature_minimal_feature_value: 0.0,
            classes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaParams {
    pub population_size: u32,
    pub max_epochs: u32,
    pub min_epochs: u32,
    pub max_age_best_model: u32,
    pub kmin: u32,
    pub kmax: u32,
    pub select_elite_pct: f64,
    pub mutated_children_pct: f64,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            population_size: 5000,
            max_epochs: 200,
            min_epochs: 1,
            max_age_best_model: 100,
            kmin: 1,
            kmax: 200,
            select_elite_pct: 2.0,
            mutated_children_pct: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamParams {
    pub method: BeamMethod,
    pub kmin: u32,
    pub kmax: u32,
    pub best_models_criterion: f64,
    pub max_nb_of_models: u32,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            method: BeamMethod::Combinatorial,
            kmin: 1,
            kmax: 100,
            best_models_criterion: 10.0,
            max_nb_of_models: 20000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McmcParams {
    pub n_iter: u32,
    pub n_burn: u32,
    pub lambda: f64,
    pub nmin: u32,
}

impl Default for McmcParams {
    fn default() -> Self {
        Self {
            n_iter: 10000,
            n_burn: 5000,
            lambda: 0.001,
            nmin: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub general: GeneralParams,
    pub data: DataParams,
    pub ga: GaParams,
    pub beam: BeamParams,
    pub mcmc: McmcParams,
}

fn check_tokens(errors: &mut Vec<String>, field: &str, value: &str, allowed: &[&str]) {
    let tokens: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        errors.push(format!("{} must not be empty", field));
    }
    for token in tokens {
        if !allowed.contains(&token.to_lowercase().as_str()) {
            errors.push(format!(
                "{} contains unknown value '{}' (allowed: {})",
                field,
                token,
                allowed.join(", ")
            ));
        }
    }
}

fn check_pct(errors: &mut Vec<String>, field: &str, value: f64) {
    if !(0.0..=100.0).contains(&value) {
        errors.push(format!("{} must be between 0 and 100, got {}", field, value));
    }
}

impl RunConfig {
    /// Parse a client supplied JSON document and validate it
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigValidationError> {
        let config: RunConfig = serde_json::from_value(value)
            .map_err(|e| ConfigValidationError(vec![e.to_string()]))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let mut errors = Vec::new();
        let g = &self.general;

        if g.thread_number < 1 {
            errors.push("general.thread_number must be at least 1".to_string());
        }
        if !(g.k_penalty >= 0.0 && g.k_penalty.is_finite()) {
            errors.push(format!("general.k_penalty must be >= 0, got {}", g.k_penalty));
        }
        check_tokens(&mut errors, "general.language", &g.language, LANGUAGES);
        check_tokens(&mut errors, "general.data_type", &g.data_type, DATA_TYPES);
        if !LOG_LEVELS.contains(&g.log_level.to_lowercase().as_str()) {
            errors.push(format!("general.log_level '{}' is not a known level", g.log_level));
        }

        let d = &self.data;
        check_pct(&mut errors, "data.feature_minimal_prevalence_pct", d.feature_minimal_prevalence_pct);
        if !(d.feature_maximal_pvalue > 0.0 && d.feature_maximal_pvalue <= 1.0) {
            errors.push(format!(
                "data.feature_maximal_pvalue must be in (0, 1], got {}",
                d.feature_maximal_pvalue
            ));
        }
        if !d.feature_minimal_feature_value.is_finite() {
            errors.push("data.feature_minimal_feature_value must be finite".to_string());
        }

        match g.algo {
            Algorithm::Ga => {
                let ga = &self.ga;
                if ga.population_size < 1 {
                    errors.push("ga.population_size must be at least 1".to_string());
                }
                if ga.min_epochs > ga.max_epochs {
                    errors.push(format!(
                        "ga.min_epochs ({}) must not exceed ga.max_epochs ({})",
                        ga.min_epochs, ga.max_epochs
                    ));
                }
                if ga.kmin > ga.kmax {
                    errors.push(format!("ga.kmin ({}) must not exceed ga.kmax ({})", ga.kmin, ga.kmax));
                }
                check_pct(&mut errors, "ga.select_elite_pct", ga.select_elite_pct);
                check_pct(&mut errors, "ga.mutated_children_pct", ga.mutated_children_pct);
            },
            Algorithm::Beam => {
                let beam = &self.beam;
                if beam.kmin > beam.kmax {
                    errors.push(format!(
                        "beam.kmin ({}) must not exceed beam.kmax ({})",
                        beam.kmin, beam.kmax
                    ));
                }
                check_pct(&mut errors, "beam.best_models_criterion", beam.best_models_criterion);
            },
            Algorithm::Mcmc => {
                let mcmc = &self.mcmc;
                if mcmc.n_burn >= mcmc.n_iter {
                    errors.push(format!(
                        "mcmc.n_burn ({}) must be below mcmc.n_iter ({})",
                        mcmc.n_burn, mcmc.n_iter
                    ));
                }
                if !(mcmc.lambda >= 0.0 && mcmc.lambda.is_finite()) {
                    errors.push(format!("mcmc.lambda must be >= 0, got {}", mcmc.lambda));
                }
            },
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigValidationError(errors))
        }
    }

    /// Upper bound on the progress counter the engine reports
    pub fn max_generations(&self) -> i32 {
        let n = match self.general.algo {
            Algorithm::Ga => self.ga.max_epochs,
            Algorithm::Beam => self.beam.kmax,
            Algorithm::Mcmc => self.mcmc.n_iter,
        };
        i32::try_from(n).unwrap_or(i32::MAX)
    }
}
