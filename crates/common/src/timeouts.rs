//! Timeout manager
//!
//! Computes test timeouts from a YAML strategy: per-environment base values,
//! arithmetic formulas over those values, and multipliers applied when the
//! machine is slow, running in CI, or under load.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Timeout used when a formula is missing or cannot be evaluated
pub const FALLBACK_TIMEOUT_MS: u64 = 25_000;

const GIB: u64 = 1024 * 1024 * 1024;
const SLOW_MACHINE_CPUS: usize = 4;
const SLOW_MACHINE_MEMORY: u64 = 8 * GIB;
const HIGH_LOAD_RATIO: f64 = 0.8;

// ============================================================================
// Strategy file
// ============================================================================

/// Where the tests are running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    CiCd,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::CiCd => "ci_cd",
            Environment::Production => "production",
        }
    }

    /// `CI` set wins, then `BDDBOARD_ENV=production`, else development.
    pub fn detect() -> Self {
        Self::detect_with(|key| std::env::var(key).ok())
    }

    fn detect_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("CI").is_some_and(|value| !value.is_empty()) {
            Environment::CiCd
        } else if lookup("BDDBOARD_ENV").as_deref() == Some("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingFactors {
    pub slow_machine_multiplier: f64,
    pub ci_environment_multiplier: f64,
    pub high_load_multiplier: f64,
}

impl Default for ScalingFactors {
    fn default() -> Self {
        Self {
            slow_machine_multiplier: 1.5,
            ci_environment_multiplier: 1.25,
            high_load_multiplier: 2.0,
        }
    }
}

/// Parsed `timeout-strategy.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutStrategy {
    #[serde(default)]
    pub environments: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub timeout_formulas: BTreeMap<String, String>,
    #[serde(default)]
    pub scaling_factors: ScalingFactors,
}

impl Default for TimeoutStrategy {
    fn default() -> Self {
        let development: BTreeMap<String, f64> = [
            ("docling_processing_base", 14000.0),
            ("network_buffer", 3000.0),
            ("ui_interaction_buffer", 2000.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let formulas: BTreeMap<String, String> = [
            (
                "bdd_global",
                "docling_processing_base + network_buffer + ui_interaction_buffer + 5000",
            ),
            ("docling_operation", "docling_processing_base + network_buffer"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            environments: BTreeMap::from([("development".to_string(), development)]),
            timeout_formulas: formulas,
            scaling_factors: ScalingFactors::default(),
        }
    }
}

impl TimeoutStrategy {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a strategy file; a missing or malformed file yields the defaults.
    pub fn load(path: &Path) -> Self {
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| Error::source_read(path, e))
            .and_then(|content| Self::from_yaml(&content));

        match loaded {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!("Timeout strategy unavailable, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

// ============================================================================
// System facts
// ============================================================================

/// Host characteristics used for scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemProfile {
    pub cpu_count: usize,
    pub total_memory_bytes: Option<u64>,
    /// One-minute load average
    pub load_average: Option<f64>,
}

impl SystemProfile {
    /// Read CPU count, total memory and one-minute load from the running
    /// host. A load average of zero (platforms without one) is left out.
    pub fn detect() -> Self {
        let refresh_kind = RefreshKind::new()
            .with_cpu(CpuRefreshKind::new())
            .with_memory(MemoryRefreshKind::new().with_ram());
        let system = System::new_with_specifics(refresh_kind);

        let cpu_count = match system.cpus().len() {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        };
        let total_memory = system.total_memory();
        let load = System::load_average().one;

        Self {
            cpu_count,
            total_memory_bytes: (total_memory > 0).then_some(total_memory),
            load_average: (load > 0.0).then_some(load),
        }
    }

    pub fn is_slow_machine(&self) -> bool {
        self.cpu_count < SLOW_MACHINE_CPUS
            || self
                .total_memory_bytes
                .map(|bytes| bytes < SLOW_MACHINE_MEMORY)
                .unwrap_or(false)
    }

    pub fn is_high_load(&self) -> bool {
        self.load_average
            .map(|load| load > self.cpu_count as f64 * HIGH_LOAD_RATIO)
            .unwrap_or(false)
    }
}

// ============================================================================
// Formulas
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(formula: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = formula.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    literal.push(d);
                    chars.next();
                }
                let value = literal
                    .parse()
                    .map_err(|_| Error::Formula(format!("bad number {:?}", literal)))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_ascii_alphanumeric() || d == '_') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            other => return Err(Error::Formula(format!("unexpected character {:?}", other))),
        }
    }

    Ok(tokens)
}

/// Recursive-descent evaluator over `+ - * /` and parentheses
struct Evaluator<'a> {
    tokens: Vec<Token>,
    pos: usize,
    variables: &'a BTreeMap<String, f64>,
}

impl<'a> Evaluator<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' {
                value * rhs
            } else if rhs == 0.0 {
                return Err(Error::Formula("division by zero".to_string()));
            } else {
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Ident(name)) => self
                .variables
                .get(&name)
                .copied()
                .ok_or_else(|| Error::Formula(format!("unknown variable {}", name))),
            Some(Token::Op('-')) => Ok(-self.factor()?),
            Some(Token::Open) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(Error::Formula("missing closing parenthesis".to_string())),
                }
            }
            Some(other) => Err(Error::Formula(format!("unexpected token {:?}", other))),
            None => Err(Error::Formula("unexpected end of formula".to_string())),
        }
    }
}

/// Evaluate an arithmetic formula over named variables.
pub fn evaluate_formula(formula: &str, variables: &BTreeMap<String, f64>) -> Result<f64> {
    let mut evaluator = Evaluator {
        tokens: tokenize(formula)?,
        pos: 0,
        variables,
    };

    let value = evaluator.expression()?;
    if evaluator.pos < evaluator.tokens.len() {
        return Err(Error::Formula(format!("trailing input in {:?}", formula)));
    }
    if !value.is_finite() {
        return Err(Error::Formula(format!("{:?} is not finite", formula)));
    }

    Ok(value)
}

// ============================================================================
// Manager
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub is_slow_machine: bool,
    pub is_high_load: bool,
    pub total_memory_bytes: Option<u64>,
    pub cpu_count: usize,
    pub load_average: Option<f64>,
}

/// Everything the manager decided, for debugging slow test runs
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub environment: Environment,
    pub scaling_factor: f64,
    pub calculated_timeouts: BTreeMap<String, u64>,
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone)]
pub struct TimeoutManager {
    strategy: TimeoutStrategy,
    environment: Environment,
    system: SystemProfile,
    scaling_factor: f64,
    calculated: BTreeMap<String, u64>,
}

impl TimeoutManager {
    /// Manager for the strategy file at `path`, the detected environment and
    /// the running host.
    pub fn from_file(path: &Path) -> Self {
        Self::new(
            TimeoutStrategy::load(path),
            Environment::detect(),
            SystemProfile::detect(),
        )
    }

    pub fn new(strategy: TimeoutStrategy, environment: Environment, system: SystemProfile) -> Self {
        let mut scaling_factor = 1.0;
        if system.is_slow_machine() {
            scaling_factor *= strategy.scaling_factors.slow_machine_multiplier;
        }
        if environment == Environment::CiCd {
            scaling_factor *= strategy.scaling_factors.ci_environment_multiplier;
        }
        if system.is_high_load() {
            scaling_factor *= strategy.scaling_factors.high_load_multiplier;
        }

        let variables = Self::variables_for(&strategy, environment);
        let calculated: BTreeMap<String, u64> = strategy
            .timeout_formulas
            .iter()
            .map(|(name, formula)| {
                let base = match evaluate_formula(formula, &variables) {
                    Ok(value) if value > 0.0 => value,
                    Ok(value) => {
                        warn!("Formula for {} gave non-positive {}, using fallback", name, value);
                        FALLBACK_TIMEOUT_MS as f64
                    }
                    Err(e) => {
                        warn!("Formula evaluation failed for {}: {}", name, e);
                        FALLBACK_TIMEOUT_MS as f64
                    }
                };
                let scaled = (base * scaling_factor).round() as u64;
                (name.clone(), scaled.max(1))
            })
            .collect();

        debug!(
            "Timeouts for {} at scaling {}: {:?}",
            environment, scaling_factor, calculated
        );

        Self {
            strategy,
            environment,
            system,
            scaling_factor,
            calculated,
        }
    }

    fn variables_for(strategy: &TimeoutStrategy, environment: Environment) -> BTreeMap<String, f64> {
        if let Some(vars) = strategy.environments.get(environment.as_str()) {
            return vars.clone();
        }

        warn!(
            "No timeout profile for {}, falling back to development",
            environment
        );
        strategy
            .environments
            .get(Environment::Development.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    pub fn strategy(&self) -> &TimeoutStrategy {
        &self.strategy
    }

    /// Timeout in milliseconds for a named formula
    pub fn timeout(&self, name: &str) -> u64 {
        self.calculated
            .get(name)
            .copied()
            .unwrap_or(FALLBACK_TIMEOUT_MS)
    }

    pub fn timeout_duration(&self, name: &str) -> Duration {
        Duration::from_millis(self.timeout(name))
    }

    pub fn bdd_global(&self) -> u64 {
        self.timeout("bdd_global")
    }

    pub fn docling_operation(&self) -> u64 {
        self.timeout("docling_operation")
    }

    pub fn ui_interaction(&self) -> u64 {
        self.timeout("ui_interaction")
    }

    pub fn api_call(&self) -> u64 {
        self.timeout("api_call")
    }

    pub fn dashboard_update(&self) -> u64 {
        self.timeout("dashboard_update")
    }

    pub fn performance_report(&self) -> PerformanceReport {
        PerformanceReport {
            environment: self.environment,
            scaling_factor: self.scaling_factor,
            calculated_timeouts: self.calculated.clone(),
            system_info: SystemInfo {
                is_slow_machine: self.system.is_slow_machine(),
                is_high_load: self.system.is_high_load(),
                total_memory_bytes: self.system.total_memory_bytes,
                cpu_count: self.system.cpu_count,
                load_average: self.system.load_average,
            },
        }
    }
}
