// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpaError;
use std::collections::BTreeMap;

/// Relative tolerance for the step-conformance check on numeric parameters.
const STEP_TOLERANCE: f64 = 1.0e-6;

/// A supplied or resolved parameter value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Choice(String),
}

impl ParamValue {
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn choice(value: impl Into<String>) -> Self {
        Self::Choice(value.into())
    }
}

/// Schema entry for one named parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamSpec {
    /// Bounded numeric parameter on a step grid.
    Numeric {
        min: f64,
        max: f64,
        step: f64,
        default: f64,
    },
    /// Enumerated parameter over a fixed option set.
    Choice {
        options: &'static [&'static str],
        default: &'static str,
    },
}

/// Named parameter definition inside a schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamDef {
    pub name: &'static str,
    pub spec: ParamSpec,
}

/// Static parameter schema of one algorithm.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSchema {
    pub params: &'static [ParamDef],
}

impl ParameterSchema {
    fn def(&self, name: &str) -> Option<&ParamDef> {
        self.params.iter().find(|def| def.name == name)
    }

    /// Returns the full default parameter set.
    pub fn defaults(&self) -> ResolvedParams {
        let mut values = BTreeMap::new();
        for def in self.params {
            let value = match &def.spec {
                ParamSpec::Numeric { default, .. } => ParamValue::Number(*default),
                ParamSpec::Choice { default, .. } => ParamValue::Choice((*default).to_string()),
            };
            values.insert(def.name.to_string(), value);
        }
        ResolvedParams { values }
    }

    /// Validates supplied parameters against this schema.
    ///
    /// Every supplied name must exist in the schema and satisfy its bounds;
    /// parameters not supplied fall back to their schema defaults.
    pub fn validate(
        &self,
        supplied: &BTreeMap<String, ParamValue>,
    ) -> Result<ResolvedParams, CpaError> {
        let mut resolved = self.defaults();

        for (name, value) in supplied {
            let def = self.def(name).ok_or_else(|| {
                CpaError::invalid_parameter(name.clone(), "not present in the parameter schema")
            })?;
            check_value(def, value)?;
            resolved.values.insert(name.clone(), value.clone());
        }

        Ok(resolved)
    }
}

fn check_value(def: &ParamDef, value: &ParamValue) -> Result<(), CpaError> {
    match (&def.spec, value) {
        (
            ParamSpec::Numeric {
                min, max, step, ..
            },
            ParamValue::Number(supplied),
        ) => {
            if !supplied.is_finite() {
                return Err(CpaError::invalid_parameter(
                    def.name,
                    format!("must be finite; got {supplied}"),
                ));
            }
            if supplied < min || supplied > max {
                return Err(CpaError::invalid_parameter(
                    def.name,
                    format!("{supplied} is outside the range [{min}, {max}]"),
                ));
            }
            if !on_step_grid(*supplied, *min, *step) {
                return Err(CpaError::invalid_parameter(
                    def.name,
                    format!("{supplied} is not on the step grid (min {min}, step {step})"),
                ));
            }
            Ok(())
        }
        (ParamSpec::Choice { options, .. }, ParamValue::Choice(supplied)) => {
            if options.contains(&supplied.as_str()) {
                Ok(())
            } else {
                Err(CpaError::invalid_parameter(
                    def.name,
                    format!("'{supplied}' is not one of {options:?}"),
                ))
            }
        }
        (ParamSpec::Numeric { .. }, ParamValue::Choice(supplied)) => Err(
            CpaError::invalid_parameter(def.name, format!("expected a number, got '{supplied}'")),
        ),
        (ParamSpec::Choice { .. }, ParamValue::Number(supplied)) => Err(
            CpaError::invalid_parameter(def.name, format!("expected an option name, got {supplied}")),
        ),
    }
}

fn on_step_grid(value: f64, min: f64, step: f64) -> bool {
    if step <= 0.0 {
        return true;
    }
    let steps = (value - min) / step;
    let nearest = steps.round();
    (steps - nearest).abs() <= STEP_TOLERANCE * steps.abs().max(1.0)
}

/// Fully-resolved parameter set: schema defaults overlaid with validated
/// caller overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedParams {
    values: BTreeMap<String, ParamValue>,
}

impl ResolvedParams {
    pub fn number(&self, name: &str) -> Result<f64, CpaError> {
        match self.values.get(name) {
            Some(ParamValue::Number(value)) => Ok(*value),
            Some(ParamValue::Choice(_)) => Err(CpaError::invalid_parameter(
                name,
                "resolved value is not numeric",
            )),
            None => Err(CpaError::invalid_parameter(name, "not resolved")),
        }
    }

    pub fn choice(&self, name: &str) -> Result<&str, CpaError> {
        match self.values.get(name) {
            Some(ParamValue::Choice(value)) => Ok(value.as_str()),
            Some(ParamValue::Number(_)) => Err(CpaError::invalid_parameter(
                name,
                "resolved value is not an option name",
            )),
            None => Err(CpaError::invalid_parameter(name, "not resolved")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
