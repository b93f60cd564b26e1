//! Joint distribution table over an ordered subset of discrete variables
//!
//! Row `r` stands for one combination of category indices, decoded with the
//! mixed-radix rule of [`crate::radix`] (last studied variable fastest). Its
//! probability is the marginal mass of that combination under the model, with
//! every variable outside the subset summed out.

use std::fmt;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{InterventionError, Result};
use crate::model::discrete::{DiscreteModel, Proposition};
use crate::radix::MixedRadix;

/// Label of the probability column unless configured otherwise
pub const DEFAULT_PROBABILITY_LABEL: &str = "P";

/// Enumerated joint (marginal) distribution
#[derive(Clone, Debug, PartialEq)]
pub struct JointDistributionTable {
    variables: Vec<String>,
    /// Category labels per studied variable
    labels: Vec<Vec<String>>,
    radix: MixedRadix,
    probabilities: Vec<f64>,
    probability_label: String,
}

impl JointDistributionTable {
    /// Enumerate the table for `studied`, in the given order
    pub fn enumerate<S: AsRef<str>>(model: &DiscreteModel, studied: &[S]) -> Result<Self> {
        Self::enumerate_with_label(model, studied, DEFAULT_PROBABILITY_LABEL)
    }

    pub fn enumerate_with_label<S: AsRef<str>>(
        model: &DiscreteModel,
        studied: &[S],
        probability_label: &str,
    ) -> Result<Self> {
        let mut seen = FxHashSet::default();
        let mut variables = Vec::with_capacity(studied.len());
        let mut positions = Vec::with_capacity(studied.len());
        let mut labels = Vec::with_capacity(studied.len());

        for name in studied {
            let name = name.as_ref();
            if !seen.insert(name) {
                return Err(InterventionError::InvalidSelection(format!(
                    "'{}' is studied twice",
                    name
                )));
            }
            let position = model.position(name)?;
            let categories = model
                .graph()
                .variable_at(position)
                .and_then(|v| v.domain.categories())
                .map(<[String]>::to_vec)
                .ok_or_else(|| InterventionError::UnsupportedVariable {
                    variable: name.to_string(),
                    family: "discrete",
                })?;
            variables.push(name.to_string());
            positions.push(position);
            labels.push(categories);
        }

        let radix = MixedRadix::new(labels.iter().map(Vec::len).collect()).ok_or_else(|| {
            InterventionError::InvalidSelection("too many category combinations".to_string())
        })?;

        // no studied variables: an empty table rather than one empty-combination row
        let rows = if variables.is_empty() { 0 } else { radix.len() };
        let mut probabilities = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut proposition = Proposition::tautology(model);
            for (digit, &position) in positions.iter().enumerate() {
                proposition.restrict(position, radix.digit(row, digit))?;
            }
            probabilities.push(model.probability_of(&proposition)?);
        }

        debug!(variables = variables.len(), rows, "enumerated joint distribution");

        Ok(JointDistributionTable {
            variables,
            labels,
            radix,
            probabilities,
            probability_label: probability_label.to_string(),
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn row_count(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Category index per studied variable for `row`
    pub fn combination_of(&self, row: usize) -> Result<Vec<usize>> {
        self.check_row(row)?;
        self.radix.decode(row).ok_or(InterventionError::IndexOutOfRange {
            what: "row",
            index: row,
            limit: self.row_count(),
        })
    }

    /// Row holding `combination`; inverse of [`JointDistributionTable::combination_of`]
    pub fn row_of(&self, combination: &[usize]) -> Result<usize> {
        if self.is_empty() {
            return Err(InterventionError::InvalidSelection(
                "table has no studied variables".to_string(),
            ));
        }
        self.radix.encode(combination).ok_or_else(|| {
            InterventionError::InvalidSelection(format!(
                "{:?} is not a combination of {:?}",
                combination, self.variables
            ))
        })
    }

    pub fn probability_of(&self, row: usize) -> Result<f64> {
        self.check_row(row)?;
        Ok(self.probabilities[row])
    }

    /// Category labels of `row`
    pub fn labels_of(&self, row: usize) -> Result<Vec<&str>> {
        let combination = self.combination_of(row)?;
        Ok(combination
            .iter()
            .zip(&self.labels)
            .map(|(&c, labels)| labels[c].as_str())
            .collect())
    }

    /// Studied variable names then the probability column label
    pub fn headers(&self) -> Vec<&str> {
        self.variables
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.probability_label.as_str()))
            .collect()
    }

    /// (combination, probability) for each row in order
    pub fn rows(&self) -> impl Iterator<Item = (Vec<usize>, f64)> + '_ {
        self.probabilities
            .iter()
            .enumerate()
            .filter_map(|(row, &p)| self.radix.decode(row).map(|c| (c, p)))
    }

    /// Sum over all rows
    ///
    /// One for any non-empty selection: variables outside it are summed out of
    /// each row's marginal. Zero for an empty selection.
    pub fn total_mass(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.row_count() {
            return Err(InterventionError::IndexOutOfRange {
                what: "row",
                index: row,
                limit: self.row_count(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for JointDistributionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(4);
        let headers = self.headers();
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for (i, labels) in self.labels.iter().enumerate() {
            let longest = labels.iter().map(String::len).max().unwrap_or(0);
            widths[i] = widths[i].max(longest);
        }
        let last = widths.len() - 1;
        widths[last] = widths[last].max(precision + 2);

        for (i, header) in headers.iter().enumerate() {
            if i > 0 {
                write!(f, "  ")?;
            }
            write!(f, "{:<width$}", header, width = widths[i])?;
        }
        writeln!(f)?;

        for row in 0..self.row_count() {
            for (i, (&c, labels)) in self
                .radix
                .decode(row)
                .unwrap_or_default()
                .iter()
                .zip(&self.labels)
                .enumerate()
            {
                if i > 0 {
                    write!(f, "  ")?;
                }
                write!(f, "{:<width$}", labels[c], width = widths[i])?;
            }
            writeln!(
                f,
                "  {:<width$.precision$}",
                self.probabilities[row],
                width = widths[last],
                precision = precision
            )?;
        }
        Ok(())
    }
}
