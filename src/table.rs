//! Result tables built while a grid search runs.

use crate::error::{Result, VectorboardError};
use serde::{Deserialize, Serialize};

pub const RUN_TIME_COLUMN: &str = "run time";
pub const EMBEDDING_TIME_COLUMN: &str = "embedding time";

/// Widest cell printed by [`InfoTable::to_text`] / [`ResultsTable::to_text`].
const MAX_CELL_WIDTH: usize = 48;

/// Label used for an experiment in table rows and columns.
pub fn experiment_label(index: usize) -> String {
    format!("Experiment_{index}")
}

/// One experiment's parameters and timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoRow {
    pub experiment: String,
    /// Parameter values, aligned with [`InfoTable::param_columns`].
    pub params: Vec<String>,
    /// Seconds from start to last answered query.
    pub run_time: Option<f64>,
    /// Seconds spent building the vector index.
    pub embedding_time: Option<f64>,
}

/// One row per experiment: every grid parameter plus run and embedding time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoTable {
    param_columns: Vec<String>,
    rows: Vec<InfoRow>,
}

impl InfoTable {
    pub fn new(param_columns: Vec<String>) -> Self {
        Self {
            param_columns,
            rows: Vec::new(),
        }
    }

    pub fn param_columns(&self) -> &[String] {
        &self.param_columns
    }

    /// All column names, parameters first.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.param_columns.clone();
        columns.push(RUN_TIME_COLUMN.to_string());
        columns.push(EMBEDDING_TIME_COLUMN.to_string());
        columns
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.param_columns.len() + 2)
    }

    pub fn rows(&self) -> &[InfoRow] {
        &self.rows
    }

    pub fn row(&self, experiment: &str) -> Option<&InfoRow> {
        self.rows.iter().find(|r| r.experiment == experiment)
    }

    pub fn add_row(&mut self, experiment: impl Into<String>, params: Vec<String>) {
        self.rows.push(InfoRow {
            experiment: experiment.into(),
            params,
            run_time: None,
            embedding_time: None,
        });
    }

    /// Record timings for an experiment. Returns false if the row is unknown.
    pub fn set_timings(&mut self, experiment: &str, run_time: f64, embedding_time: f64) -> bool {
        match self.rows.iter_mut().find(|r| r.experiment == experiment) {
            Some(row) => {
                row.run_time = Some(run_time);
                row.embedding_time = Some(embedding_time);
                true
            }
            None => false,
        }
    }

    /// Render as an aligned text table.
    pub fn to_text(&self) -> String {
        let mut headers = vec![String::new()];
        headers.extend(self.columns());

        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.experiment.clone()];
                cells.extend(row.params.iter().cloned());
                cells.push(format_seconds(row.run_time));
                cells.push(format_seconds(row.embedding_time));
                cells
            })
            .collect();

        render_text(&headers, &rows)
    }
}

/// One row per query, one column per experiment, cell = answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    queries: Vec<String>,
    columns: Vec<ResultColumn>,
}

/// All answers of one experiment, aligned with the table's queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub experiment: String,
    pub answers: Vec<String>,
}

impl ResultsTable {
    pub fn new(queries: Vec<String>) -> Self {
        Self {
            queries,
            columns: Vec::new(),
        }
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.queries.len(), self.columns.len())
    }

    /// Append an experiment's answers as the next column.
    pub fn add_column(&mut self, experiment: impl Into<String>, answers: Vec<String>) -> Result<()> {
        let experiment = experiment.into();
        if answers.len() != self.queries.len() {
            return Err(VectorboardError::InvalidState(format!(
                "{} produced {} answers for {} queries",
                experiment,
                answers.len(),
                self.queries.len()
            )));
        }
        self.columns.push(ResultColumn { experiment, answers });
        Ok(())
    }

    /// Answer at (query row, experiment column).
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|c| c.answers.get(row))
            .map(String::as_str)
    }

    /// First answer recorded for `query` by `experiment`.
    pub fn answer(&self, query: &str, experiment: &str) -> Option<&str> {
        let row = self.queries.iter().position(|q| q == query)?;
        let column = self.columns.iter().position(|c| c.experiment == experiment)?;
        self.cell(row, column)
    }

    /// Render as an aligned text table.
    pub fn to_text(&self) -> String {
        let mut headers = vec!["query".to_string()];
        headers.extend(self.columns.iter().map(|c| c.experiment.clone()));

        let rows: Vec<Vec<String>> = self
            .queries
            .iter()
            .enumerate()
            .map(|(i, query)| {
                let mut cells = vec![query.clone()];
                cells.extend(self.columns.iter().map(|c| c.answers[i].clone()));
                cells
            })
            .collect();

        render_text(&headers, &rows)
    }
}

/// Everything a finished grid search produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridReport {
    pub info: InfoTable,
    pub results: ResultsTable,
}

fn format_seconds(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn clip(cell: &str) -> String {
    let flat: String = cell.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX_CELL_WIDTH {
        let head: String = flat.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        flat
    }
}

fn render_text(headers: &[String], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| clip(h)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(|c| clip(c)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = line(&headers);
    out.push('\n');
    out.push_str(&"─".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));
    for row in &rows {
        out.push('\n');
        out.push_str(&line(row));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_table_shape_and_timings() {
        let mut info = InfoTable::new(vec![
            "chunk_size".to_string(),
            "vector_store".to_string(),
            "embeddings".to_string(),
        ]);
        info.add_row("Experiment_1", vec!["500".into(), "flat".into(), "a".into()]);
        info.add_row("Experiment_2", vec!["500".into(), "flat".into(), "b".into()]);

        assert_eq!(info.shape(), (2, 5));
        assert_eq!(info.columns()[3], RUN_TIME_COLUMN);
        assert_eq!(info.columns()[4], EMBEDDING_TIME_COLUMN);

        assert!(info.set_timings("Experiment_2", 3.0, 1.5));
        assert!(!info.set_timings("Experiment_9", 1.0, 1.0));
        assert_eq!(info.row("Experiment_2").unwrap().run_time, Some(3.0));
        assert_eq!(info.row("Experiment_1").unwrap().run_time, None);
    }

    #[test]
    fn test_results_table_cells() {
        let mut results = ResultsTable::new(vec!["q1".into(), "q2".into()]);
        results
            .add_column("Experiment_1", vec!["a".into(), "b".into()])
            .unwrap();
        results
            .add_column("Experiment_2", vec!["c".into(), "d".into()])
            .unwrap();

        assert_eq!(results.shape(), (2, 2));
        assert_eq!(results.cell(1, 0), Some("b"));
        assert_eq!(results.answer("q1", "Experiment_2"), Some("c"));
        assert_eq!(results.cell(2, 0), None);
    }

    #[test]
    fn test_results_column_length_checked() {
        let mut results = ResultsTable::new(vec!["q1".into()]);
        let err = results.add_column("Experiment_1", Vec::new()).unwrap_err();
        assert!(matches!(err, VectorboardError::InvalidState(_)));
        assert_eq!(results.shape(), (1, 0));
    }

    #[test]
    fn test_to_text_clips_long_cells() {
        let mut results = ResultsTable::new(vec!["what?".into()]);
        results
            .add_column("Experiment_1", vec!["x".repeat(100)])
            .unwrap();
        let text = results.to_text();
        assert!(text.contains("Experiment_1"));
        assert!(text.contains("..."));
        assert!(!text.contains(&"x".repeat(60)));
    }

    #[test]
    fn test_experiment_label() {
        assert_eq!(experiment_label(3), "Experiment_3");
    }
}
