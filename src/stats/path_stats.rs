use std::collections::HashMap;
use std::sync::Arc;

use crate::executor::path_condition::{BranchDiscriminator, PathCondition};
use crate::executor::symbolic_value::{Constraint, Expression};

const RESET: &str = "\x1b[0m";
const WHITE: &str = "\x1b[37m";
const BBLACK: &str = "\x1b[90m";

const OPERATORS: [&str; 23] = [
    "Add",
    "Sub",
    "Mul",
    "Div",
    "Rem",
    "Neg",
    "Shl",
    "Shr",
    "UShr",
    "And",
    "Or",
    "Xor",
    "Cmp",
    "IntegerToReal",
    "RealToInteger",
    "ToByte",
    "ToChar",
    "ToShort",
    "ToInt",
    "Concat",
    "Abs",
    "Min",
    "Max",
];

const COMPARATORS: [&str; 6] = ["Eq", "Ne", "Lt", "Le", "Gt", "Ge"];

/// Collects statistics about the constraints of one or more path conditions.
#[derive(Default)]
pub struct PathStatistics {
    pub total_constraints: usize,
    pub branch_counts: usize,
    pub supporting_counts: usize,
    pub multiway_counts: usize,
    pub constant_counts: usize,
    pub reference_counts: usize,
    pub constraint_depths: Vec<usize>,
    pub operator_counts: HashMap<String, usize>,
    pub comparator_counts: HashMap<String, usize>,
    pub variable_counts: HashMap<Arc<str>, usize>,
}

impl PathStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_from_expression(&mut self, expr: &Expression, depth: usize) {
        match expr {
            Expression::Constant(_) => {
                self.constant_counts += 1;
            }
            Expression::NullReference | Expression::Reference(_) => {
                self.reference_counts += 1;
            }
            Expression::Variable(v) => {
                *self.variable_counts.entry(v.name.clone()).or_insert(0) += 1;
            }
            Expression::Operation(o) => {
                *self
                    .operator_counts
                    .entry(format!("{:?}", o.op))
                    .or_insert(0) += 1;
                for operand in &o.operands {
                    self.update_from_expression(operand, depth + 1);
                }
            }
        }

        if self.constraint_depths.len() <= depth {
            self.constraint_depths.push(1);
        } else {
            self.constraint_depths[depth] += 1;
        }
    }

    fn update_from_constraint(&mut self, constraint: &Constraint) {
        self.total_constraints += 1;
        *self
            .comparator_counts
            .entry(format!("{:?}", constraint.comparator))
            .or_insert(0) += 1;
        self.update_from_expression(&constraint.left, 0);
        self.update_from_expression(&constraint.right, 0);
    }

    /// Adds every branch and supporting constraint of `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Path condition of one finished execution.
    pub fn update(&mut self, path: &PathCondition) {
        for branch in path {
            self.branch_counts += 1;
            if !matches!(branch.discriminator, BranchDiscriminator::Bool(_)) {
                self.multiway_counts += 1;
            }
            for c in &branch.supporting {
                self.supporting_counts += 1;
                self.update_from_constraint(c);
            }
            self.update_from_constraint(&branch.constraint);
        }
    }

    pub fn average_depth(&self) -> f64 {
        if self.constraint_depths.is_empty() {
            0.0
        } else {
            self.constraint_depths.iter().sum::<usize>() as f64
                / self.constraint_depths.len() as f64
        }
    }

    pub fn maximum_depth(&self) -> usize {
        self.constraint_depths.len()
    }

    pub fn average_variable_usage(&self) -> f64 {
        if self.variable_counts.is_empty() {
            0.0
        } else {
            self.variable_counts.values().sum::<usize>() as f64 / self.variable_counts.len() as f64
        }
    }

    pub fn csv_header() -> String {
        let mut columns = vec![
            "total", "branch", "supporting", "multiway", "constant", "reference", "avg_depth",
            "max_depth",
        ];
        columns.extend(OPERATORS.iter());
        columns.extend(COMPARATORS.iter());
        columns.extend(["num_variables", "avg_variable_usage", "max_variable_usage"]);
        columns.join(",")
    }

    pub fn csv_row(&self) -> String {
        let mut values = vec![
            self.total_constraints.to_string(),
            self.branch_counts.to_string(),
            self.supporting_counts.to_string(),
            self.multiway_counts.to_string(),
            self.constant_counts.to_string(),
            self.reference_counts.to_string(),
            format!("{:.2}", self.average_depth()),
            self.maximum_depth().to_string(),
        ];
        for op in OPERATORS.iter() {
            values.push(self.operator_counts.get(*op).unwrap_or(&0).to_string());
        }
        for c in COMPARATORS.iter() {
            values.push(self.comparator_counts.get(*c).unwrap_or(&0).to_string());
        }
        values.push(self.variable_counts.len().to_string());
        values.push(format!("{:.2}", self.average_variable_usage()));
        values.push(
            self.variable_counts
                .values()
                .max()
                .unwrap_or(&0)
                .to_string(),
        );
        values.join(",")
    }
}

fn count_line(name: &str, c: usize, width: usize) {
    println!(
        " • {:<width$}: {}{}{}",
        name,
        if c != 0 { WHITE } else { BBLACK },
        c,
        RESET,
        width = width
    );
}

pub fn print_path_summary_statistics_pretty(stats: &PathStatistics) {
    println!(" ┌─────────────────────┬─────────────┐");
    println!(" │ Constraint Type     │     Count   │");
    println!(" ├─────────────────────┼─────────────┤");
    println!(" │ Total               │ {:11} │", stats.total_constraints);
    println!(" │ Branch              │ {:11} │", stats.branch_counts);
    println!(" │ Supporting          │ {:11} │", stats.supporting_counts);
    println!(" │ Multi-way           │ {:11} │", stats.multiway_counts);
    println!(" └─────────────────────┴─────────────┘");

    println!("\n📊 Constraint Depth Statistics:");
    println!(" • Average Depth: {:.2}", stats.average_depth());
    println!(" • Maximum Depth: {}", stats.maximum_depth());

    println!("\n🔢 Comparator Counts:");
    for c in COMPARATORS.iter() {
        count_line(c, *stats.comparator_counts.get(*c).unwrap_or(&0), 4);
    }

    println!("\n🔢 Operator Counts:");
    for op in OPERATORS.iter() {
        count_line(op, *stats.operator_counts.get(*op).unwrap_or(&0), 13);
    }

    println!("\n📈 Variable Statistics:");
    println!(
        " • Total Number of Variables: {}",
        stats.variable_counts.len()
    );
    println!(
        " • Average Number of Usage  : {:.2}",
        stats.average_variable_usage()
    );
    println!(
        " • Maximum Number of Usage  : {}",
        stats.variable_counts.values().max().unwrap_or(&0)
    );
}

pub fn print_path_summary_statistics_csv(stats: &PathStatistics) {
    println!("{}", PathStatistics::csv_header());
    println!("{}", stats.csv_row());
}
