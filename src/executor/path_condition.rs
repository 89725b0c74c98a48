use std::fmt;
use std::sync::Arc;

use colored::Colorize;

use crate::executor::error::NormalizationError;
use crate::executor::normalizer::normalize;
use crate::executor::symbolic_value::Constraint;

/// Static identity of a branch instruction.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BranchSite {
    pub class_name: Arc<str>,
    pub method_name: Arc<str>,
    pub branch_index: i32,
}

impl BranchSite {
    pub fn new(class_name: &str, method_name: &str, branch_index: i32) -> Self {
        BranchSite {
            class_name: Arc::from(class_name),
            method_name: Arc::from(method_name),
            branch_index,
        }
    }
}

impl fmt::Display for BranchSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}#{}",
            self.class_name, self.method_name, self.branch_index
        )
    }
}

/// Which way the concrete run went at a branch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BranchDiscriminator {
    /// Two-way branch; `true` when the recorded `==`/`<` primitive held,
    /// `false` when its negation did.
    Bool(bool),
    /// Multi-way branch that selected this label.
    Label(i32),
    /// Multi-way branch that fell through to its default target.
    Default,
}

impl fmt::Display for BranchDiscriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchDiscriminator::Bool(b) => write!(f, "{}", b),
            BranchDiscriminator::Label(l) => write!(f, "case {}", l),
            BranchDiscriminator::Default => write!(f, "default"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BranchCondition {
    pub site: BranchSite,
    pub constraint: Constraint,
    /// Side conditions accumulated since the previous committed branch, in order.
    pub supporting: Vec<Constraint>,
    pub discriminator: BranchDiscriminator,
}

/// Ordered branch decisions of one concrete execution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathCondition {
    conditions: Vec<BranchCondition>,
}

impl PathCondition {
    pub fn new(conditions: Vec<BranchCondition>) -> Self {
        PathCondition { conditions }
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BranchCondition> {
        self.conditions.iter()
    }

    pub fn branch_conditions(&self) -> &[BranchCondition] {
        &self.conditions
    }

    pub fn supporting_constraint_count(&self) -> usize {
        self.conditions.iter().map(|b| b.supporting.len()).sum()
    }

    /// Every constraint of the path, supporting ones before their branch.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.conditions
            .iter()
            .flat_map(|b| b.supporting.iter().chain(std::iter::once(&b.constraint)))
    }

    pub fn lookup_fmt(&self) -> String {
        let mut s = format!("{}\n", "🪶 PathCondition [".cyan());
        for (i, b) in self.conditions.iter().enumerate() {
            s += &format!(
                "  {} {} {} {}\n",
                format!("{:>3}.", i).bright_black(),
                b.site.to_string().magenta(),
                b.constraint.lookup_fmt(),
                format!("({})", b.discriminator).green()
            );
            for c in &b.supporting {
                s += &format!("        {} {}\n", "⛓️".cyan(), c.lookup_fmt());
            }
        }
        s += &format!("{}", "]".cyan());
        s
    }
}

impl<'a> IntoIterator for &'a PathCondition {
    type Item = &'a BranchCondition;
    type IntoIter = std::slice::Iter<'a, BranchCondition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.iter()
    }
}

impl fmt::Display for PathCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.conditions {
            writeln!(f, "{}: {} [{}]", b.site, b.constraint, b.discriminator)?;
            for c in &b.supporting {
                writeln!(f, "    where {}", c)?;
            }
        }
        Ok(())
    }
}

/// Accumulates supporting constraints and commits branch conditions.
#[derive(Clone, Debug)]
pub struct PathConditionCollector {
    pending: Vec<Constraint>,
    trace: Vec<BranchCondition>,
    normalize: bool,
}

impl PathConditionCollector {
    pub fn new(normalize: bool) -> Self {
        PathConditionCollector {
            pending: Vec::new(),
            trace: Vec::new(),
            normalize,
        }
    }

    fn prepare(&self, constraint: Constraint) -> Result<Constraint, NormalizationError> {
        if self.normalize {
            normalize(constraint)
        } else {
            Ok(constraint)
        }
    }

    /// Queues a side condition for the next committed branch. Fully concrete
    /// constraints are dropped.
    pub fn append_supporting(&mut self, constraint: Constraint) -> Result<(), NormalizationError> {
        if !constraint.contains_variable() {
            return Ok(());
        }
        let constraint = self.prepare(constraint)?;
        self.pending.push(constraint);
        Ok(())
    }

    /// Commits a branch condition together with the queued side conditions.
    /// Fully concrete constraints are dropped and leave the queue untouched.
    pub fn append_branch(
        &mut self,
        site: BranchSite,
        constraint: Constraint,
        discriminator: BranchDiscriminator,
    ) -> Result<(), NormalizationError> {
        if !constraint.contains_variable() {
            return Ok(());
        }
        let constraint = self.prepare(constraint)?;
        let supporting = std::mem::take(&mut self.pending);
        self.trace.push(BranchCondition {
            site,
            constraint,
            supporting,
            discriminator,
        });
        Ok(())
    }

    /// Side conditions recorded after the last committed branch.
    pub fn pending_supporting(&self) -> &[Constraint] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    pub fn path_condition(&self) -> PathCondition {
        PathCondition::new(self.trace.clone())
    }

    pub fn into_path_condition(self) -> PathCondition {
        PathCondition::new(self.trace)
    }
}
