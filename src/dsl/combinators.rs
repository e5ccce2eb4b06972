use std::ops::{BitOr, Shr};

use crate::dsl::job::JobSpec;

/// A composed DSL value: a single job, or a `Serial`/`Parallel` composite of further
/// DSL values. Built with the `|` (parallel) and `>>` (serial) operators, or the
/// [`crate::dsl::serial`]/[`crate::dsl::parallel`] free functions.
///
/// The flattening rules on `|`/`>>` mirror the Python original's asymmetric
/// `__or__`/`__rshift__` overloads on `JobABC` vs. `Serial`/`Parallel`: composing a
/// bare job onto an existing composite of the *same* kind flattens into it, while
/// composing onto a composite of the *other* kind wraps both sides as siblings.
#[derive(Clone)]
pub enum Dsl {
    Leaf(JobSpec),
    Serial(Vec<Dsl>),
    Parallel(Vec<Dsl>),
}

impl Dsl {
    pub fn leaf(spec: JobSpec) -> Self {
        Dsl::Leaf(spec)
    }

    /// Opt a leaf job into result-saving. A no-op on composites, since `save_result`
    /// is a per-job property set before composition.
    pub fn save_result(self) -> Self {
        match self {
            Dsl::Leaf(spec) => Dsl::Leaf(spec.save_result(true)),
            other => other,
        }
    }

    /// Override a leaf job's join-wait timeout. A no-op on composites.
    pub fn timeout(self, timeout: std::time::Duration) -> Self {
        match self {
            Dsl::Leaf(spec) => Dsl::Leaf(spec.timeout(timeout)),
            other => other,
        }
    }
}

impl BitOr for Dsl {
    type Output = Dsl;

    /// Parallel composition (`|`).
    fn bitor(self, rhs: Dsl) -> Dsl {
        match (self, rhs) {
            (Dsl::Parallel(mut components), rhs) => {
                components.push(rhs);
                Dsl::Parallel(components)
            }
            (lhs, Dsl::Parallel(mut components)) if matches!(lhs, Dsl::Leaf(_)) => {
                components.insert(0, lhs);
                Dsl::Parallel(components)
            }
            (lhs, rhs) => Dsl::Parallel(vec![lhs, rhs]),
        }
    }
}

impl Shr for Dsl {
    type Output = Dsl;

    /// Serial composition (`>>`).
    fn shr(self, rhs: Dsl) -> Dsl {
        match (self, rhs) {
            (Dsl::Serial(mut components), rhs) => {
                components.push(rhs);
                Dsl::Serial(components)
            }
            (lhs, Dsl::Serial(mut components)) if matches!(lhs, Dsl::Leaf(_)) => {
                components.insert(0, lhs);
                Dsl::Serial(components)
            }
            (lhs, rhs) => Dsl::Serial(vec![lhs, rhs]),
        }
    }
}

/// Combine many DSL values into one `Parallel` composite, the non-operator
/// equivalent of folding `|` across `components`.
///
/// # Examples
/// ```
/// use dagflow::dsl::{job, parallel, Dsl};
/// use dagflow::dsl::job::TaskView;
///
/// let noop = |_: TaskView| async { Ok(serde_json::json!({})) };
/// let a = job("a", noop);
/// let b = job("b", noop);
/// let both = parallel(vec![a, b]).unwrap();
/// assert!(matches!(both, Dsl::Parallel(components) if components.len() == 2));
/// ```
pub fn parallel(components: Vec<Dsl>) -> anyhow::Result<Dsl> {
    fold(components, |acc, next| acc | next)
}

/// Combine many DSL values into one `Serial` composite, the non-operator equivalent
/// of folding `>>` across `components`.
pub fn serial(components: Vec<Dsl>) -> anyhow::Result<Dsl> {
    fold(components, |acc, next| acc >> next)
}

fn fold(mut components: Vec<Dsl>, op: impl Fn(Dsl, Dsl) -> Dsl) -> anyhow::Result<Dsl> {
    if components.is_empty() {
        anyhow::bail!("cannot compose an empty list of DSL components");
    }
    if components.len() == 1 {
        return Ok(components.remove(0));
    }
    let mut iter = components.into_iter();
    let first = iter.next().unwrap();
    Ok(iter.fold(first, op))
}
