use crate::{Result, TraversalError};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MemoryValue {
    Bool(bool),
    Long(i64),
    Double(f64),
}

impl MemoryValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MemoryValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MemoryValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MemoryValue::Long(l) => Some(*l as f64),
            MemoryValue::Double(d) => Some(*d),
            MemoryValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::Bool(b) => write!(f, "{}", b),
            MemoryValue::Long(l) => write!(f, "{}", l),
            MemoryValue::Double(d) => write!(f, "{}", d),
        }
    }
}

/// Commutative, associative fold used to combine contributions to a memory
/// key. Contributions arrive from many vertices in no particular order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reducer {
    And,
    Or,
    Sum,
    Min,
    Max,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::And => "and",
            Reducer::Or => "or",
            Reducer::Sum => "sum",
            Reducer::Min => "min",
            Reducer::Max => "max",
        };
        f.write_str(name)
    }
}

impl Reducer {
    pub fn apply(&self, key: &str, a: MemoryValue, b: MemoryValue) -> Result<MemoryValue> {
        use MemoryValue::*;

        self.check(key, a)?;
        self.check(key, b)?;

        let value = match (self, a, b) {
            (Reducer::And, Bool(a), Bool(b)) => Bool(a && b),
            (Reducer::Or, Bool(a), Bool(b)) => Bool(a || b),
            (Reducer::Sum, Long(a), Long(b)) => Long(
                a.checked_add(b)
                    .ok_or_else(|| TraversalError::Overflow(key.to_string()))?,
            ),
            (Reducer::Min, Long(a), Long(b)) => Long(a.min(b)),
            (Reducer::Max, Long(a), Long(b)) => Long(a.max(b)),
            _ => {
                // Mixed numeric operands widen to double.
                let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                Double(match self {
                    Reducer::Sum => a + b,
                    Reducer::Min => a.min(b),
                    _ => a.max(b),
                })
            }
        };

        Ok(value)
    }

    /// Rejects values this reducer cannot fold.
    pub fn check(&self, key: &str, value: MemoryValue) -> Result<()> {
        let accepted = match self {
            Reducer::And | Reducer::Or => matches!(value, MemoryValue::Bool(_)),
            Reducer::Sum | Reducer::Min | Reducer::Max => !matches!(value, MemoryValue::Bool(_)),
        };

        if accepted {
            Ok(())
        } else {
            Err(TraversalError::MemoryTypeMismatch {
                key: key.to_string(),
                reducer: self.to_string(),
                found: format!("{:?}", value),
            })
        }
    }
}

/// A memory key a program asks the host to maintain across supersteps.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryKey {
    pub name: String,
    pub reducer: Reducer,
    pub initial: MemoryValue,
}

impl MemoryKey {
    pub fn new(name: impl Into<String>, reducer: Reducer, initial: MemoryValue) -> Self {
        MemoryKey {
            name: name.into(),
            reducer,
            initial,
        }
    }
}

/// Computation-wide state visible to vertex programs.
pub trait Memory {
    fn get(&self, key: &str) -> Option<MemoryValue>;

    fn set(&mut self, key: &str, value: MemoryValue) -> Result<()>;

    /// Folds `value` into `key` with the key's declared reducer.
    fn reduce(&mut self, key: &str, value: MemoryValue) -> Result<()>;

    fn and(&mut self, key: &str, value: bool) -> Result<()> {
        self.reduce(key, MemoryValue::Bool(value))
    }

    fn iteration(&self) -> u64;

    fn is_initial_iteration(&self) -> bool {
        self.iteration() == 0
    }
}

/// Master-owned memory. Between supersteps it is the single source of truth;
/// during a superstep each worker folds into its own [`WorkerMemory`] and the
/// partials are absorbed at the barrier.
#[derive(Debug, Default)]
pub struct GlobalMemory {
    reducers: Arc<HashMap<String, Reducer>>,
    values: HashMap<String, MemoryValue>,
    iteration: u64,
}

impl GlobalMemory {
    pub fn new(keys: Vec<MemoryKey>) -> Result<Self> {
        let mut reducers = HashMap::new();
        let mut values = HashMap::new();

        for key in keys {
            if reducers.insert(key.name.clone(), key.reducer).is_some() {
                return Err(TraversalError::DuplicateKey(key.name));
            }
            values.insert(key.name, key.initial);
        }

        Ok(GlobalMemory {
            reducers: Arc::new(reducers),
            values,
            iteration: 0,
        })
    }

    pub(crate) fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    /// A worker-side view frozen at the current superstep.
    pub(crate) fn worker_view(&self) -> WorkerMemory {
        WorkerMemory {
            snapshot: Arc::new(self.values.clone()),
            reducers: Arc::clone(&self.reducers),
            partials: HashMap::new(),
            iteration: self.iteration,
        }
    }

    pub(crate) fn absorb(&mut self, worker: WorkerMemory) -> Result<()> {
        for (key, partial) in worker.partials {
            self.reduce(&key, partial)?;
        }
        Ok(())
    }

    fn reducer(&self, key: &str) -> Result<Reducer> {
        self.reducers
            .get(key)
            .copied()
            .ok_or_else(|| TraversalError::UnknownMemoryKey(key.to_string()))
    }
}

impl Memory for GlobalMemory {
    fn get(&self, key: &str) -> Option<MemoryValue> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: MemoryValue) -> Result<()> {
        self.reducer(key)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn reduce(&mut self, key: &str, value: MemoryValue) -> Result<()> {
        let reducer = self.reducer(key)?;
        let folded = match self.values.get(key) {
            Some(current) => reducer.apply(key, *current, value)?,
            None => value,
        };
        self.values.insert(key.to_string(), folded);
        Ok(())
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }
}

/// Per-worker memory for one superstep. Reads see the values as of the start
/// of the superstep; writes are folded locally and never observed by other
/// vertices until the barrier.
#[derive(Debug)]
pub struct WorkerMemory {
    snapshot: Arc<HashMap<String, MemoryValue>>,
    reducers: Arc<HashMap<String, Reducer>>,
    partials: HashMap<String, MemoryValue>,
    iteration: u64,
}

impl Memory for WorkerMemory {
    fn get(&self, key: &str) -> Option<MemoryValue> {
        self.snapshot.get(key).copied()
    }

    /// Vertices never overwrite shared memory; a write is a fold.
    fn set(&mut self, key: &str, value: MemoryValue) -> Result<()> {
        self.reduce(key, value)
    }

    fn reduce(&mut self, key: &str, value: MemoryValue) -> Result<()> {
        let reducer = self
            .reducers
            .get(key)
            .copied()
            .ok_or_else(|| TraversalError::UnknownMemoryKey(key.to_string()))?;

        let folded = match self.partials.get(key) {
            Some(current) => reducer.apply(key, *current, value)?,
            None => {
                reducer.check(key, value)?;
                value
            }
        };
        self.partials.insert(key.to_string(), folded);
        Ok(())
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }
}
