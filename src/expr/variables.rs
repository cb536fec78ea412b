/// Coordinate names bound by the sampler before every evaluation.
pub const COORDINATE_NAMES: [&str; 3] = ["x", "y", "z"];

/// Named scalar variables, addressed by slot.
///
/// Slots are handed out in first-registration order and never move while the
/// variable exists, so compiled tokens can refer to a slot instead of a name.
/// Writing a value through [`set`](VariableStore::set) is visible to the next
/// evaluation without recompiling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableStore {
    names: Vec<String>,
    values: Vec<f64>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with `value` and returns its slot.
    ///
    /// If the name already exists the first registration wins: the existing
    /// slot is returned and its value is left untouched.
    pub fn add(&mut self, name: &str, value: f64) -> usize {
        if let Some(slot) = self.slot(name) {
            return slot;
        }
        self.names.push(name.to_string());
        self.values.push(value);
        self.names.len() - 1
    }

    /// Removes `name`. Returns `false` if it was not registered.
    ///
    /// Slots after the removed one shift down, so only use this on stores that
    /// no compiled expression refers to (e.g. a detached copy).
    pub fn remove(&mut self, name: &str) -> bool {
        match self.slot(name) {
            Some(slot) => {
                self.names.remove(slot);
                self.values.remove(slot);
                true
            }
            None => false,
        }
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.slot(name).map(|slot| self.values[slot])
    }

    /// Sets an existing variable. Returns `false` for unknown names.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.slot(name) {
            Some(slot) => {
                self.values[slot] = value;
                true
            }
            None => false,
        }
    }

    /// Sets every known name from `values` and returns how many were set.
    pub fn set_values<'a, I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        values
            .into_iter()
            .filter(|(name, value)| self.set(name, *value))
            .count()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Values indexed by slot.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every variable except the coordinates `x`, `y`, `z`.
    pub fn user_variables(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .zip(self.values.iter())
            .filter(|(name, _)| !COORDINATE_NAMES.contains(&name.as_str()))
            .map(|(name, value)| (name.as_str(), *value))
    }
}
