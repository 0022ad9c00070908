//! visitor pattern helpers
mod visit_values;
pub use visit_values::VisitValues;

/// Visitor that looks at its subjects along with where they were found
pub trait Visit<T> {
    fn visit(&mut self, location: &Location, value: &T);
}

// blanket impl for FnMut
impl<T, F> Visit<T> for F
where
    F: FnMut(&Location, &T),
{
    fn visit(&mut self, location: &Location, value: &T) {
        self(location, value)
    }
}

/// Position of a visited value, as a list of keys and indices
///
/// Displayed dot separated, e.g. `main.tf.json.0.resource.aws_iam_user`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Location(Vec<String>);

impl Location {
    pub fn push(&mut self, segment: impl ToString) {
        self.0.push(segment.to_string());
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("."))
    }
}
