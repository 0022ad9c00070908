//! Blocks and the references derived from them
//!
//! A [Block] is a configuration fragment addressed by a dotted path such as
//! `resource.aws_iam_user.peanut`. When rendered it is flattened into a nested
//! mapping, one level per path segment:
//!
//! ```
//! # use tfrender::block::Block;
//! let block = Block::new("resource.aws_iam_user.peanut").with("name", "peanut");
//! let flattened = tfrender::value::Value::Object(block.flatten());
//!
//! assert_eq!(
//!     flattened.to_json().unwrap(),
//!     serde_json::json!({"resource": {"aws_iam_user": {"peanut": {"name": "peanut"}}}})
//! );
//! ```
//!
//! Attributes of a block are never looked up. [Block::attr] builds a [Reference]
//! that the provisioning tool resolves later:
//!
//! | **block path**                  | **attribute** | **reference**                 |
//! |---------------------------------|---------------|-------------------------------|
//! | `resource.aws_iam_user.peanut`  | `arn`         | `${aws_iam_user.peanut.arn}`  |
//! | `variable.name`                 | `value`       | `${var.name.value}`           |
//! | `data.aws_caller_identity.me`   | `account_id`  | `${data.aws_caller_identity.me.account_id}` |
//! | `provider.aws` (`alias="east"`) | anything      | `${aws.east}`                 |
use crate::value::{Mapping, Value};

/// Textual handle for a value computed elsewhere
///
/// Displays as the interpolation syntax of the output format, `${path}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    path: String,
}

impl Reference {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The dotted path without interpolation markers
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reference one level deeper
    pub fn attr(&self, name: &str) -> Reference {
        Reference::new(format!("{}.{name}", self.path))
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${{{}}}", self.path)
    }
}

impl PartialEq<str> for Reference {
    fn eq(&self, other: &str) -> bool {
        other.len() == self.path.len() + 3
            && other.starts_with("${")
            && other.ends_with('}')
            && other[2..other.len() - 1] == self.path
    }
}

impl PartialEq<&str> for Reference {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<String> for Reference {
    fn eq(&self, other: &String) -> bool {
        self == other.as_str()
    }
}

/// Named configuration fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    path: String,
    body: Mapping,
}

impl Block {
    /// A block with an empty body
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_body(path, Mapping::new())
    }

    pub fn with_body(path: impl Into<String>, body: Mapping) -> Self {
        Self {
            path: path.into(),
            body,
        }
    }

    /// Set a body field, replacing an existing one of the same name
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Mapping {
        &self.body
    }

    /// Last segment of the path, e.g. `peanut` for `resource.aws_iam_user.peanut`
    pub fn label(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Nest the body under each segment of the path
    pub fn flatten(&self) -> Mapping {
        let mut segments = self.path.rsplit('.');
        let innermost = segments.next().unwrap_or(&self.path);

        let mut mapping =
            Mapping::from([(innermost.to_string(), Value::Object(self.body.clone()))]);
        for segment in segments {
            mapping = Mapping::from([(segment.to_string(), Value::Object(mapping))]);
        }

        mapping
    }

    /// Reference to an attribute of this block
    pub fn attr(&self, name: &str) -> Reference {
        match self.reference_root() {
            ReferenceRoot::Exact(path) => Reference::new(path),
            ReferenceRoot::Prefix(prefix) => Reference::new(format!("{prefix}.{name}")),
        }
    }

    /// How the provisioning tool addresses this block
    fn reference_root(&self) -> ReferenceRoot {
        let mut segments = self.path.splitn(2, '.');
        let category = segments.next().unwrap_or_default();
        let rest = segments.next();

        match (category, rest) {
            // resources are addressed without their category
            ("resource", Some(rest)) => ReferenceRoot::Prefix(rest.to_string()),
            ("variable", Some(rest)) => ReferenceRoot::Prefix(format!("var.{rest}")),
            ("provider", Some(rest)) => {
                let provider_type = rest.split('.').next().unwrap_or(rest);
                match self.body.get("alias").and_then(Value::as_str) {
                    Some(alias) if !alias.is_empty() => {
                        ReferenceRoot::Exact(format!("{provider_type}.{alias}"))
                    }
                    _ => ReferenceRoot::Exact(provider_type.to_string()),
                }
            }
            _ => ReferenceRoot::Prefix(self.path.clone()),
        }
    }
}

enum ReferenceRoot {
    /// Used as is, attribute names are not appended
    Exact(String),
    Prefix(String),
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flattened_json(block: &Block) -> serde_json::Value {
        Value::Object(block.flatten()).to_json().unwrap()
    }

    #[test]
    fn flatten_nests_one_level_per_segment() {
        let block = Block::new("resource.aws_iam_user.peanut").with("name", "peanut");
        assert_eq!(
            flattened_json(&block),
            serde_json::json!({"resource": {"aws_iam_user": {"peanut": {"name": "peanut"}}}})
        );
    }

    #[test]
    fn flatten_single_segment() {
        let block = Block::new("terraform").with("required_version", ">= 1.0");
        assert_eq!(
            flattened_json(&block),
            serde_json::json!({"terraform": {"required_version": ">= 1.0"}})
        );
    }

    #[test]
    fn resource_reference_drops_category() {
        let user = Block::new("resource.aws_iam_user.peanut");
        assert_eq!(user.attr("arn"), "${aws_iam_user.peanut.arn}");
        assert_eq!(user.attr("arn").to_string(), "${aws_iam_user.peanut.arn}");
    }

    #[test]
    fn variable_reference_uses_var() {
        let name = Block::new("variable.name");
        assert_eq!(name.attr("value"), "${var.name.value}");
    }

    #[test]
    fn other_categories_keep_their_path() {
        let me = Block::new("data.aws_caller_identity.me");
        assert_eq!(
            me.attr("account_id"),
            "${data.aws_caller_identity.me.account_id}"
        );
    }

    #[test]
    fn provider_reference() {
        let aws = Block::new("provider.aws").with("region", "eu-west-1");
        assert_eq!(aws.attr("anything"), "${aws}");

        let east = Block::new("provider.aws").with("alias", "east");
        assert_eq!(east.attr("region"), "${aws.east}");
        assert_eq!(east.attr("whatever"), "${aws.east}");
    }

    #[test]
    fn reference_chaining_does_not_mutate() {
        let group = Reference::new("aws_iam_group.dogs");
        let name = group.attr("name");
        let nested = name.attr("length");

        assert_eq!(group, "${aws_iam_group.dogs}");
        assert_eq!(name, "${aws_iam_group.dogs.name}");
        assert_eq!(nested, "${aws_iam_group.dogs.name.length}");
        assert!(group != "aws_iam_group.dogs");
    }

    #[test]
    fn label() {
        assert_eq!(Block::new("resource.aws_iam_group.dogs").label(), "dogs");
        assert_eq!(Block::new("terraform").label(), "terraform");
    }
}
