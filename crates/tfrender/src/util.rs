//! file naming conventions
use std::path::{Path, PathBuf};

const JSON_SUFFIX: &str = ".json";
const TFVARS_SUFFIX: &str = ".tfvars.json";
const AUTO_TFVARS_SUFFIX: &str = ".auto.tfvars.json";
const DEFAULT_TFVARS: &str = "terraform.tfvars.json";

/// Output file for a source path: the path with `.json` appended
///
/// `main.tf` becomes `main.tf.json`, `terraform.tfvars` becomes `terraform.tfvars.json`.
/// Paths that already end in `.json` are kept.
pub(crate) fn output_path_for(path: &Path) -> PathBuf {
    let mut output = path.as_os_str().to_owned();
    if !output.to_string_lossy().ends_with(JSON_SUFFIX) {
        output.push(JSON_SUFFIX);
    }
    PathBuf::from(output)
}

/// Final path component as a string, empty for paths without one
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether the output file is a variable definitions file (name → value data)
pub(crate) fn is_tfvars(output_name: &str) -> bool {
    output_name.ends_with(TFVARS_SUFFIX)
}

/// Whether the provisioning tool loads the variable definitions file without being told to
///
/// Only these files are a source of values while rendering.
pub(crate) fn is_auto_loaded_tfvars(output_name: &str) -> bool {
    output_name == DEFAULT_TFVARS || output_name.ends_with(AUTO_TFVARS_SUFFIX)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_paths() {
        assert_eq!(output_path_for(Path::new("main.tf")), PathBuf::from("main.tf.json"));
        assert_eq!(
            output_path_for(Path::new("iam/terraform.tfvars")),
            PathBuf::from("iam/terraform.tfvars.json")
        );
        assert_eq!(output_path_for(Path::new("x.tf.json")), PathBuf::from("x.tf.json"));
    }

    #[test]
    fn tfvars() {
        assert!(is_tfvars("terraform.tfvars.json"));
        assert!(is_tfvars("dev.auto.tfvars.json"));
        assert!(!is_tfvars("main.tf.json"));
        assert!(!is_tfvars("terraform.tfvars"));
    }

    #[test]
    fn auto_loaded_tfvars() {
        assert!(is_auto_loaded_tfvars("terraform.tfvars.json"));
        assert!(is_auto_loaded_tfvars("dev.auto.tfvars.json"));
        assert!(!is_auto_loaded_tfvars("dev.tfvars.json"));
        assert!(!is_auto_loaded_tfvars("my-terraform.tfvars.json"));
        assert!(!is_auto_loaded_tfvars("main.tf.json"));
    }
}
