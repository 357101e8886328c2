use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

static SIGNATURE_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"(\w+)\((.*?)\)").expect("SIGNATURE_REGEX is a valid regex pattern")
});

/// Python buffers still carrying `pass` below this many lines count as untouched.
const MIN_PYTHON_LINES: usize = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    Java,
}

/// A function signature split into its callable name and parameter list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

impl Signature {
    pub fn parse(signature: &str) -> AppResult<Self> {
        let captures = SIGNATURE_REGEX.captures(signature).ok_or_else(|| {
            AppError::ValidationError(format!("Cannot parse function signature '{}'", signature))
        })?;

        let params = captures[2]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            name: captures[1].to_string(),
            params,
        })
    }
}

impl Language {
    /// Runtime name understood by the execution service.
    pub fn runtime(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Language::Python => "3.10.0",
            Language::Java => "15.0.2",
        }
    }

    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            Language::Python => None,
            Language::Java => Some("Main.java"),
        }
    }

    /// Lines the harness places above the attendee's code.
    pub fn harness_line_offset(&self) -> u32 {
        match self {
            Language::Python => 0,
            Language::Java => 1,
        }
    }

    pub fn starter_template(&self, function_signature: &str) -> String {
        match self {
            Language::Python => format!(
                "def {}:\n    # Write your solution here\n    pass",
                function_signature
            ),
            Language::Java => format!(
                "public static Object {} {{\n    // Write your solution here\n}}",
                function_signature
            ),
        }
    }

    /// True when `code` is empty, still the starter template, or an obvious stub.
    pub fn is_untouched(&self, code: &str, function_signature: &str) -> bool {
        let trimmed = code.trim();
        if trimmed.is_empty() || trimmed == self.starter_template(function_signature).trim() {
            return true;
        }

        match self {
            Language::Python => {
                trimmed.contains("pass") && trimmed.lines().count() < MIN_PYTHON_LINES
            }
            Language::Java => {
                strip_comments_and_whitespace(trimmed)
                    == strip_comments_and_whitespace(&self.starter_template(function_signature))
            }
        }
    }

    /// Embeds the attendee's function in a program that calls it with the
    /// literal test input and prints the result.
    pub fn build_harness(&self, code: &str, function_signature: &str, input: &str) -> AppResult<String> {
        let signature = Signature::parse(function_signature)?;
        let args = input
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(", ");

        let source = match self {
            Language::Python => format!(
                "{code}\n\n\nif __name__ == \"__main__\":\n    print({name}({args}))\n",
                code = code,
                name = signature.name,
                args = args
            ),
            Language::Java => format!(
                "public class Main {{\n{code}\n\n    public static void main(String[] args) {{\n        System.out.println({name}({args}));\n    }}\n}}\n",
                code = code,
                name = signature.name,
                args = args
            ),
        };

        Ok(source)
    }
}

/// Drops `//` line comments and all whitespace so stubs compare equal to the template.
fn strip_comments_and_whitespace(code: &str) -> String {
    code.lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect()
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.runtime())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            other => Err(AppError::ValidationError(format!(
                "Unsupported language '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_parse_extracts_name_and_params() {
        let sig = Signature::parse("add(a, b)").expect("signature should parse");
        assert_eq!(sig.name, "add");
        assert_eq!(sig.params, vec!["a".to_string(), "b".to_string()]);

        let sig = Signature::parse("int twice(int x)").expect("typed signature should parse");
        assert_eq!(sig.name, "twice");
        assert_eq!(sig.params, vec!["int x".to_string()]);
    }

    #[test]
    fn signature_parse_rejects_missing_parentheses() {
        let err = Signature::parse("add").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn starter_templates_embed_signature() {
        let py = Language::Python.starter_template("add(a, b)");
        assert!(py.starts_with("def add(a, b):"));
        assert!(py.ends_with("pass"));

        let java = Language::Java.starter_template("add(int a, int b)");
        assert!(java.starts_with("public static Object add(int a, int b) {"));
    }

    #[test]
    fn java_stub_without_comment_is_untouched() {
        let sig = "add(int a, int b)";
        assert!(Language::Java.is_untouched("public static Object add(int a, int b) {\n}", sig));
        assert!(Language::Java.is_untouched(
            "public static Object add(int a, int b)\n{\n    // TODO\n\n}",
            sig
        ));
        assert!(!Language::Java.is_untouched(
            "public static Object add(int a, int b) {\n    return a + b;\n}",
            sig
        ));
    }

    #[test]
    fn untouched_detection() {
        let sig = "add(a, b)";
        let template = Language::Python.starter_template(sig);
        assert!(Language::Python.is_untouched(&template, sig));
        assert!(Language::Python.is_untouched("   \n", sig));
        assert!(Language::Python.is_untouched("def add(a, b):\n    pass", sig));
        assert!(!Language::Python.is_untouched("def add(a, b):\n    return a + b", sig));

        let java_template = Language::Java.starter_template(sig);
        assert!(Language::Java.is_untouched(&java_template, sig));
        assert!(!Language::Java.is_untouched(
            "public static Object add(int a, int b) { return a + b; }",
            sig
        ));
    }

    #[test]
    fn python_harness_calls_function_with_literal_arguments() {
        let source = Language::Python
            .build_harness("def add(a, b):\n    return a + b", "add(a, b)", "1 ,2")
            .expect("harness should build");

        assert!(source.starts_with("def add(a, b):"));
        assert!(source.contains("print(add(1, 2))"));
    }

    #[test]
    fn java_harness_wraps_code_in_main_class() {
        let source = Language::Java
            .build_harness(
                "public static Object add(int a, int b) { return a + b; }",
                "add(int a, int b)",
                "3, 4",
            )
            .expect("harness should build");

        assert!(source.starts_with("public class Main {\npublic static Object add"));
        assert!(source.contains("System.out.println(add(3, 4));"));
    }

    #[test]
    fn language_parses_and_displays() {
        assert_eq!("Python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("java".parse::<Language>().unwrap(), Language::Java);
        assert!("cobol".parse::<Language>().is_err());
        assert_eq!(Language::Java.to_string(), "java");
        assert_eq!(Language::Java.file_name(), Some("Main.java"));
    }
}
