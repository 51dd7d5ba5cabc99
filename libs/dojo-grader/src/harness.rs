//! Harness Generator
//!
//! Appends a call to the user's function and prints its result so the
//! execution service's stdout carries exactly one comparable line.
//!
//! **Argument conventions differ per language:**
//! - python: `input` is a raw argument expression (`"2, 7"`) placed inside
//!   the call parentheses; the result is printed with `print`.
//! - javascript / typescript: `input` is a JSON array literal (`"[2, 7]"`)
//!   spread into positional arguments; the result is printed as JSON.
//!
//! Exceptions are not caught, so the runtime reports them on stderr.

use dojo_common::types::{Language, UnsupportedLanguage};

pub fn build_harness(user_code: &str, language: Language, function_name: &str, input: &str) -> String {
    match language {
        Language::Python => format!("{user_code}\n\nprint({function_name}({input}))"),
        Language::JavaScript | Language::TypeScript => {
            format!("{user_code}\n\nconsole.log(JSON.stringify({function_name}(...{input})))")
        }
    }
}

/// [`build_harness`] for a language given by its configured name.
pub fn build_harness_named(
    user_code: &str,
    language: &str,
    function_name: &str,
    input: &str,
) -> Result<String, UnsupportedLanguage> {
    let language = language.parse::<Language>()?;
    Ok(build_harness(user_code, language, function_name, input))
}
