//! Per-level rendering prompt templates
//!
//! Code and documentation files get different instruction sets; both are
//! keyed by compression level. Templates carry a `{code}` placeholder.

use std::path::Path;

use crate::domain::CompressionLevel;

/// Extensions treated as documentation rather than code
const DOC_EXTENSIONS: &[&str] = &[
    "md", "markdown", "rst", "txt", "adoc", "asciidoc", "org", "pod",
];

/// True when the file should use the documentation prompt set
pub fn is_doc_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| DOC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Prompt template for `path` at `level`, or `None` when the level needs
/// no rendering call at all
pub fn template_for(path: &Path, level: CompressionLevel) -> Option<&'static str> {
    if level == CompressionLevel::None {
        return None;
    }
    Some(if is_doc_file(path) {
        doc_template(level)
    } else {
        code_template(level)
    })
}

/// Fill `{code}` in a template
pub fn fill(template: &str, code: &str) -> String {
    template.replace("{code}", code)
}

fn code_template(level: CompressionLevel) -> &'static str {
    match level {
        CompressionLevel::None => "{code}",

        CompressionLevel::Trim => {
            "Compress the following code by 5%. The output MUST be shorter than the input.\n\n\
             Remove ONLY:\n\
             - Import statements\n\
             - ALL blank lines and excessive whitespace\n\
             - Commented-out code (code that is commented out, NOT regular comments)\n\
             - print/debug statements\n\n\
             KEEP:\n\
             - ALL regular comments (explanatory comments, TODOs, warnings)\n\
             - ALL docstrings\n\
             - ALL actual code\n\
             - Function and class definitions unchanged\n\n\
             Respond only with the compressed code, no additional text.\n{code}"
        }

        CompressionLevel::Light => {
            "Compress the following code by 15%. The output MUST be 85% of the original size.\n\n\
             Remove:\n\
             - Import statements and other non-critical information at the top of the file\n\
             - ALL logging statements (unless they log errors or critical events)\n\
             - ALL blank lines and excessive whitespace\n\
             - ALL commented-out code\n\
             - ALL redundant comments (keep only critical warnings/security notes)\n\
             - ALL docstrings except those documenting complex algorithms\n\n\
             Try to keep in original form:\n\
             - All function and class definitions\n\
             - All actual implementation code\n\
             - Critical comments (security warnings, complex algorithm explanations)\n\
             - Business logic and core functionality\n\n\
             Respond only with the compressed code, no additional text.\n{code}"
        }

        CompressionLevel::Medium => {
            "Compress the following code by 50%. The output MUST be approximately half the size.\n\n\
             Remove:\n\
             - Import statements and other non-critical information at the top of the file\n\
             - ALL logging statements (unless they log errors or critical events)\n\
             - ALL blank lines and excessive whitespace\n\
             - ALL commented-out code\n\
             - ALL redundant comments (keep only critical warnings/security notes)\n\
             - ALL docstrings except those documenting complex algorithms\n\
             - All getter/setter methods\n\n\
             Then REPLACE:\n\
             - Trivial one-liner functions -> just the function signature\n\
             - Functions longer than 10 lines that aren't complex -> replace the body with one \
             to three lines describing what it does\n\n\
             Try to keep as actual code:\n\
             - Complex algorithms or business logic\n\
             - Critical operations such as external calls and state changes\n\
             - Security/auth checks\n\
             - Non-obvious implementations\n\n\
             Respond only with the compressed code, no additional text.\n{code}"
        }

        CompressionLevel::Heavy => {
            "Compress the following code by 90%. The output MUST be 10% of original size.\n\n\
             Replace the ENTIRE file with:\n\
             - A summary at the top of the file's purpose and functionality\n\
             - List of key functions/classes with signatures, with one to three line \
             descriptions for non-obvious or complex functions\n\
             - When possible, preserve actual code for important or complex logic\n\n\
             Respond only with the compressed code, no additional text.\n{code}"
        }

        CompressionLevel::Max => {
            "Summarize the following code in one to three sentences.\n\
             Respond only with the summary, no additional text.\n{code}"
        }
    }
}

fn doc_template(level: CompressionLevel) -> &'static str {
    match level {
        CompressionLevel::None => "{code}",
        CompressionLevel::Trim => doc_percent_template(5),
        CompressionLevel::Light => doc_percent_template(15),
        CompressionLevel::Medium => doc_percent_template(50),
        CompressionLevel::Heavy => doc_percent_template(90),
        CompressionLevel::Max => {
            "Summarize the following documentation in one to three sentences, capturing its \
             main purpose and key points.\n\
             Respond only with the summary, no additional text.\n{code}"
        }
    }
}

fn doc_percent_template(percent: u8) -> &'static str {
    // Static variants so templates stay &'static
    match percent {
        5 => {
            "Compress the following documentation by 5%.\n\n\
             Start by removing whitespace, then eliminate redundant statements or contents. \
             Then summarize less important details, retaining as much detail about the \
             critical points as possible.\n\n\
             Respond only with the compressed documentation, no additional text.\n{code}"
        }
        15 => {
            "Compress the following documentation by 15%.\n\n\
             Start by removing whitespace, then eliminate redundant statements or contents. \
             Then summarize less important details, retaining as much detail about the \
             critical points as possible.\n\n\
             Respond only with the compressed documentation, no additional text.\n{code}"
        }
        50 => {
            "Compress the following documentation by 50%.\n\n\
             Start by removing whitespace, then eliminate redundant statements or contents. \
             Then summarize less important details, retaining as much detail about the \
             critical points as possible.\n\n\
             Respond only with the compressed documentation, no additional text.\n{code}"
        }
        _ => {
            "Compress the following documentation by 90%.\n\n\
             Start by removing whitespace, then eliminate redundant statements or contents. \
             Then summarize less important details, retaining as much detail about the \
             critical points as possible.\n\n\
             Respond only with the compressed documentation, no additional text.\n{code}"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_detection() {
        assert!(is_doc_file(Path::new("README.md")));
        assert!(is_doc_file(Path::new("docs/guide.RST")));
        assert!(!is_doc_file(Path::new("src/main.rs")));
        assert!(!is_doc_file(Path::new("Makefile")));
    }

    #[test]
    fn test_none_level_has_no_template() {
        assert!(template_for(Path::new("a.rs"), CompressionLevel::None).is_none());
    }

    #[test]
    fn test_every_compressing_level_has_a_template() {
        for level in CompressionLevel::ALL.iter().skip(1) {
            let code = template_for(Path::new("a.rs"), *level).unwrap();
            assert!(code.contains("{code}"));
            let doc = template_for(Path::new("a.md"), *level).unwrap();
            assert!(doc.contains("{code}"));
        }
    }

    #[test]
    fn test_fill_substitutes_content() {
        let template = template_for(Path::new("a.rs"), CompressionLevel::Max).unwrap();
        let filled = fill(template, "fn main() {}");
        assert!(filled.contains("fn main() {}"));
        assert!(!filled.contains("{code}"));
    }
}
