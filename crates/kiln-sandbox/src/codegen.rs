// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt rendering and extraction of files from generator output.
//!
//! Generators are asked for a strict format: one `### <filename>` header per
//! file, each followed by a fenced code block. Output that ignores the
//! headers is treated as a single file named after its fence language.

use std::sync::LazyLock;

use kiln_core::{CodePrompt, CodeRequest};
use regex::Regex;

use crate::workspace::{GeneratedFile, sanitize_filename};

/// System prompt carrying the output-format contract.
pub const CODING_SYSTEM_PROMPT: &str = "\
You are an expert software engineer who turns a task description into complete, runnable code files.

OUTPUT FORMAT (strict):
1. Start every file with a header line `### <filename.ext>`.
2. Follow each header immediately with one fenced code block.
3. Do not bold filenames and do not wrap the whole response in a single code block.
4. No conversational text before, between or after the files.

### main.py
```python
def main() -> None:
    print(\"hello\")


if __name__ == \"__main__\":
    main()
```

Guidelines:
- Put every file the task needs in this one response.
- Always provide an entry point named main.<ext> that can be run directly.
- Validate inputs and handle errors; print results to standard output.";

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*###[ \t]+([\w\-./]+)").expect("header pattern is valid")
});

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([\w+-]*)[ \t]*\r?\n?(.*?)```")
        .expect("fence pattern is valid")
});

static FENCE_LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([\w+-]+)").expect("lang pattern is valid"));

static REQUESTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[\w\-/]+\.(?:py|js|ts|tsx|jsx|html|css|go|java|json|yaml|yml|md|sh|rb|php)\b")
        .expect("filename pattern is valid")
});

/// Files extracted from one generator response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub files: Vec<GeneratedFile>,
    pub warnings: Vec<String>,
}

impl ParsedOutput {
    /// Index of the entry file: `main.*` if present, else the first file.
    pub fn entry_index(&self) -> usize {
        self.files
            .iter()
            .position(|f| f.name.split('.').next() == Some("main"))
            .unwrap_or(0)
    }
}

/// Builds the generator prompt for a code request.
///
/// Repair requests carry the previous code and the captured error.
pub fn render_prompt(request: &CodeRequest) -> CodePrompt {
    let mut user = String::new();
    user.push_str("Task:\n");
    user.push_str(request.instruction.trim());
    user.push('\n');

    if !request.context.is_empty() {
        user.push_str("\nContext gathered from tools:\n");
        for observation in &request.context {
            user.push_str("- ");
            user.push_str(observation);
            user.push('\n');
        }
    }

    if let (Some(code), Some(error)) = (&request.previous_code, &request.previous_error) {
        user.push_str(&format!(
            "\nAttempt {} failed. Previous code:\n```\n{}\n```\n\nCaptured error:\n```\n{}\n```\n\
             Fix the error and return the complete corrected files in the same format.\n",
            request.attempt,
            code.trim_end(),
            error.trim_end()
        ));
    }

    CodePrompt {
        system: CODING_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Parses generator output into files plus format warnings.
pub fn parse_output(raw: &str, requested: &[String]) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    let headers: Vec<_> = HEADER_RE.captures_iter(raw).collect();

    if headers.is_empty() {
        let language = fence_language(raw).unwrap_or_default();
        parsed.files.push(GeneratedFile {
            name: default_filename(&language),
            language,
            code: strip_markdown(raw),
        });
    } else {
        for (i, caps) in headers.iter().enumerate() {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(raw.len(), |m| m.start());
            let block = &raw[whole.end()..end];
            let code = strip_markdown(block);
            if code.is_empty() {
                parsed
                    .warnings
                    .push(format!("file {} has no content", name.as_str()));
                continue;
            }

            let Some(file_name) = sanitize_filename(name.as_str()) else {
                parsed
                    .warnings
                    .push(format!("unusable filename {:?}", name.as_str()));
                continue;
            };
            if file_name != name.as_str() {
                parsed.warnings.push(format!(
                    "filename {} reduced to {file_name}",
                    name.as_str()
                ));
            }
            if parsed.files.iter().any(|f| f.name == file_name) {
                parsed
                    .warnings
                    .push(format!("duplicate file {file_name} ignored"));
                continue;
            }

            let language = fence_language(block).unwrap_or_else(|| extension_of(&file_name));
            parsed.files.push(GeneratedFile {
                name: file_name,
                language,
                code,
            });
        }
        if parsed.files.is_empty() {
            parsed.files.push(GeneratedFile {
                name: "main.txt".to_string(),
                language: String::new(),
                code: strip_markdown(raw),
            });
        }
    }

    check_format(&mut parsed, requested);
    parsed
}

/// Filenames explicitly mentioned in a request.
pub fn requested_filenames(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for m in REQUESTED_RE.find_iter(text) {
        if let Some(name) = sanitize_filename(m.as_str()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// `main.<ext>` for a fence language; `main.txt` when unknown.
pub fn default_filename(language: &str) -> String {
    format!("main.{}", language_extension(language))
}

pub fn language_extension(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "python" | "py" => "py",
        "typescript" | "ts" => "ts",
        "tsx" => "tsx",
        "javascript" | "js" | "node" => "js",
        "jsx" => "jsx",
        "go" | "golang" => "go",
        "java" => "java",
        "c" => "c",
        "cpp" | "cxx" | "c++" => "cpp",
        "cs" | "csharp" => "cs",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "bash" | "shell" | "sh" => "sh",
        "ruby" | "rb" => "rb",
        "php" => "php",
        "json" => "json",
        "yaml" => "yaml",
        "yml" => "yml",
        "markdown" | "md" => "md",
        _ => "txt",
    }
}

fn check_format(parsed: &mut ParsedOutput, requested: &[String]) {
    for file in &parsed.files {
        if file.code.contains("```") {
            parsed
                .warnings
                .push(format!("leftover markdown fence in {}", file.name));
        }
    }
    let missing: Vec<&str> = requested
        .iter()
        .filter(|name| !parsed.files.iter().any(|f| &f.name == *name))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        parsed
            .warnings
            .push(format!("missing requested files: {}", missing.join(", ")));
    }
}

fn strip_markdown(text: &str) -> String {
    let blocks: Vec<&str> = FENCE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str().trim())
        .filter(|block| !block.is_empty())
        .collect();
    if !blocks.is_empty() {
        return blocks.join("\n\n");
    }

    // Unterminated fence: drop fence lines and keep the rest.
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn fence_language(text: &str) -> Option<String> {
    FENCE_LANG_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_file_output_is_split_on_headers() {
        let raw = "Sure!\n### main.py\n```python\nfrom util import add\nprint(add(1, 2))\n```\n\n### util.py\n```python\ndef add(a, b):\n    return a + b\n```\n";
        let parsed = parse_output(raw, &[]);
        assert_eq!(parsed.files.len(), 2);
        assert_eq!(parsed.files[0].name, "main.py");
        assert_eq!(parsed.files[0].language, "python");
        assert_eq!(parsed.files[0].code, "from util import add\nprint(add(1, 2))");
        assert_eq!(parsed.files[1].code, "def add(a, b):\n    return a + b");
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.entry_index(), 0);
    }

    #[test]
    fn headerless_output_uses_fence_language() {
        let parsed = parse_output("```bash\necho hi\n```", &[]);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].name, "main.sh");
        assert_eq!(parsed.files[0].code, "echo hi");
    }

    #[test]
    fn unknown_language_falls_back_to_txt() {
        let parsed = parse_output("just some prose", &[]);
        assert_eq!(parsed.files[0].name, "main.txt");
        assert_eq!(parsed.files[0].code, "just some prose");
    }

    #[test]
    fn entry_prefers_main() {
        let raw = "### util.sh\n```bash\nX=1\n```\n### main.sh\n```bash\necho main\n```";
        let parsed = parse_output(raw, &[]);
        assert_eq!(parsed.entry_index(), 1);
    }

    #[test]
    fn nested_paths_are_flattened_with_warning() {
        let raw = "### ../../etc/cron.sh\n```bash\necho pwned\n```";
        let parsed = parse_output(raw, &[]);
        assert_eq!(parsed.files[0].name, "cron.sh");
        assert!(parsed.warnings.iter().any(|w| w.contains("reduced to cron.sh")));
    }

    #[test]
    fn missing_requested_files_are_reported() {
        let requested = requested_filenames("Create main.py and helpers.py please");
        assert_eq!(requested, vec!["main.py", "helpers.py"]);
        let parsed = parse_output("### main.py\n```python\nprint(1)\n```", &requested);
        assert_eq!(parsed.warnings, vec!["missing requested files: helpers.py"]);
    }

    #[test]
    fn unterminated_fence_is_stripped() {
        let parsed = parse_output("### main.py\n```python\nprint(1)\n", &[]);
        assert_eq!(parsed.files[0].code, "print(1)");
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn repair_prompt_includes_previous_code_and_error() {
        let mut request = CodeRequest::new("print the first 10 fibonacci numbers");
        request.context.push("fib(n=10) -> [0, 1, 1]".into());
        request.previous_code = Some("print(1 + '1')".into());
        request.previous_error = Some("TypeError: unsupported operand".into());
        request.attempt = 1;

        let prompt = render_prompt(&request);
        assert_eq!(prompt.system, CODING_SYSTEM_PROMPT);
        assert!(prompt.user.contains("print the first 10 fibonacci numbers"));
        assert!(prompt.user.contains("fib(n=10)"));
        assert!(prompt.user.contains("print(1 + '1')"));
        assert!(prompt.user.contains("unsupported operand"));
        assert!(prompt.user.contains("Attempt 1 failed"));
    }

    #[test]
    fn first_prompt_has_no_repair_section() {
        let prompt = render_prompt(&CodeRequest::new("say hi"));
        assert!(!prompt.user.contains("Captured error"));
    }
}
