use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

// Only the crate's own sources are policed.
const SOURCE_DIRS: [&str; 4] = ["diagnose", "dataset", "cli", "tests"];

// One source-policy rule: a line regex plus the message shown when it matches.
struct Rule {
    name: &'static str,
    pattern: &'static str,
    advice: &'static str,
    skip: fn(&str) -> bool,
}

const RULES: [Rule; 3] = [
    Rule {
        name: "underscore-prefixed variables",
        pattern: r"\b(_[a-zA-Z0-9_]+)\b",
        advice: "Underscore-prefixed variable names are not allowed in this project.\n   \
                 Either use the variable (removing the underscore) or remove it completely.",
        skip: is_comment_or_string_match,
    },
    Rule {
        name: "forbidden comment patterns",
        pattern: r"(//|/\*|///).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE|\*\*)",
        advice: "Comments describing edits ('FIX', 'NEW', 'CHANGED', 'UPDATED', ...) are not allowed.\n   \
                 Neither is '**' in comments. Remove them rather than commenting them out.",
        skip: is_markdown_in_doc_comment,
    },
    Rule {
        name: "#[allow(dead_code)] attributes",
        pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
        advice: "#[allow(dead_code)] attributes are STRICTLY FORBIDDEN in this project.\n   \
                 Either use the code (removing the attribute) or remove it completely.",
        skip: never_skip,
    },
];

// Collects every offending line of one file so the report shows them all at once.
struct ViolationCollector {
    violations: Vec<String>,
    file_path: PathBuf,
    skip: fn(&str) -> bool,
}

impl ViolationCollector {
    fn new(file_path: &Path, skip: fn(&str) -> bool) -> Self {
        Self {
            violations: Vec::new(),
            file_path: file_path.to_path_buf(),
            skip,
        }
    }

    fn check_and_get_error_message(&self, rule: &Rule) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let file_name = self.file_path.to_str().unwrap_or("?");
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            rule.name,
            file_name
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        error_msg.push_str(&format!("\n⚠️ {}\n", rule.advice));
        Some(error_msg)
    }
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();

        if !(self.skip)(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn is_comment_or_string_match(line_text: &str) -> bool {
    if line_text.trim_start().starts_with("//") {
        return true;
    }
    // Odd-numbered pieces of a quote split are inside string literals.
    line_text
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'))
}

fn is_markdown_in_doc_comment(line_text: &str) -> bool {
    let trimmed = line_text.trim_start();
    let is_doc = trimmed.starts_with("///") || trimmed.starts_with("//!");
    let has_edit_word = [
        "FIX", "CORRECTED", "NEW", "CHANGE", "MODIF", "UPDATE",
    ]
    .iter()
    .any(|word| line_text.contains(word));
    is_doc && !has_edit_word
}

fn never_skip(_: &str) -> bool {
    false
}

fn rust_sources() -> impl Iterator<Item = PathBuf> {
    SOURCE_DIRS.iter().flat_map(|dir| {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
            .map(|e| e.into_path())
    })
}

fn scan_sources() -> Result<(), Box<dyn Error>> {
    let mut searcher = Searcher::new();
    for rule in &RULES {
        let matcher = RegexMatcher::new_line_matcher(rule.pattern)?;
        for path in rust_sources() {
            let mut collector = ViolationCollector::new(&path, rule.skip);
            searcher.search_path(&matcher, &path, &mut collector)?;
            if let Some(error_message) = collector.check_and_get_error_message(rule) {
                return Err(error_message.into());
            }
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }
    println!("cargo:rerun-if-env-changed=FNACAST_RELEASE_TAG");

    let build_timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    println!("cargo:rustc-env=FNACAST_BUILD_TIMESTAMP={build_timestamp}");

    // The eprintln! is what makes the report visible in cargo's output.
    if let Err(e) = scan_sources() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
