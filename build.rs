use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Source trees held to the coding policy. Benchmarks keep their banner comments.
const POLICED_DIRS: [&str; 2] = ["solver", "tests"];

// What a collector is looking for on each matched line.
#[derive(Clone, Copy)]
enum Rule {
    UnderscorePrefix,
    ForbiddenCommentWord,
    ShoutingComment,
    AllowDeadCode,
}

impl Rule {
    fn pattern(self) -> &'static str {
        match self {
            Rule::UnderscorePrefix => r"\b(_[a-zA-Z0-9_]+)\b",
            Rule::ForbiddenCommentWord => {
                r"(//|/\*).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFY|UPDATED|UPDATE)"
            }
            Rule::ShoutingComment => r"(//|/\*).*",
            Rule::AllowDeadCode => r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
        }
    }

    fn headline(self) -> &'static str {
        match self {
            Rule::UnderscorePrefix => "underscore-prefixed identifiers",
            Rule::ForbiddenCommentWord => "comments narrating edits (fix/change/update/new)",
            Rule::ShoutingComment => "comments written entirely in capitals",
            Rule::AllowDeadCode => "#[allow(dead_code)] attributes",
        }
    }
}

// Collects every violating line of one file for one rule.
struct ViolationCollector {
    rule: Rule,
    file_path: PathBuf,
    violations: Vec<String>,
}

impl ViolationCollector {
    fn new(rule: Rule, file_path: &Path) -> Self {
        Self {
            rule,
            file_path: file_path.to_path_buf(),
            violations: Vec::new(),
        }
    }

    fn check_and_get_error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            self.rule.headline(),
            self.file_path.display()
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        Some(error_msg)
    }
}

fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim_start_matches(['/', '!']).trim());
    }
    let start = line.find("/*")?;
    let rest = &line[start + 2..];
    Some(match rest.find("*/") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    })
}

fn inside_string_literal(line: &str, needle: &str) -> bool {
    match line.find(needle) {
        Some(idx) => line[..idx].matches('"').count() % 2 == 1,
        None => false,
    }
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        let is_pure_comment = line_text.trim_start().starts_with("//");

        let violates = match self.rule {
            Rule::UnderscorePrefix => {
                let matcher = RegexMatcher::new_line_matcher(self.rule.pattern())
                    .map_err(std::io::Error::other)?;
                let mut offending = None;
                grep::matcher::Matcher::find_iter(&matcher, line_text.as_bytes(), |m| {
                    let word = &line_text[m.start()..m.end()];
                    if !inside_string_literal(line_text, word) {
                        offending = Some(());
                        return false;
                    }
                    true
                })
                .map_err(std::io::Error::other)?;
                !is_pure_comment && offending.is_some()
            }
            Rule::ForbiddenCommentWord | Rule::AllowDeadCode => true,
            Rule::ShoutingComment => match comment_text(line_text) {
                Some(text) => {
                    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
                    letters.len() > 1 && letters.iter().all(|c| c.is_uppercase())
                }
                None => false,
            },
        };

        if violates {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn scan(rule: Rule) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(rule.pattern())?;
    let mut searcher = Searcher::new();

    for dir in POLICED_DIRS {
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        {
            let path = entry.path();
            let mut collector = ViolationCollector::new(rule, path);
            searcher.search_path(&matcher, path, &mut collector)?;
            if let Some(error_message) = collector.check_and_get_error_message() {
                return Err(error_message.into());
            }
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in POLICED_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    for rule in [
        Rule::UnderscorePrefix,
        Rule::ForbiddenCommentWord,
        Rule::ShoutingComment,
        Rule::AllowDeadCode,
    ] {
        if let Err(e) = scan(rule) {
            // eprintln so the report shows up in cargo's output.
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
