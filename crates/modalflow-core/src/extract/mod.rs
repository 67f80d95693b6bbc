//! Parameter extraction chain
//!
//! Pattern-based extractors pull structured fields out of free text. The
//! chain runs every extractor whose `supports` predicate accepts the input
//! and unions the resulting maps; a pass-through general extractor always
//! matches, so the chain never fails on unsupported input.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// One pattern-based extractor in the chain
pub trait ParameterExtractor: Send + Sync {
    /// Whether this extractor applies to the given input
    fn supports(&self, input: &str) -> bool;

    /// Extract structured fields from the input
    fn extract(&self, input: &str) -> HashMap<String, String>;
}

/// Runs the registered extractors in order and unions their output.
/// Last writer per key wins.
pub struct ExtractorChain {
    extractors: Vec<Box<dyn ParameterExtractor>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn ParameterExtractor>>) -> Self {
        Self { extractors }
    }

    /// Chain with the built-in extractors registered
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(LendingParameterExtractor),
            Box::new(GeneralParameterExtractor),
        ])
    }

    pub fn extract(&self, input: &str) -> HashMap<String, String> {
        let mut merged = HashMap::new();
        for extractor in &self.extractors {
            if extractor.supports(input) {
                merged.extend(extractor.extract(input));
            }
        }
        merged
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::standard()
    }
}

fn book_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[《"“](.+?)[》"”]"#).expect("valid regex"))
}

fn book_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:book\s*id|图书\s*id|书籍\s*id|书\s*id)[\s:：=]*(?:为|是)?\s*(\d+)")
            .expect("valid regex")
    })
}

fn student_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:student\s*id|学号|\bid)[\s:：=]*(?:为|是)?\s*(\d+)").expect("valid regex")
    })
}

fn student_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:姓名|name)[\s:：=]*(?:为|是)?\s*([^，,。.;；\n]+)").expect("valid regex")
    })
}

// English terms need word boundaries ("smart" is not "art"); CJK terms
// must not use them because adjacent CJK characters never form a boundary.
fn category_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(programming|math|literature|science fiction|history|psychology|economics|management|art|physics|chemistry|biology)\b|(编程|程序|数学|文学|小说|科幻|历史|心理学|经济|管理|艺术|音乐|物理|化学|生物)",
        )
        .expect("valid regex")
    })
}

/// Extracts lending-domain fields: item title, labeled numeric ids,
/// a labeled person name and a category keyword.
pub struct LendingParameterExtractor;

impl LendingParameterExtractor {
    fn extract_book_id(&self, input: &str, out: &mut HashMap<String, String>) {
        if let Some(caps) = book_id_re().captures(input) {
            out.insert("bookId".to_string(), caps[1].to_string());
        }
    }

    fn extract_student_id(&self, input: &str, out: &mut HashMap<String, String>) {
        for caps in student_id_re().captures_iter(input) {
            let Some(m) = caps.get(0) else { continue };
            // A bare "id" label preceded by a book word belongs to the
            // book-id pattern, not the student one (the regex crate has
            // no lookbehind, so the prefix is checked here).
            let prefix: String = input[..m.start()]
                .chars()
                .rev()
                .take(8)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            let prefix = prefix.to_lowercase();
            if prefix.trim_end().ends_with("book")
                || prefix.contains("图书")
                || prefix.contains("书籍")
                || prefix.trim_end().ends_with('书')
            {
                continue;
            }
            out.insert("studentId".to_string(), caps[1].to_string());
            return;
        }
    }

    fn extract_student_name(&self, input: &str, out: &mut HashMap<String, String>) {
        if let Some(caps) = student_name_re().captures(input) {
            let name = caps[1].trim();
            if !name.is_empty() {
                out.insert("studentName".to_string(), name.to_string());
            }
        }
    }

    fn extract_book_title(&self, input: &str, out: &mut HashMap<String, String>) {
        if let Some(caps) = book_title_re().captures(input) {
            out.insert("bookTitle".to_string(), caps[1].trim().to_string());
        }
    }

    fn extract_category(&self, input: &str, out: &mut HashMap<String, String>) {
        if let Some(caps) = category_re().captures(input) {
            let Some(keyword) = caps.get(1).or_else(|| caps.get(2)) else {
                return;
            };
            let keyword = keyword.as_str().to_lowercase();
            let normalized = match keyword.as_str() {
                "程序" => "编程",
                "小说" | "科幻" => "文学",
                "心理学" => "心理",
                "音乐" => "艺术",
                other => other,
            };
            out.insert("category".to_string(), normalized.to_string());
        }
    }
}

impl ParameterExtractor for LendingParameterExtractor {
    fn supports(&self, input: &str) -> bool {
        let lower = input.to_lowercase();
        ["book", "borrow", "return", "lend", "student", "书", "借", "还", "归还", "学号", "姓名"]
            .iter()
            .any(|kw| lower.contains(kw))
            || book_title_re().is_match(input)
    }

    fn extract(&self, input: &str) -> HashMap<String, String> {
        let mut out = HashMap::new();
        if input.is_empty() {
            return out;
        }
        self.extract_book_id(input, &mut out);
        self.extract_student_id(input, &mut out);
        self.extract_student_name(input, &mut out);
        self.extract_book_title(input, &mut out);
        self.extract_category(input, &mut out);
        out
    }
}

/// Always matches, contributes nothing. Guarantees the chain accepts
/// arbitrary input.
pub struct GeneralParameterExtractor;

impl ParameterExtractor for GeneralParameterExtractor {
    fn supports(&self, _input: &str) -> bool {
        true
    }

    fn extract(&self, _input: &str) -> HashMap<String, String> {
        HashMap::new()
    }
}
