use regex::Regex;

use crate::db::models::GeneratedName;

/// The result set shown to the user is a fixed grid of four slots.
pub const RESULT_SLOTS: usize = 4;

const TEXT_MARKER: &str = "文字：";
const ASSOCIATION_MARKER: &str = "关联：";
const TRANSLATION_MARKER: &str = "英文翻译：";
const SECTION_END: &str = "Done.";
const FUNCTION_CALL: &str = "function call";

/// Incremental parser for the name bot's reply format. Answer deltas are
/// accumulated; each `Done.` marker closes a section, which is scanned for
/// the three fixed field markers. Completed names fill the first empty slot
/// of the four-slot result set. Sections without a full set of markers are
/// dropped and parsing continues.
pub struct NameParser {
    buf: String,
    slots: [Option<GeneratedName>; RESULT_SLOTS],
    re_text: Regex,
    re_association: Regex,
    re_translation: Regex,
}

impl Default for NameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NameParser {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            slots: Default::default(),
            re_text: Regex::new("文字：([^\n]*)").unwrap(),
            re_association: Regex::new(r"(?s)关联：(.*?)(?:\n英文翻译：|$)").unwrap(),
            re_translation: Regex::new("英文翻译：([^\n]*)").unwrap(),
        }
    }

    /// Feed an answer delta; returns the `(slot, name)` pairs it completed.
    pub fn push(&mut self, delta: &str) -> Vec<(usize, GeneratedName)> {
        self.buf.push_str(delta);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.find(SECTION_END) {
            let section: String = self.buf.drain(..pos + SECTION_END.len()).collect();
            let section = &section[..pos];
            if section.contains(TEXT_MARKER)
                && section.contains(ASSOCIATION_MARKER)
                && section.contains(TRANSLATION_MARKER)
            {
                if let Some(name) = self.extract(section) {
                    if let Some(slot) = self.place(name.clone()) {
                        out.push((slot, name));
                    }
                }
            }
        }
        out
    }

    /// End of stream: one final extraction pass over the residual buffer,
    /// which may hold complete names that never got a `Done.` terminator.
    pub fn finish(&mut self) -> Vec<(usize, GeneratedName)> {
        let rest = std::mem::take(&mut self.buf);
        // A tool-call transcript may precede the answer; keep the last part.
        let tail = rest.rsplit(FUNCTION_CALL).next().unwrap_or(&rest);

        let starts: Vec<usize> = tail.match_indices(TEXT_MARKER).map(|(i, _)| i).collect();
        let mut out = Vec::new();
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(tail.len());
            if let Some(name) = self.extract(&tail[start..end]) {
                if let Some(slot) = self.place(name.clone()) {
                    out.push((slot, name));
                }
            }
        }
        out
    }

    /// All names parsed so far, in slot order.
    pub fn names(&self) -> Vec<GeneratedName> {
        self.slots.iter().flatten().cloned().collect()
    }

    fn extract(&self, section: &str) -> Option<GeneratedName> {
        let text = self
            .re_text
            .captures(section)?
            .get(1)?
            .as_str()
            .trim()
            .to_string();
        if text.is_empty() {
            return None;
        }
        let association = capture(&self.re_association, section);
        let translation = capture(&self.re_translation, section);
        Some(GeneratedName {
            text,
            association,
            translation,
        })
    }

    fn place(&mut self, name: GeneratedName) -> Option<usize> {
        let slot = self.slots.iter().position(|s| s.is_none())?;
        self.slots[slot] = Some(name);
        Some(slot)
    }
}

fn capture(re: &Regex, section: &str) -> String {
    re.captures(section)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Incremental extractor for markdown image links in the image bot's reply.
/// Only links under the fixed `s.coze.cn` prefix count; duplicates are
/// ignored and at most [`RESULT_SLOTS`] URLs are collected.
pub struct ImageParser {
    buf: String,
    urls: Vec<String>,
    re: Regex,
}

impl Default for ImageParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageParser {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            urls: Vec::new(),
            re: Regex::new(r"!\[[^\]]*\]\((https://s\.coze\.cn/t/[\w-]+/)\)").unwrap(),
        }
    }

    /// Feed an answer delta; returns the `(slot, url)` pairs it completed.
    pub fn push(&mut self, delta: &str) -> Vec<(usize, String)> {
        self.buf.push_str(delta);
        let mut out = Vec::new();
        for cap in self.re.captures_iter(&self.buf) {
            if self.urls.len() >= RESULT_SLOTS {
                break;
            }
            let url = cap[1].trim().to_string();
            if !self.urls.contains(&url) {
                out.push((self.urls.len(), url.clone()));
                self.urls.push(url);
            }
        }
        out
    }

    /// All URLs collected so far, in arrival order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}
