use regex::bytes::Regex;

/// Fields pulled out of one record.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Record {
    /// Byte offset of the record within the scanned buffer.
    pub(crate) offset: usize,
    /// Hashtags found in the record's first text field, ASCII-lowercased.
    pub(crate) hashtags: Vec<String>,
    /// First language code in the record, case preserved.
    pub(crate) language: Option<String>,
}

/// Scanner for tweet documents embedded in raw corpus bytes.
///
/// Matching is byte-oriented and deliberately loose: it keys on the shape of
/// a serialized document (a `doc` object with a text field and, later, a
/// lang field) rather than parsing JSON, so partial records at buffer edges
/// degrade to non-matches instead of errors. `.` stops at newlines, which
/// keeps a match from swallowing the line-delimited records that follow it.
pub(crate) struct RecordScanner {
    record_re: Regex,
    text_re: Regex,
    tag_re: Regex,
    lang_re: Regex,
}

impl RecordScanner {
    pub(crate) fn new() -> Self {
        Self {
            record_re: Regex::new(r#"(?i-u)doc":.*?"text".*?".*?",.*"lang".*?,"#)
                .expect("record pattern compiles"),
            text_re: Regex::new(r#"(?-u)"text":"(.*?)""#).expect("text pattern compiles"),
            tag_re: Regex::new(r"(?-u)#([a-zA-Z0-9_]+)").expect("hashtag pattern compiles"),
            lang_re: Regex::new(r#"(?-u)"lang":"(.*?)""#).expect("language pattern compiles"),
        }
    }

    /// Lazily yields one [`Record`] per document found in `buf`. A buffer
    /// with no documents yields nothing.
    ///
    /// Only the record boundary is matched case-insensitively; the field
    /// patterns are exact, so a record whose fields are cased unexpectedly
    /// still counts as a record with those fields absent.
    pub(crate) fn records<'a>(&'a self, buf: &'a [u8]) -> impl Iterator<Item = Record> + 'a {
        self.record_re.find_iter(buf).map(move |m| {
            let doc = m.as_bytes();

            // Records may carry several text-shaped fields; the first one is
            // the authoritative tweet body.
            let hashtags = match self.text_re.captures(doc) {
                Some(caps) => self
                    .tag_re
                    .captures_iter(&doc[caps.get(1).expect("text capture").range()])
                    .map(|tag| {
                        String::from_utf8_lossy(tag.get(1).expect("tag capture").as_bytes())
                            .to_ascii_lowercase()
                    })
                    .collect(),
                None => Vec::new(),
            };

            let language = self.lang_re.captures(doc).map(|caps| {
                String::from_utf8_lossy(caps.get(1).expect("lang capture").as_bytes()).into_owned()
            });

            Record {
                offset: m.start(),
                hashtags,
                language,
            }
        })
    }
}
