use serde::Serialize;

use crate::ext::BestEffortPathExt;
use crate::pipeline::{Artifact, FileRecord, Origin};

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const VLQ_SHIFT: u32 = 5;
const VLQ_CONTINUATION: i64 = 1 << VLQ_SHIFT;
const VLQ_MASK: i64 = VLQ_CONTINUATION - 1;

/// Revision 3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Joins `files` with newlines into one artifact.
///
/// With `with_map`, every line of an own-source file maps to the same line of
/// its original content; third-party lines stay unmapped.
pub fn concat(files: &[FileRecord], name: &str, with_map: bool) -> Artifact {
    let contents = files
        .iter()
        .map(|file| file.contents.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Artifact {
        name: name.to_string(),
        contents,
        source_map: with_map.then(|| build_map(files, name)),
        map_file: None,
    }
}

fn build_map(files: &[FileRecord], name: &str) -> SourceMap {
    let mut sources = Vec::new();
    let mut sources_content = Vec::new();
    let mut mappings = String::new();
    let mut previous_source = 0i64;
    let mut previous_line = 0i64;
    let mut first_line = true;

    for file in files {
        let source_index = (file.origin == Origin::Own).then(|| {
            sources.push(file.path.to_slash_string());
            sources_content.push(file.original.to_string());
            (sources.len() - 1) as i64
        });
        let original_lines = file.original.split('\n').count();

        for (line, _) in file.contents.split('\n').enumerate() {
            if !first_line {
                mappings.push(';');
            }
            first_line = false;

            let Some(source_index) = source_index else {
                continue;
            };
            if line >= original_lines {
                continue;
            }

            let line = line as i64;
            encode_vlq(0, &mut mappings);
            encode_vlq(source_index - previous_source, &mut mappings);
            encode_vlq(line - previous_line, &mut mappings);
            encode_vlq(0, &mut mappings);
            previous_source = source_index;
            previous_line = line;
        }
    }

    SourceMap {
        version: 3,
        file: name.to_string(),
        sources,
        sources_content,
        names: Vec::new(),
        mappings,
    }
}

/// Appends `value` as a base64 VLQ.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut remaining = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = remaining & VLQ_MASK;
        remaining >>= VLQ_SHIFT;
        if remaining > 0 {
            digit |= VLQ_CONTINUATION;
        }
        out.push(BASE64_DIGITS[digit as usize] as char);
        if remaining == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[rstest]
    #[case(0, "A")]
    #[case(1, "C")]
    #[case(-1, "D")]
    #[case(15, "e")]
    #[case(16, "gB")]
    #[case(123, "2H")]
    #[case(-123, "3H")]
    fn encodes_vlq(#[case] value: i64, #[case] expected: &str) {
        assert_eq!(vlq(value), expected);
    }

    fn own(path: &str, contents: &str) -> FileRecord {
        FileRecord::new(path, contents.to_string(), Origin::Own)
    }

    #[test]
    fn joins_files_with_newlines() {
        let files = vec![own("a.js", "a();"), own("b.js", "b();")];
        let artifact = concat(&files, "app.js", false);

        assert_eq!(artifact.name, "app.js");
        assert_eq!(artifact.contents, "a();\nb();");
        assert_eq!(artifact.source_map, None);
    }

    #[test]
    fn maps_each_line_to_its_source() {
        let files = vec![own("src/a.js", "a1\na2"), own("src/b.js", "b1")];
        let map = concat(&files, "app.js", true).source_map.unwrap();

        assert_eq!(map.sources, vec!["src/a.js", "src/b.js"]);
        assert_eq!(map.sources_content, vec!["a1\na2", "b1"]);
        // a.js line 0, a.js line 1, b.js line 0
        assert_eq!(map.mappings, "AAAA;AACA;ACDA");
    }

    #[test]
    fn third_party_lines_are_unmapped() {
        let files = vec![
            FileRecord::new("bower_components/x/x.js", "x1\nx2".to_string(), Origin::ThirdParty),
            own("src/a.js", "a1"),
        ];
        let map = concat(&files, "app.js", true).source_map.unwrap();

        assert_eq!(map.sources, vec!["src/a.js"]);
        assert_eq!(map.mappings, ";;AAAA");
    }

    #[test]
    fn lines_beyond_the_original_are_unmapped() {
        let mut transformed = own("src/a.js", "a1");
        transformed.contents = "a1\n// added".to_string();
        let map = concat(&[transformed], "app.js", true).source_map.unwrap();

        assert_eq!(map.mappings, "AAAA;");
    }

    #[test]
    fn serializes_camel_case_json() {
        let map = concat(&[own("a.js", "a")], "app.js", true).source_map.unwrap();
        let json: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "app.js");
        assert_eq!(json["sourcesContent"][0], "a");
        assert_eq!(json["mappings"], "AAAA");
    }
}
