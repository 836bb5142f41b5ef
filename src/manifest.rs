//! Download manifests for releases.
//!
//! A manifest lists every segment of every part of a binary, with enough
//! information (group, message-id, size) for a client to fetch and
//! reassemble the files. The default format is NZB.
//!
//! Reference: https://sabnzbd.org/wiki/extra/nzb-spec

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

use crate::catalog::BinaryWithParts;

const NZB_NAMESPACE: &str = "http://www.newzbin.com/DTD/2003/nzb";
const NZB_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE nzb PUBLIC \"-//newzBin//DTD NZB 1.1//EN\" \"http://www.newzbin.com/DTD/nzb/nzb-1.1.dtd\">\n";

/// Errors raised while serializing a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// The binary has no segments to describe.
    #[error("binary '{0}' has no segments")]
    EmptyBinary(String),

    /// The XML writer failed.
    #[error("failed to write NZB: {0}")]
    Xml(String),
}

/// Serializes a fully loaded binary into a download manifest.
pub trait ManifestBuilder: Send + Sync {
    /// Builds the manifest payload for `binary`.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] if the binary cannot be described.
    fn build(&self, binary: &BinaryWithParts) -> Result<String, ManifestError>;
}

/// Writes NZB 1.1 documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NzbManifestBuilder;

impl ManifestBuilder for NzbManifestBuilder {
    fn build(&self, binary: &BinaryWithParts) -> Result<String, ManifestError> {
        if binary.parts.iter().all(|p| p.segments.is_empty()) {
            return Err(ManifestError::EmptyBinary(binary.binary.name.clone()));
        }

        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut root = BytesStart::new("nzb");
        root.push_attribute(("xmlns", NZB_NAMESPACE));
        write(&mut writer, Event::Start(root))?;

        write(&mut writer, Event::Start(BytesStart::new("head")))?;
        let mut meta = BytesStart::new("meta");
        meta.push_attribute(("type", "name"));
        write(&mut writer, Event::Start(meta))?;
        write(&mut writer, Event::Text(BytesText::new(&binary.binary.name)))?;
        write(&mut writer, Event::End(BytesEnd::new("meta")))?;
        write(&mut writer, Event::End(BytesEnd::new("head")))?;

        for entry in &binary.parts {
            let part = &entry.part;
            let date = part.posted.to_string();
            let mut file = BytesStart::new("file");
            // push_attribute escapes
            file.push_attribute(("poster", part.poster.as_str()));
            file.push_attribute(("date", date.as_str()));
            file.push_attribute(("subject", part.subject.as_str()));
            write(&mut writer, Event::Start(file))?;

            write(&mut writer, Event::Start(BytesStart::new("groups")))?;
            write(&mut writer, Event::Start(BytesStart::new("group")))?;
            write(&mut writer, Event::Text(BytesText::new(&part.group_name)))?;
            write(&mut writer, Event::End(BytesEnd::new("group")))?;
            write(&mut writer, Event::End(BytesEnd::new("groups")))?;

            write(&mut writer, Event::Start(BytesStart::new("segments")))?;
            for segment in &entry.segments {
                let bytes = segment.size.to_string();
                let number = segment.number.to_string();
                let mut element = BytesStart::new("segment");
                element.push_attribute(("bytes", bytes.as_str()));
                element.push_attribute(("number", number.as_str()));
                write(&mut writer, Event::Start(element))?;
                let message_id = segment.message_id.trim_start_matches('<').trim_end_matches('>');
                write(&mut writer, Event::Text(BytesText::new(message_id)))?;
                write(&mut writer, Event::End(BytesEnd::new("segment")))?;
            }
            write(&mut writer, Event::End(BytesEnd::new("segments")))?;

            write(&mut writer, Event::End(BytesEnd::new("file")))?;
        }

        write(&mut writer, Event::End(BytesEnd::new("nzb")))?;

        let body = String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| ManifestError::Xml(e.to_string()))?;

        let mut document = String::with_capacity(NZB_PROLOG.len() + body.len());
        document.push_str(NZB_PROLOG);
        document.push_str(&body);
        Ok(document)
    }
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), ManifestError> {
    writer
        .write_event(event)
        .map_err(|e| ManifestError::Xml(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::{Binary, Part, PartWithSegments, Segment};

    fn binary(parts: Vec<PartWithSegments>) -> BinaryWithParts {
        BinaryWithParts {
            binary: Binary {
                id: 1,
                hash: "h".to_string(),
                name: "My.Show.S01E01".to_string(),
                poster: "poster <p@example.com>".to_string(),
                group_name: "alt.binaries.tv".to_string(),
                posted: 1_700_000_000,
                total_parts: 2,
            },
            parts,
        }
    }

    fn part(id: i64, subject: &str, segments: Vec<Segment>) -> PartWithSegments {
        PartWithSegments {
            part: Part {
                id,
                subject: subject.to_string(),
                group_name: "alt.binaries.tv".to_string(),
                poster: "poster <p@example.com>".to_string(),
                posted: 1_700_000_000 + id,
                total_segments: i64::try_from(segments.len()).unwrap(),
                binary_id: Some(1),
            },
            segments,
        }
    }

    fn segment(part_id: i64, number: i64) -> Segment {
        Segment {
            id: part_id * 100 + number,
            part_id,
            number,
            size: 750_000,
            message_id: format!("<{part_id}-{number}@news.example.com>"),
        }
    }

    #[test]
    fn test_nzb_contains_prolog_and_namespace() {
        let nzb = NzbManifestBuilder
            .build(&binary(vec![part(1, "file [1/2]", vec![segment(1, 1)])]))
            .unwrap();

        assert!(nzb.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(nzb.contains("<!DOCTYPE nzb"));
        assert!(nzb.contains(r#"<nzb xmlns="http://www.newzbin.com/DTD/2003/nzb">"#));
        assert!(nzb.contains(r#"<meta type="name">My.Show.S01E01</meta>"#));
    }

    #[test]
    fn test_nzb_lists_every_part_and_segment_in_order() {
        let nzb = NzbManifestBuilder
            .build(&binary(vec![
                part(1, "first [1/2]", vec![segment(1, 1), segment(1, 2)]),
                part(2, "second [2/2]", vec![segment(2, 1)]),
            ]))
            .unwrap();

        assert_eq!(nzb.matches("<file ").count(), 2);
        assert_eq!(nzb.matches("<segment ").count(), 3);
        assert!(nzb.find("first [1/2]").unwrap() < nzb.find("second [2/2]").unwrap());
        assert!(nzb.contains(r#"<segment bytes="750000" number="2">1-2@news.example.com</segment>"#));
        assert!(nzb.contains("<group>alt.binaries.tv</group>"));
        assert!(nzb.contains(r#"date="1700000001""#));
    }

    #[test]
    fn test_nzb_escapes_attributes() {
        let nzb = NzbManifestBuilder
            .build(&binary(vec![part(1, r#"a & "b" [1/1]"#, vec![segment(1, 1)])]))
            .unwrap();

        assert!(nzb.contains("poster &lt;p@example.com&gt;"));
        assert!(nzb.contains("a &amp; &quot;b&quot; [1/1]"));
    }

    #[test]
    fn test_nzb_rejects_binary_without_segments() {
        let err = NzbManifestBuilder
            .build(&binary(vec![part(1, "file [1/1]", Vec::new())]))
            .unwrap_err();

        assert_eq!(err, ManifestError::EmptyBinary("My.Show.S01E01".to_string()));
    }
}
