use std::{io::BufRead, path::PathBuf};

use pixmill_imgproc::filter::Effect;
use serde::Deserialize;

use crate::error::PipelineError;

/// One filtering request: where to read, where to write and what to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    /// Location of the input image.
    pub in_path: PathBuf,
    /// Location the filtered image is written to.
    pub out_path: PathBuf,
    /// Effects to apply, in order.
    pub effects: Vec<Effect>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    in_path: String,
    out_path: String,
    #[serde(default)]
    effects: Vec<String>,
}

impl JobDescriptor {
    /// Parse a descriptor from one JSON line.
    ///
    /// # Arguments
    ///
    /// * `line` - A JSON object like `{"inPath": "a.png", "outPath": "b.png", "effects": ["G"]}`.
    /// * `line_number` - The 1-based line number, used in error reports.
    ///
    /// # Example
    ///
    /// ```
    /// use pixmill_imgproc::filter::Effect;
    /// use pixmill_pipeline::descriptor::JobDescriptor;
    ///
    /// let line = r#"{"inPath": "in.png", "outPath": "out.png", "effects": ["S", "B"]}"#;
    /// let descriptor = JobDescriptor::parse(line, 1).unwrap();
    ///
    /// assert_eq!(descriptor.effects, vec![Effect::Sharpen, Effect::Blur]);
    /// ```
    pub fn parse(line: &str, line_number: usize) -> Result<Self, PipelineError> {
        let raw: RawDescriptor =
            serde_json::from_str(line).map_err(|e| PipelineError::Descriptor {
                line: line_number,
                message: e.to_string(),
            })?;

        let effects = raw
            .effects
            .iter()
            .map(|code| code.parse::<Effect>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::Descriptor {
                line: line_number,
                message: e.to_string(),
            })?;

        Ok(Self {
            in_path: PathBuf::from(raw.in_path),
            out_path: PathBuf::from(raw.out_path),
            effects,
        })
    }
}

/// Iterator over the descriptors of a line based stream.
///
/// Yields the job id (the 0-based line index) with the parsed descriptor. Blank lines
/// are skipped. A line that is not valid UTF-8 fails on its own like any malformed
/// line. A read error is yielded once and ends the iteration.
pub struct DescriptorLines<R> {
    reader: R,
    buf: Vec<u8>,
    index: usize,
    done: bool,
}

impl<R: BufRead> DescriptorLines<R> {
    /// Read descriptors from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            index: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for DescriptorLines<R> {
    type Item = (usize, Result<JobDescriptor, PipelineError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let id = self.index;
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(err) => {
                    self.done = true;
                    return Some((id, Err(PipelineError::Input(err))));
                }
            }
            self.index += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(err) => {
                    return Some((
                        id,
                        Err(PipelineError::Descriptor {
                            line: id + 1,
                            message: err.to_string(),
                        }),
                    ))
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some((id, JobDescriptor::parse(line, id + 1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() -> Result<(), PipelineError> {
        let line = r#"{"inPath": "img/a.png", "outPath": "out/a.png", "effects": ["G", "S", "E", "B"]}"#;
        let descriptor = JobDescriptor::parse(line, 1)?;
        assert_eq!(descriptor.in_path, PathBuf::from("img/a.png"));
        assert_eq!(descriptor.out_path, PathBuf::from("out/a.png"));
        assert_eq!(
            descriptor.effects,
            vec![Effect::Grayscale, Effect::Sharpen, Effect::Edge, Effect::Blur]
        );
        Ok(())
    }

    #[test]
    fn test_parse_without_effects() -> Result<(), PipelineError> {
        let descriptor = JobDescriptor::parse(r#"{"inPath": "a.png", "outPath": "b.png"}"#, 1)?;
        assert!(descriptor.effects.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_errors_carry_line_number() {
        let res = JobDescriptor::parse(r#"{"inPath": "a.png", "effects": ["G"]}"#, 4);
        assert!(matches!(res, Err(PipelineError::Descriptor { line: 4, .. })));

        let res = JobDescriptor::parse(
            r#"{"inPath": "a.png", "outPath": "b.png", "effects": ["X"]}"#,
            7,
        );
        assert!(matches!(res, Err(PipelineError::Descriptor { line: 7, .. })));

        let res = JobDescriptor::parse("not json", 2);
        assert!(matches!(res, Err(PipelineError::Descriptor { line: 2, .. })));
    }

    #[test]
    fn test_lines_skip_blanks_and_keep_going() {
        let input = concat!(
            r#"{"inPath": "a.png", "outPath": "b.png", "effects": []}"#,
            "\n\n",
            "garbage\n",
            "   \n",
            r#"{"inPath": "c.png", "outPath": "d.png", "effects": ["B"]}"#,
            "\n",
        );

        let parsed = DescriptorLines::new(input.as_bytes()).collect::<Vec<_>>();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].0, 0);
        assert!(parsed[0].1.is_ok());
        assert_eq!(parsed[1].0, 2);
        assert!(matches!(
            parsed[1].1,
            Err(PipelineError::Descriptor { line: 3, .. })
        ));
        assert_eq!(parsed[2].0, 4);
        assert!(matches!(&parsed[2].1, Ok(d) if d.effects == vec![Effect::Blur]));
    }

    #[test]
    fn test_invalid_utf8_line_fails_alone() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"inPath": "a.png", "outPath": "b.png"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\r\n");
        input.extend_from_slice(br#"{"inPath": "c.png", "outPath": "d.png"}"#);

        let parsed = DescriptorLines::new(input.as_slice()).collect::<Vec<_>>();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].1.is_ok());
        assert_eq!(parsed[1].0, 1);
        assert!(matches!(
            parsed[1].1,
            Err(PipelineError::Descriptor { line: 2, .. })
        ));
        assert!(parsed[2].1.is_ok());
    }
}
