//! # Clip Table
//!
//! A delimited text table with a header row naming at least a video column
//! (a watch URL or a bare identifier) and usually start/end timecode columns:
//!
//! ```text
//! URL,start_timecode,end_timecode
//! https://www.youtube.com/watch?v=abc123,0:00:05,0:00:12
//! ```
//!
//! Quoting follows the usual CSV rules. Columns are looked up by name; each
//! row is turned into a typed [`ClipRequest`] or rejected with
//! [`TableError::MalformedRow`].

use std::path::Path;

use tracing::debug;

use crate::clip::{ClipRequest, ClipTargets};
use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::timecode::TimeSpec;

/// Cell values that mean "no value"
const EMPTY_MARKERS: [&str; 4] = ["", "nan", "NaN", "None"];

/// One data row, with cells kept exactly as written
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// 1-based line number in the table file
    pub line: usize,
    pub video_ref: String,
    pub start: String,
    pub end: Option<String>,
}

/// What to do with a row
#[derive(Debug, Clone, PartialEq)]
pub enum RowPlan {
    Clip(ClipRequest),
    /// No end time: nothing to cut
    MissingEnd { video_id: String },
}

impl TableRow {
    /// Identifier of the source video
    ///
    /// For watch URLs this is the text after `v=` (up to any further `v=`);
    /// a cell without `v=` is taken as the identifier itself.
    pub fn video_id(&self) -> std::result::Result<&str, TableError> {
        let id = match self.video_ref.split("v=").nth(1) {
            Some(id) => id,
            None => self.video_ref.as_str(),
        };

        if id.is_empty() || id.contains(['/', '\\']) {
            return Err(TableError::MalformedRow {
                line: self.line,
                reason: format!("cannot derive a video id from '{}'", self.video_ref),
            });
        }
        Ok(id)
    }

    /// Resolve input/output paths and build the request for this row
    pub fn plan(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        input_extension: &str,
        targets: ClipTargets,
    ) -> std::result::Result<RowPlan, TableError> {
        let video_id = self.video_id()?;

        let end = match &self.end {
            Some(end) => end,
            None => return Ok(RowPlan::MissingEnd { video_id: video_id.to_string() }),
        };

        let source = input_dir.join(format!("{}.{}", video_id, input_extension));
        let output = output_dir.join(output_file_name(video_id, &self.start, end));

        let request = ClipRequest::new(source, TimeSpec::from(self.start.as_str()), TimeSpec::from(end.as_str()), output)
            .with_targets(targets);
        Ok(RowPlan::Clip(request))
    }
}

/// `{video_id}_{start}_{end}.mp4`, with start and end exactly as they appear in the table
pub fn output_file_name(video_id: &str, start: &str, end: &str) -> String {
    format!("{}_{}_{}.mp4", video_id, start, end)
}

/// All rows of a clip table, in file order
#[derive(Debug)]
pub struct ClipTable {
    rows: Vec<std::result::Result<TableRow, TableError>>,
}

impl ClipTable {
    pub fn from_file<P: AsRef<Path>>(path: P, config: &TableConfig) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| TableError::FileNotFound { path: path.display().to_string() })?;
        Ok(Self::parse(&content, config)?)
    }

    /// Parse table text
    ///
    /// A missing video column fails the whole table. Problems confined to one
    /// row are kept as that row's error so the rest of the table stays usable.
    pub fn parse(text: &str, config: &TableConfig) -> std::result::Result<Self, TableError> {
        let delimiter = u8::try_from(config.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(TableError::UnsupportedDelimiter { delimiter: config.delimiter })?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let header = reader
            .headers()
            .map_err(|e| TableError::MalformedRow { line: 1, reason: e.to_string() })?
            .clone();

        let column = |name: &str| header.iter().position(|cell| cell == name);
        let url_index = column(&config.url_column)
            .ok_or_else(|| TableError::MissingColumn { column: config.url_column.clone() })?;
        let start_index = column(&config.start_column);
        let end_index = column(&config.end_column);

        if start_index.is_none() {
            debug!("No '{}' column, clips start at 0", config.start_column);
        }

        let rows = reader
            .records()
            .map(|record| {
                let record = record.map_err(|e| TableError::MalformedRow {
                    line: e.position().map_or(0, |p| p.line() as usize),
                    reason: e.to_string(),
                })?;
                let line = record.position().map_or(0, |p| p.line() as usize);

                if record.len() != header.len() {
                    return Err(TableError::MalformedRow {
                        line,
                        reason: format!("{} cells, header has {}", record.len(), header.len()),
                    });
                }

                let cell = |index: Option<usize>| {
                    index
                        .and_then(|i| record.get(i))
                        .filter(|value| !EMPTY_MARKERS.contains(value))
                        .map(str::to_string)
                };

                let video_ref = cell(Some(url_index)).ok_or_else(|| TableError::MalformedRow {
                    line,
                    reason: format!("empty '{}' cell", config.url_column),
                })?;

                Ok(TableRow {
                    line,
                    video_ref,
                    start: cell(start_index).unwrap_or_else(|| "0".to_string()),
                    end: cell(end_index),
                })
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[std::result::Result<TableRow, TableError>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const TABLE: &str = "\
URL,start_timecode,end_timecode
https://www.youtube.com/watch?v=abc123,0:00:05,0:00:12
https://www.youtube.com/watch?v=def456,90,
,1,2
\"ghi789\", 00:10 , 00:20
";

    fn parse(text: &str) -> ClipTable {
        ClipTable::parse(text, &TableConfig::default()).unwrap()
    }

    #[test]
    fn test_rows_keep_raw_cells() {
        let table = parse(TABLE);
        assert_eq!(table.len(), 4);

        let first = table.rows()[0].as_ref().unwrap();
        assert_eq!(first.line, 2);
        assert_eq!(first.video_id().unwrap(), "abc123");
        assert_eq!(first.start, "0:00:05");
        assert_eq!(first.end.as_deref(), Some("0:00:12"));

        let second = table.rows()[1].as_ref().unwrap();
        assert_eq!(second.end, None);

        assert!(matches!(table.rows()[2], Err(TableError::MalformedRow { line: 4, .. })));

        let fourth = table.rows()[3].as_ref().unwrap();
        assert_eq!(fourth.video_id().unwrap(), "ghi789");
        assert_eq!(fourth.start, "00:10");
    }

    #[test]
    fn test_plan_builds_request() {
        let table = parse(TABLE);
        let row = table.rows()[0].as_ref().unwrap();

        let plan = row
            .plan(Path::new("download_video"), Path::new("processed_clips"), "mp4", ClipTargets::default())
            .unwrap();
        let RowPlan::Clip(request) = plan else {
            panic!("expected a clip plan");
        };

        assert_eq!(request.source_path, PathBuf::from("download_video/abc123.mp4"));
        assert_eq!(request.output_path, PathBuf::from("processed_clips/abc123_0:00:05_0:00:12.mp4"));
        assert_eq!(request.start, TimeSpec::from("0:00:05"));
        assert_eq!(request.targets, ClipTargets::default());
    }

    #[test]
    fn test_missing_end_is_not_a_clip() {
        let table = parse(TABLE);
        let row = table.rows()[1].as_ref().unwrap();
        let plan = row.plan(Path::new("in"), Path::new("out"), "mp4", ClipTargets::default()).unwrap();
        assert_eq!(plan, RowPlan::MissingEnd { video_id: "def456".to_string() });
    }

    #[test]
    fn test_missing_columns() {
        let err = ClipTable::parse("link,start\nx,1\n", &TableConfig::default()).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { column } if column == "URL"));

        // Without start/end columns rows start at 0 and have no end
        let table = parse("URL\nabc123\n");
        let row = table.rows()[0].as_ref().unwrap();
        assert_eq!(row.start, "0");
        assert_eq!(row.end, None);

        assert!(ClipTable::parse("", &TableConfig::default()).is_err());
    }

    #[test]
    fn test_video_id_forms() {
        let row = |video_ref: &str| TableRow {
            line: 1,
            video_ref: video_ref.to_string(),
            start: "0".into(),
            end: Some("1".into()),
        };
        assert_eq!(row("https://youtube.com/watch?v=XyZ_-9").video_id().unwrap(), "XyZ_-9");
        assert_eq!(row("plainid").video_id().unwrap(), "plainid");
        assert!(row("https://youtu.be/abc").video_id().is_err());
        assert!(row("watch?v=").video_id().is_err());
    }

    #[test]
    fn test_quoted_delimiters_stay_in_their_cell() {
        let table = parse(
            "URL,start_timecode,end_timecode\n\"https://www.youtube.com/watch?v=abc,def\",0:00:05,0:00:12\n",
        );
        let row = table.rows()[0].as_ref().unwrap();
        assert_eq!(row.video_ref, "https://www.youtube.com/watch?v=abc,def");
        assert_eq!(row.start, "0:00:05");
        assert_eq!(row.end.as_deref(), Some("0:00:12"));
    }

    #[test]
    fn test_cell_count_mismatch_is_malformed() {
        let table = parse("URL,start_timecode,end_timecode\nabc,1,2,3\ndef,1\nghi,1,2\n");
        assert!(matches!(table.rows()[0], Err(TableError::MalformedRow { line: 2, .. })));
        assert!(matches!(table.rows()[1], Err(TableError::MalformedRow { line: 3, .. })));
        assert!(table.rows()[2].is_ok());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = TableConfig { delimiter: '§', ..TableConfig::default() };
        assert!(matches!(
            ClipTable::parse("URL\nabc\n", &config),
            Err(TableError::UnsupportedDelimiter { delimiter: '§' })
        ));
    }

    #[test]
    fn test_custom_layout() {
        let config = TableConfig {
            url_column: "video".into(),
            start_column: "from".into(),
            end_column: "to".into(),
            delimiter: '\t',
            ..TableConfig::default()
        };
        let table = ClipTable::parse("video\tfrom\tto\nabc\t1\t2\n", &config).unwrap();
        let row = table.rows()[0].as_ref().unwrap();
        assert_eq!((row.start.as_str(), row.end.as_deref()), ("1", Some("2")));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("abc", "0:01:30", "0:02:00"), "abc_0:01:30_0:02:00.mp4");
        assert_eq!(output_file_name("abc", "90", "120.5"), "abc_90_120.5.mp4");
    }

    #[test]
    fn test_missing_file() {
        let result = ClipTable::from_file("/no/such/table.csv", &TableConfig::default());
        assert!(matches!(
            result,
            Err(crate::error::NormalizerError::Table(TableError::FileNotFound { .. }))
        ));
    }
}
