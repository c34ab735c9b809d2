use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::SplitError;
use crate::model::GroupOutcome;

#[must_use]
pub fn archive_file_name(batch_date: &str) -> String {
    format!("LO_Refunds_{batch_date}.zip")
}

#[must_use]
pub fn entry_file_name(batch_date: &str, identifier: &str) -> String {
    format!("{batch_date}-{identifier}.pdf")
}

/// Packs every built group document into one deflate-compressed zip. Failed
/// groups are left out; the archive may end up empty.
pub fn build_archive(outcomes: &[GroupOutcome]) -> Result<Vec<u8>, SplitError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for outcome in outcomes {
        let GroupOutcome::Built { file_name, pdf, .. } = outcome else {
            continue;
        };
        writer.start_file(file_name.as_str(), options)?;
        writer.write_all(pdf)?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use super::{archive_file_name, build_archive, entry_file_name};
    use crate::model::GroupOutcome;

    #[test]
    fn names_follow_batch_date() {
        assert_eq!(archive_file_name("112425"), "LO_Refunds_112425.zip");
        assert_eq!(entry_file_name("112425", "016"), "112425-016.pdf");
    }

    #[test]
    fn skips_failed_groups() {
        let outcomes = vec![
            GroupOutcome::Built {
                identifier: "016".to_string(),
                file_name: entry_file_name("112425", "016"),
                row_count: 2,
                pdf: b"%PDF-1.5 fake".to_vec(),
            },
            GroupOutcome::Failed {
                identifier: "020".to_string(),
                reason: "render failed".to_string(),
            },
        ];

        let bytes = build_archive(&outcomes).expect("archive should build");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("archive should open");
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_name("112425-016.pdf").expect("entry should exist");
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .expect("entry should be readable");
        assert_eq!(contents, b"%PDF-1.5 fake");
    }

    #[test]
    fn empty_archive_is_valid() {
        let bytes = build_archive(&[]).expect("archive should build");
        let archive = ZipArchive::new(Cursor::new(bytes)).expect("archive should open");
        assert_eq!(archive.len(), 0);
    }
}
